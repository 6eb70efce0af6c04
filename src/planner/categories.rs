//! Keyword taxonomy for classifying query parts
//!
//! Classification is non-exclusive: a part can land in several categories,
//! or in none.

use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Revenue,
    Performance,
    Campaign,
    Flow,
    Segment,
    Profile,
    Template,
    List,
    Tag,
    Event,
    Comparative,
    Analytical,
}

/// Static keyword lists
const REVENUE_KEYWORDS: &[&str] = &[
    "revenue", "sales", "order", "orders", "purchase", "purchases", "income", "earnings",
    "money", "roi", "aov", "placed order",
];

const PERFORMANCE_KEYWORDS: &[&str] = &[
    "performance", "performing", "metric", "metrics", "stats", "statistics", "analytics",
    "kpi", "kpis", "engagement", "open rate", "click rate",
];

const CAMPAIGN_KEYWORDS: &[&str] = &[
    "campaign", "campaigns", "newsletter", "newsletters", "blast", "blasts",
];

const FLOW_KEYWORDS: &[&str] = &[
    "flow", "flows", "automation", "automations", "journey", "journeys",
];

const SEGMENT_KEYWORDS: &[&str] = &[
    "segment", "segments", "audience", "audiences", "cohort", "cohorts",
];

const PROFILE_KEYWORDS: &[&str] = &[
    "profile", "profiles", "customer", "customers", "subscriber", "subscribers", "contact",
    "contacts",
];

const TEMPLATE_KEYWORDS: &[&str] = &["template", "templates"];

const LIST_KEYWORDS: &[&str] = &[
    "lists", "mailing list", "email list", "subscriber list", "contact list",
];

const TAG_KEYWORDS: &[&str] = &["tag", "tags", "tagged", "label", "labels"];

const EVENT_KEYWORDS: &[&str] = &["event", "events", "activity", "activities"];

const COMPARATIVE_KEYWORDS: &[&str] = &[
    "compare", "compared", "comparison", "versus", "vs", "better", "worse",
];

const ANALYTICAL_KEYWORDS: &[&str] = &[
    "analyze", "analyse", "analysis", "breakdown", "trend", "trends", "insight", "insights",
    "report", "overview", "how did", "how well", "best performing", "top performing",
];

/// Phrases that ask for campaign-level delivery and engagement numbers
pub const COMPREHENSIVE_CAMPAIGN_PHRASES: &[&str] = &[
    "campaign performance", "campaigns performance", "campaign metrics", "campaign stats",
    "campaign results", "campaign report", "deliveries", "delivered", "open percent",
    "open rate", "click rate",
];

/// Revenue intent inside a comprehensive campaign request
pub const COMPREHENSIVE_REVENUE_KEYWORDS: &[&str] = &[
    "revenue", "order", "orders", "sales", "performance", "roi", "conversion", "conversions",
];

/// Words asking for per-campaign numbers rather than a bare listing
pub const CAMPAIGN_DETAIL_KEYWORDS: &[&str] = &[
    "send", "sends", "sent", "open", "opens", "opened", "click", "clicks", "clicked",
    "revenue", "recipients", "bounces", "unsubscribes",
];

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Revenue,
        Category::Performance,
        Category::Campaign,
        Category::Flow,
        Category::Segment,
        Category::Profile,
        Category::Template,
        Category::List,
        Category::Tag,
        Category::Event,
        Category::Comparative,
        Category::Analytical,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Revenue => REVENUE_KEYWORDS,
            Category::Performance => PERFORMANCE_KEYWORDS,
            Category::Campaign => CAMPAIGN_KEYWORDS,
            Category::Flow => FLOW_KEYWORDS,
            Category::Segment => SEGMENT_KEYWORDS,
            Category::Profile => PROFILE_KEYWORDS,
            Category::Template => TEMPLATE_KEYWORDS,
            Category::List => LIST_KEYWORDS,
            Category::Tag => TAG_KEYWORDS,
            Category::Event => EVENT_KEYWORDS,
            Category::Comparative => COMPARATIVE_KEYWORDS,
            Category::Analytical => ANALYTICAL_KEYWORDS,
        }
    }
}

/// Lowercased query part with its word set.
///
/// Single-word keywords match whole words only ("tag" must not match
/// "percentage"); multi-word keywords match as substrings.
pub struct QueryText {
    lowered: String,
    words: HashSet<String>,
}

impl QueryText {
    pub fn new(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        Self { lowered, words }
    }

    pub fn has(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            self.lowered.contains(keyword)
        } else {
            self.words.contains(keyword)
        }
    }

    pub fn has_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.has(kw))
    }
}

pub fn classify(text: &QueryText) -> BTreeSet<Category> {
    Category::ALL
        .iter()
        .copied()
        .filter(|category| text.has_any(category.keywords()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories_of(text: &str) -> BTreeSet<Category> {
        classify(&QueryText::new(text))
    }

    #[test]
    fn test_multiple_categories() {
        let found = categories_of("Compare flow revenue versus campaign revenue");
        assert!(found.contains(&Category::Revenue));
        assert!(found.contains(&Category::Flow));
        assert!(found.contains(&Category::Campaign));
        assert!(found.contains(&Category::Comparative));
        assert!(!found.contains(&Category::Segment));
    }

    #[test]
    fn test_whole_word_matching() {
        let found = categories_of("what percentage of the stage was reached");
        assert!(!found.contains(&Category::Tag));

        let found = categories_of("List all segments");
        assert!(!found.contains(&Category::List));
        assert!(found.contains(&Category::Segment));
    }

    #[test]
    fn test_phrase_matching() {
        let text = QueryText::new("Show our mailing list growth");
        assert!(text.has("mailing list"));
        assert!(classify(&text).contains(&Category::List));
    }

    #[test]
    fn test_no_category() {
        assert!(categories_of("hello there").is_empty());
        assert!(categories_of("").is_empty());
    }
}
