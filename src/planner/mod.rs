//! Strategy planning
//!
//! Turns a free-text request into an ordered, deduplicated list of
//! [`Strategy`] values. Planning is deterministic keyword routing; nothing
//! here touches the network.

use crate::models::{QueryContext, Strategy, ToolGuess};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

pub mod catalog;
pub mod categories;
pub mod follow_ups;
pub mod time_range;

use catalog::FALLBACK_REVENUE_METRIC_ID;
use categories::{
    classify, Category, QueryText, CAMPAIGN_DETAIL_KEYWORDS, COMPREHENSIVE_CAMPAIGN_PHRASES,
    COMPREHENSIVE_REVENUE_KEYWORDS,
};
use time_range::{extract_time_range, mentions_time, TimeRange};

/// Produces phase-2 strategies from a phase-1 result.
///
/// Called at most once per strategy, only after its primary invocation
/// succeeded, with that invocation's data.
pub trait FollowUpPlanner: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn plan_follow_ups(&self, parent: &Value) -> Vec<Strategy>;
}

/// Entity categories that map to a single plain listing
const PLAIN_LISTINGS: &[(Category, &str, &str)] = &[
    (Category::Flow, catalog::FLOWS_LIST, "flows"),
    (Category::Segment, catalog::SEGMENTS_LIST, "segments"),
    (Category::Profile, catalog::PROFILES_LIST, "profiles"),
    (Category::Template, catalog::TEMPLATES_LIST, "templates"),
    (Category::List, catalog::LISTS_LIST, "lists"),
    (Category::Tag, catalog::TAGS_LIST, "tags"),
    (Category::Event, catalog::EVENTS_LIST, "events"),
];

/// Keyword → tool routing for direct-mode guesses, first match wins
const DIRECT_GUESSES: &[(&[&str], &str)] = &[
    (&["campaign"], catalog::CAMPAIGNS_LIST),
    (&["metric", "performance"], catalog::METRICS_LIST),
    (&["segment"], catalog::SEGMENTS_LIST),
    (&["flow"], catalog::FLOWS_LIST),
    (&["profile", "customer"], catalog::PROFILES_LIST),
    (&["template"], catalog::TEMPLATES_LIST),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyBuilder;

impl StrategyBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build strategies relative to the current time
    pub fn build(&self, query: &str, context: &QueryContext) -> Vec<Strategy> {
        self.build_at(query, context, Utc::now())
    }

    /// Build strategies relative to `now`
    pub fn build_at(
        &self,
        query: &str,
        context: &QueryContext,
        now: DateTime<Utc>,
    ) -> Vec<Strategy> {
        let mut parts = split_query(query);
        if parts.is_empty() {
            parts.push(query.trim().to_string());
        }

        let strategies: Vec<Strategy> = parts
            .iter()
            .flat_map(|part| self.build_part(part, context, now))
            .collect();

        let strategies = dedup_strategies(strategies);

        debug!(
            parts = parts.len(),
            strategy_count = strategies.len(),
            client_id = %context.client_id,
            "Strategies built"
        );

        strategies
    }

    fn build_part(&self, part: &str, context: &QueryContext, now: DateTime<Utc>) -> Vec<Strategy> {
        let text = QueryText::new(part);
        let categories = classify(&text);
        let has = |category: Category| categories.contains(&category);

        let explicit_range = extract_time_range(part, now);
        let range = TimeRange::or_default(explicit_range, now);
        let revenue_metric = context.revenue_metric_id.as_deref();

        let mut strategies = Vec::new();

        let comprehensive = text.has_any(COMPREHENSIVE_CAMPAIGN_PHRASES)
            || (has(Category::Campaign) && has(Category::Analytical));

        if comprehensive {
            strategies.push(catalog::comprehensive_campaigns(range));

            if let Some(metric_id) = revenue_metric {
                if text.has_any(COMPREHENSIVE_REVENUE_KEYWORDS) {
                    strategies.push(catalog::revenue_aggregate(metric_id, range));
                }
            }
        }

        if has(Category::Revenue) {
            match revenue_metric {
                Some(metric_id) => strategies.push(catalog::revenue_aggregate(metric_id, range)),
                None => {
                    strategies.push(catalog::revenue_metric_discovery(range));
                    strategies.push(catalog::revenue_aggregate(FALLBACK_REVENUE_METRIC_ID, range));
                }
            }

            if has(Category::Flow) {
                strategies.push(catalog::list_strategy(catalog::FLOWS_LIST, "flows"));
                strategies.push(catalog::flow_revenue_aggregate(
                    revenue_metric.unwrap_or(FALLBACK_REVENUE_METRIC_ID),
                    range,
                ));
            }
        }

        if has(Category::Performance) && !comprehensive {
            strategies.push(catalog::engagement_metrics(range));
        }

        if has(Category::Campaign) && !comprehensive {
            if text.has_any(CAMPAIGN_DETAIL_KEYWORDS) {
                strategies.push(catalog::detailed_campaigns(range));
            } else {
                strategies.push(catalog::campaigns_list());
            }
        }

        for (category, tool, entity) in PLAIN_LISTINGS {
            if has(*category) {
                strategies.push(catalog::list_strategy(tool, entity));
            }
        }

        // Comparative-only parts get the padding below instead
        if strategies.is_empty() && !has(Category::Comparative) {
            strategies.push(catalog::recent_campaigns());
            if mentions_time(part, explicit_range.as_ref()) {
                strategies.push(catalog::list_strategy(catalog::METRICS_LIST, "metrics"));
            }
        }

        if has(Category::Comparative) {
            let distinct = unique_signatures(&strategies);
            if distinct < 2 {
                strategies.push(catalog::campaigns_list());
                strategies.push(catalog::segments_list());
            }
        }

        strategies
    }

    /// Cheap single-keyword guess for direct fallbacks; `None` for a blank
    /// query
    pub fn guess_direct_tool(&self, query: &str) -> Option<ToolGuess> {
        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let tool = DIRECT_GUESSES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(_, tool)| *tool)
            .unwrap_or(catalog::CAMPAIGNS_LIST);

        Some(ToolGuess::new(tool))
    }
}

/// Split into independent parts: lines, else sentences, else the whole text
pub fn split_query(query: &str) -> Vec<String> {
    let pieces: Vec<&str> = if query.contains('\n') {
        query.lines().collect()
    } else if query.contains(". ") {
        query.split(". ").collect()
    } else {
        vec![query]
    };

    pieces
        .into_iter()
        .map(|piece| piece.trim().trim_end_matches('.').trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep the first strategy per (tool, params) signature, preserving order
pub fn dedup_strategies(strategies: Vec<Strategy>) -> Vec<Strategy> {
    let mut seen = HashSet::with_capacity(strategies.len());
    strategies
        .into_iter()
        .filter(|strategy| seen.insert(strategy.signature()))
        .collect()
}

fn unique_signatures(strategies: &[Strategy]) -> usize {
    strategies
        .iter()
        .map(Strategy::signature)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::{
        any, prop, prop_assert, prop_assert_eq, proptest, Strategy as ValueStrategy,
        TestCaseError,
    };
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn context_with_revenue() -> QueryContext {
        QueryContext {
            client_id: "client-1".to_string(),
            revenue_metric_id: Some("RevM1".to_string()),
            client_name: Some("Acme".to_string()),
            account_id: None,
        }
    }

    fn tools(strategies: &[Strategy]) -> Vec<&str> {
        strategies.iter().map(Strategy::tool).collect()
    }

    fn assert_no_duplicates(strategies: &[Strategy]) {
        assert_eq!(unique_signatures(strategies), strategies.len());
    }

    #[test]
    fn test_split_query() {
        assert_eq!(
            split_query("List all segments\nShow campaign performance\n\n"),
            vec!["List all segments", "Show campaign performance"]
        );
        assert_eq!(
            split_query("Show flows. Then list tags."),
            vec!["Show flows", "Then list tags"]
        );
        assert_eq!(split_query("just one part"), vec!["just one part"]);
        assert!(split_query("   ").is_empty());
    }

    #[test]
    fn test_unrecognized_query_falls_back() {
        let builder = StrategyBuilder::new();
        let context = QueryContext::minimal("c");

        for query in ["hello there", "", "   ", "¿qué tal?"] {
            let strategies = builder.build_at(query, &context, now());
            assert!(!strategies.is_empty(), "empty plan for {:?}", query);
            assert_eq!(strategies[0].description(), "List recent campaigns");
        }

        let strategies = builder.build_at("anything from last week", &context, now());
        assert_eq!(tools(&strategies), vec!["campaigns.list", "metrics.list"]);
    }

    #[test]
    fn test_comprehensive_campaign_with_revenue() {
        let strategies = StrategyBuilder::new().build_at(
            "Show campaign performance for last 30 days",
            &context_with_revenue(),
            now(),
        );

        assert_eq!(tools(&strategies), vec!["campaigns.list", "metrics.aggregate"]);
        assert_eq!(
            strategies[0].follow_up().map(|p| p.name()),
            Some("campaign_performance")
        );
        assert_eq!(strategies[1].params()["metric_id"], json!("RevM1"));
        assert_eq!(strategies[1].params()["start"], json!("2026-09-19T09:00:00Z"));
        assert_eq!(strategies[1].params()["end"], json!("2026-10-19T09:00:00Z"));
    }

    #[test]
    fn test_comprehensive_campaign_without_revenue_metric() {
        let strategies = StrategyBuilder::new().build_at(
            "campaign performance",
            &QueryContext::minimal("c"),
            now(),
        );
        assert_eq!(tools(&strategies), vec!["campaigns.list"]);
        assert!(strategies[0].follow_up().is_some());
    }

    #[test]
    fn test_revenue_without_metric_uses_discovery() {
        let strategies = StrategyBuilder::new().build_at(
            "What was our revenue October 2024?",
            &QueryContext::minimal("c"),
            now(),
        );

        assert_eq!(tools(&strategies), vec!["metrics.list", "metrics.aggregate"]);
        assert_eq!(strategies[0].description(), "Discover revenue metric");
        assert_eq!(
            strategies[1].params()["metric_id"],
            json!(FALLBACK_REVENUE_METRIC_ID)
        );
        assert_eq!(strategies[1].params()["start"], json!("2024-10-01T00:00:00Z"));
        assert_eq!(strategies[1].params()["end"], json!("2024-10-31T23:59:59Z"));
    }

    #[test]
    fn test_flow_revenue() {
        let strategies = StrategyBuilder::new().build_at(
            "How much revenue did each flow generate",
            &context_with_revenue(),
            now(),
        );

        assert_eq!(
            tools(&strategies),
            vec!["metrics.aggregate", "flows.list", "metrics.aggregate"]
        );
        assert_eq!(strategies[2].params()["by"], json!(["$flow"]));
        assert_no_duplicates(&strategies);
    }

    #[test]
    fn test_campaign_detail_vs_plain() {
        let builder = StrategyBuilder::new();
        let context = QueryContext::minimal("c");

        let detailed = builder.build_at("how many opens did my campaigns get", &context, now());
        assert_eq!(tools(&detailed), vec!["campaigns.list"]);
        assert_eq!(
            detailed[0].follow_up().map(|p| p.name()),
            Some("campaign_metrics")
        );

        let plain = builder.build_at("show my campaigns", &context, now());
        assert_eq!(tools(&plain), vec!["campaigns.list"]);
        assert!(plain[0].follow_up().is_none());
    }

    #[test]
    fn test_performance_metrics() {
        let strategies = StrategyBuilder::new().build_at(
            "engagement metrics this quarter",
            &QueryContext::minimal("c"),
            now(),
        );
        assert_eq!(tools(&strategies), vec!["metrics.list"]);
        assert_eq!(
            strategies[0].follow_up().map(|p| p.name()),
            Some("engagement_metrics")
        );
    }

    #[test]
    fn test_plain_listings() {
        let strategies = StrategyBuilder::new().build_at(
            "show templates, tags and events for every profile",
            &QueryContext::minimal("c"),
            now(),
        );
        assert_eq!(
            tools(&strategies),
            vec!["profiles.list", "templates.list", "tags.list", "events.list"]
        );
        assert!(strategies
            .iter()
            .all(|s| s.params() == &json!({"page_size": catalog::DEFAULT_PAGE_SIZE})));
    }

    #[test]
    fn test_comparative_padding() {
        let strategies = StrategyBuilder::new().build_at(
            "which is better?",
            &QueryContext::minimal("c"),
            now(),
        );
        assert_eq!(tools(&strategies), vec!["campaigns.list", "segments.list"]);
        assert_eq!(strategies[0].params(), &json!({"page_size": 50}));
        assert_no_duplicates(&strategies);

        for query in ["compare", "compare last month"] {
            let strategies =
                StrategyBuilder::new().build_at(query, &QueryContext::minimal("c"), now());
            assert_eq!(tools(&strategies), vec!["campaigns.list", "segments.list"]);
        }

        let strategies = StrategyBuilder::new().build_at(
            "compare segments versus flows",
            &QueryContext::minimal("c"),
            now(),
        );
        assert_eq!(tools(&strategies), vec!["flows.list", "segments.list"]);
    }

    #[test]
    fn test_compound_query_dedups_across_parts() {
        let strategies = StrategyBuilder::new().build_at(
            "List all segments\nShow campaign performance for last 7 days\nList all segments",
            &context_with_revenue(),
            now(),
        );

        assert!(tools(&strategies).contains(&"segments.list"));
        assert!(strategies
            .iter()
            .any(|s| s.tool() == "campaigns.list" && s.follow_up().is_some()));
        assert_no_duplicates(&strategies);
        assert_eq!(strategies[0].tool(), "segments.list");
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = StrategyBuilder::new();
        let context = context_with_revenue();
        let query = "Compare revenue by flow vs campaigns last month. List tags";

        let first: Vec<String> = builder
            .build_at(query, &context, now())
            .iter()
            .map(|s| format!("{}|{}", s.signature(), s.description()))
            .collect();
        let second: Vec<String> = builder
            .build_at(query, &context, now())
            .iter()
            .map(|s| format!("{}|{}", s.signature(), s.description()))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_guess_direct_tool() {
        let builder = StrategyBuilder::new();
        let guess = |q: &str| builder.guess_direct_tool(q).map(|g| g.tool);

        assert_eq!(guess("campaign sends"), Some("campaigns.list".to_string()));
        assert_eq!(guess("Performance please"), Some("metrics.list".to_string()));
        assert_eq!(guess("top segments"), Some("segments.list".to_string()));
        assert_eq!(guess("customers"), Some("profiles.list".to_string()));
        assert_eq!(guess("templates"), Some("templates.list".to_string()));
        assert_eq!(guess("something else"), Some("campaigns.list".to_string()));
        assert_eq!(guess("  "), None);
    }

    const VOCABULARY: &[&str] = &[
        "show", "list", "all", "campaign", "campaigns", "performance", "revenue", "orders",
        "flows", "segments", "profiles", "templates", "tags", "events", "compare", "vs",
        "better", "analyze", "trend", "opens", "clicks", "sends", "open rate", "last",
        "past", "7", "2", "days", "weeks", "months", "year", "October", "2024", "today",
        "yesterday", "metrics", "deliveries", ".", "\n",
    ];

    fn any_context() -> impl ValueStrategy<Value = QueryContext> {
        any::<bool>().prop_map(|with_revenue| {
            if with_revenue {
                context_with_revenue()
            } else {
                QueryContext::minimal("client-1")
            }
        })
    }

    fn keyword_query() -> impl ValueStrategy<Value = String> {
        prop::collection::vec(prop::sample::select(VOCABULARY), 0..12)
            .prop_map(|words| words.join(" "))
    }

    fn rendered(strategies: &[Strategy]) -> Vec<String> {
        strategies
            .iter()
            .map(|s| format!("{}|{}|{}", s.signature(), s.description(), s.fallback_tool()))
            .collect()
    }

    fn check_plan(query: &str, context: &QueryContext) -> std::result::Result<(), TestCaseError> {
        let builder = StrategyBuilder::new();
        let first = builder.build_at(query, context, now());
        let second = builder.build_at(query, context, now());

        prop_assert!(!first.is_empty(), "empty plan for {:?}", query);
        prop_assert_eq!(unique_signatures(&first), first.len());
        prop_assert_eq!(rendered(&first), rendered(&second));
        Ok(())
    }

    proptest! {
        #[test]
        fn test_arbitrary_text_plans(
            query in "\\PC{0,120}",
            context in any_context()
        ) {
            check_plan(&query, &context)?;
        }

        #[test]
        fn test_keyword_mixes_plan(
            query in keyword_query(),
            context in any_context()
        ) {
            check_plan(&query, &context)?;
        }
    }
}
