//! Insight aggregation over recorded results
//!
//! Rules-based and deterministic: counts are pulled from list payloads by
//! their [`PayloadKind`], then recommendation rules run over the counts.

use crate::models::{CategorySummary, Insights, PayloadKind, RecordedResult};
use crate::planner::follow_ups::list_items;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const CAMPAIGNS_CATEGORY: &str = "campaigns";
pub const SEGMENTS_CATEGORY: &str = "segments";

pub const TARGETED_CAMPAIGNS_RECOMMENDATION: &str =
    "You have far more segments than campaigns. Consider creating targeted campaigns for your most valuable segments.";

/// Trait for recommendation rules
pub trait InsightRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recommendation text when the rule fires
    fn evaluate(&self, summary: &BTreeMap<String, CategorySummary>) -> Option<String>;
}

pub struct InsightAggregator {
    rules: Vec<Box<dyn InsightRule>>,
}

impl InsightAggregator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn InsightRule>) {
        self.rules.push(rule);
    }

    pub fn summarize(&self, results: &[RecordedResult]) -> Insights {
        let mut data_summary: BTreeMap<String, CategorySummary> = BTreeMap::new();

        for result in results {
            let (category, status_of): (&str, fn(&Value) -> Option<String>) = match result.kind {
                PayloadKind::CampaignList => (CAMPAIGNS_CATEGORY, campaign_status),
                PayloadKind::SegmentList => (SEGMENTS_CATEGORY, segment_status),
                PayloadKind::MetricAggregate | PayloadKind::GenericTool => continue,
            };

            let summary = data_summary.entry(category.to_string()).or_default();
            for item in list_items(&result.data) {
                summary.total += 1;
                if let Some(status) = status_of(item) {
                    *summary.by_status.entry(status).or_insert(0) += 1;
                }
            }
        }

        let recommendations: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let recommendation = rule.evaluate(&data_summary)?;
                debug!(rule = rule.name(), "Insight rule fired");
                Some(recommendation)
            })
            .collect();

        Insights {
            data_summary,
            correlations: Vec::new(),
            recommendations,
        }
    }
}

impl Default for InsightAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn attribute<'a>(item: &'a Value, key: &str) -> Option<&'a Value> {
    item.get("attributes")
        .and_then(|attrs| attrs.get(key))
        .or_else(|| item.get(key))
}

fn campaign_status(item: &Value) -> Option<String> {
    attribute(item, "status")
        .and_then(Value::as_str)
        .map(|status| status.to_lowercase())
}

fn segment_status(item: &Value) -> Option<String> {
    attribute(item, "is_active")
        .and_then(Value::as_bool)
        .map(|active| if active { "active" } else { "inactive" }.to_string())
}

//
// ========== Recommendation Rules ==========
//

/// Rule: segments outnumber campaigns more than two to one
pub struct SegmentCoverageRule;

impl InsightRule for SegmentCoverageRule {
    fn name(&self) -> &'static str {
        "segment_coverage"
    }

    fn evaluate(&self, summary: &BTreeMap<String, CategorySummary>) -> Option<String> {
        let campaigns = summary.get(CAMPAIGNS_CATEGORY)?;
        let segments = summary.get(SEGMENTS_CATEGORY)?;

        (segments.total > 2 * campaigns.total)
            .then(|| TARGETED_CAMPAIGNS_RECOMMENDATION.to_string())
    }
}

/// Create an aggregator with the standard rules
pub fn create_default_insight_aggregator() -> InsightAggregator {
    let mut aggregator = InsightAggregator::new();
    aggregator.add_rule(Box::new(SegmentCoverageRule));
    aggregator
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn campaigns(count: usize) -> RecordedResult {
        let items: Vec<Value> = (0..count)
            .map(|i| {
                let status = if i % 2 == 0 { "Sent" } else { "Draft" };
                json!({"id": format!("c{}", i), "attributes": {"status": status}})
            })
            .collect();
        RecordedResult::new("List campaigns", "campaigns.list", json!({ "data": items }))
    }

    fn segments(count: usize) -> RecordedResult {
        let items: Vec<Value> = (0..count)
            .map(|i| json!({"id": format!("s{}", i), "attributes": {"is_active": i != 0}}))
            .collect();
        RecordedResult::new("List segments", "segments.list", json!({ "data": items }))
    }

    #[test]
    fn test_counts_by_status() {
        let insights = create_default_insight_aggregator().summarize(&[campaigns(3), segments(2)]);

        let campaign_summary = &insights.data_summary[CAMPAIGNS_CATEGORY];
        assert_eq!(campaign_summary.total, 3);
        assert_eq!(campaign_summary.by_status["sent"], 2);
        assert_eq!(campaign_summary.by_status["draft"], 1);

        let segment_summary = &insights.data_summary[SEGMENTS_CATEGORY];
        assert_eq!(segment_summary.total, 2);
        assert_eq!(segment_summary.by_status["active"], 1);
        assert_eq!(segment_summary.by_status["inactive"], 1);

        assert!(insights.recommendations.is_empty());
        assert!(insights.correlations.is_empty());
    }

    #[test]
    fn test_targeted_campaign_recommendation() {
        let insights = create_default_insight_aggregator().summarize(&[campaigns(2), segments(5)]);
        assert_eq!(
            insights.recommendations,
            vec![TARGETED_CAMPAIGNS_RECOMMENDATION.to_string()]
        );

        // Exactly twice as many is not enough
        let insights = create_default_insight_aggregator().summarize(&[campaigns(2), segments(4)]);
        assert!(insights.recommendations.is_empty());
    }

    #[test]
    fn test_rule_needs_both_summaries() {
        let insights = create_default_insight_aggregator().summarize(&[segments(9)]);
        assert!(insights.recommendations.is_empty());
        assert!(!insights.data_summary.contains_key(CAMPAIGNS_CATEGORY));
    }

    #[test]
    fn test_other_payloads_ignored() {
        let aggregate = RecordedResult::new(
            "Aggregate revenue",
            "metrics.aggregate",
            json!({"data": [{"value": 10}]}),
        );
        let insights = InsightAggregator::new().summarize(&[aggregate]);
        assert!(insights.data_summary.is_empty());
    }
}
