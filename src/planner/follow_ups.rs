//! Follow-up planners: turn a listing result into per-entity strategies

use super::catalog::{
    self, CAMPAIGN_STATISTICS, COMPREHENSIVE_CAMPAIGN_STATISTICS, ENGAGEMENT_MEASUREMENTS,
    ENGAGEMENT_METRIC_NAMES, MAX_FOLLOW_UP_ENTITIES, REVENUE_MEASUREMENTS, REVENUE_METRIC_NAME,
};
use super::time_range::TimeRange;
use super::FollowUpPlanner;
use crate::models::Strategy;
use serde_json::Value;

/// Entities of a listing payload: `{"data": [...]}` or a bare array
pub fn list_items(payload: &Value) -> &[Value] {
    payload
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| payload.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn entity_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn entity_name(item: &Value) -> Option<&str> {
    item.get("attributes")
        .and_then(|attrs| attrs.get("name"))
        .or_else(|| item.get("name"))
        .and_then(Value::as_str)
}

/// One metrics strategy per listed campaign, capped at
/// [`MAX_FOLLOW_UP_ENTITIES`]
#[derive(Debug, Clone)]
pub struct CampaignMetricsPlanner {
    range: TimeRange,
    statistics: &'static [&'static str],
    with_detail_fallback: bool,
}

impl CampaignMetricsPlanner {
    pub fn comprehensive(range: TimeRange) -> Self {
        Self {
            range,
            statistics: COMPREHENSIVE_CAMPAIGN_STATISTICS,
            with_detail_fallback: true,
        }
    }

    pub fn per_campaign(range: TimeRange) -> Self {
        Self {
            range,
            statistics: CAMPAIGN_STATISTICS,
            with_detail_fallback: false,
        }
    }
}

impl FollowUpPlanner for CampaignMetricsPlanner {
    fn name(&self) -> &'static str {
        if self.with_detail_fallback {
            "campaign_performance"
        } else {
            "campaign_metrics"
        }
    }

    fn plan_follow_ups(&self, parent: &Value) -> Vec<Strategy> {
        list_items(parent)
            .iter()
            .filter_map(|item| {
                let id = entity_id(item)?;
                let name = entity_name(item).unwrap_or(&id).to_string();
                Some((id, name))
            })
            .take(MAX_FOLLOW_UP_ENTITIES)
            .map(|(id, name)| {
                catalog::campaign_metrics(
                    &id,
                    &name,
                    self.statistics,
                    self.range,
                    self.with_detail_fallback,
                )
            })
            .collect()
    }
}

/// One aggregate per listed metric whose name matches a fragment
#[derive(Debug, Clone)]
pub struct MetricAggregatePlanner {
    range: TimeRange,
    name_fragments: &'static [&'static str],
    measurements: &'static [&'static str],
    label: &'static str,
}

impl MetricAggregatePlanner {
    /// Opened / clicked / received / sent counts
    pub fn engagement(range: TimeRange) -> Self {
        Self {
            range,
            name_fragments: ENGAGEMENT_METRIC_NAMES,
            measurements: ENGAGEMENT_MEASUREMENTS,
            label: "engagement_metrics",
        }
    }

    /// Revenue sums for a discovered "Placed Order" metric
    pub fn revenue(range: TimeRange) -> Self {
        Self {
            range,
            name_fragments: &[REVENUE_METRIC_NAME],
            measurements: REVENUE_MEASUREMENTS,
            label: "revenue_metric",
        }
    }
}

impl FollowUpPlanner for MetricAggregatePlanner {
    fn name(&self) -> &'static str {
        self.label
    }

    fn plan_follow_ups(&self, parent: &Value) -> Vec<Strategy> {
        list_items(parent)
            .iter()
            .filter_map(|item| {
                let id = entity_id(item)?;
                let name = entity_name(item)?;
                let lowered = name.to_lowercase();
                self.name_fragments
                    .iter()
                    .any(|fragment| lowered.contains(fragment))
                    .then(|| catalog::metric_aggregate(&id, name, self.measurements, self.range))
            })
            .collect()
    }
}
