//! Tool names and strategy constructors
//!
//! Every tool is opaque to the engine; this module only fixes the names and
//! parameter shapes the planner emits.

use super::follow_ups::{CampaignMetricsPlanner, MetricAggregatePlanner};
use super::time_range::TimeRange;
use crate::models::Strategy;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CAMPAIGNS_LIST: &str = "campaigns.list";
pub const CAMPAIGNS_GET: &str = "campaigns.get";
pub const CAMPAIGNS_GET_METRICS: &str = "campaigns.get_metrics";
pub const METRICS_LIST: &str = "metrics.list";
pub const METRICS_AGGREGATE: &str = "metrics.aggregate";
pub const SEGMENTS_LIST: &str = "segments.list";
pub const FLOWS_LIST: &str = "flows.list";
pub const PROFILES_LIST: &str = "profiles.list";
pub const TEMPLATES_LIST: &str = "templates.list";
pub const LISTS_LIST: &str = "lists.list";
pub const TAGS_LIST: &str = "tags.list";
pub const EVENTS_LIST: &str = "events.list";

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const RECENT_PAGE_SIZE: u64 = 10;

/// Cap on per-entity follow-ups generated from one listing
pub const MAX_FOLLOW_UP_ENTITIES: usize = 10;

/// Metric id used when the client has no resolved revenue metric
pub const FALLBACK_REVENUE_METRIC_ID: &str = "placed_order";

/// Name fragment identifying the revenue metric during discovery
pub const REVENUE_METRIC_NAME: &str = "placed order";

pub const REVENUE_MEASUREMENTS: &[&str] = &["sum_value", "count"];
pub const ENGAGEMENT_MEASUREMENTS: &[&str] = &["count"];
pub const ENGAGEMENT_METRIC_NAMES: &[&str] = &["opened", "clicked", "received", "sent"];

pub const COMPREHENSIVE_CAMPAIGN_STATISTICS: &[&str] = &[
    "recipients",
    "delivered",
    "delivery_rate",
    "opens",
    "open_rate",
    "clicks",
    "click_rate",
    "conversions",
    "conversion_value",
    "unsubscribes",
    "bounced",
];

pub const CAMPAIGN_STATISTICS: &[&str] = &["recipients", "opens", "clicks", "conversion_value"];

/// Plain `<entity>.list` with the fixed page size
pub fn list_strategy(tool: &str, entity: &str) -> Strategy {
    Strategy::new(
        tool,
        json!({ "page_size": DEFAULT_PAGE_SIZE }),
        format!("List {}", entity),
    )
}

pub fn campaigns_list() -> Strategy {
    list_strategy(CAMPAIGNS_LIST, "campaigns")
}

pub fn segments_list() -> Strategy {
    list_strategy(SEGMENTS_LIST, "segments")
}

/// Most recently created campaigns; falls back to an unparameterized listing
pub fn recent_campaigns() -> Strategy {
    Strategy::new(
        CAMPAIGNS_LIST,
        json!({ "page_size": RECENT_PAGE_SIZE, "sort": "-created_at" }),
        "List recent campaigns",
    )
    .with_fallback(CAMPAIGNS_LIST, json!({}))
}

/// Phase-1 listing whose follow-ups fetch full delivery metrics per campaign
pub fn comprehensive_campaigns(range: TimeRange) -> Strategy {
    list_strategy(CAMPAIGNS_LIST, "campaigns for performance analysis")
        .with_follow_up(Arc::new(CampaignMetricsPlanner::comprehensive(range)))
}

/// Listing whose follow-ups fetch the basic numbers per campaign
pub fn detailed_campaigns(range: TimeRange) -> Strategy {
    list_strategy(CAMPAIGNS_LIST, "campaigns with send details")
        .with_follow_up(Arc::new(CampaignMetricsPlanner::per_campaign(range)))
}

/// Metric listing whose follow-ups aggregate the engagement metrics
pub fn engagement_metrics(range: TimeRange) -> Strategy {
    list_strategy(METRICS_LIST, "metrics")
        .with_follow_up(Arc::new(MetricAggregatePlanner::engagement(range)))
}

/// Searches for the revenue metric and aggregates whatever it finds
pub fn revenue_metric_discovery(range: TimeRange) -> Strategy {
    Strategy::new(
        METRICS_LIST,
        json!({ "search": "Placed Order" }),
        "Discover revenue metric",
    )
    .with_follow_up(Arc::new(MetricAggregatePlanner::revenue(range)))
}

pub fn revenue_aggregate(metric_id: &str, range: TimeRange) -> Strategy {
    Strategy::new(
        METRICS_AGGREGATE,
        aggregate_params(metric_id, REVENUE_MEASUREMENTS, range),
        format!(
            "Aggregate revenue for metric {} from {} to {}",
            metric_id,
            range.start_iso(),
            range.end_iso()
        ),
    )
}

pub fn flow_revenue_aggregate(metric_id: &str, range: TimeRange) -> Strategy {
    let mut params = aggregate_params(metric_id, REVENUE_MEASUREMENTS, range);
    params["by"] = json!(["$flow"]);

    Strategy::new(
        METRICS_AGGREGATE,
        params,
        format!("Aggregate revenue by flow for metric {}", metric_id),
    )
}

pub fn metric_aggregate(metric_id: &str, metric_name: &str, measurements: &[&str], range: TimeRange) -> Strategy {
    Strategy::new(
        METRICS_AGGREGATE,
        aggregate_params(metric_id, measurements, range),
        format!("Aggregate metric '{}'", metric_name),
    )
}

pub fn aggregate_params(metric_id: &str, measurements: &[&str], range: TimeRange) -> Value {
    json!({
        "metric_id": metric_id,
        "measurements": measurements,
        "interval": "day",
        "start": range.start_iso(),
        "end": range.end_iso(),
    })
}

/// Per-campaign metrics over a range; `with_detail_fallback` retries with a
/// plain campaign fetch instead of repeating the metrics call.
pub fn campaign_metrics(
    campaign_id: &str,
    campaign_name: &str,
    statistics: &[&str],
    range: TimeRange,
    with_detail_fallback: bool,
) -> Strategy {
    let strategy = Strategy::new(
        CAMPAIGNS_GET_METRICS,
        json!({
            "campaign_id": campaign_id,
            "statistics": statistics,
            "start": range.start_iso(),
            "end": range.end_iso(),
        }),
        format!("Get metrics for campaign '{}'", campaign_name),
    );

    if with_detail_fallback {
        strategy.with_fallback(CAMPAIGNS_GET, json!({ "campaign_id": campaign_id }))
    } else {
        strategy
    }
}
