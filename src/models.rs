//! Core data models for the query engine

use crate::error::QueryError;
use crate::planner::FollowUpPlanner;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Result mode reported when AUTO recovered through a direct call
pub const AUTO_FALLBACK_MODE: &str = "auto_fallback";

//
// ================= Mode =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Intelligent,
    Direct,
    Auto,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Intelligent => "intelligent",
            Mode::Direct => "direct",
            Mode::Auto => "auto",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intelligent" => Ok(Mode::Intelligent),
            "direct" => Ok(Mode::Direct),
            "auto" => Ok(Mode::Auto),
            other => Err(QueryError::InvalidMode(other.to_string())),
        }
    }
}

//
// ================= Strategy =================
//

/// One planned tool invocation.
///
/// Built once by the planner and never mutated afterwards; the fallback
/// defaults to the primary tool and params.
#[derive(Debug, Clone)]
pub struct Strategy {
    tool: String,
    params: Value,
    description: String,
    fallback_tool: String,
    fallback_params: Value,
    follow_up: Option<Arc<dyn FollowUpPlanner>>,
}

impl Strategy {
    pub fn new(tool: impl Into<String>, params: Value, description: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            fallback_tool: tool.clone(),
            fallback_params: params.clone(),
            tool,
            params,
            description: description.into(),
            follow_up: None,
        }
    }

    pub fn with_fallback(mut self, tool: impl Into<String>, params: Value) -> Self {
        self.fallback_tool = tool.into();
        self.fallback_params = params;
        self
    }

    pub fn with_follow_up(mut self, planner: Arc<dyn FollowUpPlanner>) -> Self {
        self.follow_up = Some(planner);
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fallback_tool(&self) -> &str {
        &self.fallback_tool
    }

    pub fn fallback_params(&self) -> &Value {
        &self.fallback_params
    }

    pub fn follow_up(&self) -> Option<&Arc<dyn FollowUpPlanner>> {
        self.follow_up.as_ref()
    }

    /// Dedup key: tool name plus serialized params.
    /// `serde_json` object keys are ordered, so equal maps serialize equally.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.tool, self.params)
    }
}

/// Serializable view of a strategy, used by diagnostics endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub tool: String,
    pub params: Value,
    pub description: String,
    pub fallback_tool: String,
    pub fallback_params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

impl From<&Strategy> for StrategySummary {
    fn from(strategy: &Strategy) -> Self {
        Self {
            tool: strategy.tool.clone(),
            params: strategy.params.clone(),
            description: strategy.description.clone(),
            fallback_tool: strategy.fallback_tool.clone(),
            fallback_params: strategy.fallback_params.clone(),
            follow_up: strategy.follow_up.as_ref().map(|p| p.name().to_string()),
        }
    }
}

//
// ================= Context =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_metric_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl QueryContext {
    /// Context carrying only the client id
    pub fn minimal(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }
}

//
// ================= Execution =================
//

/// Raw outcome of a single gateway invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Discriminator for recorded payloads, derived from the tool name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    CampaignList,
    SegmentList,
    MetricAggregate,
    GenericTool,
}

impl PayloadKind {
    pub fn from_tool(tool: &str) -> Self {
        match tool {
            "campaigns.list" => PayloadKind::CampaignList,
            "segments.list" => PayloadKind::SegmentList,
            "metrics.aggregate" => PayloadKind::MetricAggregate,
            _ => PayloadKind::GenericTool,
        }
    }
}

/// One successful invocation kept in the aggregated response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedResult {
    pub strategy: String,
    pub tool: String,
    pub kind: PayloadKind,
    pub data: Value,
}

impl RecordedResult {
    pub fn new(strategy: impl Into<String>, tool: impl Into<String>, data: Value) -> Self {
        let tool = tool.into();
        Self {
            strategy: strategy.into(),
            kind: PayloadKind::from_tool(&tool),
            tool,
            data,
        }
    }

    /// Usefulness gate: an explicit `success: true` on the payload, or a
    /// non-empty list at `data.data`.
    pub fn is_useful(&self) -> bool {
        if self.data.get("success").and_then(Value::as_bool) == Some(true) {
            return true;
        }

        self.data
            .get("data")
            .and_then(Value::as_array)
            .map_or(false, |items| !items.is_empty())
    }
}

//
// ================= Insights =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub data_summary: BTreeMap<String, CategorySummary>,
    pub correlations: Vec<String>,
    pub recommendations: Vec<String>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedQueryResult {
    pub success: bool,
    pub results: Vec<RecordedResult>,
    pub total_strategies: usize,
    pub successful_strategies: usize,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Descriptions of every strategy that was started, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempted: Vec<String>,
    /// Failures swallowed along the way
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl AggregatedQueryResult {
    pub fn failure(mode: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            total_strategies: 0,
            successful_strategies: 0,
            mode: mode.into(),
            insights: None,
            partial: None,
            error: Some(error.into()),
            attempted: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

//
// ================= Parse diagnostics =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolGuess {
    pub tool: String,
    pub params: Value,
}

impl ToolGuess {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params: json!({}),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub strategies: Vec<StrategySummary>,
    pub direct_tool_guess: Option<ToolGuess>,
}
