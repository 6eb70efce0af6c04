//! Execution engine for planned strategies
//!
//! Strategies run sequentially in planner order. Each gets one primary
//! attempt and one fallback attempt; follow-ups run after their parent;
//! execution stops as soon as a useful result has been recorded.

use crate::error::QueryError;
use crate::gateway::Gateway;
use crate::insights::{create_default_insight_aggregator, InsightAggregator};
use crate::models::{AggregatedQueryResult, ExecutionResult, Mode, RecordedResult, Strategy};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use crate::config::DEFAULT_MAX_DISTINCT_ATTEMPTS;

/// Failures swallowed during one execution
#[derive(Debug, Default)]
struct RunLog {
    diagnostics: Vec<String>,
    failures: usize,
    transport_failures: usize,
}

pub struct Executor {
    gateway: Arc<dyn Gateway>,
    insights: InsightAggregator,
}

impl Executor {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            insights: create_default_insight_aggregator(),
        }
    }

    /// Single gateway call, no fallback
    pub async fn call_once(&self, tool: &str, client_id: &str, params: &Value) -> Result<ExecutionResult> {
        self.gateway.invoke(tool, client_id, params).await
    }

    /// Run `strategies` in order with fallback, follow-ups and the
    /// usefulness gate. At most `max_distinct_attempts` top-level strategies
    /// are started.
    pub async fn execute_with_retry(
        &self,
        strategies: &[Strategy],
        client_id: &str,
        max_distinct_attempts: usize,
    ) -> Result<AggregatedQueryResult> {
        if strategies.is_empty() {
            return Err(QueryError::InvalidPlan(
                "No strategies to execute".to_string(),
            ));
        }

        let limit = max_distinct_attempts.max(1);
        let start = Instant::now();

        let mut log = RunLog::default();
        let mut results: Vec<RecordedResult> = Vec::new();
        let mut attempted: Vec<String> = Vec::with_capacity(limit.min(strategies.len()));
        let mut successful_strategies = 0;
        let mut useful = false;

        debug!(
            client_id,
            strategy_count = strategies.len(),
            limit,
            "Starting strategy execution"
        );

        for (index, strategy) in strategies.iter().enumerate() {
            if attempted.len() >= limit {
                let remaining = strategies.len() - index;
                debug!(remaining, limit, "Attempt limit reached");
                log.diagnostics.push(format!(
                    "Attempt limit of {} reached; {} strategies not started",
                    limit, remaining
                ));
                break;
            }

            debug!(
                step = index + 1,
                tool = strategy.tool(),
                strategy = strategy.description(),
                "Processing strategy"
            );
            attempted.push(strategy.description().to_string());

            let Some((tool, data)) = self.run_with_fallback(strategy, client_id, &mut log).await
            else {
                continue;
            };

            let recorded_before = results.len();

            if let Some(planner) = strategy.follow_up() {
                let follow_ups = planner.plan_follow_ups(&data);
                debug!(
                    planner = planner.name(),
                    follow_up_count = follow_ups.len(),
                    "Follow-ups planned"
                );

                for follow_up in &follow_ups {
                    if let Some((follow_up_tool, follow_up_data)) =
                        self.run_with_fallback(follow_up, client_id, &mut log).await
                    {
                        results.push(RecordedResult::new(
                            follow_up.description(),
                            follow_up_tool,
                            follow_up_data,
                        ));
                    }
                }
            }

            // No planner, or nothing came of it: keep the parent's own data
            if results.len() == recorded_before {
                results.push(RecordedResult::new(strategy.description(), tool, data));
            }

            successful_strategies += 1;

            if results[recorded_before..].iter().any(RecordedResult::is_useful) {
                useful = true;
                info!(
                    step = index + 1,
                    tool = strategy.tool(),
                    "Useful result recorded, skipping remaining strategies"
                );
                break;
            }
        }

        debug!(
            recorded = results.len(),
            attempted = attempted.len(),
            useful,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Strategy execution completed"
        );

        let mut outcome = AggregatedQueryResult {
            success: false,
            results: Vec::new(),
            total_strategies: strategies.len(),
            successful_strategies,
            mode: Mode::Intelligent.as_str().to_string(),
            insights: None,
            partial: None,
            error: None,
            attempted,
            diagnostics: Vec::new(),
        };

        if useful {
            outcome.success = true;
            outcome.insights = Some(self.insights.summarize(&results));
        } else if !results.is_empty() {
            outcome.success = true;
            outcome.partial = Some(true);
        } else {
            let error = if log.failures > 0 && log.transport_failures == log.failures {
                QueryError::GatewayUnavailableError(format!(
                    "every call failed to reach the gateway. Attempted strategies: {}",
                    outcome.attempted.join("; ")
                ))
            } else {
                QueryError::NoUsefulDataError(format!(
                    "none of the {} attempted strategies returned data. Attempted strategies: {}",
                    outcome.attempted.len(),
                    outcome.attempted.join("; ")
                ))
            };
            warn!(error = %error, "Strategy execution produced no data");
            outcome.error = Some(error.to_string());
        }

        outcome.results = results;
        outcome.diagnostics = log.diagnostics;
        Ok(outcome)
    }

    /// Primary attempt, then one fallback attempt. Returns the tool that
    /// produced the data. Failures are logged and recorded in `log`.
    async fn run_with_fallback<'s>(
        &self,
        strategy: &'s Strategy,
        client_id: &str,
        log: &mut RunLog,
    ) -> Option<(&'s str, Value)> {
        match self
            .attempt(strategy.tool(), client_id, strategy.params(), log)
            .await
        {
            Ok(data) => return Some((strategy.tool(), data)),
            Err(error) => {
                warn!(
                    tool = strategy.tool(),
                    strategy = strategy.description(),
                    error = %error,
                    "Primary attempt failed, trying fallback"
                );
                log.diagnostics.push(format!(
                    "{}: primary {} failed: {}",
                    strategy.description(),
                    strategy.tool(),
                    error
                ));
            }
        }

        match self
            .attempt(strategy.fallback_tool(), client_id, strategy.fallback_params(), log)
            .await
        {
            Ok(data) => {
                debug!(
                    tool = strategy.fallback_tool(),
                    strategy = strategy.description(),
                    "Fallback attempt succeeded"
                );
                Some((strategy.fallback_tool(), data))
            }
            Err(error) => {
                warn!(
                    tool = strategy.fallback_tool(),
                    strategy = strategy.description(),
                    error = %error,
                    "Fallback attempt failed"
                );
                log.diagnostics.push(format!(
                    "{}: fallback {} failed: {}",
                    strategy.description(),
                    strategy.fallback_tool(),
                    error
                ));
                None
            }
        }
    }

    async fn attempt(
        &self,
        tool: &str,
        client_id: &str,
        params: &Value,
        log: &mut RunLog,
    ) -> Result<Value> {
        let error = match self.gateway.invoke(tool, client_id, params).await {
            Ok(result) if result.success => return Ok(result.data),
            Ok(result) => QueryError::StrategyExecutionError(
                result
                    .error
                    .unwrap_or_else(|| format!("{} failed without an error", tool)),
            ),
            Err(error) => error,
        };

        log.failures += 1;
        if error.is_transport() {
            log.transport_failures += 1;
        }
        Err(error)
    }
}
