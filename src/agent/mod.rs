//! Query service - the caller-facing entry point
//!
//! INTELLIGENT: RESOLVE CONTEXT → BUILD → EXECUTE
//! AUTO:        INTELLIGENT, then one DIRECT call if execution failed
//! DIRECT:      one gateway call with a caller-named or guessed tool

use crate::config::EngineConfig;
use crate::context::{ClientStore, ContextResolver};
use crate::error::QueryError;
use crate::execution::Executor;
use crate::gateway::Gateway;
use crate::models::{
    AggregatedQueryResult, Mode, ParseReport, QueryContext, RecordedResult, StrategySummary,
    AUTO_FALLBACK_MODE,
};
use crate::planner::StrategyBuilder;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct QueryService {
    resolver: ContextResolver,
    builder: StrategyBuilder,
    executor: Executor,
    max_distinct_attempts: usize,
}

impl QueryService {
    pub fn new(resolver: ContextResolver, builder: StrategyBuilder, executor: Executor) -> Self {
        Self {
            resolver,
            builder,
            executor,
            max_distinct_attempts: crate::config::DEFAULT_MAX_DISTINCT_ATTEMPTS,
        }
    }

    pub fn with_max_distinct_attempts(mut self, max_distinct_attempts: usize) -> Self {
        self.max_distinct_attempts = max_distinct_attempts.max(1);
        self
    }

    pub fn from_config(
        config: &EngineConfig,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ClientStore>,
    ) -> Self {
        Self::new(
            ContextResolver::from_config(config, store),
            StrategyBuilder::new(),
            Executor::new(gateway),
        )
        .with_max_distinct_attempts(config.max_distinct_attempts)
    }

    /// Answer a natural-language query.
    ///
    /// Failures are reported inside the returned result. `Err` is reserved
    /// for DIRECT requests that name no tool and give nothing to guess from.
    pub async fn query(
        &self,
        natural_query: &str,
        client_id: &str,
        mode: Mode,
        fallback_tool: Option<&str>,
        fallback_params: Option<Value>,
    ) -> Result<AggregatedQueryResult> {
        let query_id = Uuid::new_v4();
        let span = info_span!("query", %query_id, client_id, mode = mode.as_str());

        async move {
            let start = Instant::now();
            info!(query = natural_query, "Query received");

            let result = match mode {
                Mode::Direct => {
                    let (tool, params) = self
                        .direct_target(natural_query, fallback_tool, fallback_params)
                        .ok_or_else(|| {
                            QueryError::InvalidToolInput(
                                "DIRECT mode needs a tool and none could be guessed from the query"
                                    .to_string(),
                            )
                        })?;
                    self.direct_call(&tool, client_id, Some(params)).await
                }
                Mode::Intelligent => self.intelligent(natural_query, client_id).await,
                Mode::Auto => {
                    self.auto(natural_query, client_id, fallback_tool, fallback_params)
                        .await
                }
            };

            info!(
                success = result.success,
                mode = %result.mode,
                results = result.results.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query completed"
            );
            Ok::<_, QueryError>(result)
        }
        .instrument(span)
        .await
    }

    /// One gateway call, no planning and no fallback
    pub async fn direct_call(
        &self,
        tool: &str,
        client_id: &str,
        params: Option<Value>,
    ) -> AggregatedQueryResult {
        let direct = Mode::Direct.as_str();
        let tool = tool.trim();

        if tool.is_empty() {
            let error = QueryError::InvalidToolInput("tool name is empty".to_string());
            return AggregatedQueryResult::failure(direct, error.to_string());
        }

        let params = params.unwrap_or_else(|| json!({}));
        if !params.is_object() {
            let error = QueryError::InvalidToolInput(format!(
                "params for {} must be a JSON object",
                tool
            ));
            return AggregatedQueryResult::failure(direct, error.to_string());
        }

        let description = format!("Direct call to {}", tool);
        debug!(tool, client_id, "Direct call");

        let error = match self.executor.call_once(tool, client_id, &params).await {
            Ok(outcome) if outcome.success => {
                return AggregatedQueryResult {
                    success: true,
                    results: vec![RecordedResult::new(&description, tool, outcome.data)],
                    total_strategies: 1,
                    successful_strategies: 1,
                    mode: direct.to_string(),
                    insights: None,
                    partial: None,
                    error: None,
                    attempted: vec![description],
                    diagnostics: Vec::new(),
                };
            }
            Ok(outcome) => QueryError::StrategyExecutionError(
                outcome
                    .error
                    .unwrap_or_else(|| format!("{} failed without an error", tool)),
            ),
            Err(error) => error,
        };

        warn!(tool, client_id, error = %error, "Direct call failed");
        let mut result = AggregatedQueryResult::failure(direct, error.to_string());
        result.total_strategies = 1;
        result.attempted = vec![description];
        result
    }

    /// Planning preview; no context lookup and no gateway calls
    pub fn test_parse(&self, natural_query: &str) -> ParseReport {
        let strategies = self
            .builder
            .build(natural_query, &QueryContext::default());

        ParseReport {
            strategies: strategies.iter().map(StrategySummary::from).collect(),
            direct_tool_guess: self.builder.guess_direct_tool(natural_query),
        }
    }

    async fn intelligent(&self, natural_query: &str, client_id: &str) -> AggregatedQueryResult {
        let mode = Mode::Intelligent.as_str();

        let context = self.resolver.resolve(client_id).await;
        let strategies = self.builder.build(natural_query, &context);

        match self
            .executor
            .execute_with_retry(&strategies, client_id, self.max_distinct_attempts)
            .await
        {
            Ok(result) => result.with_mode(mode),
            Err(error) => {
                warn!(error = %error, "Execution aborted");
                AggregatedQueryResult::failure(mode, error.to_string())
            }
        }
    }

    async fn auto(
        &self,
        natural_query: &str,
        client_id: &str,
        fallback_tool: Option<&str>,
        fallback_params: Option<Value>,
    ) -> AggregatedQueryResult {
        let primary = self.intelligent(natural_query, client_id).await;
        if primary.success {
            return primary.with_mode(Mode::Auto.as_str());
        }

        let primary_error = primary
            .error
            .clone()
            .unwrap_or_else(|| "intelligent execution failed".to_string());

        let Some((tool, params)) =
            self.direct_target(natural_query, fallback_tool, fallback_params)
        else {
            info!("No direct fallback available");
            return primary.with_mode(Mode::Auto.as_str());
        };

        info!(tool = %tool, "Intelligent execution failed, falling back to direct call");
        let mut fallback = self.direct_call(&tool, client_id, Some(params)).await;

        let mut diagnostics = primary.diagnostics;
        diagnostics.push(format!("Intelligent execution failed: {}", primary_error));
        diagnostics.append(&mut fallback.diagnostics);
        fallback.diagnostics = diagnostics;

        let mut attempted = primary.attempted;
        attempted.append(&mut fallback.attempted);
        fallback.attempted = attempted;

        if !fallback.success {
            let fallback_error = fallback.error.take().unwrap_or_default();
            fallback.error = Some(format!(
                "{}; direct fallback {} also failed: {}",
                primary_error, tool, fallback_error
            ));
        }

        fallback.with_mode(AUTO_FALLBACK_MODE)
    }

    /// Caller-named tool first, else the builder's guess
    fn direct_target(
        &self,
        natural_query: &str,
        fallback_tool: Option<&str>,
        fallback_params: Option<Value>,
    ) -> Option<(String, Value)> {
        if let Some(tool) = fallback_tool.map(str::trim).filter(|t| !t.is_empty()) {
            return Some((tool.to_string(), fallback_params.unwrap_or_else(|| json!({}))));
        }

        self.builder
            .guess_direct_tool(natural_query)
            .map(|guess| (guess.tool, guess.params))
    }
}
