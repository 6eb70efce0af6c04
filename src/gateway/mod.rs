//! Tool-invocation gateway
//!
//! Every domain tool lives behind `POST {base}/tool/{name}`.
//! The engine never interprets tool semantics; it only moves the
//! success/data envelope.

use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::models::ExecutionResult;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
pub mod scripted;

/// Executes one named tool for one client.
///
/// `Err` means the gateway itself could not be reached or answered with a
/// non-2xx status; a tool-level failure is `Ok` with `success == false`.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn invoke(&self, tool: &str, client_id: &str, params: &Value) -> Result<ExecutionResult>;
}

/// Wire body for a tool call
#[derive(Debug, Serialize)]
pub struct ToolRequest<'a> {
    pub tool: &'a str,
    pub client_id: &'a str,
    pub params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ToolEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Connection-pooled HTTP gateway client
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    base: Url,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                QueryError::ConfigError(format!("Failed to build gateway HTTP client: {}", e))
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                QueryError::ConfigError(format!("Invalid gateway base URL: {}", base_url))
            })?;

        Ok(Self {
            client,
            base_url,
            base,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.require_gateway_base_url()?, config.gateway_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/tool/{tool}` with the tool name as one encoded path segment
    pub fn tool_url(&self, tool: &str) -> Result<Url> {
        if tool.is_empty() || tool == "." || tool == ".." || tool.chars().any(char::is_control) {
            return Err(QueryError::InvalidToolInput(format!(
                "{:?} is not a valid tool name",
                tool
            )));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                QueryError::ConfigError(format!("Invalid gateway base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("tool")
            .push(tool);
        Ok(url)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn invoke(&self, tool: &str, client_id: &str, params: &Value) -> Result<ExecutionResult> {
        let url = self.tool_url(tool)?;

        let response = self
            .client
            .post(url)
            .json(&ToolRequest {
                tool,
                client_id,
                params,
            })
            .send()
            .await
            .map_err(|e| {
                QueryError::GatewayUnavailableError(format!(
                    "Gateway request failed for {}: {}",
                    tool, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::GatewayUnavailableError(format!(
                "Gateway returned {} for {}: {}",
                status, tool, body
            )));
        }

        let envelope = response.json::<ToolEnvelope>().await.map_err(|e| {
            QueryError::StrategyExecutionError(format!(
                "Invalid JSON response from {}: {}",
                tool, e
            ))
        })?;

        debug!(tool, success = envelope.success, "Gateway call completed");

        if envelope.success {
            Ok(ExecutionResult::ok(envelope.data))
        } else {
            Ok(ExecutionResult::failed(
                envelope
                    .error
                    .unwrap_or_else(|| format!("{} reported failure without an error", tool)),
            ))
        }
    }
}
