//! Error types for the analytics query engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Client metadata could not be loaded. Never fatal: the resolver
    /// degrades to a minimal context.
    #[error("Context lookup error: {0}")]
    ContextLookupError(String),

    #[error("Strategy execution error: {0}")]
    StrategyExecutionError(String),

    /// Network failure or non-2xx status from the tool gateway
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailableError(String),

    #[error("No useful data: {0}")]
    NoUsefulDataError(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Database driver error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl QueryError {
    /// True for failures of the transport itself rather than of a tool
    pub fn is_transport(&self) -> bool {
        matches!(self, QueryError::GatewayUnavailableError(_))
    }
}
