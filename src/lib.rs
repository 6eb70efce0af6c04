//! Analytics Query Engine
//!
//! Turns natural-language marketing-analytics questions into tool calls:
//! - Resolves per-client context (revenue metric, account) with graceful degradation
//! - Plans ordered, deduplicated strategies from keyword routing and time ranges
//! - Executes strategies against an HTTP tool gateway with fallback and follow-ups
//! - Stops at the first useful result and summarizes what was collected
//!
//! PIPELINE:
//! CONTEXT → PLAN → EXECUTE (→ FALLBACK → FOLLOW-UP) → USEFUL? → INSIGHTS

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod insights;
pub mod models;
pub mod planner;

pub use error::Result;

// Re-export common types
pub use agent::QueryService;
pub use config::EngineConfig;
pub use error::QueryError;
pub use models::*;
