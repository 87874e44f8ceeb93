//! Overseer - malware-analysis tool orchestration
//!
//! Runs a configurable set of external analysis utilities against a
//! sample and returns one uniform result record per tool.
//!
//! # Architecture
//!
//! - **tools**: registry, process runner, batch orchestration
//! - **cli**: configuration and argument model
//! - **telemetry**: in-process run statistics

pub mod errors;
pub mod tools;
pub mod cli;
pub mod telemetry;
pub mod logging;

// Re-export commonly used types
pub use errors::{OverseerError, Result};
pub use tools::{
    BatchEntry, CancelHandle, CancelToken, ExecutionResult, ToolCategory, ToolDefinition,
    ToolRegistry, ToolRunner, ToolRuntime,
};
