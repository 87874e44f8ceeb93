//! Tool orchestration engine
//!
//! Runs configured external analysis tools with:
//! - Ordered, validated registry of tool definitions
//! - Lazy executable resolution
//! - Per-tool timeout with process-tree termination
//! - Bounded-parallel batches with stable result order
//! - Batch cancellation

pub mod types;
pub mod registry;
pub mod resolver;
pub mod cancel;
pub mod process;
pub mod executor;
pub mod runtime;

// Re-export commonly used types
pub use types::{
    BatchEntry, CapturedOutput, ExecutionResult, FailureKind, RunnerOptions, ToolCategory,
    ToolDefinition, DEFAULT_MAX_OUTPUT_BYTES,
};
pub use registry::ToolRegistry;
pub use cancel::{CancelHandle, CancelToken};
pub use executor::ToolRunner;
pub use runtime::ToolRuntime;
