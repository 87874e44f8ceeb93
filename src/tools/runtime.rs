//! Tool runtime coordinator
//!
//! The library contract exposed to presentation layers: built once from
//! configuration, then queried and run by direct invocation.

use crate::cli::Config;
use crate::errors::Result;
use crate::telemetry::TelemetryCollector;
use crate::tools::cancel::CancelToken;
use crate::tools::executor::ToolRunner;
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{BatchEntry, ExecutionResult, RunnerOptions, ToolCategory, ToolDefinition};
use std::sync::Arc;

/// Tool runtime coordinator
pub struct ToolRuntime {
    runner: Arc<ToolRunner>,
}

impl ToolRuntime {
    /// Build from validated configuration
    ///
    /// Fails with a configuration error on duplicate or invalid tools.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.tool_definitions(), config.runner_options())
    }

    /// Build from explicit definitions
    pub fn new(definitions: Vec<ToolDefinition>, options: RunnerOptions) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::new(definitions)?);
        tracing::info!(
            tools = registry.len(),
            parallel = options.max_parallel,
            "tool runtime ready"
        );

        Ok(Self {
            runner: Arc::new(ToolRunner::with_telemetry(
                registry,
                options,
                TelemetryCollector::new(),
            )),
        })
    }

    /// Run one tool by name
    pub async fn run_one(&self, name: &str) -> Result<ExecutionResult> {
        self.runner.run_one(name).await
    }

    /// Run one tool by name until it finishes or `cancel` fires
    pub async fn run_one_with_cancel(&self, name: &str, cancel: &CancelToken) -> Result<BatchEntry> {
        self.runner.run_one_with_cancel(name, cancel).await
    }

    /// Run one category in registry order
    pub async fn run_category(&self, category: ToolCategory, cancel: &CancelToken) -> Vec<BatchEntry> {
        self.runner.run_category_with_cancel(category, cancel).await
    }

    /// Run static, then dynamic
    pub async fn run_all(&self, cancel: &CancelToken) -> Vec<BatchEntry> {
        self.runner.run_all_with_cancel(cancel).await
    }

    /// Shared runner, for callers that spawn their own tasks
    pub fn runner(&self) -> Arc<ToolRunner> {
        self.runner.clone()
    }

    /// Get tool registry
    pub fn get_registry(&self) -> &ToolRegistry {
        self.runner.registry()
    }

    pub fn list_all(&self) -> &[ToolDefinition] {
        self.get_registry().list_all()
    }

    pub fn list_by_category(&self, category: ToolCategory) -> Vec<&ToolDefinition> {
        self.get_registry().list_by_category(category)
    }

    /// Check if tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.get_registry().contains(name)
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        self.runner.telemetry()
    }
}
