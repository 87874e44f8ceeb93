//! Tool runner with bounded parallelism
//!
//! Concurrency model:
//! - batch members run under a semaphore of configurable width
//! - runs of the same tool name are serialized (tools write into shared
//!   analysis directories)
//! - results come back in registry order regardless of completion order
//! - one tool's failure never stops the rest of the batch

use crate::errors::{OverseerError, Result};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::cancel::CancelToken;
use crate::tools::process::{self, ToolOutcome};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{BatchEntry, ExecutionResult, RunnerOptions, ToolCategory, ToolDefinition};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs tool definitions from a shared registry
pub struct ToolRunner {
    /// Read-only after construction, shared without locking
    registry: Arc<ToolRegistry>,

    options: RunnerOptions,

    /// Worker-pool width for batches
    semaphore: Arc<Semaphore>,

    /// One async lock per tool name
    name_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    telemetry: TelemetryCollector,
}

impl ToolRunner {
    /// Create a runner over a registry
    pub fn new(registry: Arc<ToolRegistry>, options: RunnerOptions) -> Self {
        Self::with_telemetry(registry, options, TelemetryCollector::new())
    }

    /// Create a runner recording into an existing collector
    pub fn with_telemetry(
        registry: Arc<ToolRegistry>,
        options: RunnerOptions,
        telemetry: TelemetryCollector,
    ) -> Self {
        let width = options.max_parallel.max(1);
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(width)),
            options,
            name_locks: Mutex::new(HashMap::new()),
            telemetry,
        }
    }

    /// Run a single tool by name
    ///
    /// `Err(NotFound)` for an unknown name; every execution failure is
    /// reported inside the `ExecutionResult` instead.
    pub async fn run_one(&self, name: &str) -> Result<ExecutionResult> {
        self.run_one_with_cancel(name, &CancelToken::never())
            .await?
            .into_result()
            .ok_or_else(|| OverseerError::Interrupted {
                name: name.to_string(),
            })
    }

    /// Cancellable variant of [`run_one`](Self::run_one)
    ///
    /// Cancellation kills the tool's process tree and yields
    /// `BatchEntry::Skipped`.
    pub async fn run_one_with_cancel(&self, name: &str, cancel: &CancelToken) -> Result<BatchEntry> {
        let definition = self.registry.lookup(name)?;
        Ok(self.execute(definition, cancel).await)
    }

    /// Run every tool of one category, in registry order
    pub async fn run_category(&self, category: ToolCategory) -> Vec<BatchEntry> {
        self.run_category_with_cancel(category, &CancelToken::never())
            .await
    }

    /// Cancellable variant of [`run_category`](Self::run_category)
    pub async fn run_category_with_cancel(
        &self,
        category: ToolCategory,
        cancel: &CancelToken,
    ) -> Vec<BatchEntry> {
        let definitions = self.registry.list_by_category(category);
        self.run_batch(&definitions, cancel).await
    }

    /// Run static tools, then dynamic tools
    pub async fn run_all(&self) -> Vec<BatchEntry> {
        self.run_all_with_cancel(&CancelToken::never()).await
    }

    /// Cancellable variant of [`run_all`](Self::run_all)
    pub async fn run_all_with_cancel(&self, cancel: &CancelToken) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(self.registry.len());
        for category in ToolCategory::ALL {
            entries.extend(self.run_category_with_cancel(category, cancel).await);
        }
        entries
    }

    /// Run an explicit list of definitions as one batch
    ///
    /// The returned vector has exactly one entry per definition, in input
    /// order.
    pub async fn run_batch(
        &self,
        definitions: &[&ToolDefinition],
        cancel: &CancelToken,
    ) -> Vec<BatchEntry> {
        let batch_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            %batch_id,
            tools = definitions.len(),
            parallel = self.max_parallel_operations(),
            "batch started"
        );
        self.telemetry.record(TelemetryEvent::BatchDispatch);

        let entries = join_all(definitions.iter().map(|def| self.execute(def, cancel))).await;

        let skipped = entries.iter().filter(|e| e.is_skipped()).count();
        if skipped > 0 {
            warn!(%batch_id, skipped, "batch cancelled");
        }
        info!(
            %batch_id,
            completed = entries.len() - skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );
        entries
    }

    async fn execute(&self, definition: &ToolDefinition, cancel: &CancelToken) -> BatchEntry {
        let name_lock = self.name_lock(&definition.name);
        let _name_guard = tokio::select! {
            guard = name_lock.lock() => guard,
            _ = cancel.cancelled() => return self.skipped(definition, false),
        };

        let _permit = tokio::select! {
            permit = self.semaphore.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return self.skipped(definition, false),
            },
            _ = cancel.cancelled() => return self.skipped(definition, false),
        };

        if cancel.is_cancelled() {
            return self.skipped(definition, false);
        }

        self.telemetry.record(TelemetryEvent::ToolStarted);

        match process::run_tool(definition, &self.options, cancel).await {
            ToolOutcome::Finished(result) => {
                self.telemetry.record(TelemetryEvent::ToolCompleted {
                    duration_ms: result.duration_ms,
                    success: result.succeeded,
                });
                BatchEntry::Completed(result)
            }
            ToolOutcome::Interrupted => self.skipped(definition, true),
        }
    }

    fn skipped(&self, definition: &ToolDefinition, interrupted: bool) -> BatchEntry {
        self.telemetry.record(TelemetryEvent::ToolSkipped { interrupted });
        BatchEntry::Skipped {
            tool_name: definition.name.clone(),
            interrupted,
        }
    }

    fn name_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.name_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Get registry reference
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Get current parallelism limit
    pub fn max_parallel_operations(&self) -> usize {
        self.options.max_parallel.max(1)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tools::cancel::CancelHandle;
    use crate::tools::types::FailureKind;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sh(name: &str, category: ToolCategory, script: &str) -> ToolDefinition {
        ToolDefinition::new(name, "/bin/sh", category).with_arguments(["-c", script])
    }

    fn runner(definitions: Vec<ToolDefinition>, temp: &TempDir, width: usize) -> ToolRunner {
        let registry = Arc::new(ToolRegistry::new(definitions).unwrap());
        let options = RunnerOptions::new(temp.path().to_path_buf()).with_max_parallel(width);
        ToolRunner::new(registry, options)
    }

    fn names(entries: &[BatchEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.tool_name()).collect()
    }

    #[tokio::test]
    async fn test_run_one_unknown_tool() {
        let temp = TempDir::new().unwrap();
        let runner = runner(vec![], &temp, 1);

        let err = runner.run_one("nonexistent").await.unwrap_err();
        assert!(matches!(err, OverseerError::NotFound { ref name } if name == "nonexistent"));
    }

    #[tokio::test]
    async fn test_run_one_records_telemetry() {
        let temp = TempDir::new().unwrap();
        let runner = runner(vec![sh("echo", ToolCategory::Static, "echo hi")], &temp, 1);

        let result = runner.run_one("echo").await.unwrap();
        assert!(result.succeeded);

        let stats = runner.telemetry().get_stats();
        assert_eq!(stats.tools_executed, 1);
        assert_eq!(stats.tools_succeeded, 1);
    }

    #[tokio::test]
    async fn test_parallel_batch_preserves_registry_order() {
        let temp = TempDir::new().unwrap();
        let runner = runner(
            vec![
                sh("slow", ToolCategory::Static, "sleep 0.4; echo slow"),
                sh("medium", ToolCategory::Static, "sleep 0.2; echo medium"),
                sh("fast", ToolCategory::Static, "echo fast"),
            ],
            &temp,
            3,
        );

        let entries = runner.run_category(ToolCategory::Static).await;
        assert_eq!(names(&entries), vec!["slow", "medium", "fast"]);
        assert!(entries.iter().all(|e| e.result().map_or(false, |r| r.succeeded)));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let temp = TempDir::new().unwrap();
        let runner = runner(
            vec![
                ToolDefinition::new("missing", temp.path().join("nope"), ToolCategory::Dynamic),
                sh("exit2", ToolCategory::Dynamic, "exit 2"),
                sh("ok", ToolCategory::Dynamic, "true"),
            ],
            &temp,
            1,
        );

        let entries = runner.run_category(ToolCategory::Dynamic).await;
        assert_eq!(entries.len(), 3);

        let results: Vec<_> = entries.iter().filter_map(|e| e.result()).collect();
        assert_eq!(results[0].failure, Some(FailureKind::Resolution));
        assert!(!results[1].succeeded && results[1].error_message.is_none());
        assert!(results[2].succeeded);
    }

    #[tokio::test]
    async fn test_run_all_static_then_dynamic() {
        let temp = TempDir::new().unwrap();
        let runner = runner(
            vec![
                sh("d1", ToolCategory::Dynamic, "true"),
                sh("s1", ToolCategory::Static, "true"),
                sh("d2", ToolCategory::Dynamic, "true"),
                sh("s2", ToolCategory::Static, "true"),
            ],
            &temp,
            2,
        );

        let entries = runner.run_all().await;
        assert_eq!(names(&entries), vec!["s1", "s2", "d1", "d2"]);
    }

    #[tokio::test]
    async fn test_same_tool_runs_are_serialized() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("busy");
        let script = format!(
            "if [ -e {m} ]; then echo overlap; exit 3; fi; touch {m}; sleep 0.3; rm {m}",
            m = marker.display()
        );
        let runner = Arc::new(runner(vec![sh("writer", ToolCategory::Static, &script)], &temp, 4));

        let a = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run_one("writer").await }
        });
        let b = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run_one("writer").await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(a.succeeded, "first run: {}", a.standard_output);
        assert!(b.succeeded, "second run: {}", b.standard_output);
    }

    #[tokio::test]
    async fn test_cancel_before_start_skips_everything() {
        let temp = TempDir::new().unwrap();
        let runner = runner(
            vec![
                sh("a", ToolCategory::Static, "true"),
                sh("b", ToolCategory::Static, "true"),
            ],
            &temp,
            1,
        );
        let handle = CancelHandle::new();
        handle.cancel();

        let entries = runner
            .run_category_with_cancel(ToolCategory::Static, &handle.token())
            .await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.is_skipped()));
        assert_eq!(runner.telemetry().get_stats().tools_skipped, 2);
    }

    #[tokio::test]
    async fn test_run_one_with_cancel_kills_tool() {
        let temp = TempDir::new().unwrap();
        let runner = runner(vec![sh("monitor", ToolCategory::Dynamic, "sleep 30")], &temp, 1);
        let handle = CancelHandle::new();
        let token = handle.token();

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        };
        let start = Instant::now();
        let (entry, _) = tokio::join!(runner.run_one_with_cancel("monitor", &token), canceller);

        match entry.unwrap() {
            BatchEntry::Skipped { tool_name, interrupted } => {
                assert_eq!(tool_name, "monitor");
                assert!(interrupted);
            }
            other => panic!("expected interrupted skip, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.telemetry().get_stats().tools_interrupted, 1);
    }

    #[tokio::test]
    async fn test_run_one_with_cancel_unknown_tool() {
        let temp = TempDir::new().unwrap();
        let runner = runner(vec![], &temp, 1);

        let err = runner
            .run_one_with_cancel("ghost", &CancelHandle::new().token())
            .await
            .unwrap_err();
        assert!(matches!(err, OverseerError::NotFound { .. }));
    }

    #[test]
    fn test_max_parallel_operations() {
        let temp = TempDir::new().unwrap();
        let runner = runner(vec![], &temp, 4);
        assert_eq!(runner.max_parallel_operations(), 4);
    }
}
