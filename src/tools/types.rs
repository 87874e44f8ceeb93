//! Tool definitions, execution results, and runner options
//!
//! Core data model shared by the registry, the runner, and callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default per-stream capture cap (2 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 2_097_152;

/// Analysis category of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Inspects the target without executing it
    Static,
    /// Observes the target while it executes
    Dynamic,
}

impl ToolCategory {
    /// Batch order used by "run all"
    pub const ALL: [ToolCategory; 2] = [ToolCategory::Static, ToolCategory::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Static => "static",
            ToolCategory::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(ToolCategory::Static),
            "dynamic" => Ok(ToolCategory::Dynamic),
            other => Err(format!("unknown tool category: {}", other)),
        }
    }
}

/// Declarative description of one external analysis utility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name within the registry
    pub name: String,

    /// Binary or script to execute
    pub executable_path: PathBuf,

    /// Static or dynamic
    pub category: ToolCategory,

    /// Arguments passed verbatim
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Working directory (runner default when absent)
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Execution bound; absent or zero runs to natural completion
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl ToolDefinition {
    /// Create a definition with no arguments and no timing bound
    pub fn new(
        name: impl Into<String>,
        executable_path: impl Into<PathBuf>,
        category: ToolCategory,
    ) -> Self {
        Self {
            name: name.into(),
            executable_path: executable_path.into(),
            category,
            arguments: Vec::new(),
            working_directory: None,
            timeout_seconds: None,
        }
    }

    /// Set argument list
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Set working directory
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Effective timeout; `None` means unbounded
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

/// Why a tool could not produce a normal exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Executable missing or not executable; nothing was spawned
    Resolution,
    /// Bound exceeded; process tree was killed
    Timeout,
    /// OS refused to create or wait on the process
    Spawn,
}

/// Captured stdout/stderr of one process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Name of the originating definition
    pub tool_name: String,

    /// Exited with status 0 within any applicable timeout
    pub succeeded: bool,

    /// Exit code, when the process exited normally
    pub exit_code: Option<i32>,

    pub standard_output: String,
    pub standard_error: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,

    /// Set only when the tool could not run or was stopped by the runner
    pub error_message: Option<String>,

    /// Tag matching `error_message`
    pub failure: Option<FailureKind>,

    /// Wall-clock time from spawn to exit or forced termination
    pub duration_ms: u64,

    pub started_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Result for a process that exited on its own
    pub fn exited(
        tool_name: String,
        exit_code: Option<i32>,
        output: CapturedOutput,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name,
            succeeded: exit_code == Some(0),
            exit_code,
            standard_output: output.stdout,
            standard_error: output.stderr,
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
            error_message: None,
            failure: None,
            duration_ms: duration.as_millis() as u64,
            started_at,
        }
    }

    /// Result for a tool that never ran or was stopped by the runner
    pub fn failure(
        tool_name: String,
        kind: FailureKind,
        message: String,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name,
            succeeded: false,
            exit_code: None,
            standard_output: String::new(),
            standard_error: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            error_message: Some(message),
            failure: Some(kind),
            duration_ms: duration.as_millis() as u64,
            started_at,
        }
    }

    /// Attach output captured before a forced termination
    pub fn with_output(mut self, output: CapturedOutput) -> Self {
        self.standard_output = output.stdout;
        self.standard_error = output.stderr;
        self.stdout_truncated = output.stdout_truncated;
        self.stderr_truncated = output.stderr_truncated;
        self
    }
}

/// One slot of a batch run, in registry order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchEntry {
    /// Tool was started and produced a result
    Completed(ExecutionResult),
    /// Batch was cancelled before the tool finished; `interrupted` is set
    /// when its process tree was killed rather than never started
    Skipped { tool_name: String, interrupted: bool },
}

impl BatchEntry {
    pub fn tool_name(&self) -> &str {
        match self {
            BatchEntry::Completed(result) => &result.tool_name,
            BatchEntry::Skipped { tool_name, .. } => tool_name,
        }
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            BatchEntry::Completed(result) => Some(result),
            BatchEntry::Skipped { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            BatchEntry::Completed(result) => Some(result),
            BatchEntry::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, BatchEntry::Skipped { .. })
    }
}

/// Runner-wide execution settings
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Working directory for tools that do not set one
    pub working_dir: PathBuf,

    /// Per-stream capture cap (bytes)
    pub max_output_size: usize,

    /// Worker-pool width for batch runs
    pub max_parallel: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| ".".into()),
            max_output_size: DEFAULT_MAX_OUTPUT_BYTES,
            max_parallel: 1,
        }
    }
}

impl RunnerOptions {
    /// Create options with a default working directory
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    /// Set max output size
    pub fn with_max_output_size(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }

    /// Set worker-pool width (clamped to at least 1)
    pub fn with_max_parallel(mut self, width: usize) -> Self {
        self.max_parallel = width.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str) -> CapturedOutput {
        CapturedOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_category_parse_and_display() {
        assert_eq!("static".parse::<ToolCategory>().unwrap(), ToolCategory::Static);
        assert_eq!("Dynamic".parse::<ToolCategory>().unwrap(), ToolCategory::Dynamic);
        assert!("hybrid".parse::<ToolCategory>().is_err());
        assert_eq!(ToolCategory::Dynamic.to_string(), "dynamic");
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let def = ToolDefinition::new("procmon", "/opt/procmon", ToolCategory::Dynamic)
            .with_timeout_seconds(0);
        assert!(def.timeout().is_none());

        let def = def.with_timeout_seconds(5);
        assert_eq!(def.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_exited_zero_succeeds() {
        let result = ExecutionResult::exited(
            "capa".to_string(),
            Some(0),
            output("ok", ""),
            Utc::now(),
            Duration::from_millis(100),
        );

        assert!(result.succeeded);
        assert!(result.error_message.is_none());
        assert_eq!(result.duration_ms, 100);
        assert_eq!(result.standard_output, "ok");
    }

    #[test]
    fn test_exited_nonzero_has_no_error_message() {
        let result = ExecutionResult::exited(
            "yara".to_string(),
            Some(1),
            output("", "bad rule"),
            Utc::now(),
            Duration::from_millis(20),
        );

        assert!(!result.succeeded);
        assert!(result.error_message.is_none());
        assert_eq!(result.standard_error, "bad rule");
    }

    #[test]
    fn test_signal_exit_is_not_success() {
        let result = ExecutionResult::exited(
            "floss".to_string(),
            None,
            CapturedOutput::default(),
            Utc::now(),
            Duration::from_millis(5),
        );
        assert!(!result.succeeded);
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_failure_result() {
        let result = ExecutionResult::failure(
            "fakenet".to_string(),
            FailureKind::Timeout,
            "timed out after 1s".to_string(),
            Utc::now(),
            Duration::from_millis(1000),
        )
        .with_output(output("partial", ""));

        assert!(!result.succeeded);
        assert!(result.error_message.is_some());
        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert_eq!(result.standard_output, "partial");
    }

    #[test]
    fn test_batch_entry_accessors() {
        let skipped = BatchEntry::Skipped {
            tool_name: "procdump".to_string(),
            interrupted: false,
        };
        assert!(skipped.is_skipped());
        assert_eq!(skipped.tool_name(), "procdump");
        assert!(skipped.result().is_none());
    }

    #[test]
    fn test_runner_options_builder() {
        let opts = RunnerOptions::default()
            .with_max_output_size(1024)
            .with_max_parallel(0);

        assert_eq!(opts.max_output_size, 1024);
        assert_eq!(opts.max_parallel, 1);
    }
}
