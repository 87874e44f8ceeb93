//! External process execution
//!
//! Runs one tool definition as a child process:
//! - executable resolved lazily, nothing spawned on failure
//! - argv passed verbatim (no shell)
//! - child placed in its own process group so the whole tree can be killed
//! - stdout/stderr drained concurrently into byte-capped buffers
//! - exit raced against the timeout and the batch cancel token

use crate::tools::cancel::CancelToken;
use crate::tools::resolver::resolve_executable;
use crate::tools::types::{
    CapturedOutput, ExecutionResult, FailureKind, RunnerOptions, ToolDefinition,
};
use chrono::Utc;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long to keep draining pipes after the child is gone
///
/// Helpers that escaped the process group can hold the pipes open.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8192;

/// What became of one tool run
#[derive(Debug)]
pub enum ToolOutcome {
    /// Produced a result (normal exit, timeout, or could not run)
    Finished(ExecutionResult),
    /// Killed because the batch was cancelled
    Interrupted,
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Bounded capture buffer for one stream
#[derive(Debug)]
struct CaptureBuffer {
    bytes: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CaptureBuffer {
    fn new(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, data: &[u8]) {
        let room = self.cap.saturating_sub(self.bytes.len());
        let take = room.min(data.len());
        self.bytes.extend_from_slice(&data[..take]);
        if take < data.len() {
            self.truncated = true;
        }
    }

    fn snapshot(&self) -> (String, bool) {
        (String::from_utf8_lossy(&self.bytes).into_owned(), self.truncated)
    }
}

type SharedBuffer = Arc<Mutex<CaptureBuffer>>;

/// Run one tool to completion, timeout, or cancellation
///
/// Never returns an error: every failure is folded into the result.
pub async fn run_tool(
    definition: &ToolDefinition,
    options: &RunnerOptions,
    cancel: &CancelToken,
) -> ToolOutcome {
    let name = definition.name.clone();
    let started_at = Utc::now();
    let start = Instant::now();
    let working_dir = effective_working_dir(definition, options);

    let program = match resolve_executable(&definition.executable_path, &working_dir).await {
        Ok(path) => path,
        Err(e) => {
            warn!(tool = %name, error = %e, "executable resolution failed");
            return ToolOutcome::Finished(ExecutionResult::failure(
                name,
                FailureKind::Resolution,
                format!("Failed to resolve executable: {}", e),
                started_at,
                start.elapsed(),
            ));
        }
    };

    let mut cmd = Command::new(&program);
    cmd.args(&definition.arguments)
        .current_dir(&working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(tool = %name, program = %program.display(), error = %e, "spawn failed");
            return ToolOutcome::Finished(ExecutionResult::failure(
                name,
                FailureKind::Spawn,
                format!("Failed to spawn process: {}", e),
                started_at,
                start.elapsed(),
            ));
        }
    };

    let pid = child.id();
    debug!(tool = %name, ?pid, cwd = %working_dir.display(), "process spawned");

    let stdout_buf: SharedBuffer = Arc::new(Mutex::new(CaptureBuffer::new(options.max_output_size)));
    let stderr_buf: SharedBuffer = Arc::new(Mutex::new(CaptureBuffer::new(options.max_output_size)));
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(drain(stdout, stdout_buf.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(drain(stderr, stderr_buf.clone())));
    }

    let outcome = wait_with_policy(&mut child, definition.timeout(), cancel).await;

    match outcome {
        WaitOutcome::Exited(Ok(status)) => {
            let duration = start.elapsed();
            let output = collect(readers, &stdout_buf, &stderr_buf).await;
            info!(
                tool = %name,
                exit_code = ?status.code(),
                duration_ms = duration.as_millis() as u64,
                "process exited"
            );
            ToolOutcome::Finished(ExecutionResult::exited(
                name,
                status.code(),
                output,
                started_at,
                duration,
            ))
        }
        WaitOutcome::Exited(Err(e)) => {
            terminate_tree(&mut child, pid).await;
            let duration = start.elapsed();
            let output = collect(readers, &stdout_buf, &stderr_buf).await;
            warn!(tool = %name, error = %e, "waiting on process failed");
            ToolOutcome::Finished(
                ExecutionResult::failure(
                    name,
                    FailureKind::Spawn,
                    format!("Failed to wait for process: {}", e),
                    started_at,
                    duration,
                )
                .with_output(output),
            )
        }
        WaitOutcome::TimedOut(limit) => {
            terminate_tree(&mut child, pid).await;
            let duration = start.elapsed();
            let output = collect(readers, &stdout_buf, &stderr_buf).await;
            warn!(tool = %name, limit_secs = limit.as_secs(), "process timed out, tree killed");
            ToolOutcome::Finished(
                ExecutionResult::failure(
                    name,
                    FailureKind::Timeout,
                    format!("timeout: timed out after {}s", limit.as_secs()),
                    started_at,
                    duration,
                )
                .with_output(output),
            )
        }
        WaitOutcome::Cancelled => {
            terminate_tree(&mut child, pid).await;
            for reader in readers {
                reader.abort();
            }
            info!(tool = %name, "batch cancelled, process tree killed");
            ToolOutcome::Interrupted
        }
    }
}

/// Absolute directory the tool runs in
///
/// The child re-resolves a relative program path against its own cwd, so
/// a relative directory would make resolution and spawn disagree.
fn effective_working_dir(definition: &ToolDefinition, options: &RunnerOptions) -> PathBuf {
    let dir = match &definition.working_directory {
        Some(dir) => options.working_dir.join(dir),
        None => options.working_dir.clone(),
    };
    if dir.is_absolute() {
        return dir;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot absolutize working directory");
            dir
        }
    }
}

async fn wait_with_policy(
    child: &mut Child,
    limit: Option<Duration>,
    cancel: &CancelToken,
) -> WaitOutcome {
    let deadline = async {
        match limit {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        status = child.wait() => WaitOutcome::Exited(status),
        limit = deadline => WaitOutcome::TimedOut(limit),
        _ = cancel.cancelled() => WaitOutcome::Cancelled,
    }
}

/// Kill the child's whole process group, then reap the child
async fn terminate_tree(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_group(pid);
    }

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill on child failed");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "reaping killed child failed");
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed, falling back to direct kill");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

async fn drain<R>(mut reader: R, buffer: SharedBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut buf = buffer.lock().unwrap_or_else(|e| e.into_inner());
                buf.push(&chunk[..n]);
            }
        }
    }
}

async fn collect(
    readers: Vec<JoinHandle<()>>,
    stdout: &SharedBuffer,
    stderr: &SharedBuffer,
) -> CapturedOutput {
    for mut reader in readers {
        if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
            reader.abort();
        }
    }

    let (stdout, stdout_truncated) = stdout.lock().unwrap_or_else(|e| e.into_inner()).snapshot();
    let (stderr, stderr_truncated) = stderr.lock().unwrap_or_else(|e| e.into_inner()).snapshot();

    CapturedOutput {
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    }
}
