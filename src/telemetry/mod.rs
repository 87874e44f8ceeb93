//! Telemetry system for Overseer
//!
//! In-process event collection for tool runs and a terminal summary.

use colored::Colorize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Telemetry event types
#[derive(Debug, Clone, Copy)]
pub enum TelemetryEvent {
    ToolStarted,
    ToolCompleted { duration_ms: u64, success: bool },
    ToolSkipped { interrupted: bool },
    BatchDispatch,
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub tools_executed: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub tools_skipped: usize,
    /// Skipped tools whose process tree was killed mid-run
    pub tools_interrupted: usize,
    pub batches: usize,
    pub total_tool_ms: u64,
}

/// Telemetry collector
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        let mut stats = lock(&self.stats);
        match event {
            TelemetryEvent::ToolStarted => {
                stats.tools_executed += 1;
            }
            TelemetryEvent::ToolCompleted {
                success,
                duration_ms,
            } => {
                if success {
                    stats.tools_succeeded += 1;
                } else {
                    stats.tools_failed += 1;
                }
                stats.total_tool_ms += duration_ms;
            }
            TelemetryEvent::ToolSkipped { interrupted } => {
                stats.tools_skipped += 1;
                if interrupted {
                    stats.tools_interrupted += 1;
                }
            }
            TelemetryEvent::BatchDispatch => {
                stats.batches += 1;
            }
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Calculate tool success rate
    pub fn tool_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.tools_succeeded + stats.tools_failed;
        if total == 0 {
            1.0
        } else {
            stats.tools_succeeded as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Summary lines, without colour
    pub fn summary_lines(&self) -> Vec<String> {
        let stats = self.collector.get_stats();
        vec![
            format!("Duration:          {:?}", self.collector.elapsed()),
            format!("Batches:           {}", stats.batches),
            format!("Tools executed:    {}", stats.tools_executed),
            format!("Succeeded:         {}", stats.tools_succeeded),
            format!("Failed:            {}", stats.tools_failed),
            format!(
                "Skipped:           {} ({} interrupted)",
                stats.tools_skipped, stats.tools_interrupted
            ),
            format!(
                "Success rate:      {:.1}%",
                self.collector.tool_success_rate() * 100.0
            ),
        ]
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        println!("\n{}", "Run Summary".bold());
        println!("─────────────────────────────────────");
        for line in self.summary_lines() {
            println!("{}", line);
        }
        println!();
    }
}
