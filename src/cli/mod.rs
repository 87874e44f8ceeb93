//! CLI module for Overseer
//!
//! Handles command-line argument parsing and configuration management.

pub mod config;
pub mod args;

pub use config::{Config, MonitorConfig, RunnerConfig, ToolEntry};
pub use args::{Args, Commands, RunSelection, Verbosity};
