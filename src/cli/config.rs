//! Configuration management for Overseer
//!
//! Typed configuration deserialized once at startup. TOML by default,
//! JSON when the file ends in `.json`.
//! Default location: ~/.overseer/config.toml

use crate::errors::{OverseerError, Result};
use crate::tools::{RunnerOptions, ToolCategory, ToolDefinition, DEFAULT_MAX_OUTPUT_BYTES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for Overseer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
}

/// Runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Worker-pool width; 0 means one per CPU
    pub max_parallel: usize,
    /// Per-stream capture cap
    pub max_output_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// Timing policy for monitoring tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub duration_secs: u64,
    /// Run until stopped externally
    pub disable_timer: bool,
}

/// One `[[tools]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    pub name: String,
    pub path: PathBuf,
    pub category: ToolCategory,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Timing comes from `[monitor]` instead of `timeout_seconds`
    #[serde(default)]
    pub monitor: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            working_dir: None,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            disable_timer: false,
        }
    }
}

impl MonitorConfig {
    /// Effective bound for monitor tools; `None` is unbounded
    pub fn timeout_seconds(&self) -> Option<u64> {
        if self.disable_timer || self.duration_secs == 0 {
            None
        } else {
            Some(self.duration_secs)
        }
    }
}

impl ToolEntry {
    /// Convert into a registry definition, applying monitor timing
    pub fn to_definition(&self, monitor: &MonitorConfig) -> ToolDefinition {
        let timeout_seconds = if self.monitor {
            monitor.timeout_seconds()
        } else {
            self.timeout_seconds
        };

        ToolDefinition {
            name: self.name.clone(),
            executable_path: self.path.clone(),
            category: self.category,
            arguments: self.arguments.clone(),
            working_directory: self.working_directory.clone(),
            timeout_seconds,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(&config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OverseerError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = if is_json(path) {
            Self::from_json_str(&contents)?
        } else {
            Self::from_toml_str(&contents)?
        };

        tracing::debug!(path = %path.display(), tools = config.tools.len(), "configuration loaded");
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".overseer").join("config.toml"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| OverseerError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(contents)
            .map_err(|e| OverseerError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.runner.max_output_bytes == 0 {
            return Err(OverseerError::ConfigError(
                "max_output_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self).map_err(|e| {
                OverseerError::ConfigError(format!("Failed to serialize config: {}", e))
            })?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OverseerError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| OverseerError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Tool definitions in configuration order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|entry| entry.to_definition(&self.monitor))
            .collect()
    }

    /// Runner options derived from `[runner]`
    pub fn runner_options(&self) -> RunnerOptions {
        let width = match self.runner.max_parallel {
            0 => num_cpus::get(),
            n => n,
        };

        let mut options = RunnerOptions::default()
            .with_max_output_size(self.runner.max_output_bytes)
            .with_max_parallel(width);
        if let Some(dir) = &self.runner.working_dir {
            options.working_dir = dir.clone();
        }
        options
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
