//! Ordered tool registry
//!
//! Built once from configuration and read-only afterwards. Insertion order
//! is preserved so batch runs are reproducible across runs of the same
//! configuration. The filesystem is never touched here; executables are
//! resolved lazily by the runner.

use crate::errors::{OverseerError, Result};
use crate::tools::types::{ToolCategory, ToolDefinition};
use std::collections::HashMap;

/// Tool registry
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Definitions in insertion order
    tools: Vec<ToolDefinition>,

    /// Map of tool name to position in `tools`
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a registry, validating every definition
    ///
    /// Fails on the first duplicate name or invalid definition.
    pub fn new(definitions: impl IntoIterator<Item = ToolDefinition>) -> Result<Self> {
        let mut registry = Self::default();

        for definition in definitions {
            registry.register(definition)?;
        }

        tracing::debug!(tools = registry.len(), "tool registry constructed");
        Ok(registry)
    }

    fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        Self::validate(&definition)?;

        if self.index.contains_key(&definition.name) {
            return Err(OverseerError::DuplicateTool {
                name: definition.name,
            });
        }

        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(definition);
        Ok(())
    }

    fn validate(definition: &ToolDefinition) -> Result<()> {
        if definition.name.trim().is_empty() {
            return Err(OverseerError::InvalidDefinition {
                name: definition.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }

        if definition.executable_path.as_os_str().is_empty() {
            return Err(OverseerError::InvalidDefinition {
                name: definition.name.clone(),
                reason: "executable path must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get tool definition by name
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition> {
        self.get(name).ok_or_else(|| OverseerError::NotFound {
            name: name.to_string(),
        })
    }

    /// Get tool definition by name, if present
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Definitions of one category, in registry order
    pub fn list_by_category(&self, category: ToolCategory) -> Vec<&ToolDefinition> {
        self.tools
            .iter()
            .filter(|def| def.category == category)
            .collect()
    }

    /// All definitions, in registry order
    pub fn list_all(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|def| def.name.clone()).collect()
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
