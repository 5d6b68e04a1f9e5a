//! Name-indexed registry of tools, built once at startup.

use std::collections::BTreeMap;

use hookline_types::error::ToolError;
use hookline_types::tool::ToolSchema;

use super::{BoxTool, Tool};

/// Top-level request fields the HTTP layer takes for job metadata.
///
/// Tool calls put the tool's arguments next to these, so a parameter with one
/// of these names would never reach the tool.
pub const RESERVED_PARAMETER_NAMES: [&str; 3] = ["owner", "conversation_id", "tags"];

/// Registry of available tools, indexed and ordered by name.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, BoxTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Two tools may not share a name, and no tool may declare a parameter
    /// listed in [`RESERVED_PARAMETER_NAMES`].
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register_boxed(BoxTool::new(tool))
    }

    pub fn register_boxed(&mut self, tool: BoxTool) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        if let Some(param) = tool
            .schema()
            .parameters
            .iter()
            .find(|p| RESERVED_PARAMETER_NAMES.contains(&p.name.as_str()))
        {
            return Err(ToolError::InvalidInput(format!(
                "tool '{name}' declares parameter '{}', which is reserved for job metadata",
                param.name
            )));
        }
        tracing::debug!(tool = %name, "tool registered");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BoxTool> {
        self.tools.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<&BoxTool, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(BoxTool::schema).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
