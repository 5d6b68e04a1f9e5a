//! The tools Hookline ships with.

pub mod confetti;
pub mod fibonacci;
pub mod goose;
pub mod timer;

pub use confetti::ConfettiTool;
pub use fibonacci::FibonacciTool;
pub use goose::GooseTool;
pub use timer::TimerTool;

use hookline_core::tool::ToolRegistry;
use hookline_types::config::ToolsConfig;
use hookline_types::error::ToolError;

/// Build the registry of bundled tools.
pub fn default_tools(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(TimerTool)?;
    registry.register(FibonacciTool)?;
    registry.register(ConfettiTool::new(config.confetti_url.clone()))?;
    registry.register(GooseTool::new(config.goose_binary.clone()))?;
    Ok(registry)
}
