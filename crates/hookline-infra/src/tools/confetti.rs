//! `confetti`: celebrate by opening a Raycast deep link.

use serde::Deserialize;
use serde_json::{Value, json};

use hookline_core::job::JobContext;
use hookline_core::tool::Tool;
use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ToolSchema};

#[derive(Debug, Clone)]
pub struct ConfettiTool {
    url: String,
}

impl ConfettiTool {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for ConfettiTool {
    fn default() -> Self {
        Self::new("raycast://confetti")
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfettiInput {}

impl Tool for ConfettiTool {
    type Input = ConfettiInput;

    fn name(&self) -> &str {
        "confetti"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "confetti".to_string(),
            description: "Shoot confetti on the user's screen to celebrate something.".to_string(),
            parameters: Vec::new(),
        }
    }

    fn settings(&self) -> JobSettings {
        // Opening a URL is instant; there is nothing to cancel.
        JobSettings::default().cancelable(false)
    }

    async fn run(&self, _input: ConfettiInput, _ctx: JobContext) -> Result<Value, ToolError> {
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || open::that(&url))
            .await
            .map_err(|e| ToolError::failed(format!("Failed to trigger confetti: {e}")))?
            .map_err(|e| ToolError::failed(format!("Failed to trigger confetti: {e}")))?;
        tracing::debug!(url = %self.url, "confetti triggered");
        Ok(json!({ "message": "Confetti triggered!" }))
    }

    fn summarize(&self, _result: &Value) -> Option<String> {
        Some("Confetti triggered!".to_string())
    }
}
