//! `goose`: hand a prompt to the Goose CLI agent and return its output.

use std::process::Stdio;

use serde::Deserialize;
use serde_json::{Value, json};

use hookline_core::job::JobContext;
use hookline_core::tool::Tool;
use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ParameterType, ToolParameter, ToolSchema};

/// Characters of stderr kept in a failure message.
const STDERR_SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct GooseTool {
    binary: String,
}

impl GooseTool {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for GooseTool {
    fn default() -> Self {
        Self::new("goose")
    }
}

#[derive(Debug, Deserialize)]
pub struct GooseInput {
    pub text: String,
}

impl Tool for GooseTool {
    type Input = GooseInput;

    fn name(&self) -> &str {
        "goose"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "goose".to_string(),
            description: "Run a query, prompt or command with the Goose agent on the user's \
                          machine."
                .to_string(),
            parameters: vec![ToolParameter::required(
                "text",
                ParameterType::String,
                "Query, prompt or command to run with Goose.",
            )],
        }
    }

    fn settings(&self) -> JobSettings {
        JobSettings::default()
            .with_sync_threshold(5.0)
            .with_notification("Goose Command Complete", "Goose finished: {text}")
    }

    fn validate(&self, input: &GooseInput) -> Result<(), ToolError> {
        if input.text.trim().is_empty() {
            return Err(ToolError::InvalidInput("text must not be empty".to_string()));
        }
        Ok(())
    }

    async fn run(&self, input: GooseInput, ctx: JobContext) -> Result<Value, ToolError> {
        let child = tokio::process::Command::new(&self.binary)
            .args(["run", "-t", input.text.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::failed(format!("Could not start {}: {e}", self.binary)))?;

        tracing::debug!(job_id = %ctx.job_id(), pid = ?child.id(), "goose started");

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|e| ToolError::failed(format!("Failed to wait for goose: {e}")))?,
            () = ctx.cancelled() => return Err(ToolError::Cancelled),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::failed(format!(
                "Goose command failed ({}): {}",
                output.status,
                summarize_stderr(&stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(json!({
            "text": input.text,
            "output": stdout.trim(),
        }))
    }
}

/// Trailing part of stderr, where CLI tools usually put the actual error.
fn summarize_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return "no error output".to_string();
    }
    let count = trimmed.chars().count();
    if count <= STDERR_SUMMARY_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_SUMMARY_CHARS).collect();
    format!("...{tail}")
}
