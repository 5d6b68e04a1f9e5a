//! `set_timer`: a countdown that runs in the background.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use hookline_core::job::JobContext;
use hookline_core::tool::Tool;
use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ParameterType, ToolParameter, ToolSchema};

/// Longest timer accepted, one day.
const MAX_DURATION_SECS: u64 = 86_400;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimerTool;

#[derive(Debug, Deserialize)]
pub struct TimerInput {
    pub duration_seconds: i64,
}

impl Tool for TimerTool {
    type Input = TimerInput;

    fn name(&self) -> &str {
        "set_timer"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "set_timer".to_string(),
            description: "Starts a countdown timer for a specified duration. The timer runs in \
                          the background and notifies when complete."
                .to_string(),
            parameters: vec![ToolParameter::required(
                "duration_seconds",
                ParameterType::Integer,
                "The duration in seconds. For example, 300 for 5 minutes. If the user doesn't \
                 specify a duration, ask them how long they want the timer to run for.",
            )],
        }
    }

    fn settings(&self) -> JobSettings {
        JobSettings::default()
            .with_sync_threshold(5.0)
            .with_notification("Timer Complete", "Timer completed after {duration_seconds} seconds")
    }

    fn validate(&self, input: &TimerInput) -> Result<(), ToolError> {
        if input.duration_seconds <= 0 {
            return Err(ToolError::InvalidInput(
                "duration_seconds must be a positive number of seconds".to_string(),
            ));
        }
        if input.duration_seconds.unsigned_abs() > MAX_DURATION_SECS {
            return Err(ToolError::InvalidInput(format!(
                "duration_seconds must be at most {MAX_DURATION_SECS} (one day)"
            )));
        }
        Ok(())
    }

    async fn run(&self, input: TimerInput, ctx: JobContext) -> Result<Value, ToolError> {
        let secs = input.duration_seconds.unsigned_abs();
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(secs)) => {
                Ok(json!({ "duration_seconds": secs }))
            }
            () = ctx.cancelled() => Err(ToolError::Cancelled),
        }
    }

    fn summarize(&self, result: &Value) -> Option<String> {
        let secs = result["duration_seconds"].as_u64()?;
        Some(format!("Timer for {secs} seconds completed"))
    }
}
