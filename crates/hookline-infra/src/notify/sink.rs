//! Notification sinks.

use hookline_types::error::ToolError;

use super::{Notification, NotificationSink, NotifyError};

/// Writes notifications to the log. Used where no desktop is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(title = %notification.title, "{}", notification.message);
        Ok(())
    }
}

/// macOS Notification Center via `osascript`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsascriptSink;

impl NotificationSink for OsascriptSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape_applescript(&notification.message),
            escape_applescript(&notification.title),
        );
        let output = tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
