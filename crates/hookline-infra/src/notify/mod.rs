//! Completion notifications.
//!
//! The [`Notifier`] listens on the job event bus. When a job whose tool
//! declares `notify_title`/`notify_message` finishes, it renders the message
//! template against the job input and hands it to a [`NotificationSink`].

pub mod sink;

pub use sink::{LogSink, OsascriptSink};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use hookline_core::event::JobEventStream;
use hookline_core::job::JobRegistry;
use hookline_core::tool::ToolRegistry;
use hookline_types::event::JobEvent;
use hookline_types::job::{JobRecord, JobStatus};

/// A message for the user's desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to launch notifier: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("notifier exited with {0}")]
    Failed(String),
}

/// Somewhere notifications can be shown.
pub trait NotificationSink: Send + Sync {
    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

#[derive(Debug, Clone)]
struct Template {
    title: String,
    message: String,
}

/// Turns job completion events into notifications.
pub struct Notifier<S> {
    sink: S,
    templates: HashMap<String, Template>,
}

impl<S: NotificationSink> Notifier<S> {
    /// Collect templates from every tool that declares both a title and a message.
    pub fn from_tools(tools: &ToolRegistry, sink: S) -> Self {
        let templates = tools
            .names()
            .into_iter()
            .filter_map(|name| {
                let settings = tools.get(name)?.settings();
                Some((
                    name.to_string(),
                    Template {
                        title: settings.notify_title?,
                        message: settings.notify_message?,
                    },
                ))
            })
            .collect();
        Self { sink, templates }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The notification for a finished job, if its tool wants one.
    ///
    /// Successful jobs get the rendered template; failed jobs get the error.
    pub fn notification_for(&self, record: &JobRecord) -> Option<Notification> {
        let template = self.templates.get(&record.tool_name)?;
        match record.status {
            JobStatus::Success => Some(Notification {
                title: template.title.clone(),
                message: render_template(&template.message, &record.input),
            }),
            JobStatus::Failed => Some(Notification {
                title: format!("{} (failed)", template.title),
                message: record
                    .error
                    .clone()
                    .unwrap_or_else(|| "The job failed".to_string()),
            }),
            _ => None,
        }
    }

    /// Deliver notifications until the event bus closes.
    pub async fn run(self, mut events: JobEventStream, registry: Arc<JobRegistry>) {
        while let Some(event) = events.next().await {
            let JobEvent::JobFinished { job_id, .. } = event else {
                continue;
            };
            let Ok(record) = registry.get(job_id) else {
                continue;
            };
            let Some(notification) = self.notification_for(&record) else {
                continue;
            };

            match self.sink.deliver(&notification).await {
                Ok(()) => tracing::debug!(job_id = %job_id, title = %notification.title, "notification delivered"),
                Err(e) => tracing::warn!(job_id = %job_id, error = %e, "notification failed"),
            }
        }
        tracing::debug!(dropped = events.dropped(), "notifier stopped");
    }
}

/// Replace `{name}` placeholders with values from `input`.
///
/// Strings are inserted bare, other values as JSON. Placeholders with no
/// matching key are left untouched.
pub fn render_template(template: &str, input: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match input.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
