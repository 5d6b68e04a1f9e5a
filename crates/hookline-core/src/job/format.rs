//! Plain-language rendering of job state for a conversational agent.
//!
//! The output is read aloud or paraphrased by an LLM, so it favours full
//! sentences over tables and never fails on missing optional fields.

use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use hookline_types::job::{JobRecord, JobStatus};

use super::clock::{Clock, SystemClock};

/// Longest result excerpt included in a summary, in characters.
const RESULT_EXCERPT_CHARS: usize = 200;

/// Renders [`JobRecord`]s into LLM-legible prose.
#[derive(Clone)]
pub struct StatusFormatter {
    clock: Arc<dyn Clock>,
    list_limit: usize,
}

impl StatusFormatter {
    pub fn new(clock: Arc<dyn Clock>, list_limit: usize) -> Self {
        Self {
            clock,
            list_limit: list_limit.max(1),
        }
    }

    pub fn list_limit(&self) -> usize {
        self.list_limit
    }

    /// One paragraph describing a single job.
    pub fn format_one(&self, record: &JobRecord) -> String {
        let name = &record.tool_name;
        let id = record.id;
        match record.status {
            JobStatus::Pending => {
                let waited = humanize(self.clock.now() - record.created_at);
                let mut text =
                    format!("The {name} job ({id}) is pending and has been waiting for {waited}.");
                if record.cancellation_requested {
                    text.push_str(" Cancellation has been requested.");
                }
                text
            }
            JobStatus::Running => {
                let since = record.started_at.unwrap_or(record.created_at);
                let elapsed = humanize(self.clock.now() - since);
                let mut text = format!("The {name} job ({id}) is still running after {elapsed}.");
                if record.cancellation_requested {
                    text.push_str(" Cancellation has been requested.");
                }
                text
            }
            JobStatus::Success => {
                let mut text = format!("The {name} job ({id}) completed successfully");
                if let Some(d) = record.duration() {
                    text.push_str(&format!(" in {}", humanize(d)));
                }
                text.push('.');
                if !record.status_message.is_empty()
                    && record.status_message != super::registry::default_message(
                        JobStatus::Success,
                        name,
                        None,
                    )
                {
                    text.push(' ');
                    text.push_str(&sentence(&record.status_message));
                }
                if let Some(result) = record.result.as_ref().filter(|r| !r.is_null()) {
                    text.push_str(&format!(" Result: {}", excerpt(result)));
                }
                text
            }
            JobStatus::Failed => {
                let mut text = format!("The {name} job ({id}) failed");
                if let Some(d) = record.duration() {
                    text.push_str(&format!(" after {}", humanize(d)));
                }
                let error = record.error.as_deref().unwrap_or("no error details were recorded");
                text.push_str(&format!(". Error: {}", sentence(error)));
                text
            }
            JobStatus::Cancelled => {
                if record.started_at.is_some() {
                    format!("The {name} job ({id}) was cancelled while running.")
                } else {
                    format!("The {name} job ({id}) was cancelled before it started.")
                }
            }
            JobStatus::Expired => {
                format!("The {name} job ({id}) expired before it could finish.")
            }
        }
    }

    /// A listing of many jobs, newest first, capped at the list limit.
    pub fn format_many(&self, records: &[JobRecord]) -> String {
        if records.is_empty() {
            return "There are no jobs.".to_string();
        }

        let mut header = format!(
            "There {} {} {}",
            if records.len() == 1 { "is" } else { "are" },
            records.len(),
            plural(records.len() as u64, "job", "jobs"),
        );
        let counts: Vec<String> = JobStatus::ALL
            .iter()
            .filter_map(|status| {
                let n = records.iter().filter(|r| r.status == *status).count();
                (n > 0).then(|| format!("{n} {status}"))
            })
            .collect();
        header.push_str(&format!(": {}.", counts.join(", ")));

        // Stable sort over the reversed slice keeps later insertions first on ties.
        let mut newest_first: Vec<&JobRecord> = records.iter().rev().collect();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut lines = vec![header];
        lines.extend(
            newest_first
                .iter()
                .take(self.list_limit)
                .map(|r| format!("- {}", self.format_one(r))),
        );
        let hidden = records.len().saturating_sub(self.list_limit);
        if hidden > 0 {
            lines.push(format!("... and {hidden} more"));
        }
        lines.join("\n")
    }
}

impl Default for StatusFormatter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), 20)
    }
}

impl std::fmt::Debug for StatusFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFormatter")
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

fn plural<'a>(n: u64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// "3 seconds", "2 minutes 5 seconds", "1 hour 4 minutes".
pub fn humanize(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0).unsigned_abs();
    if secs == 0 {
        return "less than a second".to_string();
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let part = |n: u64, unit: &str| format!("{n} {}", plural(n, unit, &format!("{unit}s")));
    if hours > 0 {
        if minutes > 0 {
            format!("{} {}", part(hours, "hour"), part(minutes, "minute"))
        } else {
            part(hours, "hour")
        }
    } else if minutes > 0 {
        if seconds > 0 {
            format!("{} {}", part(minutes, "minute"), part(seconds, "second"))
        } else {
            part(minutes, "minute")
        }
    } else {
        part(seconds, "second")
    }
}

fn excerpt(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= RESULT_EXCERPT_CHARS {
        text
    } else {
        let cut: String = text.chars().take(RESULT_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

/// Ensure a message ends with terminal punctuation.
fn sentence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}
