//! Job lifecycle events.
//!
//! `JobEvent` is broadcast by the job runner and registry on every
//! lifecycle change. All variants are Clone + Send + Sync for use with
//! tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus};

/// Events emitted as jobs move through their lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A job record was allocated.
    JobCreated { job_id: JobId, tool_name: String },

    /// The operation started executing.
    JobStarted { job_id: JobId, tool_name: String },

    /// Someone asked the job to stop.
    JobCancelRequested { job_id: JobId, tool_name: String },

    /// The job reached a terminal state.
    JobFinished {
        job_id: JobId,
        tool_name: String,
        status: JobStatus,
        /// The final `status_message` of the record.
        message: String,
        duration_ms: Option<u64>,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::JobCreated { job_id, .. }
            | JobEvent::JobStarted { job_id, .. }
            | JobEvent::JobCancelRequested { job_id, .. }
            | JobEvent::JobFinished { job_id, .. } => *job_id,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            JobEvent::JobCreated { tool_name, .. }
            | JobEvent::JobStarted { tool_name, .. }
            | JobEvent::JobCancelRequested { tool_name, .. }
            | JobEvent::JobFinished { tool_name, .. } => tool_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagged_serialization() {
        let event = JobEvent::JobFinished {
            job_id: JobId::new(),
            tool_name: "fibonacci_calculate".to_string(),
            status: JobStatus::Success,
            message: "The 10th Fibonacci number is 55".to_string(),
            duration_ms: Some(4),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "job_finished");
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn test_accessors() {
        let id = JobId::new();
        let event = JobEvent::JobStarted {
            job_id: id,
            tool_name: "goose".to_string(),
        };
        assert_eq!(event.job_id(), id);
        assert_eq!(event.tool_name(), "goose");
    }
}
