//! Query parameter extractors.

use serde::Deserialize;

use hookline_types::job::{JobFilter, JobStatus};

use crate::http::error::AppError;

/// Query parameters for the job list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct JobListQuery {
    /// Filter by status (pending, running, success, failed, cancelled, expired).
    pub status: Option<String>,
    pub tool_name: Option<String>,
    pub owner: Option<String>,
    pub conversation_id: Option<String>,
}

impl JobListQuery {
    pub fn into_filter(self) -> Result<JobFilter, AppError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<JobStatus>())
            .transpose()
            .map_err(AppError::Validation)?;
        Ok(JobFilter {
            status,
            tool_name: non_empty(self.tool_name),
            owner: non_empty(self.owner),
            conversation_id: non_empty(self.conversation_id),
        })
    }
}

/// `?owner=` with no value means "no filter", not "owner is empty".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `?sync_threshold=` on tool calls.
#[derive(Debug, Deserialize, Default)]
pub struct SyncQuery {
    /// Seconds to wait for the job before answering; 0 answers immediately.
    pub sync_threshold: Option<f64>,
}
