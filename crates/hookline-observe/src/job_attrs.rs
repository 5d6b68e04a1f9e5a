//! Span and event field names for job instrumentation.
//!
//! Kept in one place so log queries and OTel exporters see the same keys
//! from the runner, the HTTP layer and the CLI.

/// Job identifier (UUID v7).
pub const JOB_ID: &str = "job.id";

/// Registered tool name, e.g. `set_timer`.
pub const JOB_TOOL: &str = "job.tool";

/// Lifecycle status after the event.
pub const JOB_STATUS: &str = "job.status";

/// Wall-clock run time in milliseconds, set once the job is terminal.
pub const JOB_DURATION_MS: &str = "job.duration_ms";

/// Caller-supplied owner, when present.
pub const JOB_OWNER: &str = "job.owner";

// Span names

/// One execution of a job operation.
pub const SPAN_JOB_RUN: &str = "job.run";

/// One HTTP request against the API.
pub const SPAN_HTTP_REQUEST: &str = "http.request";

/// Build the span for one job execution.
///
/// `tracing` needs field names at compile time, so the keys above are
/// repeated literally here.
#[macro_export]
macro_rules! job_span {
    ($job_id:expr, $tool:expr) => {
        tracing::info_span!("job.run", "job.id" = %$job_id, "job.tool" = %$tool)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_share_the_job_namespace() {
        for key in [JOB_ID, JOB_TOOL, JOB_STATUS, JOB_DURATION_MS, JOB_OWNER] {
            assert!(key.starts_with("job."), "{key}");
        }
        assert_eq!(SPAN_JOB_RUN, "job.run");
    }

    #[test]
    fn job_span_builds() {
        let _span = job_span!("0198c1f2-0000-7000-8000-000000000000", "set_timer");
    }
}
