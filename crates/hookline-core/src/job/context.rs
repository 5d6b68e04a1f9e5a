//! Per-job handle passed to running operations.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hookline_types::error::ToolError;
use hookline_types::job::JobId;

use super::registry::JobRegistry;

/// What a running operation knows about its own job.
///
/// Cancellation is cooperative: operations poll [`JobContext::is_cancelled`]
/// or await [`JobContext::cancelled`] at points where stopping is safe.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    token: CancellationToken,
    registry: Arc<JobRegistry>,
}

impl JobContext {
    pub fn new(job_id: JobId, token: CancellationToken, registry: Arc<JobRegistry>) -> Self {
        Self {
            job_id,
            token,
            registry,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// The job's cancellation token, for use in `tokio::select!`.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once a cancel was requested through the token or the registry.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
            || self
                .registry
                .get(self.job_id)
                .is_ok_and(|r| r.cancellation_requested)
    }

    /// `Err(ToolError::Cancelled)` if the job should stop.
    pub fn check_cancelled(&self) -> Result<(), ToolError> {
        if self.is_cancelled() {
            Err(ToolError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token fires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_flag_counts_as_cancellation() {
        let registry = Arc::new(JobRegistry::new());
        let record = registry.create("set_timer");
        let ctx = JobContext::new(record.id, CancellationToken::new(), registry.clone());
        assert!(!ctx.is_cancelled());
        assert!(ctx.check_cancelled().is_ok());

        registry.request_cancel(record.id).unwrap();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check_cancelled(), Err(ToolError::Cancelled));
    }

    #[tokio::test]
    async fn token_fires_cancelled_future() {
        let registry = Arc::new(JobRegistry::new());
        let record = registry.create("set_timer");
        let token = CancellationToken::new();
        let ctx = JobContext::new(record.id, token.clone(), registry);
        token.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }
}
