//! Job runner: moves operations onto background tasks and reports back.
//!
//! # Execution flow
//!
//! 1. Allocate a `pending` record and a cancellation token.
//! 2. Hand the job future to the [`TaskSpawner`] and return immediately.
//! 3. In the background: wait for a concurrency permit (if capped), then move
//!    the job to `running`, or straight to `cancelled` if a cancel arrived
//!    first.
//! 4. Run the operation, catching panics.
//! 5. Record `success`, `failed` or `cancelled`. If the job was expired in
//!    the meantime the registry rejects the late completion and the record
//!    stays `expired`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use hookline_types::error::{JobError, ToolError};
use hookline_types::event::JobEvent;
use hookline_types::job::{JobId, JobRecord, JobSpec, JobStatus};

use crate::event::EventBus;

use super::context::JobContext;
use super::registry::JobRegistry;
use super::spawner::TaskSpawner;

/// What a successful operation hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub result: Value,
    /// Overrides the default success `status_message`.
    pub message: Option<String>,
}

impl JobOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<Value> for JobOutput {
    fn from(result: Value) -> Self {
        Self::new(result)
    }
}

/// Schedules operations as tracked jobs.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    spawner: Arc<dyn TaskSpawner>,
    event_bus: EventBus,
    /// Cancellation tokens keyed by job id, present while the job's task lives.
    tokens: Arc<DashMap<JobId, CancellationToken>>,
    /// Caps simultaneously running jobs when set.
    permits: Option<Arc<Semaphore>>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        spawner: Arc<dyn TaskSpawner>,
        event_bus: EventBus,
        max_concurrent_jobs: Option<usize>,
    ) -> Self {
        Self {
            registry,
            spawner,
            event_bus,
            tokens: Arc::new(DashMap::new()),
            permits: max_concurrent_jobs.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Number of jobs whose background task has not finished yet.
    pub fn active_count(&self) -> usize {
        self.tokens.len()
    }

    /// Create a `pending` job for `spec` and run `operation` in the background.
    ///
    /// Returns the freshly created record without waiting for anything.
    pub fn submit<F, Fut, T>(&self, spec: JobSpec, operation: F) -> JobRecord
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ToolError>> + Send + 'static,
        T: Into<JobOutput> + Send + 'static,
    {
        let record = self.registry.create_with(spec);
        let job_id = record.id;
        let token = CancellationToken::new();
        self.tokens.insert(job_id, token.clone());

        tracing::debug!(job_id = %job_id, tool = %record.tool_name, "job submitted");
        self.event_bus.publish(JobEvent::JobCreated {
            job_id,
            tool_name: record.tool_name.clone(),
        });

        let task = JobTask {
            job_id,
            tool_name: record.tool_name.clone(),
            token,
            registry: self.registry.clone(),
            event_bus: self.event_bus.clone(),
            tokens: self.tokens.clone(),
            permits: self.permits.clone(),
        };
        self.spawner.spawn(Box::pin(task.run(operation)));

        record
    }

    /// Request cooperative cancellation of a `pending` or `running` job.
    pub fn cancel(&self, id: JobId) -> Result<JobRecord, JobError> {
        let record = self.registry.request_cancel(id)?;
        if let Some(token) = self.tokens.get(&id) {
            token.cancel();
        }
        tracing::info!(job_id = %id, tool = %record.tool_name, "cancellation requested");
        self.event_bus.publish(JobEvent::JobCancelRequested {
            job_id: id,
            tool_name: record.tool_name.clone(),
        });
        Ok(record)
    }

    /// Mark old `pending`/`running` jobs as expired.
    ///
    /// Only the record changes. The operation keeps running and whatever it
    /// returns later is dropped because the record is already terminal.
    pub fn expire_stale(&self, max_age: Duration) -> Vec<JobRecord> {
        let expired = self.registry.expire_stale(max_age);
        for record in &expired {
            tracing::info!(job_id = %record.id, tool = %record.tool_name, "job expired");
            self.publish_finished(record);
        }
        expired
    }

    /// Delete a job record, stopping its operation if it is still going.
    pub fn remove(&self, id: JobId) -> Result<JobRecord, JobError> {
        let record = self.registry.remove(id)?;
        self.stop(id);
        Ok(record)
    }

    /// Delete every job record. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = self.registry.clear();
        for id in &removed {
            self.stop(*id);
        }
        removed.len()
    }

    fn stop(&self, id: JobId) {
        if let Some(token) = self.tokens.get(&id) {
            token.cancel();
        }
    }

    fn publish_finished(&self, record: &JobRecord) {
        publish_finished(&self.event_bus, record);
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("active", &self.tokens.len())
            .field(
                "max_concurrent",
                &self.permits.as_ref().map(|_| "capped").unwrap_or("unbounded"),
            )
            .finish()
    }
}

fn publish_finished(bus: &EventBus, record: &JobRecord) {
    bus.publish(JobEvent::JobFinished {
        job_id: record.id,
        tool_name: record.tool_name.clone(),
        status: record.status,
        message: record.status_message.clone(),
        duration_ms: record
            .duration()
            .and_then(|d| u64::try_from(d.num_milliseconds()).ok()),
    });
}

/// Everything the background half of a job needs.
struct JobTask {
    job_id: JobId,
    tool_name: String,
    token: CancellationToken,
    registry: Arc<JobRegistry>,
    event_bus: EventBus,
    tokens: Arc<DashMap<JobId, CancellationToken>>,
    permits: Option<Arc<Semaphore>>,
}

impl JobTask {
    async fn run<F, Fut, T>(self, operation: F)
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ToolError>> + Send + 'static,
        T: Into<JobOutput> + Send + 'static,
    {
        let ctx = JobContext::new(self.job_id, self.token.clone(), self.registry.clone());

        // Jobs queue in `pending` until a permit frees up or they are cancelled.
        let _permit = match &self.permits {
            Some(semaphore) => {
                tokio::select! {
                    permit = semaphore.clone().acquire_owned() => permit.ok(),
                    () = self.token.cancelled() => None,
                }
            }
            None => None,
        };

        if ctx.is_cancelled() {
            self.finish(JobStatus::Cancelled, None, None, None);
            return;
        }

        match self
            .registry
            .transition(self.job_id, JobStatus::Running, None, None, None)
        {
            Ok(_) => {
                tracing::info!(job_id = %self.job_id, tool = %self.tool_name, "job started");
                self.event_bus.publish(JobEvent::JobStarted {
                    job_id: self.job_id,
                    tool_name: self.tool_name.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, tool = %self.tool_name, error = %e, "job could not start");
                self.tokens.remove(&self.job_id);
                return;
            }
        }

        let outcome = AssertUnwindSafe(async move { operation(ctx).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => {
                let output = output.into();
                self.finish(JobStatus::Success, output.message, Some(output.result), None);
            }
            Ok(Err(ToolError::Cancelled)) => {
                self.finish(JobStatus::Cancelled, None, None, None);
            }
            Ok(Err(e)) => {
                self.finish(JobStatus::Failed, None, None, Some(e.to_string()));
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(job_id = %self.job_id, tool = %self.tool_name, panic = %detail, "job panicked");
                let error = format!("The {} job stopped unexpectedly: {detail}", self.tool_name);
                self.finish(JobStatus::Failed, None, None, Some(error));
            }
        }
    }

    fn finish(
        &self,
        status: JobStatus,
        message: Option<String>,
        result: Option<Value>,
        error: Option<String>,
    ) {
        self.tokens.remove(&self.job_id);
        match self
            .registry
            .transition(self.job_id, status, message, result, error)
        {
            Ok(record) => {
                tracing::info!(
                    job_id = %self.job_id,
                    tool = %self.tool_name,
                    status = %record.status,
                    duration_ms = record.duration().map(|d| d.num_milliseconds()),
                    "job finished"
                );
                publish_finished(&self.event_bus, &record);
            }
            Err(JobError::NotFound(_)) => {
                tracing::debug!(job_id = %self.job_id, "job was deleted before it finished");
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %self.job_id,
                    tool = %self.tool_name,
                    attempted = %status,
                    error = %e,
                    "late job completion rejected"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::job::spawner::TokioSpawner;
    use hookline_types::job::JobFilter;

    fn runner(max_concurrent: Option<usize>) -> JobRunner {
        JobRunner::new(
            Arc::new(JobRegistry::new()),
            Arc::new(TokioSpawner),
            EventBus::new(256),
            max_concurrent,
        )
    }

    async fn wait_terminal(runner: &JobRunner, id: JobId) -> JobRecord {
        let mut rx = runner.registry().watch(id).unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_terminal()))
            .await
            .expect("job did not finish in time")
            .unwrap();
        runner.registry().get(id).unwrap()
    }

    fn fib(n: u64) -> u64 {
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..n {
            (a, b) = (b, a + b);
        }
        a
    }

    #[tokio::test]
    async fn submit_returns_pending_immediately() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("slow"), |ctx: JobContext| async move {
            ctx.cancelled().await;
            Err::<Value, _>(ToolError::Cancelled)
        });
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(runner.registry().len(), 1);
        runner.cancel(record.id).unwrap();
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn fibonacci_job_succeeds() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("fibonacci_calculate"), |_ctx| async {
            Ok::<_, ToolError>(serde_json::json!(fib(10)))
        });
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status, JobStatus::Success);
        assert_eq!(done.result, Some(serde_json::json!(55)));
        assert!(done.error.is_none());
        assert!(done.started_at.unwrap() <= done.completed_at.unwrap());
    }

    #[tokio::test]
    async fn output_message_becomes_status_message() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("fibonacci_calculate"), |_ctx| async {
            Ok::<_, ToolError>(
                JobOutput::new(serde_json::json!(55)).with_message("The result is 55"),
            )
        });
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status_message, "The result is 55");
    }

    #[tokio::test]
    async fn failing_job_records_error() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("goose"), |_ctx| async {
            Err::<Value, _>(ToolError::failed("goose exited with status 1"))
        });
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.error.as_deref(), Some("goose exited with status 1"));
        assert!(done.result.is_none());
    }

    #[tokio::test]
    async fn panicking_job_is_reported_as_failed() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("broken"), |_ctx| async {
            if true {
                panic!("index out of bounds");
            }
            Ok::<Value, ToolError>(Value::Null)
        });
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        let error = done.error.unwrap();
        assert!(error.contains("stopped unexpectedly"));
        assert!(error.contains("index out of bounds"));
        assert!(!error.contains("panicked at"));
    }

    #[tokio::test]
    async fn cancel_before_start_skips_running() {
        let runner = runner(None);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_in_job = ran.clone();
        let record = runner.submit(JobSpec::new("set_timer"), move |_ctx| async move {
            ran_in_job.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ToolError>(Value::Null)
        });

        // The current-thread test runtime has not polled the task yet.
        runner.cancel(record.id).unwrap();
        let done = wait_terminal(&runner, record.id).await;
        assert_eq!(done.status, JobStatus::Cancelled);
        assert!(done.started_at.is_none());
        assert!(done.completed_at.is_some());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_cancel_is_invalid_state() {
        let runner = runner(None);
        let record = runner.submit(JobSpec::new("set_timer"), |ctx: JobContext| async move {
            ctx.cancelled().await;
            Err::<Value, _>(ToolError::Cancelled)
        });
        runner.cancel(record.id).unwrap();
        wait_terminal(&runner, record.id).await;
        assert!(matches!(
            runner.cancel(record.id),
            Err(JobError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn hundred_concurrent_jobs_all_succeed() {
        let runner = runner(None);
        let counter = Arc::new(AtomicUsize::new(0));
        let ids: Vec<JobId> = (0..100)
            .map(|_| {
                let counter = counter.clone();
                runner
                    .submit(JobSpec::new("increment"), move |_ctx| async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, ToolError>(Value::Null)
                    })
                    .id
            })
            .collect();

        for id in &ids {
            wait_terminal(&runner, *id).await;
        }
        let succeeded = runner
            .registry()
            .list(&JobFilter::default().with_status(JobStatus::Success));
        assert_eq!(succeeded.len(), 100);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(runner.active_count(), 0);
    }

    #[tokio::test]
    async fn concurrency_cap_keeps_extra_jobs_pending() {
        let runner = runner(Some(1));
        let gate = CancellationToken::new();
        let first_gate = gate.clone();
        let first = runner.submit(JobSpec::new("hold"), move |_ctx| async move {
            first_gate.cancelled().await;
            Ok::<_, ToolError>(Value::Null)
        });
        let second = runner.submit(JobSpec::new("hold"), |_ctx| async {
            Ok::<_, ToolError>(Value::Null)
        });

        let mut first_rx = runner.registry().watch(first.id).unwrap();
        first_rx
            .wait_for(|s| *s == JobStatus::Running)
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(
            runner.registry().get(second.id).unwrap().status,
            JobStatus::Pending
        );

        gate.cancel();
        assert_eq!(wait_terminal(&runner, first.id).await.status, JobStatus::Success);
        assert_eq!(wait_terminal(&runner, second.id).await.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_permit() {
        let runner = runner(Some(1));
        let gate = CancellationToken::new();
        let first_gate = gate.clone();
        let first = runner.submit(JobSpec::new("hold"), move |_ctx| async move {
            first_gate.cancelled().await;
            Ok::<_, ToolError>(Value::Null)
        });
        let queued = runner.submit(JobSpec::new("hold"), |_ctx| async {
            Ok::<_, ToolError>(Value::Null)
        });

        tokio::task::yield_now().await;
        runner.cancel(queued.id).unwrap();
        let done = wait_terminal(&runner, queued.id).await;
        assert_eq!(done.status, JobStatus::Cancelled);
        assert!(done.started_at.is_none());

        gate.cancel();
        wait_terminal(&runner, first.id).await;
    }

    #[tokio::test]
    async fn expired_running_job_stays_expired() {
        let runner = runner(None);
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let record = runner.submit(JobSpec::new("goose"), |ctx: JobContext| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = done_tx.send(ctx.is_cancelled());
            Ok::<_, ToolError>(serde_json::json!("finished anyway"))
        });
        let mut rx = runner.registry().watch(record.id).unwrap();
        rx.wait_for(|s| *s == JobStatus::Running).await.unwrap();

        let expired = runner.expire_stale(Duration::ZERO);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].status, JobStatus::Expired);

        // The operation runs to completion without ever seeing a cancel.
        let cancelled_when_done = tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .expect("operation did not finish")
            .unwrap();
        assert!(!cancelled_when_done);

        tokio::time::timeout(Duration::from_secs(5), async {
            while runner.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task bookkeeping was not released");

        let stored = runner.registry().get(record.id).unwrap();
        assert_eq!(stored.status, JobStatus::Expired);
        assert!(stored.result.is_none());
        assert!(!stored.cancellation_requested);
    }

    #[tokio::test]
    async fn lifecycle_events_are_published() {
        let runner = runner(None);
        let mut rx = runner.event_bus().subscribe();
        let record = runner.submit(JobSpec::new("confetti"), |_ctx| async {
            Ok::<_, ToolError>(Value::Null)
        });
        wait_terminal(&runner, record.id).await;

        assert!(matches!(rx.next().await.unwrap(), JobEvent::JobCreated { .. }));
        assert!(matches!(rx.next().await.unwrap(), JobEvent::JobStarted { .. }));
        match rx.next().await.unwrap() {
            JobEvent::JobFinished { job_id, status, .. } => {
                assert_eq!(job_id, record.id);
                assert_eq!(status, JobStatus::Success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_stops_running_operation() {
        let runner = runner(None);
        let stopped = Arc::new(AtomicUsize::new(0));
        let stopped_in_job = stopped.clone();
        let record = runner.submit(JobSpec::new("set_timer"), move |ctx: JobContext| async move {
            ctx.cancelled().await;
            stopped_in_job.fetch_add(1, Ordering::SeqCst);
            Err::<Value, _>(ToolError::Cancelled)
        });
        let mut rx = runner.registry().watch(record.id).unwrap();
        rx.wait_for(|s| *s == JobStatus::Running).await.unwrap();
        drop(rx);

        runner.remove(record.id).unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(runner.registry().get(record.id).is_err());
        assert_eq!(runner.active_count(), 0);
    }
}
