//! Job service: the single entry point callers use to run and inspect jobs.
//!
//! Wraps the registry, runner, tool registry and formatter behind one facade
//! owned by the application state. HTTP handlers and CLI commands go through
//! this type; nothing outside `crate::job` mutates job records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use hookline_types::config::JobsConfig;
use hookline_types::error::{JobError, ToolError};
use hookline_types::job::{JobFilter, JobId, JobRecord, JobSpec};

use crate::event::EventBus;
use crate::job::{
    Clock, IdGenerator, JobContext, JobOutput, JobRegistry, JobRunner, StatusFormatter,
    SystemClock, TaskSpawner, TokioSpawner, UuidV7Generator,
};
use crate::tool::ToolRegistry;

/// Injected environment: time, ids and background execution.
#[derive(Clone)]
pub struct JobEnvironment {
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub spawner: Arc<dyn TaskSpawner>,
}

impl Default for JobEnvironment {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidV7Generator),
            spawner: Arc::new(TokioSpawner),
        }
    }
}

/// Correlation metadata a caller may attach to a tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerInfo {
    pub owner: Option<String>,
    pub conversation_id: Option<String>,
    pub tags: Vec<String>,
}

/// Facade over the job subsystem.
pub struct JobService {
    runner: JobRunner,
    tools: Arc<ToolRegistry>,
    formatter: StatusFormatter,
    default_sync_threshold: Duration,
    expire_after: Duration,
    retention: Duration,
}

impl JobService {
    pub fn new(tools: ToolRegistry, config: &JobsConfig, env: JobEnvironment) -> Self {
        let registry = Arc::new(JobRegistry::with_env(env.clock.clone(), env.ids));
        let runner = JobRunner::new(
            registry,
            env.spawner,
            EventBus::default(),
            config.max_concurrent_jobs,
        );
        Self {
            runner,
            tools: Arc::new(tools),
            formatter: StatusFormatter::new(env.clock, config.list_limit),
            default_sync_threshold: secs_to_duration(config.default_sync_threshold_secs),
            expire_after: Duration::from_secs(config.expire_after_secs),
            retention: Duration::from_secs(config.retention_secs),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        self.runner.registry()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.runner.event_bus()
    }

    pub fn formatter(&self) -> &StatusFormatter {
        &self.formatter
    }

    /// Run an arbitrary operation as a job. Returns as soon as the job exists.
    pub fn submit_job<F, Fut, T>(&self, tool_name: impl Into<String>, operation: F) -> JobId
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ToolError>> + Send + 'static,
        T: Into<JobOutput> + Send + 'static,
    {
        self.runner.submit(JobSpec::new(tool_name), operation).id
    }

    /// Like [`submit_job`](Self::submit_job) with full job metadata.
    pub fn submit_job_with<F, Fut, T>(&self, spec: JobSpec, operation: F) -> JobRecord
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ToolError>> + Send + 'static,
        T: Into<JobOutput> + Send + 'static,
    {
        self.runner.submit(spec, operation)
    }

    /// Validate `input` for the named tool and start it as a job.
    ///
    /// Unknown tools and bad input are rejected before any record exists.
    pub fn start_tool(
        &self,
        name: &str,
        input: Value,
        caller: CallerInfo,
    ) -> Result<JobRecord, ToolError> {
        let tool = self.tools.require(name)?.clone();
        tool.validate(&input)?;

        let settings = tool.settings();
        let spec = JobSpec::new(name)
            .with_input(input.clone())
            .with_owner(caller.owner)
            .with_conversation(caller.conversation_id)
            .with_tags(caller.tags)
            .cancelable(settings.cancelable);

        Ok(self.runner.submit(spec, move |ctx| async move {
            let result = tool.run(input, ctx).await?;
            let message = tool.summarize(&result);
            Ok::<_, ToolError>(JobOutput { result, message })
        }))
    }

    /// Start a tool and hold the caller until it settles or the sync
    /// threshold passes, whichever comes first.
    ///
    /// `threshold` overrides the tool's own setting. The returned record is
    /// terminal if the job finished in time and `pending`/`running` otherwise.
    pub async fn submit_and_wait(
        &self,
        name: &str,
        input: Value,
        caller: CallerInfo,
        threshold: Option<Duration>,
    ) -> Result<JobRecord, ToolError> {
        let wait = threshold.unwrap_or_else(|| self.sync_threshold_for(name));
        let started = self.start_tool(name, input, caller)?;
        Ok(self.wait_for(started.id, wait).await.unwrap_or(started))
    }

    /// How long an HTTP caller is held for the named tool by default.
    pub fn sync_threshold_for(&self, name: &str) -> Duration {
        self.tools
            .get(name)
            .and_then(|t| t.settings().sync_threshold_secs)
            .map(secs_to_duration)
            .unwrap_or(self.default_sync_threshold)
    }

    /// Wait up to `timeout` for a job to reach a terminal state, then return
    /// its current record either way.
    pub async fn wait_for(&self, id: JobId, timeout: Duration) -> Result<JobRecord, JobError> {
        let mut rx = self.registry().watch(id)?;
        if !timeout.is_zero() {
            let settled = tokio::time::timeout(timeout, rx.wait_for(|s| s.is_terminal()))
                .await
                .is_ok_and(|r| r.is_ok());
            tracing::debug!(job_id = %id, settled, "sync wait finished");
        }
        self.registry().get(id)
    }

    pub fn get_job(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.registry().get(id)
    }

    pub fn list_jobs(&self, filter: &JobFilter) -> Vec<JobRecord> {
        self.registry().list(filter)
    }

    pub fn cancel_job(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.runner.cancel(id)
    }

    pub fn format_status(&self, record: &JobRecord) -> String {
        self.formatter.format_one(record)
    }

    pub fn format_statuses(&self, records: &[JobRecord]) -> String {
        self.formatter.format_many(records)
    }

    /// Expire active jobs older than `max_age` (default: `jobs.expire_after_secs`).
    pub fn expire_stale(&self, max_age: Option<Duration>) -> Vec<JobRecord> {
        self.runner.expire_stale(max_age.unwrap_or(self.expire_after))
    }

    /// Remove finished jobs older than `older_than` (default: `jobs.retention_secs`).
    pub fn purge_terminal(&self, older_than: Option<Duration>) -> usize {
        let removed = self
            .registry()
            .purge_terminal(older_than.unwrap_or(self.retention));
        if removed > 0 {
            tracing::info!(removed, "purged finished jobs");
        }
        removed
    }

    pub fn delete_job(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.runner.remove(id)
    }

    pub fn clear_jobs(&self) -> usize {
        self.runner.clear()
    }
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("tools", &self.tools.names())
            .field("runner", &self.runner)
            .finish()
    }
}

/// Seconds as configured (fractional, possibly negative) to a wait duration.
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
