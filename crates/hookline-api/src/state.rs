//! Application state wiring the job service, tools and config together.
//!
//! AppState holds the single `JobService` used by both CLI commands and REST
//! API handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use hookline_core::service::{JobEnvironment, JobService};
use hookline_infra::config::load_config_with_env;
use hookline_infra::filesystem::resolve_data_dir;
use hookline_infra::notify::{LogSink, Notifier, OsascriptSink};
use hookline_infra::tools::default_tools;
use hookline_types::config::GlobalConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load config and register the built-in tools.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config_with_env(&data_dir).await;
        Self::from_config(config, data_dir)
    }

    pub fn from_config(config: GlobalConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        config.validate()?;
        let tools = default_tools(&config.tools)?;
        let jobs = JobService::new(tools, &config.jobs, JobEnvironment::default());
        tracing::debug!(tools = ?jobs.tools().names(), "job service ready");

        Ok(Self {
            jobs: Arc::new(jobs),
            config: Arc::new(config),
            data_dir,
        })
    }

    /// Start delivering completion notifications, unless disabled in config.
    pub fn spawn_notifier(&self) -> Option<JoinHandle<()>> {
        if !self.config.tools.notifications {
            tracing::debug!("completion notifications disabled");
            return None;
        }

        let events = self.jobs.event_bus().subscribe();
        let registry = self.jobs.registry().clone();
        let handle = if cfg!(target_os = "macos") {
            let notifier = Notifier::from_tools(self.jobs.tools(), OsascriptSink);
            tokio::spawn(notifier.run(events, registry))
        } else {
            let notifier = Notifier::from_tools(self.jobs.tools(), LogSink);
            tokio::spawn(notifier.run(events, registry))
        };
        Some(handle)
    }

    /// Periodically expire stale jobs and purge finished ones past retention.
    ///
    /// Only runs when `jobs.sweep_interval_secs` is set. Otherwise jobs are
    /// expired or purged solely through explicit calls.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let Some(secs) = self.config.jobs.sweep_interval_secs else {
            tracing::debug!("job sweeper disabled");
            return None;
        };
        let period = Duration::from_secs(secs);
        let jobs = self.jobs.clone();
        tracing::debug!(interval_secs = secs, "job sweeper enabled");
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let expired = jobs.expire_stale(None);
                if !expired.is_empty() {
                    tracing::info!(count = expired.len(), "expired stale jobs");
                }
                jobs.purge_terminal(None);
            }
        }))
    }
}
