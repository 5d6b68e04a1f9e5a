//! In-memory job store and the only place job records are mutated.
//!
//! Every mutation happens under a single lock held for a short, non-async
//! critical section. Readers get cloned snapshots. Each record also owns a
//! `watch` channel carrying its current status, so callers can wait for a
//! job to settle without polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use hookline_types::error::JobError;
use hookline_types::job::{JobFilter, JobId, JobRecord, JobSpec, JobStatus};

use super::clock::{Clock, SystemClock};
use super::id::{IdGenerator, UuidV7Generator};

struct Entry {
    record: JobRecord,
    status_tx: watch::Sender<JobStatus>,
}

#[derive(Default)]
struct RegistryState {
    /// Insertion order, oldest first.
    order: Vec<JobId>,
    entries: HashMap<JobId, Entry>,
}

/// Process-wide store of [`JobRecord`]s.
pub struct JobRegistry {
    state: Mutex<RegistryState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl JobRegistry {
    /// A registry using wall-clock time and UUID v7 ids.
    pub fn new() -> Self {
        Self::with_env(Arc::new(SystemClock), Arc::new(UuidV7Generator))
    }

    pub fn with_env(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            clock,
            ids,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a `pending` record for `tool_name` with no input.
    pub fn create(&self, tool_name: impl Into<String>) -> JobRecord {
        self.create_with(JobSpec::new(tool_name))
    }

    /// Allocate a `pending` record from a full spec.
    pub fn create_with(&self, spec: JobSpec) -> JobRecord {
        let now = self.clock.now();
        let mut state = self.lock();

        let mut id = self.ids.next_id();
        while state.entries.contains_key(&id) {
            tracing::warn!(job_id = %id, "id generator repeated an id, drawing another");
            id = self.ids.next_id();
        }

        let record = JobRecord {
            id,
            status: JobStatus::Pending,
            status_message: default_message(JobStatus::Pending, &spec.tool_name, None),
            tool_name: spec.tool_name,
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            cancellation_requested: false,
            cancelable: spec.cancelable,
            input: spec.input,
            owner: spec.owner,
            conversation_id: spec.conversation_id,
            tags: spec.tags,
        };

        let (status_tx, _) = watch::channel(JobStatus::Pending);
        state.order.push(id);
        state.entries.insert(
            id,
            Entry {
                record: record.clone(),
                status_tx,
            },
        );
        record
    }

    pub fn get(&self, id: JobId) -> Result<JobRecord, JobError> {
        self.lock()
            .entries
            .get(&id)
            .map(|e| e.record.clone())
            .ok_or(JobError::NotFound(id))
    }

    /// Snapshot of all records matching `filter`, oldest first.
    pub fn list(&self, filter: &JobFilter) -> Vec<JobRecord> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .map(|e| &e.record)
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a record along one edge of the state machine.
    ///
    /// `result` is kept only when moving to `success` and `error` only when
    /// moving to `failed`. A missing `message` falls back to the default text
    /// for the new status. Rejected transitions leave the record untouched.
    pub fn transition(
        &self,
        id: JobId,
        to: JobStatus,
        message: Option<String>,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<JobRecord, JobError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let entry = state.entries.get_mut(&id).ok_or(JobError::NotFound(id))?;
        apply_transition(entry, to, now, message, result, error)?;
        Ok(entry.record.clone())
    }

    /// Flag a `pending` or `running` job for cooperative cancellation.
    ///
    /// Does not change the status; the runner moves the job to `cancelled`
    /// once the operation notices. Repeating the request on a job that is
    /// still active is a no-op.
    pub fn request_cancel(&self, id: JobId) -> Result<JobRecord, JobError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let entry = state.entries.get_mut(&id).ok_or(JobError::NotFound(id))?;
        let record = &mut entry.record;

        if record.status.is_terminal() {
            return Err(JobError::InvalidState {
                id,
                status: record.status,
                reason: "it has already finished and can no longer be cancelled".to_string(),
            });
        }
        if !record.cancelable {
            return Err(JobError::InvalidState {
                id,
                status: record.status,
                reason: format!("{} jobs cannot be cancelled", record.tool_name),
            });
        }

        if !record.cancellation_requested {
            record.cancellation_requested = true;
            record.status_message = format!(
                "Cancellation requested, waiting for the {} job to stop",
                record.tool_name
            );
            record.updated_at = now;
        }
        Ok(record.clone())
    }

    /// Subscribe to status changes of one job.
    ///
    /// The receiver starts at the current status. It reports closed once the
    /// record is removed.
    pub fn watch(&self, id: JobId) -> Result<watch::Receiver<JobStatus>, JobError> {
        self.lock()
            .entries
            .get(&id)
            .map(|e| e.status_tx.subscribe())
            .ok_or(JobError::NotFound(id))
    }

    /// Expire every `pending` or `running` job created more than `max_age` ago.
    ///
    /// Returns the records that were expired. Expired records are kept.
    pub fn expire_stale(&self, max_age: Duration) -> Vec<JobRecord> {
        let now = self.clock.now();
        let Some(cutoff) = cutoff(now, max_age) else {
            return Vec::new();
        };

        let mut state = self.lock();
        let RegistryState { order, entries } = &mut *state;
        let mut expired = Vec::new();
        for id in order.iter() {
            let Some(entry) = entries.get_mut(id) else {
                continue;
            };
            if entry.record.status.is_active()
                && entry.record.created_at <= cutoff
                && apply_transition(entry, JobStatus::Expired, now, None, None, None).is_ok()
            {
                expired.push(entry.record.clone());
            }
        }
        expired
    }

    /// Delete terminal records that completed more than `older_than` ago.
    ///
    /// Returns how many records were removed.
    pub fn purge_terminal(&self, older_than: Duration) -> usize {
        let now = self.clock.now();
        let Some(cutoff) = cutoff(now, older_than) else {
            return 0;
        };

        let mut state = self.lock();
        let stale: Vec<JobId> = state
            .entries
            .values()
            .filter(|e| {
                e.record.status.is_terminal()
                    && e.record.completed_at.is_some_and(|done| done <= cutoff)
            })
            .map(|e| e.record.id)
            .collect();

        for id in &stale {
            state.entries.remove(id);
        }
        state.order.retain(|id| !stale.contains(id));
        stale.len()
    }

    /// Delete one record regardless of its status.
    pub fn remove(&self, id: JobId) -> Result<JobRecord, JobError> {
        let mut state = self.lock();
        let entry = state.entries.remove(&id).ok_or(JobError::NotFound(id))?;
        state.order.retain(|other| *other != id);
        Ok(entry.record)
    }

    /// Delete every record. Returns the removed ids, oldest first.
    pub fn clear(&self) -> Vec<JobId> {
        let mut state = self.lock();
        state.entries.clear();
        std::mem::take(&mut state.order)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.len())
            .finish()
    }
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    let age = chrono::Duration::from_std(age).ok()?;
    now.checked_sub_signed(age)
}

fn apply_transition(
    entry: &mut Entry,
    to: JobStatus,
    now: DateTime<Utc>,
    message: Option<String>,
    result: Option<Value>,
    error: Option<String>,
) -> Result<(), JobError> {
    let record = &mut entry.record;
    let from = record.status;
    if !from.can_transition_to(to) {
        return Err(JobError::InvalidTransition {
            id: record.id,
            from,
            to,
        });
    }

    record.status = to;
    record.updated_at = now;
    if to == JobStatus::Running {
        record.started_at = Some(now);
    }
    if to.is_terminal() {
        record.completed_at = Some(now);
    }

    record.result = match to {
        JobStatus::Success => Some(result.unwrap_or(Value::Null)),
        _ => None,
    };
    record.error = match to {
        JobStatus::Failed => Some(
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "the job failed without an error message".to_string()),
        ),
        _ => None,
    };
    record.status_message =
        message.unwrap_or_else(|| default_message(to, &record.tool_name, record.error.as_deref()));

    entry.status_tx.send_replace(to);
    Ok(())
}

/// The status message a record gets when nothing more specific is supplied.
pub fn default_message(status: JobStatus, tool_name: &str, error: Option<&str>) -> String {
    match status {
        JobStatus::Pending => format!("Waiting to start {tool_name} job"),
        JobStatus::Running => format!("Currently running {tool_name} job"),
        JobStatus::Success => format!("The {tool_name} job completed successfully"),
        JobStatus::Failed => format!("Job failed: {}", error.unwrap_or("unknown error")),
        JobStatus::Cancelled => "Job was cancelled".to_string(),
        JobStatus::Expired => "Job has expired".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::clock::ManualClock;
    use crate::job::id::SequentialIdGenerator;

    fn registry() -> (JobRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let registry = JobRegistry::with_env(clock.clone(), Arc::new(SequentialIdGenerator::new()));
        (registry, clock)
    }

    #[test]
    fn create_starts_pending() {
        let (registry, clock) = registry();
        let record = registry.create("set_timer");
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.status_message, "Waiting to start set_timer job");
        assert_eq!(record.created_at, clock.now());
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
        assert!(record.result.is_none());
        assert!(record.error.is_none());
        assert!(!record.cancellation_requested);
    }

    #[test]
    fn create_with_carries_metadata() {
        let (registry, _) = registry();
        let record = registry.create_with(
            JobSpec::new("goose")
                .with_input(serde_json::json!({"text": "hi"}))
                .with_owner(Some("alice".to_string()))
                .with_conversation(Some("conv-9".to_string()))
                .with_tags(vec!["demo".to_string()])
                .cancelable(false),
        );
        let stored = registry.get(record.id).unwrap();
        assert_eq!(stored.input["text"], "hi");
        assert_eq!(stored.owner.as_deref(), Some("alice"));
        assert_eq!(stored.conversation_id.as_deref(), Some("conv-9"));
        assert_eq!(stored.tags, vec!["demo".to_string()]);
        assert!(!stored.cancelable);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let (registry, _) = registry();
        let id = JobId::new();
        assert_eq!(registry.get(id), Err(JobError::NotFound(id)));
    }

    #[test]
    fn list_preserves_creation_order() {
        let (registry, _) = registry();
        let ids: Vec<JobId> = (0..5).map(|_| registry.create("fibonacci_calculate").id).collect();
        let listed: Vec<JobId> = registry.list(&JobFilter::default()).iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn list_filters_by_status_and_tool() {
        let (registry, _) = registry();
        let a = registry.create("set_timer");
        registry.create("goose");
        registry
            .transition(a.id, JobStatus::Running, None, None, None)
            .unwrap();

        let running = registry.list(&JobFilter::default().with_status(JobStatus::Running));
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, a.id);

        let goose = registry.list(&JobFilter::default().with_tool("goose"));
        assert_eq!(goose.len(), 1);
        assert_eq!(goose[0].tool_name, "goose");
    }

    #[test]
    fn success_path_sets_fields() {
        let (registry, clock) = registry();
        let record = registry.create("fibonacci_calculate");

        clock.advance(chrono::Duration::seconds(1));
        let running = registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();
        assert_eq!(running.started_at, Some(clock.now()));
        assert_eq!(running.status_message, "Currently running fibonacci_calculate job");

        clock.advance(chrono::Duration::seconds(2));
        let done = registry
            .transition(
                record.id,
                JobStatus::Success,
                Some("The result is 55".to_string()),
                Some(serde_json::json!({"n": 10, "result": 55})),
                Some("ignored".to_string()),
            )
            .unwrap();
        assert_eq!(done.status, JobStatus::Success);
        assert_eq!(done.result.as_ref().unwrap()["result"], 55);
        assert!(done.error.is_none());
        assert_eq!(done.completed_at, Some(clock.now()));
        assert_eq!(done.duration().unwrap().num_seconds(), 2);
        assert_eq!(done.status_message, "The result is 55");
    }

    #[test]
    fn failure_path_keeps_error_only() {
        let (registry, _) = registry();
        let record = registry.create("goose");
        registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();
        let failed = registry
            .transition(
                record.id,
                JobStatus::Failed,
                None,
                Some(serde_json::json!("partial")),
                Some("goose exited with status 2".to_string()),
            )
            .unwrap();
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("goose exited with status 2"));
        assert_eq!(failed.status_message, "Job failed: goose exited with status 2");
    }

    #[test]
    fn failure_without_error_text_gets_placeholder() {
        let (registry, _) = registry();
        let record = registry.create("goose");
        registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();
        let failed = registry
            .transition(record.id, JobStatus::Failed, None, None, Some("  ".to_string()))
            .unwrap();
        assert!(!failed.error.unwrap().trim().is_empty());
    }

    #[test]
    fn invalid_transition_leaves_record_unchanged() {
        let (registry, clock) = registry();
        let record = registry.create("set_timer");
        clock.advance(chrono::Duration::seconds(5));

        let err = registry
            .transition(record.id, JobStatus::Success, None, Some(Value::Bool(true)), None)
            .unwrap_err();
        assert_eq!(
            err,
            JobError::InvalidTransition {
                id: record.id,
                from: JobStatus::Pending,
                to: JobStatus::Success,
            }
        );
        assert_eq!(registry.get(record.id).unwrap(), record);
    }

    #[test]
    fn terminal_records_reject_further_transitions() {
        let (registry, _) = registry();
        let record = registry.create("set_timer");
        registry
            .transition(record.id, JobStatus::Cancelled, None, None, None)
            .unwrap();
        for to in JobStatus::ALL {
            assert!(registry.transition(record.id, to, None, None, None).is_err());
        }
        assert_eq!(registry.get(record.id).unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn pending_cancel_sets_completed_without_start() {
        let (registry, _) = registry();
        let record = registry.create("set_timer");
        let cancelled = registry
            .transition(record.id, JobStatus::Cancelled, None, None, None)
            .unwrap();
        assert!(cancelled.started_at.is_none());
        assert!(cancelled.completed_at.is_some());
        assert_eq!(cancelled.status_message, "Job was cancelled");
    }

    #[test]
    fn request_cancel_sets_flag_without_transition() {
        let (registry, _) = registry();
        let record = registry.create("set_timer");
        let flagged = registry.request_cancel(record.id).unwrap();
        assert!(flagged.cancellation_requested);
        assert_eq!(flagged.status, JobStatus::Pending);

        // Repeating while active is harmless.
        let again = registry.request_cancel(record.id).unwrap();
        assert!(again.cancellation_requested);
    }

    #[test]
    fn request_cancel_on_terminal_job_is_invalid_state() {
        let (registry, _) = registry();
        let record = registry.create("set_timer");
        registry.request_cancel(record.id).unwrap();
        registry
            .transition(record.id, JobStatus::Cancelled, None, None, None)
            .unwrap();

        let err = registry.request_cancel(record.id).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidState {
                status: JobStatus::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn request_cancel_on_non_cancelable_job_is_invalid_state() {
        let (registry, _) = registry();
        let record = registry.create_with(JobSpec::new("confetti").cancelable(false));
        let err = registry.request_cancel(record.id).unwrap_err();
        assert!(err.to_string().contains("cannot be cancelled"));
        assert!(!registry.get(record.id).unwrap().cancellation_requested);
    }

    #[test]
    fn expire_stale_only_touches_old_active_jobs() {
        let (registry, clock) = registry();
        let old_pending = registry.create("set_timer");
        let old_running = registry.create("goose");
        registry
            .transition(old_running.id, JobStatus::Running, None, None, None)
            .unwrap();
        let old_done = registry.create("confetti");
        registry
            .transition(old_done.id, JobStatus::Running, None, None, None)
            .unwrap();
        registry
            .transition(old_done.id, JobStatus::Success, None, None, None)
            .unwrap();

        clock.advance(chrono::Duration::hours(2));
        let fresh = registry.create("set_timer");

        let expired = registry.expire_stale(Duration::from_secs(3600));
        let expired_ids: Vec<JobId> = expired.iter().map(|r| r.id).collect();
        assert_eq!(expired_ids, vec![old_pending.id, old_running.id]);

        assert_eq!(registry.get(old_pending.id).unwrap().status, JobStatus::Expired);
        assert_eq!(
            registry.get(old_running.id).unwrap().status_message,
            "Job has expired"
        );
        assert_eq!(registry.get(old_done.id).unwrap().status, JobStatus::Success);
        assert_eq!(registry.get(fresh.id).unwrap().status, JobStatus::Pending);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn late_completion_after_expiry_is_rejected() {
        let (registry, clock) = registry();
        let record = registry.create("goose");
        registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();
        clock.advance(chrono::Duration::hours(2));
        registry.expire_stale(Duration::from_secs(60));

        let err = registry
            .transition(record.id, JobStatus::Success, None, None, None)
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { from: JobStatus::Expired, .. }));
        assert_eq!(registry.get(record.id).unwrap().status, JobStatus::Expired);
    }

    #[test]
    fn purge_terminal_removes_old_finished_jobs() {
        let (registry, clock) = registry();
        let done = registry.create("set_timer");
        registry
            .transition(done.id, JobStatus::Cancelled, None, None, None)
            .unwrap();
        let active = registry.create("set_timer");

        clock.advance(chrono::Duration::days(2));
        let recent = registry.create("set_timer");
        registry
            .transition(recent.id, JobStatus::Cancelled, None, None, None)
            .unwrap();

        assert_eq!(registry.purge_terminal(Duration::from_secs(86_400)), 1);
        assert!(registry.get(done.id).is_err());
        let remaining: Vec<JobId> = registry.list(&JobFilter::default()).iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec![active.id, recent.id]);
    }

    #[test]
    fn remove_and_clear() {
        let (registry, _) = registry();
        let a = registry.create("set_timer");
        let b = registry.create("set_timer");
        assert_eq!(registry.remove(a.id).unwrap().id, a.id);
        assert_eq!(registry.remove(a.id), Err(JobError::NotFound(a.id)));
        assert_eq!(registry.clear(), vec![b.id]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn watch_reports_status_changes() {
        let (registry, _) = registry();
        let record = registry.create("set_timer");
        let mut rx = registry.watch(record.id).unwrap();
        assert_eq!(*rx.borrow(), JobStatus::Pending);

        registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), JobStatus::Running);

        registry.remove(record.id).unwrap();
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn concurrent_transitions_have_single_winner() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);
        let record = registry.create("set_timer");
        registry
            .transition(record.id, JobStatus::Running, None, None, None)
            .unwrap();

        let handles: Vec<_> = [JobStatus::Success, JobStatus::Failed, JobStatus::Cancelled]
            .into_iter()
            .cycle()
            .take(12)
            .map(|to| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .transition(record.id, to, None, None, Some("boom".to_string()))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);

        let stored = registry.get(record.id).unwrap();
        assert_eq!(stored.result.is_some(), stored.status == JobStatus::Success);
        assert_eq!(stored.error.is_some(), stored.status == JobStatus::Failed);
    }
}
