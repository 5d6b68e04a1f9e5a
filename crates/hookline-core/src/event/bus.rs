//! Job lifecycle fan-out.
//!
//! The runner publishes a [`JobEvent`] at every state change. Listeners such
//! as the completion notifier hold a [`JobEventStream`], which hides the
//! broadcast channel's lag and close signals behind a plain `Option`.

use hookline_types::event::JobEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Events buffered per listener before the slowest one starts losing them.
///
/// A job produces at most four events, so this covers bursts of roughly
/// sixty jobs finishing while a listener is busy delivering one notification.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publishes job lifecycle events to every live [`JobEventStream`].
///
/// Clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Start listening. Only events published after this call are seen.
    pub fn subscribe(&self) -> JobEventStream {
        JobEventStream {
            receiver: self.sender.subscribe(),
            dropped: 0,
        }
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send `event` to every listener and return how many received it.
    ///
    /// Nobody listening is normal (no notifier in `run --no-wait`, tests).
    pub fn publish(&self, event: JobEvent) -> usize {
        match self.sender.send(event) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(job_id = %event.job_id(), "job event had no listeners");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// One listener's view of the bus.
///
/// A listener that falls more than the bus capacity behind skips the oldest
/// events. The skip is logged and counted rather than surfaced as an error.
pub struct JobEventStream {
    receiver: broadcast::Receiver<JobEvent>,
    dropped: u64,
}

impl JobEventStream {
    /// Wait for the next event. `None` once every `EventBus` clone is gone.
    pub async fn next(&mut self) -> Option<JobEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already buffered event without waiting.
    pub fn try_next(&mut self) -> Option<JobEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Total events this listener lost by falling behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        tracing::warn!(skipped, total = self.dropped, "job event listener fell behind");
    }
}

impl std::fmt::Debug for JobEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEventStream")
            .field("buffered", &self.receiver.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_types::job::{JobId, JobStatus};

    fn created(tool: &str) -> JobEvent {
        JobEvent::JobCreated {
            job_id: JobId::new(),
            tool_name: tool.to_string(),
        }
    }

    #[tokio::test]
    async fn every_listener_sees_each_event() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = created("set_timer");
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.next().await, Some(event.clone()));
        assert_eq!(second.next().await, Some(event));
    }

    #[test]
    fn publishing_without_listeners_reports_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.publish(created("confetti")), 0);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(16);
        let _keepalive = bus.subscribe();
        bus.publish(created("confetti"));

        let mut late = bus.subscribe();
        assert!(late.try_next().is_none());
    }

    #[test]
    fn slow_listener_skips_ahead_and_counts_losses() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe();

        let ids: Vec<JobId> = (0..10).map(|_| JobId::new()).collect();
        for id in &ids {
            bus.publish(JobEvent::JobStarted {
                job_id: *id,
                tool_name: "fibonacci_calculate".to_string(),
            });
        }

        let first_seen = slow.try_next().unwrap();
        assert_eq!(first_seen.job_id(), ids[6]);
        assert_eq!(slow.dropped(), 6);

        let rest: Vec<JobId> = std::iter::from_fn(|| slow.try_next())
            .map(|e| e.job_id())
            .collect();
        assert_eq!(rest, ids[7..].to_vec());
    }

    #[tokio::test]
    async fn stream_ends_when_bus_is_dropped() {
        let bus = EventBus::new(4);
        let mut stream = bus.subscribe();
        let clone = bus.clone();
        clone.publish(JobEvent::JobFinished {
            job_id: JobId::new(),
            tool_name: "goose".to_string(),
            status: JobStatus::Failed,
            message: String::new(),
            duration_ms: None,
        });
        drop(bus);
        drop(clone);

        assert!(matches!(stream.next().await, Some(JobEvent::JobFinished { .. })));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut stream = bus.subscribe();
        bus.publish(created("set_timer"));
        assert!(stream.try_next().is_some());
    }
}
