//! Background execution seam.

use futures_util::future::BoxFuture;

/// Hands a job's future to some background executor.
///
/// The runner never awaits the spawned future; completion is reported
/// through the registry.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns each job onto the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
