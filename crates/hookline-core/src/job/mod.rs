//! Background job management.
//!
//! [`JobRegistry`] owns the records and their state machine, [`JobRunner`]
//! executes operations on background tasks and reports back through the
//! registry, and [`StatusFormatter`] renders records for the agent.

pub mod clock;
pub mod context;
pub mod format;
pub mod id;
pub mod registry;
pub mod runner;
pub mod spawner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::JobContext;
pub use format::StatusFormatter;
pub use id::{IdGenerator, SequentialIdGenerator, UuidV7Generator};
pub use registry::JobRegistry;
pub use runner::{JobOutput, JobRunner};
pub use spawner::{TaskSpawner, TokioSpawner};
