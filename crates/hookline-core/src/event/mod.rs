//! Event bus for job lifecycle notifications.
//!
//! The runner publishes on an `EventBus`. Listeners read a `JobEventStream`.

pub mod bus;

pub use bus::{EventBus, JobEventStream};
