//! Business logic services (use cases).
//!
//! Services orchestrate the job subsystem and the tool registry. They depend
//! on traits (ports) -- never on concrete infrastructure implementations.

pub mod jobs;

pub use jobs::{CallerInfo, JobEnvironment, JobService};
