//! Observability for Hookline: subscriber setup and shared span field names.

pub mod job_attrs;
pub mod tracing_setup;

pub use tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
