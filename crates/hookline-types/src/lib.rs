//! Shared domain types for Hookline.
//!
//! This crate contains the types used across the bridge: job records and
//! their state machine, tool schemas, lifecycle events, configuration, and
//! the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod job;
pub mod tool;
