//! Business logic for Hookline.
//!
//! This crate owns the background job subsystem (registry, runner, status
//! formatting), the tool abstraction and the event bus. It depends only on
//! `hookline-types` -- never on `hookline-infra` or any IO crate.

pub mod event;
pub mod job;
pub mod service;
pub mod tool;
