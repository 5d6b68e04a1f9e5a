//! Infrastructure layer for Hookline.
//!
//! The built-in tools, config file and environment loading, data directory
//! resolution, and desktop notifications for finished jobs.

pub mod config;
pub mod filesystem;
pub mod notify;
pub mod tools;
