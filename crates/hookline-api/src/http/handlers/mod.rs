//! HTTP request handlers for the REST API.

pub mod jobs;
pub mod tools;
