//! HTTP/REST API layer for Hookline.
//!
//! Axum-based REST API at `/api/v1/` with API key authentication and an
//! envelope response format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
