//! API key authentication extractor.
//!
//! Reads the key from the configured header (`X-API-Key` by default) or from
//! `Authorization: Bearer <key>`, and compares it with `auth.api_key`.
//! Both sides are SHA-256 hashed before comparison so the check takes the
//! same time however many leading bytes match.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = &state.config.auth;
        let Some(expected) = auth.api_key.as_deref() else {
            return Err(AppError::Unauthorized(
                "No API key is configured on the server. Set HOOKLINE_API_KEY or auth.api_key."
                    .to_string(),
            ));
        };

        let provided = extract_api_key(parts, &auth.header)?;
        if hash_api_key(&provided) == hash_api_key(expected) {
            Ok(Authenticated)
        } else {
            Err(AppError::Forbidden("Invalid API key.".to_string()))
        }
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts, header: &str) -> Result<String, AppError> {
    if let Some(key) = parts.headers.get(header) {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized(format!("Invalid {header} header encoding"))
        })?;
        return Ok(key_str.trim().to_string());
    }

    if let Some(auth) = parts.headers.get(axum::http::header::AUTHORIZATION) {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    Err(AppError::Unauthorized(format!(
        "Missing API key. Provide it via the '{header}' header."
    )))
}

/// SHA-256 of an API key.
pub fn hash_api_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Generate a key for this server session when none is configured.
///
/// The key lives only in memory; configure `auth.api_key` to keep one
/// across restarts.
pub fn generate_session_key() -> String {
    format!("hl_{}", uuid::Uuid::now_v7().simple())
}
