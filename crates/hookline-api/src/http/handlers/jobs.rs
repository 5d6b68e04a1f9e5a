//! Job inspection and management handlers.

use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use hookline_core::service::JobService;
use hookline_types::job::{JobId, JobRecord};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::JobListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// A job record plus its natural-language status.
#[derive(Debug, Serialize)]
pub struct JobPayload {
    #[serde(flatten)]
    pub record: JobRecord,
    pub summary: String,
}

impl JobPayload {
    pub fn new(jobs: &JobService, record: JobRecord) -> Self {
        let summary = jobs.format_status(&record);
        Self { record, summary }
    }
}

/// Job list with a combined status summary.
#[derive(Debug, Serialize)]
pub struct JobList {
    pub summary: String,
    pub jobs: Vec<JobPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpireRequest {
    /// Override `jobs.expire_after_secs`.
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    /// Override `jobs.retention_secs`.
    pub older_than_secs: Option<u64>,
}

pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid job id")))
}

fn job_link(id: JobId) -> String {
    format!("/api/v1/jobs/{id}")
}

/// GET /api/v1/jobs - List jobs, optionally filtered.
pub async fn list_jobs(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<JobListQuery>,
) -> Result<Json<ApiResponse<JobList>>, AppError> {
    let start = Instant::now();
    let filter = query.into_filter()?;

    let records = state.jobs.list_jobs(&filter);
    let summary = state.jobs.format_statuses(&records);
    let jobs = records
        .into_iter()
        .map(|r| JobPayload::new(&state.jobs, r))
        .collect();

    let resp = ApiResponse::timed(JobList { summary, jobs }, start)
        .with_link("self", "/api/v1/jobs");
    Ok(Json(resp))
}

/// GET /api/v1/jobs/{id} - Get one job.
pub async fn get_job(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JobPayload>>, AppError> {
    let start = Instant::now();
    let id = parse_job_id(&id)?;

    let record = state.jobs.get_job(id)?;
    let resp = ApiResponse::timed(JobPayload::new(&state.jobs, record), start)
        .with_link("self", &job_link(id))
        .with_link("cancel", &format!("{}/cancel", job_link(id)));
    Ok(Json(resp))
}

/// POST /api/v1/jobs/{id}/cancel - Request cooperative cancellation.
pub async fn cancel_job(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JobPayload>>, AppError> {
    let start = Instant::now();
    let id = parse_job_id(&id)?;

    let record = state.jobs.cancel_job(id)?;
    tracing::info!(job_id = %id, tool = %record.tool_name, "cancellation requested over HTTP");

    let resp = ApiResponse::timed(JobPayload::new(&state.jobs, record), start)
        .with_link("self", &job_link(id));
    Ok(Json(resp))
}

/// DELETE /api/v1/jobs/{id} - Forget a job, stopping it if still active.
pub async fn delete_job(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JobPayload>>, AppError> {
    let start = Instant::now();
    let id = parse_job_id(&id)?;

    let record = state.jobs.delete_job(id)?;
    Ok(Json(ApiResponse::timed(
        JobPayload::new(&state.jobs, record),
        start,
    )))
}

/// DELETE /api/v1/jobs - Forget every job.
pub async fn clear_jobs(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let deleted = state.jobs.clear_jobs();
    Ok(Json(ApiResponse::timed(
        serde_json::json!({ "deleted": deleted }),
        start,
    )))
}

/// POST /api/v1/jobs/expire - Expire pending/running jobs older than a cutoff.
pub async fn expire_jobs(
    State(state): State<AppState>,
    _auth: Authenticated,
    body: Option<Json<ExpireRequest>>,
) -> Result<Json<ApiResponse<Vec<JobPayload>>>, AppError> {
    let start = Instant::now();
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let expired = state
        .jobs
        .expire_stale(request.max_age_secs.map(Duration::from_secs))
        .into_iter()
        .map(|r| JobPayload::new(&state.jobs, r))
        .collect();
    Ok(Json(
        ApiResponse::timed(expired, start).with_link("jobs", "/api/v1/jobs"),
    ))
}

/// POST /api/v1/jobs/purge - Remove finished jobs older than a cutoff.
pub async fn purge_jobs(
    State(state): State<AppState>,
    _auth: Authenticated,
    body: Option<Json<PurgeRequest>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let purged = state
        .jobs
        .purge_terminal(request.older_than_secs.map(Duration::from_secs));
    Ok(Json(ApiResponse::timed(
        serde_json::json!({ "purged": purged }),
        start,
    )))
}
