//! Tool discovery and invocation handlers.

use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

use hookline_core::service::CallerInfo;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::SyncQuery;
use crate::http::handlers::jobs::JobPayload;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of a tool call: the tool's own arguments plus optional correlation
/// fields, all at the top level.
///
/// The correlation field names are listed in
/// [`hookline_core::tool::RESERVED_PARAMETER_NAMES`] so tool registration can
/// refuse parameters they would shadow.
#[derive(Debug, Default, Deserialize)]
pub struct StartToolRequest {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub input: Map<String, Value>,
}

/// GET /api/v1/tools - Tool schemas in agent-platform form.
pub async fn list_tools(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let start = Instant::now();
    let tools = state.jobs.tools();

    let schemas = tools
        .names()
        .into_iter()
        .filter_map(|name| tools.get(name))
        .map(|tool| {
            let mut schema = tool.schema().to_json_schema();
            schema["settings"] = serde_json::to_value(tool.settings()).unwrap_or(Value::Null);
            schema
        })
        .collect();

    Ok(Json(
        ApiResponse::timed(schemas, start).with_link("self", "/api/v1/tools"),
    ))
}

/// POST /api/v1/tools/{name} - Start a tool as a job.
///
/// Holds the request for the tool's sync threshold (or `?sync_threshold=`).
/// Answers 200 with the finished record if the job settled in time, or 202
/// with the still-active record otherwise.
pub async fn start_tool(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
    Query(query): Query<SyncQuery>,
    body: Option<Json<StartToolRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<JobPayload>>), AppError> {
    let start = Instant::now();
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let threshold = query
        .sync_threshold
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                AppError::Validation(format!(
                    "sync_threshold must be a non-negative number of seconds, got {secs}"
                ))
            })
        })
        .transpose()?;

    let caller = CallerInfo {
        owner: request.owner,
        conversation_id: request.conversation_id,
        tags: request.tags,
    };
    let record = state
        .jobs
        .submit_and_wait(&name, Value::Object(request.input), caller, threshold)
        .await?;
    tracing::info!(job_id = %record.id, tool = %name, status = %record.status, "tool call answered");

    let status = if record.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    let link = format!("/api/v1/jobs/{}", record.id);
    let resp = ApiResponse::timed(JobPayload::new(&state.jobs, record), start)
        .with_link("job", &link);
    Ok((status, Json(resp)))
}
