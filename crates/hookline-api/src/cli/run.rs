//! `hookline run`: start a tool through the job system and report on it.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;

use hookline_core::service::CallerInfo;
use hookline_observe::job_span;
use hookline_types::job::{JobRecord, JobStatus};
use tracing::Instrument;

use crate::state::AppState;

/// Waiting "until done" still needs an upper bound for `wait_for`.
const WAIT_FOREVER: Duration = Duration::from_secs(60 * 60 * 24 * 365);

pub async fn run_tool(
    state: &AppState,
    tool: &str,
    input: &str,
    wait: Option<f64>,
    json: bool,
) -> Result<()> {
    let input: Value = serde_json::from_str(input).context("--input must be valid JSON")?;
    if !input.is_object() {
        bail!("--input must be a JSON object, e.g. '{{\"n\": 10}}'");
    }
    let wait = match wait {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("--wait must be a non-negative number, got {secs}"))?,
        None => WAIT_FOREVER,
    };

    let caller = CallerInfo {
        owner: Some("cli".to_string()),
        ..Default::default()
    };
    let started = state.jobs.start_tool(tool, input, caller)?;
    let span = job_span!(started.id, tool);

    let record = async {
        tracing::info!("job started from the command line");
        tokio::select! {
            record = state.jobs.wait_for(started.id, wait) => record,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, cancelling job");
                match state.jobs.cancel_job(started.id) {
                    Ok(_) => state.jobs.wait_for(started.id, Duration::from_secs(5)).await,
                    Err(e) => Err(e),
                }
            }
        }
    }
    .instrument(span)
    .await?;

    print_record(state, &record, json)?;
    if record.status == JobStatus::Failed {
        bail!("the {tool} job failed");
    }
    Ok(())
}

fn print_record(state: &AppState, record: &JobRecord, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(record)?;
        value["summary"] = Value::String(state.jobs.format_status(record));
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let marker = match record.status {
        JobStatus::Success => style("✓").green().bold(),
        JobStatus::Failed => style("✗").red().bold(),
        JobStatus::Cancelled | JobStatus::Expired => style("○").yellow(),
        JobStatus::Pending | JobStatus::Running => style("●").cyan(),
    };

    println!();
    println!("  {marker} {}", state.jobs.format_status(record));
    if let Some(result) = &record.result
        && !result.is_null()
    {
        println!();
        println!("  {}", style("── Result ──").dim());
        println!("  {}", serde_json::to_string_pretty(result)?.replace('\n', "\n  "));
    }
    println!();
    Ok(())
}
