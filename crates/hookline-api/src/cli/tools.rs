//! `hookline tools`: print the registered tool schemas.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub fn list_tools(state: &AppState, json: bool) -> Result<()> {
    let tools = state.jobs.tools();

    if json {
        let schemas: Vec<serde_json::Value> = tools
            .schemas()
            .iter()
            .map(|s| s.to_json_schema())
            .collect();
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Tool").fg(Color::White),
        Cell::new("Parameters").fg(Color::White),
        Cell::new("Sync wait").fg(Color::White),
        Cell::new("Cancelable").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for name in tools.names() {
        let Some(tool) = tools.get(name) else {
            continue;
        };
        let schema = tool.schema();
        let settings = tool.settings();

        let params = if schema.parameters.is_empty() {
            "-".to_string()
        } else {
            schema
                .parameters
                .iter()
                .map(|p| {
                    if p.required {
                        p.name.clone()
                    } else {
                        format!("{}?", p.name)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let wait = settings
            .sync_threshold_secs
            .map(|s| format!("{s}s"))
            .unwrap_or_else(|| format!("{}s", state.config.jobs.default_sync_threshold_secs));
        let cancelable = if settings.cancelable {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };

        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new(params),
            Cell::new(wait),
            cancelable,
            Cell::new(schema.description),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} tools. Start one over HTTP with {}",
        style(tools.len()).bold(),
        style("POST /api/v1/tools/{name}").dim()
    );
    println!();
    Ok(())
}
