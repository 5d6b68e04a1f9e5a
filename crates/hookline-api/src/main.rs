//! Hookline CLI and REST API entry point.
//!
//! Binary name: `hookline`
//!
//! Parses CLI arguments, loads config and registers the built-in tools, then
//! dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use hookline_observe::{LogFormat, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json { LogFormat::Json } else { LogFormat::Pretty };
    if let Err(e) = init_tracing(format, cli.log_directive(), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "hookline", &mut std::io::stdout());
        return Ok(());
    }

    let mut state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            // Flags beat config and environment.
            let mut config = (*state.config).clone();
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if config.auth.api_key.is_none() {
                let key = http::extractors::auth::generate_session_key();
                println!();
                println!(
                    "  {} No API key configured. Using a key for this session only:",
                    console::style("🔑").bold()
                );
                println!();
                println!("  {}", console::style(&key).yellow().bold());
                println!();
                config.auth.api_key = Some(key);
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);
            state.config = std::sync::Arc::new(config);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            let notifier = state.spawn_notifier();
            let sweeper = state.spawn_sweeper();

            if !cli.quiet {
                println!(
                    "  {} Hookline listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(
                %addr,
                data_dir = %state.data_dir.display(),
                tools = ?state.jobs.tools().names(),
                "server started"
            );

            let jobs = state.jobs.clone();
            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            let stopped = jobs.clear_jobs();
            tracing::info!(stopped, "server stopped");
            if let Some(sweeper) = sweeper {
                sweeper.abort();
            }
            if let Some(notifier) = notifier {
                notifier.abort();
            }
            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Tools => {
            cli::tools::list_tools(&state, cli.json)?;
        }

        Commands::Run { tool, input, wait } => {
            let notifier = state.spawn_notifier();
            cli::run::run_tool(&state, &tool, &input, wait, cli.json).await?;
            if let Some(notifier) = notifier {
                // Give the notifier a moment to deliver the completion message.
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                notifier.abort();
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
