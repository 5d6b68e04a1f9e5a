//! CLI command definitions for the `hookline` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod run;
pub mod tools;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run long-lived agent tools as background jobs behind a webhook API.
#[derive(Parser)]
#[command(name = "hookline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to server.port, 8000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to server.host, 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },

    /// List the registered tools and their parameters.
    Tools,

    /// Run a tool locally through the job system.
    Run {
        /// Tool name, e.g. `fibonacci_calculate`.
        tool: String,

        /// Tool input as a JSON object.
        #[arg(short, long, default_value = "{}")]
        input: String,

        /// Seconds to wait for the job before printing its status.
        /// Defaults to waiting until it finishes.
        #[arg(short, long)]
        wait: Option<f64>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Log filter for the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,hookline=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_input() {
        let cli = Cli::parse_from([
            "hookline",
            "run",
            "fibonacci_calculate",
            "--input",
            r#"{"n": 10}"#,
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Run { tool, input, wait } => {
                assert_eq!(tool, "fibonacci_calculate");
                assert_eq!(input, r#"{"n": 10}"#);
                assert_eq!(wait, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn verbosity_maps_to_directive() {
        let quiet = Cli::parse_from(["hookline", "--quiet", "tools"]);
        assert_eq!(quiet.log_directive(), "error");
        let loud = Cli::parse_from(["hookline", "-vv", "tools"]);
        assert_eq!(loud.log_directive(), "trace");
    }
}
