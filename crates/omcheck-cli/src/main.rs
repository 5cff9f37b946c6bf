//! omcheck — OpenMetrics scrape conformance checker.
//!
//! # Usage
//!
//! ```text
//! omcheck scrape --target http://127.0.0.1:9100/metrics --error-level should
//! omcheck check payload1.txt payload2.txt
//! ```
//!
//! Exit codes: 0 when every payload conforms, 1 when any parse error or
//! rule violation was observed, 2 on configuration or I/O failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use omcheck_validate::ErrorLevel;

mod commands;

#[derive(Parser)]
#[command(
    name = "omcheck",
    about = "OpenMetrics scrape conformance checker",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repeatedly scrape a target endpoint and validate each payload.
    Scrape {
        /// Target endpoint, e.g. http://127.0.0.1:9100/metrics
        #[arg(long)]
        target: String,
        /// Rule stratum: must (hard violations) or should (hard + soft).
        #[arg(long, default_value = "must")]
        error_level: ErrorLevel,
        /// Seconds between scrapes.
        #[arg(long, default_value = "10")]
        interval: u64,
        /// Per-scrape timeout in seconds.
        #[arg(long, default_value = "5")]
        timeout: u64,
        /// Stop after this many scrapes (0 = run until interrupted).
        #[arg(long, default_value = "0")]
        count: u64,
        /// Accept samples for families without TYPE metadata.
        #[arg(long)]
        allow_untyped: bool,
    },
    /// Validate exposition payload files, fed to one validator in order.
    ///
    /// Files are treated as successive scrapes of the same target, so
    /// cross-payload rules (counter regressions, disappearing metrics)
    /// apply between them.
    Check {
        /// Rule stratum: must (hard violations) or should (hard + soft).
        #[arg(long, default_value = "must")]
        error_level: ErrorLevel,
        /// Accept samples for families without TYPE metadata.
        #[arg(long)]
        allow_untyped: bool,
        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: String,
        /// Payload files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,omcheck=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Scrape {
            target,
            error_level,
            interval,
            timeout,
            count,
            allow_untyped,
        } => {
            commands::scrape::run(
                &target,
                error_level,
                interval,
                timeout,
                count,
                allow_untyped,
            )
            .await
        }
        Commands::Check {
            error_level,
            allow_untyped,
            format,
            files,
        } => commands::check::run(&files, error_level, allow_untyped, &format),
    };

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}
