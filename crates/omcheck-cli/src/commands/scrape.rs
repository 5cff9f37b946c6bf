//! Live scrape loop against one target.

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use omcheck_format::ParseOptions;
use omcheck_scrape::{ScrapeRunner, ScrapeTarget};
use omcheck_validate::{ErrorLevel, Loop};

/// Scrape `target` until interrupted (or `count` scrapes); returns the
/// finding count.
pub async fn run(
    target: &str,
    level: ErrorLevel,
    interval: u64,
    timeout: u64,
    count: u64,
    allow_untyped: bool,
) -> anyhow::Result<u64> {
    let target = ScrapeTarget::parse(target)?;
    let validator = Loop::new(target.url())
        .with_error_level(level)
        .with_parse_options(ParseOptions {
            require_type: !allow_untyped,
        });

    let mut runner = ScrapeRunner::new(
        target,
        validator,
        Duration::from_secs(interval),
        Duration::from_secs(timeout),
    );
    if count > 0 {
        runner = runner.with_max_scrapes(count);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing up");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = runner.run(shutdown_rx).await;
    Ok(report.parse_failures + report.violations)
}
