//! Long-running scrape-and-validate loop for one target.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use omcheck_validate::Loop;

use crate::fetch::fetch_payload;
use crate::target::ScrapeTarget;

/// Totals accumulated over a runner's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerReport {
    /// Scrape attempts, including failed fetches.
    pub scrapes: u64,
    /// Fetches that never produced a payload.
    pub fetch_failures: u64,
    /// Payloads rejected by the parser.
    pub parse_failures: u64,
    /// Rule violations across all scrapes.
    pub violations: u64,
}

impl RunnerReport {
    /// Whether every fetched payload parsed and passed the active rules.
    pub fn is_clean(&self) -> bool {
        self.parse_failures == 0 && self.violations == 0
    }
}

/// Periodically fetches a target and feeds each payload to a validator
/// loop. One runner per target.
pub struct ScrapeRunner {
    target: ScrapeTarget,
    validator: Loop,
    interval: Duration,
    timeout: Duration,
    max_scrapes: Option<u64>,
}

impl ScrapeRunner {
    pub fn new(
        target: ScrapeTarget,
        validator: Loop,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            target,
            validator,
            interval,
            timeout,
            max_scrapes: None,
        }
    }

    /// Stop after `count` scrapes instead of running until shutdown.
    pub fn with_max_scrapes(mut self, count: u64) -> Self {
        self.max_scrapes = Some(count);
        self
    }

    /// Run until shutdown or the scrape budget is exhausted.
    ///
    /// The first scrape happens immediately; later ones follow the
    /// interval. Fetch failures are logged and retried on the next tick.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunnerReport {
        info!(
            target = %self.target,
            interval_secs = self.interval.as_secs(),
            level = %self.validator.error_level(),
            "scrape loop started"
        );
        let mut report = RunnerReport::default();

        loop {
            self.scrape_once(&mut report).await;
            if self.max_scrapes.is_some_and(|max| report.scrapes >= max) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    debug!(target = %self.target, "scrape loop shutting down");
                    break;
                }
            }
        }

        info!(
            scrapes = report.scrapes,
            fetch_failures = report.fetch_failures,
            parse_failures = report.parse_failures,
            violations = report.violations,
            "scrape loop finished"
        );
        report
    }

    async fn scrape_once(&mut self, report: &mut RunnerReport) {
        report.scrapes += 1;

        let payload = match fetch_payload(&self.target, self.timeout).await {
            Ok(payload) => payload,
            Err(err) => {
                report.fetch_failures += 1;
                warn!(target = %self.target, error = %err, "scrape fetch failed");
                return;
            }
        };

        let now = self.validator.now();
        match self.validator.parse_and_validate(&payload, now) {
            Ok(outcome) => {
                report.violations += outcome.violations.len() as u64;
                for violation in outcome.violations.iter() {
                    warn!(
                        target = %self.target,
                        family = %violation.family,
                        "{violation}"
                    );
                }
                if outcome.is_clean() {
                    debug!(
                        target = %self.target,
                        families = outcome.set.families.len(),
                        "scrape conformant"
                    );
                }
            }
            Err(err) => {
                report.parse_failures += 1;
                error!(target = %self.target, "{err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_runner(max_scrapes: u64) -> ScrapeRunner {
        let target = ScrapeTarget::parse("http://127.0.0.1:1/metrics").unwrap();
        let validator = Loop::new(target.url());
        ScrapeRunner::new(
            target,
            validator,
            Duration::from_millis(10),
            Duration::from_millis(100),
        )
        .with_max_scrapes(max_scrapes)
    }

    #[tokio::test]
    async fn bounded_run_counts_fetch_failures() {
        let (_tx, rx) = watch::channel(false);
        let report = test_runner(2).run(rx).await;
        assert_eq!(report.scrapes, 2);
        assert_eq!(report.fetch_failures, 2);
        // No payload ever arrived, so nothing parsed or violated.
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let target = ScrapeTarget::parse("http://127.0.0.1:1/metrics").unwrap();
        let validator = Loop::new(target.url());
        let runner = ScrapeRunner::new(
            target,
            validator,
            Duration::from_secs(3600),
            Duration::from_millis(100),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(runner.run(rx));
        // Let the first scrape fail, then signal shutdown.
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let report = handle.await.unwrap();
        assert_eq!(report.scrapes, 1);
    }
}
