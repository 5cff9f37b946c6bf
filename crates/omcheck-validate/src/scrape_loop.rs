//! The stateful validator loop.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use omcheck_format::{MetricSet, ParseError, ParseOptions, Timestamp, parse_with};

use crate::error::{ErrorLevel, Violations};
use crate::last_scrape::LastScrape;
use crate::rules;

/// Clock function: seconds since the Unix epoch. Injectable so tests
/// can drive a deterministic sequence.
pub type Clock = Box<dyn FnMut() -> Timestamp + Send>;

/// Result of one successfully parsed scrape.
#[derive(Debug)]
pub struct Outcome {
    pub set: MetricSet,
    /// Violations after level filtering, in detection order.
    pub violations: Violations,
}

impl Outcome {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Treat the accumulated violations as the error they describe.
    pub fn into_result(self) -> Result<MetricSet, Violations> {
        if self.violations.is_empty() {
            Ok(self.set)
        } else {
            Err(self.violations)
        }
    }
}

/// Validates successive scrapes of one target.
///
/// The loop starts cold; the first successful parse installs a
/// [`LastScrape`] baseline and every later scrape is additionally
/// checked against it. One loop per target; loops share nothing.
pub struct Loop {
    target: String,
    level: ErrorLevel,
    options: ParseOptions,
    clock: Clock,
    last: Option<LastScrape>,
}

impl Loop {
    /// Construct a loop with default configuration for `target`.
    ///
    /// The target string is opaque here; it only flavors diagnostics.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            level: ErrorLevel::default(),
            options: ParseOptions::default(),
            clock: Box::new(system_clock),
            last: None,
        }
    }

    /// Select the rule stratum to enforce.
    pub fn with_error_level(mut self, level: ErrorLevel) -> Self {
        self.level = level;
        self
    }

    /// Adjust parser behavior (e.g. tolerate untyped families).
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the clock. Test seam.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn error_level(&self) -> ErrorLevel {
        self.level
    }

    /// Whether at least one payload has been accepted.
    pub fn is_warm(&self) -> bool {
        self.last.is_some()
    }

    /// Current time from the injected clock.
    pub fn now(&mut self) -> Timestamp {
        (self.clock)()
    }

    /// Parse one payload and validate it, within itself and against the
    /// previous scrape.
    ///
    /// A parse failure leaves the cross-scrape state untouched. Rule
    /// violations do not: the new payload becomes the baseline, so a
    /// regressed counter is judged against its new value from here on.
    pub fn parse_and_validate(
        &mut self,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<Outcome, ParseError> {
        let set = parse_with(payload, self.options)?;

        let mut violations = Violations::default();
        rules::check_set(&set, &mut violations);
        if let Some(last) = &self.last {
            rules::check_against_last(&set, last, &mut violations);
        }
        violations.filter_level(self.level);

        if !violations.is_empty() {
            debug!(
                target = %self.target,
                count = violations.len(),
                "scrape violated conformance rules"
            );
        }
        self.last = Some(LastScrape::from_set(&set, now));
        Ok(Outcome { set, violations })
    }
}

fn system_clock() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
