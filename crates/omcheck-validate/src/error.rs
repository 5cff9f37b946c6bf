//! Rule violation taxonomy and the error level configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use omcheck_format::SeriesKey;

/// Which rule stratum the validator enforces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// Hard conformance violations only.
    #[default]
    Must,
    /// Hard violations plus soft guidance.
    Should,
}

impl std::str::FromStr for ErrorLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "must" => Ok(Self::Must),
            "should" => Ok(Self::Should),
            _ => Err(format!(
                "unknown error level {s:?}, expected \"must\" or \"should\""
            )),
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Must => "must",
            Self::Should => "should",
        })
    }
}

/// The class a violation kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleClass {
    /// Spec-breaking producer behavior.
    Must,
    /// Likely misbehavior, not strictly forbidden.
    Should,
}

/// Distinguishable rule violation kinds.
///
/// Callers should match on the kind; the canonical message strings are
/// diagnostics, even though they are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CounterValueDecrease,
    TimestampDecrease,
    MetricsDisappear,
    DuplicateLabelSet,
}

impl ViolationKind {
    pub fn class(&self) -> RuleClass {
        match self {
            Self::CounterValueDecrease | Self::TimestampDecrease => RuleClass::Must,
            Self::MetricsDisappear | Self::DuplicateLabelSet => RuleClass::Should,
        }
    }

    /// Canonical message for this kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::CounterValueDecrease => "counter value must not decrease",
            Self::TimestampDecrease => "timestamp must not decrease",
            Self::MetricsDisappear => "metric should not disappear",
            Self::DuplicateLabelSet => "duplicate label set across families",
        }
    }
}

/// A single rule violation and where it was observed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{}", .kind.message())]
pub struct Violation {
    pub kind: ViolationKind,
    /// Family the violation was observed on.
    pub family: String,
    /// Offending series, for label-level rules.
    pub series: Option<SeriesKey>,
}

impl Violation {
    pub(crate) fn series(kind: ViolationKind, key: SeriesKey) -> Self {
        Self {
            kind,
            family: key.family.clone(),
            series: Some(key),
        }
    }

    pub(crate) fn family(kind: ViolationKind, family: String) -> Self {
        Self {
            kind,
            family,
            series: None,
        }
    }
}

/// Aggregated violations from one scrape, in detection order.
///
/// `Display` lists each canonical message on its own line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }

    pub(crate) fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    /// Drop SHOULD-class violations when only MUST rules are active.
    pub(crate) fn filter_level(&mut self, level: ErrorLevel) {
        if level == ErrorLevel::Must {
            self.0.retain(|v| v.kind.class() == RuleClass::Must);
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, violation) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
