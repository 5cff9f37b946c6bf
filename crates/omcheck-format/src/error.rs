//! Parse error taxonomy for the OpenMetrics text parser.

use thiserror::Error;

use crate::types::MetricKind;

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while parsing an exposition payload.
///
/// Every variant is fatal to the scrape that produced it: a payload that
/// fails to parse yields no `MetricSet` and must not advance any
/// cross-scrape state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    /// The payload did not end with the `# EOF` terminator.
    #[error("payload not terminated by # EOF")]
    Unterminated,

    #[error("line {line}: content after # EOF terminator")]
    ContentAfterEof { line: usize },

    #[error("line {line}: metadata for family {family:?} after its samples")]
    MetadataAfterSample { line: usize, family: String },

    #[error("line {line}: repeated {directive} metadata for family {family:?}")]
    DuplicateMetadata {
        line: usize,
        directive: &'static str,
        family: String,
    },

    #[error("line {line}: family {family:?} redeclared as {new} (was {old})")]
    FamilyKindConflict {
        line: usize,
        family: String,
        old: MetricKind,
        new: MetricKind,
    },

    /// A new family opened while the previous one had produced no
    /// samples. The message is part of the observable surface; keep it
    /// verbatim.
    #[error("metric name changed from {from:?} to {to:?}")]
    NameChanged { from: String, to: String },

    #[error("line {line}: sample {metric:?} does not match any declared family")]
    UnknownFamily { line: usize, metric: String },

    #[error("line {line}: sample {metric:?} not valid for {kind} family {family:?}")]
    BadSuffix {
        line: usize,
        metric: String,
        kind: MetricKind,
        family: String,
    },

    #[error("line {line}: invalid metric name {name:?}")]
    InvalidName { line: usize, name: String },

    #[error("line {line}: invalid label name {name:?}")]
    InvalidLabelName { line: usize, name: String },

    #[error("line {line}: duplicate label name {name:?}")]
    DuplicateLabel { line: usize, name: String },

    #[error("line {line}: malformed number {token:?}")]
    MalformedNumber { line: usize, token: String },

    #[error("line {line}: malformed timestamp {token:?}")]
    MalformedTimestamp { line: usize, token: String },

    #[error("line {line}: unterminated label value")]
    UnterminatedString { line: usize },

    #[error("line {line}: unsupported escape sequence \\{escape}")]
    BadEscape { line: usize, escape: char },

    #[error("line {line}: malformed label syntax")]
    MalformedLabels { line: usize },

    #[error("line {line}: malformed {directive} metadata")]
    MalformedMetadata {
        line: usize,
        directive: &'static str,
    },

    #[error("line {line}: unknown metric type {token:?}")]
    UnknownKind { line: usize, token: String },

    #[error("line {line}: malformed sample line")]
    MalformedSample { line: usize },

    #[error("line {line}: unit {unit:?} is not a suffix of family {family:?}")]
    UnitMismatch {
        line: usize,
        unit: String,
        family: String,
    },

    /// Unexpected internal condition, surfaced as a fatal parse-class
    /// error rather than a panic.
    #[error("internal validator error: {0}")]
    Internal(String),
}
