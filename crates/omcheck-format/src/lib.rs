//! omcheck-format — OpenMetrics text exposition model and parser.
//!
//! One parsed payload becomes a [`MetricSet`]: metric families in
//! exposition order, each carrying its samples. The parser is pure and
//! holds no state across calls; everything cross-scrape lives in
//! `omcheck-validate`.

pub mod error;
pub mod parse;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use parse::{ParseOptions, parse, parse_with};
pub use types::*;
