//! omcheck-validate — stateful conformance validation of successive
//! OpenMetrics scrapes.
//!
//! A [`Loop`] owns the rule configuration, an injectable clock, and a
//! compact summary of the previous scrape. Each payload runs through the
//! parser, the per-payload rules, and the cross-payload rules, then
//! replaces that summary.
//!
//! # Architecture
//!
//! ```text
//! Loop::parse_and_validate(bytes, now)
//!   ├── omcheck_format::parse()      → MetricSet (or fatal ParseError)
//!   ├── rules::check_set()           → within-payload violations
//!   ├── rules::check_against_last()  → violations against LastScrape
//!   └── LastScrape::from_set()       → new baseline for the next call
//! ```
//!
//! Parse errors abort the scrape without touching the baseline; rule
//! violations are reported but the new payload still becomes the
//! baseline, so the next scrape is judged against the latest reality.

pub mod error;
mod last_scrape;
mod rules;
mod scrape_loop;

pub use error::{ErrorLevel, RuleClass, Violation, ViolationKind, Violations};
pub use last_scrape::{LastScrape, SeriesSummary};
pub use scrape_loop::{Clock, Loop, Outcome};
