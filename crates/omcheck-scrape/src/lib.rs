//! omcheck-scrape — fetches exposition payloads over HTTP and drives a
//! validator loop on an interval.

pub mod fetch;
pub mod runner;
pub mod target;

pub use fetch::{FetchError, fetch_payload};
pub use runner::{RunnerReport, ScrapeRunner};
pub use target::{ScrapeTarget, TargetError};
