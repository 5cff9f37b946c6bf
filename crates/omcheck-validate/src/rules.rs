//! Per-payload and cross-payload conformance rules.
//!
//! Both passes emit violations in payload order so the aggregate error
//! is deterministic for a given input sequence.

use std::collections::HashMap;

use omcheck_format::{LabelSet, MetricKind, MetricSet, SeriesKey};

use crate::error::{Violation, ViolationKind, Violations};
use crate::last_scrape::LastScrape;

/// Within-payload checks: timestamp monotonicity per series and label
/// sets duplicated across families.
pub(crate) fn check_set(set: &MetricSet, out: &mut Violations) {
    let mut last_ts: HashMap<SeriesKey, f64> = HashMap::new();
    // (label set, value bits) → first family exposing the tuple.
    let mut tuples: HashMap<(LabelSet, u64), String> = HashMap::new();

    for (family, sample) in set.samples() {
        let key = SeriesKey::new(&family.name, sample.labels.clone());

        if let Some(ts) = sample.timestamp {
            if let Some(prev) = last_ts.get(&key) {
                if ts < *prev {
                    out.push(Violation::series(ViolationKind::TimestampDecrease, key.clone()));
                }
            }
            last_ts.insert(key.clone(), ts);
        }

        let tuple = (sample.labels.clone(), sample.value.to_bits());
        match tuples.get(&tuple) {
            Some(first_family) if *first_family != family.name => {
                out.push(Violation::series(ViolationKind::DuplicateLabelSet, key));
            }
            Some(_) => {}
            None => {
                tuples.insert(tuple, family.name.clone());
            }
        }
    }
}

/// Cross-payload checks against the previous scrape: counter
/// regressions, timestamp regressions, and disappeared families.
pub(crate) fn check_against_last(set: &MetricSet, last: &LastScrape, out: &mut Violations) {
    for (family, sample) in set.samples() {
        let key = SeriesKey::new(&family.name, sample.labels.clone());
        let Some(prev) = last.series(&key) else {
            continue;
        };

        if family.kind == MetricKind::Counter && sample.metric_name.ends_with("_total") {
            if let Some(prev_value) = prev.last_value {
                // A drop to exactly zero is a legitimate counter reset.
                if sample.value < prev_value && sample.value != 0.0 {
                    out.push(Violation::series(
                        ViolationKind::CounterValueDecrease,
                        key.clone(),
                    ));
                }
            }
        }

        if let (Some(ts), Some(prev_ts)) = (sample.timestamp, prev.last_timestamp) {
            if ts < prev_ts {
                out.push(Violation::series(ViolationKind::TimestampDecrease, key));
            }
        }
    }

    // Families seen last scrape must still be exposed, one report each.
    for (name, _) in last.families() {
        if set.family(name).is_none() {
            out.push(Violation::family(
                ViolationKind::MetricsDisappear,
                name.to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omcheck_format::parse;

    fn set(payload: &str) -> MetricSet {
        parse(payload.as_bytes()).unwrap()
    }

    fn kinds(violations: &Violations) -> Vec<ViolationKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn clean_payload_has_no_per_set_violations() {
        let mut out = Violations::default();
        check_set(
            &set("# TYPE a counter\na_total{x=\"1\"} 1 1\na_total{x=\"1\"} 2 2\n# EOF\n"),
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn timestamp_regression_within_payload() {
        let mut out = Violations::default();
        check_set(
            &set("# TYPE a counter\na_total{x=\"1\"} 1 2\na_total{x=\"1\"} 2 1\n# EOF\n"),
            &mut out,
        );
        assert_eq!(kinds(&out), vec![ViolationKind::TimestampDecrease]);
    }

    #[test]
    fn duplicate_tuple_across_families() {
        let mut out = Violations::default();
        check_set(
            &set(
                "# TYPE a1 counter\na1_total{bar=\"baz\"} 1\n\
                 # TYPE a2 counter\na2_total{bar=\"baz\"} 1\n# EOF\n",
            ),
            &mut out,
        );
        assert_eq!(kinds(&out), vec![ViolationKind::DuplicateLabelSet]);
        let violation = out.iter().next().unwrap();
        assert_eq!(violation.family, "a2");
    }

    #[test]
    fn same_labels_different_values_pass() {
        let mut out = Violations::default();
        check_set(
            &set(
                "# TYPE a1 counter\na1_total{bar=\"baz\"} 1\n\
                 # TYPE a2 counter\na2_total{bar=\"baz\"} 2\n# EOF\n",
            ),
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn counter_regression_against_last() {
        let prev = set("# TYPE a counter\na_total 2\n# EOF\n");
        let last = LastScrape::from_set(&prev, 1.0);
        let mut out = Violations::default();
        check_against_last(&set("# TYPE a counter\na_total 1\n# EOF\n"), &last, &mut out);
        assert_eq!(kinds(&out), vec![ViolationKind::CounterValueDecrease]);
    }

    #[test]
    fn counter_reset_to_zero_is_allowed() {
        let prev = set("# TYPE a counter\na_total 7\n# EOF\n");
        let last = LastScrape::from_set(&prev, 1.0);
        let mut out = Violations::default();
        check_against_last(&set("# TYPE a counter\na_total 0\n# EOF\n"), &last, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn disappeared_family_reported_once() {
        let prev = set("# TYPE a counter\na_total 1\n# TYPE b gauge\nb 1\n# EOF\n");
        let last = LastScrape::from_set(&prev, 1.0);
        let mut out = Violations::default();
        check_against_last(&set("# TYPE b gauge\nb 2\n# EOF\n"), &last, &mut out);
        assert_eq!(kinds(&out), vec![ViolationKind::MetricsDisappear]);
        assert_eq!(out.iter().next().unwrap().family, "a");
    }

    #[test]
    fn new_series_has_no_baseline() {
        let prev = set("# TYPE a counter\na_total{x=\"1\"} 5\n# EOF\n");
        let last = LastScrape::from_set(&prev, 1.0);
        let mut out = Violations::default();
        check_against_last(
            &set("# TYPE a counter\na_total{x=\"1\"} 6\na_total{x=\"2\"} 1\n# EOF\n"),
            &last,
            &mut out,
        );
        assert!(out.is_empty());
    }
}
