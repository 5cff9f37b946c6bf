//! Cross-scrape summary state.

use std::collections::{BTreeMap, HashMap};

use omcheck_format::{MetricKind, MetricSet, SeriesKey, Timestamp};

/// Per-series summary carried between scrapes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesSummary {
    /// Last `_total` value, for counter series only.
    pub last_value: Option<f64>,
    /// Last timestamp seen for the series, in payload order.
    pub last_timestamp: Option<Timestamp>,
}

/// Compact summary of the most recent successfully parsed payload.
///
/// Holds only what the cross-payload rules need, bounding memory per
/// loop to the number of active series. Replaced wholesale after every
/// successful parse; never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct LastScrape {
    /// Wall-clock time the payload was validated, from the loop clock.
    scraped_at: Timestamp,
    series: HashMap<SeriesKey, SeriesSummary>,
    /// Declared kind per family. Sorted so reports are deterministic.
    family_kind: BTreeMap<String, MetricKind>,
}

impl LastScrape {
    /// Summarize a freshly parsed payload.
    pub(crate) fn from_set(set: &MetricSet, now: Timestamp) -> Self {
        let mut series: HashMap<SeriesKey, SeriesSummary> = HashMap::new();
        let mut family_kind = BTreeMap::new();

        for family in &set.families {
            family_kind.insert(family.name.clone(), family.kind);
        }
        for (family, sample) in set.samples() {
            let key = SeriesKey::new(&family.name, sample.labels.clone());
            let summary = series.entry(key).or_default();
            if family.kind == MetricKind::Counter && sample.metric_name.ends_with("_total") {
                summary.last_value = Some(sample.value);
            }
            if sample.timestamp.is_some() {
                summary.last_timestamp = sample.timestamp;
            }
        }

        Self {
            scraped_at: now,
            series,
            family_kind,
        }
    }

    pub fn scraped_at(&self) -> Timestamp {
        self.scraped_at
    }

    pub fn series(&self, key: &SeriesKey) -> Option<&SeriesSummary> {
        self.series.get(key)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn family_kind(&self, name: &str) -> Option<MetricKind> {
        self.family_kind.get(name).copied()
    }

    /// Families from the previous payload, in name order.
    pub fn families(&self) -> impl Iterator<Item = (&str, MetricKind)> {
        self.family_kind.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omcheck_format::parse;

    #[test]
    fn summarizes_counters_and_timestamps() {
        let set = parse(
            b"# TYPE a counter\n\
              a_total{x=\"1\"} 5 10\n\
              a_created{x=\"1\"} 3 10\n\
              # TYPE b gauge\n\
              b 2\n\
              # EOF\n",
        )
        .unwrap();
        let last = LastScrape::from_set(&set, 42.0);

        assert_eq!(last.scraped_at(), 42.0);
        assert_eq!(last.series_count(), 2);
        assert_eq!(last.family_kind("a"), Some(MetricKind::Counter));
        assert_eq!(last.family_kind("b"), Some(MetricKind::Gauge));

        let key = SeriesKey::new("a", set.families[0].samples[0].labels.clone());
        let summary = last.series(&key).unwrap();
        // The `_created` companion shares the key but not the value slot.
        assert_eq!(summary.last_value, Some(5.0));
        assert_eq!(summary.last_timestamp, Some(10.0));

        let gauge_key = SeriesKey::new("b", Default::default());
        let gauge = last.series(&gauge_key).unwrap();
        assert_eq!(gauge.last_value, None);
        assert_eq!(gauge.last_timestamp, None);
    }

    #[test]
    fn families_iterate_in_name_order() {
        let set = parse(b"# TYPE z gauge\nz 1\n# TYPE a gauge\na 1\n# EOF\n").unwrap();
        let last = LastScrape::from_set(&set, 0.0);
        let names: Vec<_> = last.families().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }
}
