//! Domain types for parsed OpenMetrics expositions.
//!
//! These types represent the contents of a single payload: metric
//! families, their samples, and the label sets that identify individual
//! series. All types serialize to JSON for report output.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of a metric family.
pub type FamilyName = String;

/// Seconds since the Unix epoch, fractional.
pub type Timestamp = f64;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*$").expect("static pattern"));

/// Whether `name` is a valid metric or label name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

// ── Metric kinds ───────────────────────────────────────────────────

/// The declared type of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    GaugeHistogram,
    Summary,
    Info,
    StateSet,
    Unknown,
}

impl MetricKind {
    /// Parse a `# TYPE` metadata token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "counter" => Some(Self::Counter),
            "gauge" => Some(Self::Gauge),
            "histogram" => Some(Self::Histogram),
            "gaugehistogram" => Some(Self::GaugeHistogram),
            "summary" => Some(Self::Summary),
            "info" => Some(Self::Info),
            "stateset" => Some(Self::StateSet),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::GaugeHistogram => "gaugehistogram",
            Self::Summary => "summary",
            Self::Info => "info",
            Self::StateSet => "stateset",
            Self::Unknown => "unknown",
        }
    }

    /// Sample-name suffixes this kind may expose in addition to the bare
    /// family name.
    pub fn allowed_suffixes(&self) -> &'static [&'static str] {
        match self {
            Self::Counter => &["_total", "_created"],
            Self::Histogram => &["_bucket", "_sum", "_count", "_created"],
            Self::GaugeHistogram => &["_bucket", "_gsum", "_gcount"],
            Self::Summary => &["_sum", "_count", "_created"],
            Self::Info => &["_info"],
            _ => &[],
        }
    }

    /// Whether the bare family name is itself a valid sample name.
    ///
    /// Counters only expose `_total`/`_created`, info families only
    /// `_info`; every other kind samples under its own name.
    pub fn allows_bare_sample(&self) -> bool {
        !matches!(self, Self::Counter | Self::Info)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Labels ─────────────────────────────────────────────────────────

/// A single name/value pair attached to a sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A canonical, name-sorted label set.
///
/// Construction sorts by label name so equal sets compare and hash equal
/// regardless of the order they were written in. A duplicate label name
/// is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSet(Vec<Label>);

impl LabelSet {
    /// Build a canonical set. On a duplicate name, returns that name.
    pub fn new(mut labels: Vec<Label>) -> Result<Self, String> {
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in labels.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(pair[0].name.clone());
            }
        }
        Ok(Self(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    /// Value of the named label, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

impl fmt::Display for LabelSet {
    /// Exposition syntax: `{a="b",c="d"}`; empty sets print nothing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (idx, label) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=\"{}\"", label.name, label.value)?;
        }
        f.write_str("}")
    }
}

// ── Samples and families ───────────────────────────────────────────

/// A single observation from a sample line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Full sample name as written, suffix included.
    pub metric_name: String,
    pub labels: LabelSet,
    pub value: f64,
    /// Seconds since epoch, if the line carried a timestamp.
    pub timestamp: Option<Timestamp>,
}

/// A metric family: metadata plus its samples in payload order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub name: FamilyName,
    pub kind: MetricKind,
    pub help: Option<String>,
    pub unit: Option<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
            help: None,
            unit: None,
            samples: Vec::new(),
        }
    }
}

/// Identity of a time series within a payload: the owning family plus
/// the canonical label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub family: FamilyName,
    pub labels: LabelSet,
}

impl SeriesKey {
    pub fn new(family: impl Into<String>, labels: LabelSet) -> Self {
        Self {
            family: family.into(),
            labels,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family, self.labels)
    }
}

/// One parsed payload: families in exposition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub families: Vec<MetricFamily>,
}

impl MetricSet {
    /// Look up a family by name.
    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// All samples in payload order, paired with their owning family.
    pub fn samples(&self) -> impl Iterator<Item = (&MetricFamily, &Sample)> {
        self.families
            .iter()
            .flat_map(|f| f.samples.iter().map(move |s| (f, s)))
    }

    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_grammar() {
        assert!(is_valid_name("http_requests"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("a1"));
        assert!(!is_valid_name("1a"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a-b"));
    }

    #[test]
    fn kind_token_round_trip() {
        for token in [
            "counter",
            "gauge",
            "histogram",
            "gaugehistogram",
            "summary",
            "info",
            "stateset",
            "unknown",
        ] {
            let kind = MetricKind::from_token(token).unwrap();
            assert_eq!(kind.as_str(), token);
        }
        assert_eq!(MetricKind::from_token("Counter"), None);
    }

    #[test]
    fn label_set_is_canonical() {
        let a = LabelSet::new(vec![Label::new("b", "2"), Label::new("a", "1")]).unwrap();
        let b = LabelSet::new(vec![Label::new("a", "1"), Label::new("b", "2")]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn label_set_rejects_duplicates() {
        let err = LabelSet::new(vec![Label::new("a", "1"), Label::new("a", "2")]).unwrap_err();
        assert_eq!(err, "a");
    }

    #[test]
    fn label_set_display() {
        let set = LabelSet::new(vec![Label::new("foo", "bar"), Label::new("a", "1")]).unwrap();
        assert_eq!(set.to_string(), r#"{a="1",foo="bar"}"#);
        assert_eq!(LabelSet::default().to_string(), "");
    }

    #[test]
    fn series_key_display() {
        let labels = LabelSet::new(vec![Label::new("code", "200")]).unwrap();
        let key = SeriesKey::new("http_requests", labels);
        assert_eq!(key.to_string(), r#"http_requests{code="200"}"#);
    }

    #[test]
    fn metric_set_lookup_and_order() {
        let mut a = MetricFamily::new("a", MetricKind::Counter);
        a.samples.push(Sample {
            metric_name: "a_total".to_string(),
            labels: LabelSet::default(),
            value: 1.0,
            timestamp: None,
        });
        let b = MetricFamily::new("b", MetricKind::Gauge);
        let set = MetricSet {
            families: vec![a, b],
        };
        assert!(set.family("a").is_some());
        assert!(set.family("c").is_none());
        assert_eq!(set.sample_count(), 1);
        let names: Vec<_> = set.samples().map(|(_, s)| s.metric_name.clone()).collect();
        assert_eq!(names, vec!["a_total"]);
    }
}
