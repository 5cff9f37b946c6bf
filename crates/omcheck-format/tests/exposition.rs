//! End-to-end parse of a realistic exposition payload.

use omcheck_format::{MetricKind, parse};

const TARGET: &str = include_str!("fixtures/target.txt");

#[test]
fn parses_realistic_exposition() {
    let set = parse(TARGET.as_bytes()).unwrap();

    assert_eq!(set.families.len(), 5);
    assert_eq!(set.sample_count(), 11);

    let cpu = set.family("process_cpu_seconds").unwrap();
    assert_eq!(cpu.kind, MetricKind::Counter);
    assert_eq!(cpu.unit.as_deref(), Some("seconds"));
    assert_eq!(cpu.samples[0].metric_name, "process_cpu_seconds_total");
    assert_eq!(cpu.samples[0].value, 17.25);
    assert_eq!(cpu.samples[1].metric_name, "process_cpu_seconds_created");

    let hist = set.family("http_request_duration_seconds").unwrap();
    assert_eq!(hist.kind, MetricKind::Histogram);
    assert_eq!(hist.samples.len(), 5);
    assert_eq!(hist.samples[2].labels.get("le"), Some("+Inf"));
    assert_eq!(hist.samples[2].value, 14.0);

    let info = set.family("build_info").unwrap();
    assert_eq!(info.kind, MetricKind::Info);
    assert_eq!(info.samples[0].labels.get("version"), Some("1.4.2"));

    let depth = set.family("queue_depth").unwrap();
    assert_eq!(depth.samples[0].timestamp, Some(1700000123.0));
}

#[test]
fn reparse_is_identical() {
    assert_eq!(
        parse(TARGET.as_bytes()).unwrap(),
        parse(TARGET.as_bytes()).unwrap()
    );
}
