//! Offline validation of payload files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use omcheck_format::ParseOptions;
use omcheck_validate::{ErrorLevel, Loop, Violation};

/// Record of one validated payload file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    parse_error: Option<String>,
    violations: Vec<Violation>,
}

/// Validate `files` as successive scrapes; returns the finding count.
pub fn run(
    files: &[PathBuf],
    level: ErrorLevel,
    allow_untyped: bool,
    format: &str,
) -> anyhow::Result<u64> {
    let mut validator = Loop::new("file-sequence")
        .with_error_level(level)
        .with_parse_options(ParseOptions {
            require_type: !allow_untyped,
        });

    let mut findings = 0;
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let payload = std::fs::read(file)
            .with_context(|| format!("reading {}", file.display()))?;
        reports.push(check_one(&mut validator, file, &payload, format, &mut findings));
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(findings)
}

fn check_one(
    validator: &mut Loop,
    file: &Path,
    payload: &[u8],
    format: &str,
    findings: &mut u64,
) -> FileReport {
    let now = validator.now();
    match validator.parse_and_validate(payload, now) {
        Ok(outcome) => {
            *findings += outcome.violations.len() as u64;
            if format != "json" {
                for violation in outcome.violations.iter() {
                    println!("{}: {violation} ({})", file.display(), violation.family);
                }
            }
            FileReport {
                file: file.display().to_string(),
                parse_error: None,
                violations: outcome.violations.into_vec(),
            }
        }
        Err(err) => {
            *findings += 1;
            if format != "json" {
                println!("{}: {err}", file.display());
            }
            FileReport {
                file: file.display().to_string(),
                parse_error: Some(err.to_string()),
                violations: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_payload(dir: &tempfile::TempDir, name: &str, payload: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(payload.as_bytes()).unwrap();
        path
    }

    #[test]
    fn clean_sequence_has_no_findings() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_payload(&dir, "one.txt", "# TYPE a counter\na_total 1\n# EOF\n"),
            write_payload(&dir, "two.txt", "# TYPE a counter\na_total 2\n# EOF\n"),
        ];
        let findings = run(&files, ErrorLevel::Must, false, "text").unwrap();
        assert_eq!(findings, 0);
    }

    #[test]
    fn counter_regression_across_files_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_payload(&dir, "one.txt", "# TYPE a counter\na_total 2\n# EOF\n"),
            write_payload(&dir, "two.txt", "# TYPE a counter\na_total 1\n# EOF\n"),
        ];
        let findings = run(&files, ErrorLevel::Must, false, "text").unwrap();
        assert_eq!(findings, 1);
    }

    #[test]
    fn parse_error_counts_as_finding() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_payload(
            &dir,
            "bad.txt",
            "# TYPE a counter\na_total 1\n",
        )];
        let findings = run(&files, ErrorLevel::Must, false, "text").unwrap();
        assert_eq!(findings, 1);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let files = vec![PathBuf::from("/nonexistent/payload.txt")];
        assert!(run(&files, ErrorLevel::Must, false, "text").is_err());
    }

    #[test]
    fn untyped_payload_accepted_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_payload(&dir, "raw.txt", "up 1\n# EOF\n")];
        assert_eq!(run(&files, ErrorLevel::Must, false, "text").unwrap(), 1);
        assert_eq!(run(&files, ErrorLevel::Must, true, "text").unwrap(), 0);
    }
}
