//! Scrape target address parsing.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("unsupported target scheme in {0:?}, only http:// is supported")]
    UnsupportedScheme(String),
    #[error("invalid target {0:?}")]
    Invalid(String),
}

/// A parsed scrape target: TCP authority plus metrics path.
///
/// Accepts `http://host:port/path`, with `/metrics` as the default path
/// and 80 as the default port. A bare `host:port` is treated as http.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    /// host:port to connect to.
    pub authority: String,
    /// URL path of the metrics endpoint.
    pub path: String,
}

impl ScrapeTarget {
    pub fn parse(target: &str) -> Result<Self, TargetError> {
        let rest = if let Some(rest) = target.strip_prefix("http://") {
            rest
        } else if target.contains("://") {
            return Err(TargetError::UnsupportedScheme(target.to_string()));
        } else {
            target
        };

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, format!("/{path}")),
            None => (rest, "/metrics".to_string()),
        };
        if authority.is_empty() {
            return Err(TargetError::Invalid(target.to_string()));
        }
        let authority = if authority.contains(':') {
            authority.to_string()
        } else {
            format!("{authority}:80")
        };
        Ok(Self { authority, path })
    }

    /// Full URL form, for diagnostics.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.authority, self.path)
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_url() {
        let target = ScrapeTarget::parse("http://10.0.0.5:9100/metrics").unwrap();
        assert_eq!(target.authority, "10.0.0.5:9100");
        assert_eq!(target.path, "/metrics");
    }

    #[test]
    fn parse_defaults_path_and_port() {
        let target = ScrapeTarget::parse("http://example.com").unwrap();
        assert_eq!(target.authority, "example.com:80");
        assert_eq!(target.path, "/metrics");
    }

    #[test]
    fn parse_bare_authority() {
        let target = ScrapeTarget::parse("localhost:9100").unwrap();
        assert_eq!(target.authority, "localhost:9100");
        assert_eq!(target.url(), "http://localhost:9100/metrics");
    }

    #[test]
    fn parse_custom_path() {
        let target = ScrapeTarget::parse("http://app:8080/internal/om").unwrap();
        assert_eq!(target.path, "/internal/om");
    }

    #[test]
    fn rejects_https() {
        assert!(matches!(
            ScrapeTarget::parse("https://example.com/metrics"),
            Err(TargetError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_empty_host() {
        assert!(matches!(
            ScrapeTarget::parse("http:///metrics"),
            Err(TargetError::Invalid(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        let target = ScrapeTarget::parse("http://example.com:9100/metrics").unwrap();
        assert_eq!(target.to_string(), "http://example.com:9100/metrics");
    }
}
