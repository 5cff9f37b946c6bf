//! One-shot payload fetch over HTTP/1.
//!
//! A plain TCP connect plus an http1 handshake per scrape; the
//! connection is driven on a background task and dropped after the
//! body is collected. No retry here: the runner decides what a failed
//! scrape means.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use thiserror::Error;
use tracing::debug;

use crate::target::ScrapeTarget;

/// Content negotiation header for OpenMetrics endpoints.
pub const OPENMETRICS_ACCEPT: &str = "application/openmetrics-text;version=1.0.0;charset=utf-8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connect to {authority} failed: {source}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("building scrape request: {0}")]
    BadRequest(#[from] http::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("target answered {status}")]
    Status { status: http::StatusCode },

    #[error("reading body failed: {0}")]
    Body(#[source] hyper::Error),

    #[error("scrape timed out after {0:?}")]
    Timeout(Duration),
}

/// GET the target's exposition payload, bounded by `timeout`.
pub async fn fetch_payload(
    target: &ScrapeTarget,
    timeout: Duration,
) -> Result<Bytes, FetchError> {
    let result = tokio::time::timeout(timeout, fetch_inner(target)).await;
    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!(target = %target, "scrape timed out");
            Err(FetchError::Timeout(timeout))
        }
    }
}

async fn fetch_inner(target: &ScrapeTarget) -> Result<Bytes, FetchError> {
    let stream = tokio::net::TcpStream::connect(&target.authority)
        .await
        .map_err(|source| FetchError::Connect {
            authority: target.authority.clone(),
            source,
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(FetchError::Handshake)?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(target.path.as_str())
        .header("host", target.authority.as_str())
        .header("accept", OPENMETRICS_ACCEPT)
        .header("user-agent", "omcheck/0.1")
        .body(Empty::<Bytes>::new())?;

    let resp = sender.send_request(req).await.map_err(FetchError::Request)?;
    if !resp.status().is_success() {
        debug!(status = %resp.status(), target = %target, "scrape non-2xx");
        return Err(FetchError::Status {
            status: resp.status(),
        });
    }

    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(FetchError::Body)?
        .to_bytes();
    debug!(target = %target, bytes = body.len(), "payload fetched");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_from_closed_port_fails_to_connect() {
        // Port 1 won't be listening.
        let target = ScrapeTarget::parse("http://127.0.0.1:1/metrics").unwrap();
        let err = fetch_payload(&target, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Connect { .. } | FetchError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn fetch_times_out_on_unroutable_address() {
        // RFC 5737 TEST-NET-1 is not routable; the connect attempt hangs.
        let target = ScrapeTarget::parse("http://192.0.2.1:9100/metrics").unwrap();
        let err = fetch_payload(&target, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Timeout(_) | FetchError::Connect { .. }
        ));
    }
}
