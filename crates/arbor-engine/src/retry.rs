//! Bounded retry and timeout plumbing for infrastructure calls.
//!
//! Network-bound dependencies (vector search, embedding lookups) run under
//! a per-call-class timeout and a bounded exponential-backoff retry. Retry
//! never loops indefinitely; the final error returns to the caller for
//! degradation handling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use arbor_core::{Error, RetryConfig, Result};

/// Run a future under a timeout, converting elapse into an
/// infrastructure error carrying the `timeout` context flag.
pub async fn with_timeout<T, F>(label: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(format!(
            "{label} timed out after {}ms",
            limit.as_millis()
        ))
        .with_context("op", label)),
    }
}

/// Retry an operation up to `config.max_attempts` times with exponential
/// backoff (`backoff_ms · 2^attempt`). Each failure logs a WARN with the
/// attempt number; the last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(label: &str, config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    op = label,
                    retry_attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "operation failed"
                );
                last_err = Some(e);
                if attempt + 1 < config.max_attempts {
                    sleep(Duration::from_millis(config.backoff_ms << attempt)).await;
                }
            }
        }
    }
    Err(last_err.expect("max_attempts is validated to be at least 1"))
}
