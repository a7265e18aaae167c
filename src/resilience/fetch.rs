//! Retrying fetch wrapper for invoked services.
//!
//! # Responsibilities
//! - Bound retries for a failure-prone async operation
//! - Convert the final failure into transition data instead of an error path
//! - Tag failures that the UI must not surface (`silent`)
//!
//! # Design Decisions
//! - The machine layer never sees a raw service error; every invoked service
//!   resolves to a `FetchResult` the transition table can match on
//! - No backoff is imposed here; callers opt in via `FetchOptions::backoff`

use std::fmt::Display;
use std::future::Future;

use tokio::time::sleep;

use crate::resilience::backoff::calculate_backoff;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
}

/// Retry and error-shaping configuration for one invoked service.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Total attempts, including the first. Clamped to at least 1.
    pub max_attempts: u32,
    /// Whether the UI should surface the final failure.
    pub show_error: bool,
    /// Optional delay between attempts.
    pub backoff: Option<BackoffPolicy>,
}

impl FetchOptions {
    /// Single attempt, failure not surfaced to the UI.
    pub fn once_silent() -> Self {
        Self {
            max_attempts: 1,
            show_error: false,
            backoff: None,
        }
    }

    /// `max_attempts` tries, failure surfaced, no backoff.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            show_error: true,
            backoff: None,
        }
    }
}

/// Structured failure produced after the last attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Human-readable message from the last attempt.
    pub error: String,
    /// Failures configured with `show_error = false` are silent: the machine
    /// still takes its error path but the UI does not display them.
    pub silent: bool,
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Guard for transition branches that treat an invocation failure as data.
pub fn has_error<T>(result: &FetchResult<T>) -> bool {
    result.is_err()
}

/// Run `operation` up to `max_attempts` times, returning the first success
/// or a [`FetchError`] shaped from the last failure.
pub async fn fetch<T, E, F, Fut>(options: FetchOptions, operation: F) -> FetchResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = options.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = err.to_string();
                metrics::counter!("fetch_failures_total").increment(1);
                tracing::debug!(
                    attempt,
                    max_attempts = attempts,
                    error = %last_error,
                    "fetch attempt failed"
                );
                if attempt < attempts {
                    if let Some(backoff) = options.backoff {
                        sleep(calculate_backoff(attempt, backoff.base_ms, backoff.max_ms)).await;
                    }
                }
            }
        }
    }

    Err(FetchError {
        error: last_error,
        silent: !options.show_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_success_passes_payload_through() {
        let result: FetchResult<u32> =
            fetch(FetchOptions::once_silent(), || async { Ok::<_, String>(42) }).await;
        assert_eq!(result, Ok(42));
        assert!(!has_error(&result));
    }

    #[tokio::test]
    async fn test_single_attempt_failure_is_silent() {
        let result: FetchResult<u32> = fetch(FetchOptions::once_silent(), || async {
            Err::<u32, _>("node unreachable".to_string())
        })
        .await;
        assert_eq!(
            result,
            Err(FetchError {
                error: "node unreachable".to_string(),
                silent: true,
            })
        );
        assert!(has_error(&result));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: FetchResult<&str> = fetch(FetchOptions::attempts(3), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_surface_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: FetchResult<u32> = fetch(FetchOptions::attempts(2), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(format!("failure {n}"))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let err = result.unwrap_err();
        assert_eq!(err.error, "failure 1");
        assert!(!err.silent);
    }
}
