//! Telemetry sink for reported errors.
//!
//! # Design Decisions
//! - Reporting is explicit and user-triggered; nothing is sent automatically
//! - A disabled sink drops batches with a log line instead of erroring, so
//!   the reporting flow behaves identically in development builds
//! - Partial delivery is treated as failure; the caller keeps the batch

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::ReportingConfig;
use crate::services::error_store::StoredError;

/// Errors from batch delivery.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("telemetry endpoint rejected batch: {0}")]
    Rejected(String),

    #[error("telemetry transport error: {0}")]
    Transport(String),

    #[error("telemetry delivery timed out after {0}ms")]
    Timeout(u64),
}

/// Remote sink receiving error batches.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Deliver the whole batch.
    fn report<'a>(&'a self, errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Sink that discards batches. Used when reporting is disabled and in tests.
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn report<'a>(&'a self, errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            tracing::debug!(count = errors.len(), "telemetry disabled, dropping error batch");
            Ok(())
        })
    }
}

/// HTTP sink posting JSON batches to the configured endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    config: ReportingConfig,
}

impl HttpSink {
    pub fn new(config: ReportingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

impl TelemetrySink for HttpSink {
    fn report<'a>(&'a self, errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            if !self.config.enabled {
                tracing::info!(
                    count = errors.len(),
                    "error reporting disabled, skipping batch"
                );
                return Ok(());
            }

            let body = serde_json::json!({
                "release": self.config.release,
                "environment": self.config.environment,
                "errors": errors,
            });

            // A hung endpoint must not park the reporting flow; the retry
            // adapter bounds attempts, this bounds each attempt's duration.
            let request = self.client.post(&self.config.endpoint).json(&body).send();
            let response = tokio::time::timeout(
                Duration::from_millis(self.config.request_timeout_ms),
                request,
            )
            .await
            .map_err(|_| SinkError::Timeout(self.config.request_timeout_ms))?
            .map_err(|err| SinkError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(SinkError::Rejected(format!("status {}", response.status())));
            }

            tracing::info!(count = errors.len(), "reported error batch");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoopSink;
        let batch = vec![StoredError::new("ignored")];
        assert!(sink.report(&batch).await.is_ok());
    }

    #[tokio::test]
    async fn test_hung_endpoint_times_out() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let sink = HttpSink::new(ReportingConfig {
            enabled: true,
            endpoint,
            request_timeout_ms: 100,
            ..ReportingConfig::default()
        });

        let batch = vec![StoredError::new("stuck")];
        let err = tokio::time::timeout(Duration::from_secs(5), sink.report(&batch))
            .await
            .expect("delivery never returned")
            .unwrap_err();
        assert!(matches!(err, SinkError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_disabled_http_sink_skips_delivery() {
        // Endpoint is bogus; a disabled sink must not touch it.
        let sink = HttpSink::new(ReportingConfig {
            enabled: false,
            endpoint: "http://127.0.0.1:1".to_string(),
            ..ReportingConfig::default()
        });
        let batch = vec![StoredError::new("kept local")];
        assert!(sink.report(&batch).await.is_ok());
    }
}
