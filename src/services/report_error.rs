//! Error-report service façade.
//!
//! # Responsibilities
//! - Answer "do stored errors exist" and fetch the ordered list
//! - Report the current batch to the telemetry sink
//! - Clear or dismiss stored errors
//!
//! # Design Decisions
//! - Reporting and clearing are separate operations; the reporting flow
//!   sequences them so a failed report never clears the batch
//! - Capture is callable from outside the flow (panic hook); the polling
//!   cycle picks up anything persisted behind the machine's back

use std::sync::Arc;

use thiserror::Error;

use crate::services::error_store::{ErrorStore, StoreError, StoredError};
use crate::services::sink::{SinkError, TelemetrySink};

/// Errors from the reporting service.
#[derive(Debug, Error)]
pub enum ReportServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type ReportServiceResult<T> = Result<T, ReportServiceError>;

/// Façade over the error store and the telemetry sink.
pub struct ReportErrorService {
    store: Arc<ErrorStore>,
    sink: Arc<dyn TelemetrySink>,
}

impl ReportErrorService {
    pub fn new(store: Arc<ErrorStore>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self { store, sink }
    }

    pub async fn check_for_errors(&self) -> ReportServiceResult<bool> {
        Ok(self.store.has_errors()?)
    }

    pub async fn get_errors(&self) -> ReportServiceResult<Vec<StoredError>> {
        Ok(self.store.all()?)
    }

    pub async fn clear_errors(&self) -> ReportServiceResult<()> {
        Ok(self.store.clear()?)
    }

    pub async fn dismiss_error(&self, index: usize) -> ReportServiceResult<()> {
        Ok(self.store.dismiss(index)?)
    }

    /// Persist one captured error.
    pub async fn save_error(&self, error: StoredError) -> ReportServiceResult<()> {
        Ok(self.store.save(error)?)
    }

    /// Send all currently known errors to the sink. The store is untouched;
    /// clearing is the caller's next step and only happens on success.
    pub async fn report_errors(&self) -> ReportServiceResult<()> {
        let errors = self.store.all()?;
        if errors.is_empty() {
            tracing::debug!("no stored errors to report");
            return Ok(());
        }
        self.sink.report(&errors).await?;
        Ok(())
    }
}

/// Capture panics from anywhere in the host process into the store, so the
/// polling flow picks them up on its next check.
pub fn install_panic_hook(store: Arc<ErrorStore>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let record = StoredError::new(info.to_string());
        if let Err(err) = store.save(record) {
            tracing::error!(error = %err, "failed to persist panic");
        }
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sink::NoopSink;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn report<'a>(&'a self, _errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>> {
            Box::pin(async { Err(SinkError::Transport("connection refused".to_string())) })
        }
    }

    struct RecordingSink {
        called: AtomicBool,
    }

    impl TelemetrySink for RecordingSink {
        fn report<'a>(&'a self, _errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>> {
            self.called.store(true, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = Arc::new(ErrorStore::in_memory());
        let service = ReportErrorService::new(store, Arc::new(NoopSink));

        assert!(!service.check_for_errors().await.unwrap());
        service.save_error(StoredError::new("boom")).await.unwrap();
        assert!(service.check_for_errors().await.unwrap());
        assert_eq!(service.get_errors().await.unwrap()[0].message, "boom");

        service.clear_errors().await.unwrap();
        assert!(!service.check_for_errors().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_report_keeps_batch() {
        let store = Arc::new(ErrorStore::in_memory());
        let service = ReportErrorService::new(store.clone(), Arc::new(FailingSink));

        service.save_error(StoredError::new("kept")).await.unwrap();
        assert!(service.report_errors().await.is_err());
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_skips_sink() {
        let sink = Arc::new(RecordingSink {
            called: AtomicBool::new(false),
        });
        let service = ReportErrorService::new(Arc::new(ErrorStore::in_memory()), sink.clone());

        service.report_errors().await.unwrap();
        assert!(!sink.called.load(Ordering::SeqCst));
    }
}
