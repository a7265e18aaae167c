//! Registry of live machine instances.
//!
//! # Design Decisions
//! - No ambient globals: the registry is constructed at startup and passed
//!   explicitly to whoever needs to send events or derive view state
//! - One handle per machine identity; triggering shutdown tears down the
//!   drivers, and any in-flight invocation result is simply discarded
//! - The two machines share nothing but the services handed to them; each
//!   context is exclusively owned by its own driver

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::WalletConfig;
use crate::flows::report_error::{ReportErrorEffects, ReportErrorFlow};
use crate::flows::send::{SendEffects, SendFlow, SubmitRequest};
use crate::lifecycle::Shutdown;
use crate::machine::driver::{spawn, MachineHandle};
use crate::resilience::fetch::{BackoffPolicy, FetchOptions};
use crate::services::report_error::ReportErrorService;
use crate::services::tx::TransactionService;

/// Typed registry mapping each machine identity to its running interpreter.
pub struct Store {
    send: MachineHandle<SendFlow>,
    report_error: MachineHandle<ReportErrorFlow>,
}

impl Store {
    /// Spawn both machine drivers. Returns the registry and the channel on
    /// which confirmed transactions are handed to the host for submission.
    pub fn start(
        config: &WalletConfig,
        tx_service: Arc<dyn TransactionService>,
        report_service: Arc<ReportErrorService>,
        shutdown: &Shutdown,
    ) -> (Self, mpsc::UnboundedReceiver<SubmitRequest>) {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();

        let send_options = FetchOptions {
            max_attempts: config.retries.max_attempts,
            show_error: false,
            backoff: (config.retries.max_attempts > 1).then(|| BackoffPolicy {
                base_ms: config.retries.base_delay_ms,
                max_ms: config.retries.max_delay_ms,
            }),
        };
        let send = spawn(
            SendFlow,
            SendEffects::new(tx_service, send_options, submit_tx),
            shutdown.subscribe(),
        );

        let report_error = spawn(
            ReportErrorFlow::with_poll_interval(Duration::from_millis(
                config.reporting.poll_interval_ms,
            )),
            ReportErrorEffects::new(
                report_service,
                FetchOptions::attempts(config.reporting.max_attempts),
            ),
            shutdown.subscribe(),
        );

        (Self { send, report_error }, submit_rx)
    }

    /// Handle to the running send flow.
    pub fn send_flow(&self) -> &MachineHandle<SendFlow> {
        &self.send
    }

    /// Handle to the running error-report flow.
    pub fn report_error(&self) -> &MachineHandle<ReportErrorFlow> {
        &self.report_error
    }
}
