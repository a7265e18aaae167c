//! Error-report flow machine.
//!
//! # States
//! ```text
//! CheckForErrors ──▶ Idle ──▶ { Cleaning, Reporting, SavingError, DismissingError }
//!    (initial)        ▲                      │
//!        ▲           (timer: re-check after the poll interval)
//!        └──────────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Errors can be persisted by code outside the machine's control (panic
//!   hooks, host handlers), so `has_errors` is re-derived from the store on
//!   a timer instead of trusting incoming events
//! - Reporting sequences report-then-clear in one invocation; the clear is
//!   only reached if the report succeeded, so a failed report keeps the
//!   batch for the next attempt

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::machine::{Effects, Flow, Step};
use crate::resilience::fetch::{fetch, FetchOptions, FetchResult};
use crate::services::error_store::StoredError;
use crate::services::report_error::ReportErrorService;

/// Default idle delay before re-checking the store.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportErrorState {
    CheckForErrors,
    Idle,
    Cleaning,
    Reporting,
    SavingError,
    DismissingError,
}

/// Context carried across reporting transitions. `has_errors` is only ever
/// recomputed from a fresh check (or reset by a completed clear).
#[derive(Debug, Clone, Default)]
pub struct ReportErrorContext {
    pub has_errors: bool,
    pub errors: Vec<StoredError>,
}

/// Result of the periodic check: the flag and the full list, assigned
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCheck {
    pub has_errors: bool,
    pub errors: Vec<StoredError>,
}

#[derive(Debug)]
pub enum ReportErrorEvent {
    ReportErrors,
    CheckForErrors,
    DismissErrors,
    SaveError(StoredError),
    DismissError(usize),
    /// Completions of the invoked services.
    Checked(FetchResult<ErrorCheck>),
    Cleaned(FetchResult<()>),
    Reported(FetchResult<()>),
    Saved(FetchResult<()>),
    Dismissed(FetchResult<()>),
}

#[derive(Debug)]
pub enum ReportErrorCommand {
    Check,
    Clear,
    ReportThenClear,
    Save(StoredError),
    Dismiss(usize),
}

pub struct ReportErrorFlow {
    poll_interval: Duration,
}

impl ReportErrorFlow {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for ReportErrorFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl Flow for ReportErrorFlow {
    type State = ReportErrorState;
    type Context = ReportErrorContext;
    type Event = ReportErrorEvent;
    type Command = ReportErrorCommand;

    fn id(&self) -> &'static str {
        "report_error"
    }

    fn initial(&self) -> (ReportErrorState, ReportErrorContext) {
        (
            ReportErrorState::CheckForErrors,
            ReportErrorContext::default(),
        )
    }

    fn on_enter(&self, state: &ReportErrorState, _context: &ReportErrorContext) -> Vec<ReportErrorCommand> {
        match state {
            ReportErrorState::CheckForErrors => vec![ReportErrorCommand::Check],
            ReportErrorState::Cleaning => vec![ReportErrorCommand::Clear],
            ReportErrorState::Reporting => vec![ReportErrorCommand::ReportThenClear],
            _ => Vec::new(),
        }
    }

    fn after(&self, state: &ReportErrorState) -> Option<(Duration, ReportErrorEvent)> {
        match state {
            ReportErrorState::Idle => {
                Some((self.poll_interval, ReportErrorEvent::CheckForErrors))
            }
            _ => None,
        }
    }

    fn tags(&self, state: &ReportErrorState) -> &'static [&'static str] {
        match state {
            ReportErrorState::Cleaning | ReportErrorState::Reporting => &["loading"],
            _ => &[],
        }
    }

    fn transition(
        &self,
        state: &ReportErrorState,
        context: &mut ReportErrorContext,
        event: ReportErrorEvent,
    ) -> Step<ReportErrorState, ReportErrorCommand> {
        use ReportErrorEvent::*;
        use ReportErrorState::*;

        match (state, event) {
            (Idle, ReportErrors) => Step::to(Reporting),
            (Idle, ReportErrorEvent::CheckForErrors) => Step::to(ReportErrorState::CheckForErrors),
            (Idle, DismissErrors) => Step::to(Cleaning),
            (Idle, SaveError(error)) => {
                Step::to(SavingError).with(ReportErrorCommand::Save(error))
            }
            (Idle, DismissError(index)) => {
                Step::to(DismissingError).with(ReportErrorCommand::Dismiss(index))
            }

            (ReportErrorState::CheckForErrors, Checked(Ok(check))) => {
                context.has_errors = check.has_errors;
                context.errors = check.errors;
                Step::to(Idle)
            }
            (ReportErrorState::CheckForErrors, Checked(Err(err))) => {
                // Flag untouched; the next poll retries the check.
                tracing::warn!(error = %err.error, "error check failed");
                Step::to(Idle)
            }

            (Cleaning, Cleaned(result)) => {
                match result {
                    Ok(()) => {
                        context.has_errors = false;
                        context.errors.clear();
                    }
                    Err(err) => tracing::warn!(error = %err.error, "clearing errors failed"),
                }
                Step::to(Idle)
            }

            (Reporting, Reported(result)) => {
                if let Err(err) = result {
                    tracing::warn!(error = %err.error, "error report failed, batch kept");
                }
                Step::to(ReportErrorState::CheckForErrors)
            }

            (SavingError, Saved(result)) => {
                if let Err(err) = result {
                    tracing::warn!(error = %err.error, "saving error failed");
                }
                Step::to(ReportErrorState::CheckForErrors)
            }

            (DismissingError, Dismissed(result)) => {
                if let Err(err) = result {
                    tracing::warn!(error = %err.error, "dismissing error failed");
                }
                Step::to(ReportErrorState::CheckForErrors)
            }

            (state, event) => {
                tracing::trace!(?state, ?event, "report event ignored");
                Step::stay()
            }
        }
    }
}

/// Executes the reporting flow's invoked services.
pub struct ReportErrorEffects {
    service: Arc<ReportErrorService>,
    options: FetchOptions,
}

impl ReportErrorEffects {
    pub fn new(service: Arc<ReportErrorService>, options: FetchOptions) -> Self {
        Self { service, options }
    }
}

impl Effects<ReportErrorFlow> for ReportErrorEffects {
    fn run(&self, command: ReportErrorCommand) -> BoxFuture<'_, Option<ReportErrorEvent>> {
        Box::pin(async move {
            match command {
                ReportErrorCommand::Check => {
                    let result = fetch(self.options, || {
                        let service = self.service.clone();
                        async move {
                            let has_errors = service.check_for_errors().await?;
                            let errors = service.get_errors().await?;
                            Ok::<_, crate::services::report_error::ReportServiceError>(ErrorCheck {
                                has_errors,
                                errors,
                            })
                        }
                    })
                    .await;
                    Some(ReportErrorEvent::Checked(result))
                }
                ReportErrorCommand::Clear => {
                    let result = fetch(self.options, || {
                        let service = self.service.clone();
                        async move { service.clear_errors().await }
                    })
                    .await;
                    Some(ReportErrorEvent::Cleaned(result))
                }
                ReportErrorCommand::ReportThenClear => {
                    let result = fetch(self.options, || {
                        let service = self.service.clone();
                        async move {
                            // Sequential on purpose: a failed report must
                            // never reach the clear.
                            service.report_errors().await?;
                            service.clear_errors().await
                        }
                    })
                    .await;
                    Some(ReportErrorEvent::Reported(result))
                }
                ReportErrorCommand::Save(error) => {
                    let result = fetch(self.options, || {
                        let service = self.service.clone();
                        let error = error.clone();
                        async move { service.save_error(error).await }
                    })
                    .await;
                    Some(ReportErrorEvent::Saved(result))
                }
                ReportErrorCommand::Dismiss(index) => {
                    let result = fetch(self.options, || {
                        let service = self.service.clone();
                        async move { service.dismiss_error(index).await }
                    })
                    .await;
                    Some(ReportErrorEvent::Dismissed(result))
                }
            }
        })
    }
}
