//! Send flow machine.
//!
//! # States
//! ```text
//! EstimatingInitialFee ──▶ Idle ──▶ CreatingTx ──▶ ReadyToSend
//!        (initial)      (selecting)                (fee tiers, confirm)
//!
//! Global: BACK → Idle, SET_DATA → CreatingTx
//! ```
//!
//! # Design Decisions
//! - Fee-tier selection in ReadyToSend is a pure context reassignment: no
//!   invoked service, no state change, idempotent
//! - Only SET_DATA rebuilds the transaction; the tip merged into the build
//!   input follows the tier current at that moment
//! - A failed invocation returns to Idle with the message assigned; every
//!   other context field is left untouched

use std::sync::Arc;

use alloy::primitives::U256;
use alloy::rpc::types::TransactionRequest;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::machine::{Effects, Flow, Step};
use crate::resilience::fetch::{fetch, FetchOptions, FetchResult};
use crate::services::tx::{CreatedTransfer, InitialFee, TransactionService, TransferInput};

/// Fee tier chosen while a built transaction waits for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeType {
    Regular,
    Fast,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    EstimatingInitialFee,
    Idle,
    CreatingTx,
    ReadyToSend,
}

/// Context carried across send-flow transitions. `current_fee_type` is unset
/// only before the first successful estimation and is never cleared once a
/// transaction request has been built.
#[derive(Debug, Clone, Default)]
pub struct SendContext {
    pub transaction_request: Option<TransactionRequest>,
    pub provider_url: Option<String>,
    pub address: Option<String>,
    pub max_fee: Option<U256>,
    pub regular_tip: Option<U256>,
    pub fast_tip: Option<U256>,
    pub gas_limit: Option<U256>,
    pub base_asset_id: Option<String>,
    pub error: Option<String>,
    pub current_fee_type: Option<FeeType>,
}

#[derive(Debug)]
pub enum SendEvent {
    Reset,
    Back,
    SetData(TransferInput),
    Confirm,
    UseRegularFee,
    UseFastFee,
    UseAdvancedFee,
    /// Completion of the fee estimation invocation.
    FeeEstimated(FetchResult<InitialFee>),
    /// Completion of the transfer build invocation.
    TransferCreated(FetchResult<CreatedTransfer>),
}

#[derive(Debug)]
pub enum SendCommand {
    EstimateInitialFee,
    CreateTransfer(TransferInput),
    Submit(SubmitRequest),
}

/// Context snapshot handed to the external submission action on CONFIRM.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub transaction_request: TransactionRequest,
    pub provider_url: String,
    pub address: String,
    pub fee_type: FeeType,
}

pub struct SendFlow;

impl Flow for SendFlow {
    type State = SendState;
    type Context = SendContext;
    type Event = SendEvent;
    type Command = SendCommand;

    fn id(&self) -> &'static str {
        "send"
    }

    fn initial(&self) -> (SendState, SendContext) {
        (SendState::EstimatingInitialFee, SendContext::default())
    }

    fn on_enter(&self, state: &SendState, _context: &SendContext) -> Vec<SendCommand> {
        match state {
            SendState::EstimatingInitialFee => vec![SendCommand::EstimateInitialFee],
            _ => Vec::new(),
        }
    }

    fn tags(&self, state: &SendState) -> &'static [&'static str] {
        match state {
            SendState::Idle => &["selecting"],
            _ => &[],
        }
    }

    fn transition(
        &self,
        state: &SendState,
        context: &mut SendContext,
        event: SendEvent,
    ) -> Step<SendState, SendCommand> {
        use SendEvent::*;
        use SendState::*;

        match (state, event) {
            // Global transitions. Reset is accepted vocabulary but has no
            // handler; it falls through to the ignored arm, so a built
            // transaction's tier is never cleared.
            (_, Back) => Step::to(Idle),
            (_, SetData(input)) => {
                let tip = match context.current_fee_type {
                    Some(FeeType::Regular) => context.regular_tip,
                    _ => context.fast_tip,
                };
                Step::to(CreatingTx)
                    .with(SendCommand::CreateTransfer(TransferInput { tip, ..input }))
            }

            (EstimatingInitialFee, FeeEstimated(Ok(fee))) => {
                context.max_fee = Some(fee.max_fee);
                context.regular_tip = Some(fee.regular_tip);
                context.fast_tip = Some(fee.fast_tip);
                context.base_asset_id = Some(fee.base_asset_id);
                context.current_fee_type = Some(FeeType::Regular);
                Step::to(Idle)
            }
            (EstimatingInitialFee, FeeEstimated(Err(err))) => {
                context.error = Some(err.error);
                Step::to(Idle)
            }

            (CreatingTx, TransferCreated(Ok(transfer))) => {
                context.transaction_request = Some(transfer.transaction_request);
                context.provider_url = Some(transfer.provider_url);
                context.address = Some(transfer.address);
                context.max_fee = Some(transfer.max_fee);
                context.gas_limit = Some(transfer.gas_limit);
                // A tier picked before the rebuild survives it.
                context.current_fee_type = Some(context.current_fee_type.unwrap_or(FeeType::Regular));
                Step::to(ReadyToSend)
            }
            (CreatingTx, TransferCreated(Err(err))) => {
                context.error = Some(err.error);
                Step::to(Idle)
            }

            (ReadyToSend, UseRegularFee) => {
                context.current_fee_type = Some(FeeType::Regular);
                Step::stay()
            }
            (ReadyToSend, UseFastFee) => {
                context.current_fee_type = Some(FeeType::Fast);
                Step::stay()
            }
            (ReadyToSend, UseAdvancedFee) => {
                context.current_fee_type = Some(FeeType::Advanced);
                Step::stay()
            }
            (ReadyToSend, Confirm) => match submit_request(context) {
                Some(request) => Step::stay().with(SendCommand::Submit(request)),
                None => Step::stay(),
            },

            (state, event) => {
                tracing::trace!(?state, ?event, "send event ignored");
                Step::stay()
            }
        }
    }
}

fn submit_request(context: &SendContext) -> Option<SubmitRequest> {
    Some(SubmitRequest {
        transaction_request: context.transaction_request.clone()?,
        provider_url: context.provider_url.clone().unwrap_or_default(),
        address: context.address.clone().unwrap_or_default(),
        fee_type: context.current_fee_type.unwrap_or(FeeType::Regular),
    })
}

/// Executes the send flow's invoked services.
pub struct SendEffects {
    service: Arc<dyn TransactionService>,
    options: FetchOptions,
    submissions: mpsc::UnboundedSender<SubmitRequest>,
}

impl SendEffects {
    pub fn new(
        service: Arc<dyn TransactionService>,
        options: FetchOptions,
        submissions: mpsc::UnboundedSender<SubmitRequest>,
    ) -> Self {
        Self {
            service,
            options,
            submissions,
        }
    }
}

impl Effects<SendFlow> for SendEffects {
    fn run(&self, command: SendCommand) -> BoxFuture<'_, Option<SendEvent>> {
        Box::pin(async move {
            match command {
                SendCommand::EstimateInitialFee => {
                    let result =
                        fetch(self.options, || self.service.estimate_initial_fee()).await;
                    Some(SendEvent::FeeEstimated(result))
                }
                SendCommand::CreateTransfer(input) => {
                    let result = fetch(self.options, || {
                        self.service.create_transfer(input.clone())
                    })
                    .await;
                    Some(SendEvent::TransferCreated(result))
                }
                SendCommand::Submit(request) => {
                    // Submission itself is owned by the host; hand the
                    // context over and keep the machine responsive.
                    if self.submissions.send(request).is_err() {
                        tracing::warn!("submission channel closed, CONFIRM dropped");
                    }
                    None
                }
            }
        })
    }
}
