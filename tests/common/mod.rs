//! Shared mocks for flow integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use alloy::primitives::U256;
use alloy::rpc::types::TransactionRequest;
use futures_util::future::BoxFuture;

use wallet_orchestrator::services::error_store::StoredError;
use wallet_orchestrator::services::sink::{SinkError, TelemetrySink};
use wallet_orchestrator::services::tx::{
    CreatedTransfer, InitialFee, TransactionService, TransferInput, TxError, TxResult,
};

/// Programmable transaction service. A `None` payload makes the call fail
/// with `fail_message`; every call is counted.
pub struct MockTxService {
    pub fee: Option<InitialFee>,
    pub transfer: Option<CreatedTransfer>,
    pub fail_message: String,
    pub estimate_calls: AtomicU32,
    pub create_calls: AtomicU32,
    pub captured_inputs: Mutex<Vec<TransferInput>>,
}

impl MockTxService {
    pub fn happy() -> Self {
        Self {
            fee: Some(initial_fee()),
            transfer: Some(created_transfer()),
            fail_message: "mock failure".to_string(),
            estimate_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            captured_inputs: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn failing_transfer(message: &str) -> Self {
        Self {
            transfer: None,
            fail_message: message.to_string(),
            ..Self::happy()
        }
    }
}

impl TransactionService for MockTxService {
    fn estimate_initial_fee(&self) -> BoxFuture<'_, TxResult<InitialFee>> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .fee
            .clone()
            .ok_or_else(|| TxError::Rpc(self.fail_message.clone()));
        Box::pin(async move { result })
    }

    fn create_transfer(&self, input: TransferInput) -> BoxFuture<'_, TxResult<CreatedTransfer>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.captured_inputs.lock().unwrap().push(input);
        let result = self
            .transfer
            .clone()
            .ok_or_else(|| TxError::Rpc(self.fail_message.clone()));
        Box::pin(async move { result })
    }
}

/// The estimation payload from scenario-style tests.
pub fn initial_fee() -> InitialFee {
    InitialFee {
        max_fee: U256::from(100),
        regular_tip: U256::from(1),
        fast_tip: U256::from(5),
        base_asset_id: "0x00".to_string(),
    }
}

pub fn created_transfer() -> CreatedTransfer {
    CreatedTransfer {
        transaction_request: TransactionRequest::default(),
        provider_url: "https://node".to_string(),
        address: "0xabc".to_string(),
        max_fee: U256::from(120),
        gas_limit: U256::from(21_000),
    }
}

/// Sink that records delivered batches and can be told to fail. Attempts
/// are counted whether or not delivery succeeds.
#[allow(dead_code)]
pub struct RecordingSink {
    pub fail: bool,
    pub attempts: AtomicU32,
    pub batches: Mutex<Vec<Vec<StoredError>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn accepting() -> Self {
        Self {
            fail: false,
            attempts: AtomicU32::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            attempts: AtomicU32::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }
}

impl TelemetrySink for RecordingSink {
    fn report<'a>(&'a self, errors: &'a [StoredError]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SinkError::Transport("sink offline".to_string()));
            }
            self.batches.lock().unwrap().push(errors.to_vec());
            Ok(())
        })
    }
}
