//! Transaction building and fee estimation.
//!
//! # Responsibilities
//! - Estimate the initial max fee and the two tip presets
//! - Build a transfer request ready for signing and submission
//!
//! # Design Decisions
//! - Gas limit is computed, not estimated over RPC: base transfer cost plus
//!   a per-byte charge for calldata
//! - The configured gas-price ceiling is enforced here, so the machines
//!   never see a transaction that violates configuration
//! - All amounts are big integers; no floating point anywhere in the flow

use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::ProviderConfig;

/// Base cost of a plain value transfer.
const TRANSFER_GAS: u64 = 21_000;

/// Simplified calldata charge per byte.
const CALLDATA_GAS_PER_BYTE: u64 = 16;

/// Fast tip premium over the node's suggested priority fee.
const FAST_TIP_MULTIPLIER: u128 = 2;

/// Errors from the transaction service.
#[derive(Debug, Error)]
pub enum TxError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Gas price exceeded the configured maximum.
    #[error("gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Transfer input rejected before any RPC call.
    #[error("invalid transfer input: {0}")]
    InvalidInput(String),
}

pub type TxResult<T> = Result<T, TxError>;

/// Result of the initial fee estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialFee {
    pub max_fee: U256,
    pub regular_tip: U256,
    pub fast_tip: U256,
    pub base_asset_id: String,
}

/// Input for building a transfer: the UI's fields plus the tip the machine
/// selects from the current fee tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInput {
    pub to: Address,
    pub amount: U256,
    pub tip: Option<U256>,
    pub data: Bytes,
}

impl TransferInput {
    pub fn new(to: Address, amount: U256) -> Self {
        Self {
            to,
            amount,
            tip: None,
            data: Bytes::new(),
        }
    }
}

/// A built transfer waiting for confirmation.
#[derive(Debug, Clone)]
pub struct CreatedTransfer {
    pub transaction_request: TransactionRequest,
    pub provider_url: String,
    pub address: String,
    pub max_fee: U256,
    pub gas_limit: U256,
}

/// Contract the send flow invokes. Object-safe so tests can substitute a
/// programmable mock.
pub trait TransactionService: Send + Sync + 'static {
    fn estimate_initial_fee(&self) -> BoxFuture<'_, TxResult<InitialFee>>;
    fn create_transfer(&self, input: TransferInput) -> BoxFuture<'_, TxResult<CreatedTransfer>>;
}

/// Transaction service over an alloy HTTP provider.
pub struct RpcTxService {
    provider: Arc<dyn Provider + Send + Sync>,
    config: ProviderConfig,
    sender: Address,
}

impl RpcTxService {
    /// Connect to the configured RPC endpoint. `sender` is the wallet
    /// address transfers are built from.
    pub fn connect(config: ProviderConfig, sender: Address) -> TxResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|err| {
            TxError::Rpc(format!("invalid RPC URL '{}': {}", config.rpc_url, err))
        })?;
        let provider =
            Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            "transaction service connected"
        );

        Ok(Self {
            provider,
            config,
            sender,
        })
    }

    /// Current gas price, checked against the configured ceiling.
    async fn gas_price(&self) -> TxResult<u128> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|err| TxError::Rpc(err.to_string()))?;

        let gwei = (price / 1_000_000_000) as u64;
        if gwei > self.config.max_gas_price_gwei {
            return Err(TxError::GasPriceTooHigh {
                current_gwei: gwei,
                max_gwei: self.config.max_gas_price_gwei,
            });
        }
        Ok(price)
    }
}

impl TransactionService for RpcTxService {
    fn estimate_initial_fee(&self) -> BoxFuture<'_, TxResult<InitialFee>> {
        Box::pin(async move {
            let gas_price = self.gas_price().await?;
            let regular_tip = self
                .provider
                .get_max_priority_fee_per_gas()
                .await
                .map_err(|err| TxError::Rpc(err.to_string()))?;
            let fast_tip = regular_tip.saturating_mul(FAST_TIP_MULTIPLIER);
            let max_fee = gas_price
                .saturating_add(fast_tip)
                .saturating_mul(TRANSFER_GAS as u128);

            Ok(InitialFee {
                max_fee: U256::from(max_fee),
                regular_tip: U256::from(regular_tip),
                fast_tip: U256::from(fast_tip),
                base_asset_id: self.config.base_asset_id.clone(),
            })
        })
    }

    fn create_transfer(&self, input: TransferInput) -> BoxFuture<'_, TxResult<CreatedTransfer>> {
        Box::pin(async move {
            if input.amount.is_zero() {
                return Err(TxError::InvalidInput("amount must be positive".to_string()));
            }

            let gas_price = self.gas_price().await?;
            let tip: u128 = input.tip.unwrap_or_default().saturating_to();
            let nonce = self
                .provider
                .get_transaction_count(self.sender)
                .await
                .map_err(|err| TxError::Rpc(err.to_string()))?;

            let gas_limit = gas_limit_for(&input.data);
            let max_fee_per_gas = gas_price.saturating_add(tip);

            let transaction_request = TransactionRequest::default()
                .with_from(self.sender)
                .with_to(input.to)
                .with_value(input.amount)
                .with_input(input.data)
                .with_nonce(nonce)
                .with_chain_id(self.config.chain_id)
                .with_gas_limit(gas_limit)
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(tip);

            tracing::debug!(
                to = %input.to,
                amount = %input.amount,
                gas_limit,
                "transfer built"
            );

            Ok(CreatedTransfer {
                transaction_request,
                provider_url: self.config.rpc_url.clone(),
                address: self.sender.to_string(),
                max_fee: U256::from(max_fee_per_gas).saturating_mul(U256::from(gas_limit)),
                gas_limit: U256::from(gas_limit),
            })
        })
    }
}

fn gas_limit_for(data: &Bytes) -> u64 {
    TRANSFER_GAS + data.len() as u64 * CALLDATA_GAS_PER_BYTE
}
