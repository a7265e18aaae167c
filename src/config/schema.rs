//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the wallet orchestration layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// RPC provider settings used by the transaction service.
    pub provider: ProviderConfig,

    /// Error reporting settings (store, sink, polling).
    pub reporting: ReportingConfig,

    /// Retry settings for the send flow's invoked services.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// RPC provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID for replay protection.
    pub chain_id: u64,

    /// Refuse to build transactions above this gas price.
    pub max_gas_price_gwei: u64,

    /// Identifier of the chain's base asset.
    pub base_asset_id: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 1,
            max_gas_price_gwei: 500,
            base_asset_id: "0x0000000000000000000000000000000000000000".to_string(),
        }
    }
}

/// Error reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Whether batches are actually delivered to the telemetry endpoint.
    pub enabled: bool,

    /// Telemetry endpoint receiving error batches.
    pub endpoint: String,

    /// Environment tag attached to every batch.
    pub environment: String,

    /// Release tag attached to every batch.
    pub release: String,

    /// Idle delay before the reporting flow re-checks the store.
    pub poll_interval_ms: u64,

    /// Path of the JSON file backing the error store. In-memory when unset.
    pub store_path: Option<String>,

    /// Attempts per invoked reporting service call.
    pub max_attempts: u32,

    /// Total time allowed for one batch delivery request.
    pub request_timeout_ms: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            environment: "development".to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            poll_interval_ms: 5_000,
            store_path: None,
            max_attempts: 1,
            request_timeout_ms: 10_000,
        }
    }
}

/// Retry configuration for the send flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per invoked service call, including the first.
    pub max_attempts: u32,

    /// Base delay between attempts.
    pub base_delay_ms: u64,

    /// Delay cap.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Whether to expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Bind address for the metrics exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9301".to_string(),
        }
    }
}
