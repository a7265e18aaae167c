//! Wallet Orchestration Core
//!
//! Finite-state machines that sequence the wallet's multi-step asynchronous
//! flows (sending a transaction, reporting captured errors) against external
//! services: an RPC provider, persistent error storage, and a telemetry sink.

pub mod config;
pub mod flows;
pub mod lifecycle;
pub mod machine;
pub mod observability;
pub mod resilience;
pub mod services;
pub mod store;

pub use config::WalletConfig;
pub use lifecycle::Shutdown;
pub use store::Store;
