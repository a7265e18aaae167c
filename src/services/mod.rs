//! Domain service façades.
//!
//! # Design Decisions
//! - Services are thin typed clients over an external dependency (RPC
//!   provider, error store, telemetry sink)
//! - Stateless apart from connection-level handles; safe to invoke
//!   repeatedly without external locking
//! - Failures are plain `Result`s; the resilience layer shapes them into
//!   transition data for machine consumption

pub mod error_store;
pub mod report_error;
pub mod sink;
pub mod tx;

pub use error_store::{ErrorStore, StoredError};
pub use report_error::ReportErrorService;
pub use sink::{HttpSink, NoopSink, TelemetrySink};
pub use tx::{CreatedTransfer, InitialFee, RpcTxService, TransactionService, TransferInput};
