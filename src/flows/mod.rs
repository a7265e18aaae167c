//! Wallet flow machines.
//!
//! # Data Flow
//! ```text
//! UI events ──▶ send flow ──────▶ transaction service (estimate, build)
//!                 │                        │
//!                 └── SubmitRequest ──▶ host submission channel
//!
//! UI events ──▶ report-error flow ──▶ error store + telemetry sink
//!                 ▲
//!                 └── idle timer (re-check the store every poll interval)
//! ```

pub mod report_error;
pub mod send;
