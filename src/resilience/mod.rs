//! Resilience primitives for invoked services.
//!
//! # Design Decisions
//! - Retry bounds live here, not in the machines: a transition table never
//!   contains exception handling
//! - Backoff is opt-in and jittered; the fetch wrapper imposes none itself

pub mod backoff;
pub mod fetch;

pub use fetch::{fetch, has_error, BackoffPolicy, FetchError, FetchOptions, FetchResult};
