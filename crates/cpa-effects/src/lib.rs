//! # CPA Effects - Production Handlers
//!
//! Stateless production implementations of the `cpa-core` effect traits.
//! Test doubles live in `cpa-testkit`.

#![forbid(unsafe_code)]

pub mod file_store;
pub mod time;

pub use file_store::{LocalFileStoreHandler, LocalFileStoreSession};
pub use time::RealClockHandler;
