//! Error types
//!
//! Every failure of the record store surfaces as a [`StoreError`] variant so
//! callers can match on the exact failure.

mod types;

pub use types::{Result, StoreError};
