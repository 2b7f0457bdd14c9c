//! Utility modules
//!
//! Contains retry logic for store requests.

pub mod retry;

pub use retry::{retry_with_backoff, RetryConfig, RetryResult};
