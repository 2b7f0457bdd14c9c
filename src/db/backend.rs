//! Storage backend abstraction
//!
//! The record store talks to its table through [`RoastBackend`], so the
//! DynamoDB client is injected rather than reached through global state and
//! tests can run against [`InMemoryBackend`](crate::db::InMemoryBackend).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::db::fields::{AttributeFilter, RoastUpdate};
use crate::db::models::CoffeeRoastRecord;
use crate::error::Result;

/// What `insert` does when the key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatePolicy {
    /// Fail with `AlreadyExists`
    #[default]
    Reject,
    /// Replace the stored record
    Overwrite,
}

/// Lazy, finite sequence of records produced by a scan
pub type RecordStream<'a> = BoxStream<'a, Result<CoffeeRoastRecord>>;

/// Raw table operations for coffee roast records.
///
/// Absence is reported through `Option`/`bool` here; turning it into
/// `NotFound` is the repository's job.
#[async_trait]
pub trait RoastBackend: Send + Sync {
    /// Store a record. Returns `true` if an existing record was replaced.
    async fn insert(&self, record: &CoffeeRoastRecord, policy: CreatePolicy) -> Result<bool>;

    /// Fetch a record by roast name
    async fn fetch(&self, roast_name: &str) -> Result<Option<CoffeeRoastRecord>>;

    /// Apply a partial update to an existing record, returning the new state.
    /// `None` if the record does not exist.
    async fn modify(
        &self,
        roast_name: &str,
        update: &RoastUpdate,
    ) -> Result<Option<CoffeeRoastRecord>>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn remove(&self, roast_name: &str) -> Result<bool>;

    /// Scan every record, optionally keeping only those matching `filter`.
    /// Each call starts a fresh scan.
    fn scan(&self, filter: Option<AttributeFilter>) -> RecordStream<'_>;

    /// Short label for logs (table name or backend kind)
    fn describe(&self) -> String;
}
