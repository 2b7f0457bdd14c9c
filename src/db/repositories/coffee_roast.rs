//! Coffee roast repository
//!
//! Data access layer for coffee roast records. Works against any
//! [`RoastBackend`]; production code hands it a [`DynamoDbClient`](crate::db::DynamoDbClient).

use futures::TryStreamExt;
use std::sync::Arc;

use crate::db::backend::{CreatePolicy, RecordStream, RoastBackend};
use crate::db::fields::{AttributeFilter, RoastField, RoastUpdate};
use crate::db::models::{validate_roast_name, CoffeeRoastRecord};
use crate::error::{Result, StoreError};

/// Repository for coffee roast records
pub struct CoffeeRoastRepository<B: RoastBackend> {
    backend: Arc<B>,
    policy: CreatePolicy,
}

impl<B: RoastBackend> Clone for CoffeeRoastRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            policy: self.policy,
        }
    }
}

impl<B: RoastBackend> CoffeeRoastRepository<B> {
    /// Create a new repository that rejects duplicate creates
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            policy: CreatePolicy::default(),
        }
    }

    /// Set what `create` does when the roast name is already taken
    pub fn with_create_policy(mut self, policy: CreatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn create_policy(&self) -> CreatePolicy {
        self.policy
    }

    /// Store a new record and return it as stored
    pub async fn create(&self, record: CoffeeRoastRecord) -> Result<CoffeeRoastRecord> {
        validate_roast_name(&record.roast_name)?;

        let replaced = self.backend.insert(&record, self.policy).await?;

        tracing::info!(
            roast_name = %record.roast_name,
            table = %self.backend.describe(),
            replaced,
            "Created coffee roast record"
        );

        Ok(record)
    }

    /// Get a record by roast name
    pub async fn get(&self, roast_name: &str) -> Result<CoffeeRoastRecord> {
        validate_roast_name(roast_name)?;

        let record = self
            .backend
            .fetch(roast_name)
            .await?
            .ok_or_else(|| StoreError::not_found(roast_name))?;

        tracing::debug!(
            roast_name = %roast_name,
            table = %self.backend.describe(),
            "Fetched coffee roast record"
        );

        Ok(record)
    }

    /// Apply a partial update and return the record after the change.
    ///
    /// Fields not named in `update` keep their stored values.
    pub async fn update(&self, roast_name: &str, update: &RoastUpdate) -> Result<CoffeeRoastRecord> {
        validate_roast_name(roast_name)?;
        update.validate()?;

        let record = self
            .backend
            .modify(roast_name, update)
            .await?
            .ok_or_else(|| StoreError::not_found(roast_name))?;

        tracing::info!(
            roast_name = %roast_name,
            table = %self.backend.describe(),
            fields = ?update.field_names(),
            "Updated coffee roast record"
        );

        Ok(record)
    }

    /// Delete a record. Fails with `NotFound` if it does not exist.
    pub async fn delete(&self, roast_name: &str) -> Result<()> {
        validate_roast_name(roast_name)?;

        if !self.backend.remove(roast_name).await? {
            return Err(StoreError::not_found(roast_name));
        }

        tracing::info!(
            roast_name = %roast_name,
            table = %self.backend.describe(),
            "Deleted coffee roast record"
        );

        Ok(())
    }

    /// Every record in the table, in no particular order.
    ///
    /// Each call starts a new scan.
    pub fn list_all(&self) -> RecordStream<'_> {
        tracing::debug!(table = %self.backend.describe(), "Listing coffee roast records");
        self.backend.scan(None)
    }

    /// Records whose `field_name` attribute equals `value` exactly
    pub fn find_by(&self, field_name: &str, value: &str) -> Result<RecordStream<'_>> {
        let field: RoastField = field_name.parse()?;
        self.find_by_field(field, value)
    }

    pub fn find_by_field(&self, field: RoastField, value: &str) -> Result<RecordStream<'_>> {
        let filter = AttributeFilter::equals(field, value)?;

        tracing::debug!(
            table = %self.backend.describe(),
            field = %field,
            value = %value,
            "Scanning coffee roast records by attribute"
        );

        Ok(self.backend.scan(Some(filter)))
    }

    /// Number of records in the table (full scan)
    pub async fn count(&self) -> Result<usize> {
        self.list_all()
            .try_fold(0usize, |count, _| async move { Ok::<_, StoreError>(count + 1) })
            .await
    }
}
