//! In-memory backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::backend::{CreatePolicy, RecordStream, RoastBackend};
use crate::db::fields::{AttributeFilter, RoastUpdate};
use crate::db::models::CoffeeRoastRecord;
use crate::error::{Result, StoreError};

/// In-memory storage backend for testing and dry runs.
///
/// Data is not persisted and is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    records: Arc<RwLock<HashMap<String, CoffeeRoastRecord>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RoastBackend for InMemoryBackend {
    async fn insert(&self, record: &CoffeeRoastRecord, policy: CreatePolicy) -> Result<bool> {
        let mut records = self.records.write().await;
        let exists = records.contains_key(&record.roast_name);
        if exists && policy == CreatePolicy::Reject {
            return Err(StoreError::already_exists(&record.roast_name));
        }
        records.insert(record.roast_name.clone(), record.clone());
        Ok(exists)
    }

    async fn fetch(&self, roast_name: &str) -> Result<Option<CoffeeRoastRecord>> {
        Ok(self.records.read().await.get(roast_name).cloned())
    }

    async fn modify(
        &self,
        roast_name: &str,
        update: &RoastUpdate,
    ) -> Result<Option<CoffeeRoastRecord>> {
        let mut records = self.records.write().await;
        let Some(stored) = records.get(roast_name) else {
            return Ok(None);
        };

        // Apply to a copy so a rejected value leaves the stored record intact
        let mut updated = stored.clone();
        updated.apply(update)?;
        records.insert(roast_name.to_string(), updated.clone());
        Ok(Some(updated))
    }

    async fn remove(&self, roast_name: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(roast_name).is_some())
    }

    fn scan(&self, filter: Option<AttributeFilter>) -> RecordStream<'_> {
        let records = Arc::clone(&self.records);
        Box::pin(async_stream::stream! {
            // Snapshot so the lock is not held while the caller consumes
            let snapshot: Vec<CoffeeRoastRecord> = records.read().await.values().cloned().collect();
            for record in snapshot {
                if filter.as_ref().map_or(true, |f| f.matches(&record)) {
                    yield Ok(record);
                }
            }
        })
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
