//! DynamoDB client wrapper
//!
//! This module provides a wrapper around the AWS DynamoDB SDK client
//! bound to one coffee roast table, and implements [`RoastBackend`] on it.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use std::collections::HashMap;
use std::future::Future;

use crate::config::EnvironmentProfile;
use crate::db::backend::{CreatePolicy, RecordStream, RoastBackend};
use crate::db::error::{is_conditional_check_failed, map_sdk_error};
use crate::db::fields::{AttributeFilter, RoastUpdate};
use crate::db::models::{CoffeeRoastRecord, PARTITION_KEY};
use crate::error::{Result, StoreError};
use crate::utils::retry::{retry_with_backoff, RetryConfig};

/// Placeholder for the partition key in condition expressions
const KEY_NAME: &str = "#pk";

/// DynamoDB client wrapper for the coffee roast table.
///
/// The SDK client is passed in by the caller; nothing here reads global
/// configuration.
#[derive(Clone)]
pub struct DynamoDbClient {
    /// AWS DynamoDB SDK client
    client: DynamoDbSdkClient,

    /// Table holding the roast records
    table_name: String,

    /// Backoff applied to connection failures
    retry: RetryConfig,
}

impl DynamoDbClient {
    /// Create a new DynamoDB client bound to `table_name`.
    pub fn new(client: DynamoDbSdkClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            retry: RetryConfig::dynamodb(),
        }
    }

    /// Create a client for the table of a resolved environment
    pub fn for_profile(client: DynamoDbSdkClient, profile: &EnvironmentProfile) -> Self {
        Self::new(client, &profile.table_name)
    }

    /// Replace the retry configuration
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the roast table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Check if the DynamoDB connection is healthy
    ///
    /// Performs a simple list_tables operation to verify connectivity.
    pub async fn health_check(&self) -> bool {
        match self.client.list_tables().limit(1).send().await {
            Ok(_) => {
                tracing::debug!("DynamoDB health check passed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "DynamoDB health check failed");
                false
            }
        }
    }

    /// Verify the roast table exists, returning its status.
    ///
    /// Fails with [`StoreError::TableNotFound`] if it has not been provisioned.
    pub async fn ensure_table(&self) -> Result<String> {
        let output = self
            .with_retry("describe_table", || async move {
                self.client
                    .describe_table()
                    .table_name(&self.table_name)
                    .send()
                    .await
                    .map_err(|e| map_sdk_error(e, &self.table_name))
            })
            .await?;

        let status = output
            .table()
            .and_then(|t| t.table_status())
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        tracing::debug!(table = %self.table_name, status = %status, "Table found");
        Ok(status)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = retry_with_backoff(&self.retry, StoreError::is_retryable, f).await;
        if outcome.attempts > 1 {
            tracing::debug!(
                table = %self.table_name,
                operation,
                attempts = outcome.attempts,
                total_delay_ms = outcome.total_delay.as_millis() as u64,
                succeeded = outcome.result.is_ok(),
                "DynamoDB request retried"
            );
        }
        outcome.result
    }

    fn key(roast_name: &str) -> (String, AttributeValue) {
        (
            PARTITION_KEY.to_string(),
            AttributeValue::S(roast_name.to_string()),
        )
    }
}

#[async_trait]
impl RoastBackend for DynamoDbClient {
    async fn insert(&self, record: &CoffeeRoastRecord, policy: CreatePolicy) -> Result<bool> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_dynamodb()));

        request = match policy {
            CreatePolicy::Reject => request
                .condition_expression(format!("attribute_not_exists({})", KEY_NAME))
                .expression_attribute_names(KEY_NAME, PARTITION_KEY),
            CreatePolicy::Overwrite => request.return_values(ReturnValue::AllOld),
        };

        let mut attempt = 0u32;
        let outcome = self
            .with_retry("put_item", || {
                attempt += 1;
                let retried = attempt > 1;
                let request = request.clone();
                async move {
                    match request.send().await {
                        Ok(output) => Ok(Conditional::Applied(output)),
                        Err(e) if is_conditional_check_failed(&e) => {
                            Ok(Conditional::Rejected { retried })
                        }
                        Err(e) => Err(map_sdk_error(e, &self.table_name)),
                    }
                }
            })
            .await?;

        match outcome {
            Conditional::Applied(output) => {
                Ok(output.attributes().is_some_and(|old| !old.is_empty()))
            }
            Conditional::Rejected { retried: false } => {
                Err(StoreError::already_exists(&record.roast_name))
            }
            Conditional::Rejected { retried: true } => {
                // An earlier attempt may have stored this very record
                match self.fetch(&record.roast_name).await? {
                    Some(stored) if stored == *record => {
                        tracing::debug!(
                            table = %self.table_name,
                            roast_name = %record.roast_name,
                            "Put applied by an earlier attempt"
                        );
                        Ok(false)
                    }
                    _ => Err(StoreError::already_exists(&record.roast_name)),
                }
            }
        }
    }

    async fn fetch(&self, roast_name: &str) -> Result<Option<CoffeeRoastRecord>> {
        let (key_name, key_value) = Self::key(roast_name);
        let request = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(key_name, key_value)
            .consistent_read(true);

        let output = self
            .with_retry("get_item", || {
                let request = request.clone();
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| map_sdk_error(e, &self.table_name))
                }
            })
            .await?;

        output
            .item
            .map(|item| CoffeeRoastRecord::from_dynamodb(&item))
            .transpose()
    }

    async fn modify(
        &self,
        roast_name: &str,
        update: &RoastUpdate,
    ) -> Result<Option<CoffeeRoastRecord>> {
        if update.is_empty() {
            return self.fetch(roast_name).await;
        }

        let expression = UpdateExpression::build(update);
        let (key_name, key_value) = Self::key(roast_name);
        let request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(key_name, key_value)
            .update_expression(expression.expression)
            .condition_expression(format!("attribute_exists({})", KEY_NAME))
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(
                (!expression.values.is_empty()).then_some(expression.values),
            )
            .return_values(ReturnValue::AllNew);

        let output = self
            .with_retry("update_item", || {
                let request = request.clone();
                async move {
                    match request.send().await {
                        Ok(output) => Ok(Some(output)),
                        Err(e) if is_conditional_check_failed(&e) => Ok(None),
                        Err(e) => Err(map_sdk_error(e, &self.table_name)),
                    }
                }
            })
            .await?;

        output
            .and_then(|o| o.attributes)
            .map(|item| CoffeeRoastRecord::from_dynamodb(&item))
            .transpose()
    }

    async fn remove(&self, roast_name: &str) -> Result<bool> {
        let (key_name, key_value) = Self::key(roast_name);
        let request = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(key_name, key_value)
            .condition_expression(format!("attribute_exists({})", KEY_NAME))
            .expression_attribute_names(KEY_NAME, PARTITION_KEY);

        let mut attempt = 0u32;
        let outcome = self
            .with_retry("delete_item", || {
                attempt += 1;
                let retried = attempt > 1;
                let request = request.clone();
                async move {
                    match request.send().await {
                        Ok(_) => Ok(Conditional::Applied(())),
                        Err(e) if is_conditional_check_failed(&e) => {
                            Ok(Conditional::Rejected { retried })
                        }
                        Err(e) => Err(map_sdk_error(e, &self.table_name)),
                    }
                }
            })
            .await?;

        match outcome {
            Conditional::Applied(()) => Ok(true),
            Conditional::Rejected { retried: false } => Ok(false),
            Conditional::Rejected { retried: true } => {
                // The item was present when the first attempt was sent
                tracing::debug!(
                    table = %self.table_name,
                    roast_name = %roast_name,
                    "Delete applied by an earlier attempt"
                );
                Ok(true)
            }
        }
    }

    fn scan(&self, filter: Option<AttributeFilter>) -> RecordStream<'_> {
        Box::pin(async_stream::stream! {
            let mut start_key: Option<HashMap<String, AttributeValue>> = None;
            let mut page = 0u32;

            loop {
                let mut request = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .consistent_read(true)
                    .set_exclusive_start_key(start_key.take());

                if let Some(filter) = &filter {
                    request = request
                        .filter_expression("#f = :v")
                        .expression_attribute_names("#f", filter.field().attribute_name())
                        .expression_attribute_values(":v", AttributeValue::S(filter.value().to_string()));
                }

                let result = self
                    .with_retry("scan", || {
                        let request = request.clone();
                        async move {
                            request
                                .send()
                                .await
                                .map_err(|e| map_sdk_error(e, &self.table_name))
                        }
                    })
                    .await;

                let output = match result {
                    Ok(output) => output,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                page += 1;
                tracing::trace!(
                    table = %self.table_name,
                    page,
                    count = output.count,
                    scanned = output.scanned_count,
                    "Scanned page"
                );

                let next_key = output.last_evaluated_key;
                for item in output.items.unwrap_or_default() {
                    yield CoffeeRoastRecord::from_dynamodb(&item);
                }

                match next_key {
                    Some(key) if !key.is_empty() => start_key = Some(key),
                    _ => break,
                }
            }
        })
    }

    fn describe(&self) -> String {
        self.table_name.clone()
    }
}

/// Outcome of a conditional write
enum Conditional<T> {
    Applied(T),
    /// The condition did not hold. `retried` is set when an earlier attempt
    /// failed in transit and may already have been applied.
    Rejected { retried: bool },
}

/// An `UpdateItem` expression with its placeholder maps
#[derive(Debug)]
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    /// `SET #f0 = :v0, ... REMOVE #f1, ...`; the partition key placeholder
    /// is always registered for the existence condition.
    fn build(update: &RoastUpdate) -> Self {
        let mut names = HashMap::from([(KEY_NAME.to_string(), PARTITION_KEY.to_string())]);
        let mut values = HashMap::new();
        let mut set_clauses = Vec::new();
        let mut remove_clauses = Vec::new();

        for (index, (field, value)) in update.iter().enumerate() {
            let name = format!("#f{}", index);
            names.insert(name.clone(), field.attribute_name().to_string());

            match value.to_attribute_value() {
                Some(attr) => {
                    let placeholder = format!(":v{}", index);
                    set_clauses.push(format!("{} = {}", name, placeholder));
                    values.insert(placeholder, attr);
                }
                None => remove_clauses.push(name),
            }
        }

        let mut parts = Vec::new();
        if !set_clauses.is_empty() {
            parts.push(format!("SET {}", set_clauses.join(", ")));
        }
        if !remove_clauses.is_empty() {
            parts.push(format!("REMOVE {}", remove_clauses.join(", ")));
        }

        Self {
            expression: parts.join(" "),
            names,
            values,
        }
    }
}
