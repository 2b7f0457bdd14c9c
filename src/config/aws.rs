//! AWS SDK configuration
//!
//! This module builds the DynamoDB client used by the record store,
//! supporting custom endpoints for local development and testing.

use aws_config::{
    meta::region::RegionProviderChain, retry::RetryConfig as SdkRetryConfig,
    timeout::TimeoutConfig, BehaviorVersion, Region, SdkConfig,
};
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use std::time::Duration;

use crate::config::Settings;

/// Connect timeout applied to every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// AWS configuration builder
///
/// Creates AWS SDK configuration with support for:
/// - Custom regions
/// - Credential providers (environment, instance profile, etc.)
/// - Custom endpoint URLs for local testing
/// - An explicit per-operation timeout
///
/// SDK-level retries are disabled; retrying is done by the record store so
/// that only connection failures are retried.
pub struct AwsConfigBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AwsConfigBuilder<'a> {
    /// Create a new AWS configuration builder
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Timeouts derived from settings
    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .operation_timeout(Duration::from_secs(self.settings.request_timeout_seconds))
            .build()
    }

    /// Build the base AWS SDK configuration
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(Region::new(self.settings.aws_region.clone()))
                .or_default_provider();

        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .timeout_config(self.timeout_config())
            .retry_config(SdkRetryConfig::disabled())
            .load()
            .await
    }

    /// Create a DynamoDB client with optional custom endpoint
    ///
    /// If `DYNAMODB_ENDPOINT_URL` is set in settings, the client will use
    /// that endpoint (useful for DynamoDB Local or LocalStack).
    pub async fn build_dynamodb_client(&self) -> DynamoDbSdkClient {
        let sdk_config = self.build_sdk_config().await;

        if let Some(endpoint_url) = &self.settings.dynamodb_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom DynamoDB endpoint");

            let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint_url)
                .build();

            DynamoDbSdkClient::from_conf(dynamodb_config)
        } else {
            DynamoDbSdkClient::new(&sdk_config)
        }
    }
}

/// Build AWS SDK config from settings (convenience function)
pub async fn build_aws_config(settings: &Settings) -> SdkConfig {
    AwsConfigBuilder::new(settings).build_sdk_config().await
}

/// Create a DynamoDB client from settings (convenience function)
pub async fn create_dynamodb_client(settings: &Settings) -> DynamoDbSdkClient {
    AwsConfigBuilder::new(settings).build_dynamodb_client().await
}
