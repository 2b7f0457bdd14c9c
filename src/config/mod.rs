//! Configuration management module
//!
//! This module handles loading and validating application configuration
//! from environment variables and .env files, and resolving the deployment
//! environment into table parameters.

pub mod aws;
pub mod environment;
pub mod settings;

pub use aws::{build_aws_config, create_dynamodb_client, AwsConfigBuilder};
pub use environment::{
    CapacityProfile, Environment, EnvironmentProfile, EnvironmentResolver, DEFAULT_REGION,
    DEFAULT_TABLE_BASE_NAME,
};
pub use settings::Settings;
