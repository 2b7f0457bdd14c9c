//! Coffee roast record store library

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod utils;

// Re-export commonly used types
pub use config::{Environment, EnvironmentResolver, Settings};
pub use db::{CoffeeRoastRecord, CoffeeRoastRepository, DynamoDbClient, InMemoryBackend};
pub use error::{Result, StoreError};
