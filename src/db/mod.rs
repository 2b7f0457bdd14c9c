//! Database module
//!
//! Contains the record model, storage backends and the data access layer.

pub mod backend;
pub mod dynamodb;
pub mod error;
pub mod fields;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::{CreatePolicy, RecordStream, RoastBackend};
pub use dynamodb::DynamoDbClient;
pub use fields::{parse_roast_date, AttributeFilter, FieldKind, FieldValue, RoastField, RoastUpdate};
pub use memory::InMemoryBackend;
pub use models::{validate_roast_name, CoffeeRoastRecord, PARTITION_KEY};
pub use repositories::CoffeeRoastRepository;
