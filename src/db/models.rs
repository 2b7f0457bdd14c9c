//! DynamoDB data models
//!
//! This module defines the coffee roast record stored in the roast table.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::fields::{FieldValue, RoastField, RoastUpdate};
use crate::error::{Result, StoreError};

/// Partition key attribute of the roast table
pub const PARTITION_KEY: &str = "roast_name";

/// A coffee roast record.
///
/// Stored in the roast table with `roast_name` as partition key. Optional
/// fields that are `None` are not written to the item at all, so "unknown"
/// and "explicitly blank" stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoffeeRoastRecord {
    /// Roast name (partition key)
    pub roast_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roast_date: Option<DateTime<Utc>>,

    /// Flavour characteristics, in the order they were given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavour_notes: Option<Vec<String>>,

    /// Vendor or roaster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,

    /// Coffee variety (e.g., "Red Catuai", "Bourbon")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,

    /// Processing method (e.g., "washed", "natural")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// S3 path of the bag photo the record was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_s3_path: Option<String>,
}

impl CoffeeRoastRecord {
    /// Create a record with only the roast name set
    pub fn new(roast_name: impl Into<String>) -> Self {
        Self {
            roast_name: roast_name.into(),
            ..Default::default()
        }
    }

    /// Current value of a field
    pub fn field(&self, field: RoastField) -> FieldValue {
        fn text(value: &Option<String>) -> FieldValue {
            value.clone().map(FieldValue::Text).unwrap_or(FieldValue::Unset)
        }

        match field {
            RoastField::CountryOfOrigin => text(&self.country_of_origin),
            RoastField::RoastDate => self.roast_date.map(FieldValue::Date).unwrap_or(FieldValue::Unset),
            RoastField::FlavourNotes => self
                .flavour_notes
                .clone()
                .map(FieldValue::Notes)
                .unwrap_or(FieldValue::Unset),
            RoastField::VendorName => text(&self.vendor_name),
            RoastField::Variety => text(&self.variety),
            RoastField::Process => text(&self.process),
            RoastField::Producer => text(&self.producer),
            RoastField::ImageS3Path => text(&self.image_s3_path),
        }
    }

    /// Assign a field; the value must match the field's shape
    pub fn set_field(&mut self, field: RoastField, value: FieldValue) -> Result<()> {
        value.check(field)?;

        let text_slot = match field {
            RoastField::CountryOfOrigin => &mut self.country_of_origin,
            RoastField::VendorName => &mut self.vendor_name,
            RoastField::Variety => &mut self.variety,
            RoastField::Process => &mut self.process,
            RoastField::Producer => &mut self.producer,
            RoastField::ImageS3Path => &mut self.image_s3_path,
            RoastField::RoastDate => {
                self.roast_date = match value {
                    FieldValue::Date(date) => Some(date),
                    _ => None,
                };
                return Ok(());
            }
            RoastField::FlavourNotes => {
                self.flavour_notes = match value {
                    FieldValue::Notes(notes) => Some(notes),
                    _ => None,
                };
                return Ok(());
            }
        };

        *text_slot = match value {
            FieldValue::Text(text) => Some(text),
            _ => None,
        };
        Ok(())
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: &RoastUpdate) -> Result<()> {
        update
            .iter()
            .try_for_each(|(field, value)| self.set_field(field, value.clone()))
    }

    /// Convert to DynamoDB item
    pub fn to_dynamodb(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert(
            PARTITION_KEY.to_string(),
            AttributeValue::S(self.roast_name.clone()),
        );

        for field in RoastField::ALL {
            if let Some(value) = self.field(field).to_attribute_value() {
                item.insert(field.attribute_name().to_string(), value);
            }
        }

        item
    }

    /// Parse from DynamoDB item
    pub fn from_dynamodb(item: &HashMap<String, AttributeValue>) -> Result<Self> {
        let roast_name = item
            .get(PARTITION_KEY)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| StoreError::Corrupt(format!("item is missing {}", PARTITION_KEY)))?;

        let mut record = Self::new(roast_name.clone());
        for field in RoastField::ALL {
            if let Some(attr) = item.get(field.attribute_name()) {
                // Attributes explicitly stored as NULL read back as not set
                if matches!(attr, AttributeValue::Null(_)) {
                    continue;
                }
                let value = FieldValue::from_attribute_value(field, attr)?;
                record.set_field(field, value)?;
            }
        }

        Ok(record)
    }
}

/// Reject empty or whitespace-only roast names
pub fn validate_roast_name(roast_name: &str) -> Result<()> {
    if roast_name.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "roast_name must not be empty".to_string(),
        ));
    }
    Ok(())
}
