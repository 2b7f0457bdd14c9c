//! Extraction payload
//!
//! The JSON object produced by the photo extraction agent. Field shapes are
//! checked here before the payload becomes a [`CoffeeRoastRecord`].

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::{parse_roast_date, CoffeeRoastRecord};
use crate::error::StoreError;

/// Coffee bean data extracted from a bag photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RoastPayload {
    /// Name of the coffee roast/product
    #[serde(alias = "coffee_roast_name")]
    #[validate(length(min = 1, message = "roast_name must not be empty"))]
    pub roast_name: String,

    #[serde(default)]
    pub country_of_origin: Option<String>,

    /// ISO date (`YYYY-MM-DD`) or RFC 3339 timestamp; null if not visible
    #[serde(default)]
    pub roast_date: Option<String>,

    #[serde(default)]
    pub flavour_notes: Option<Vec<String>>,

    #[serde(default)]
    pub vendor_name: Option<String>,

    #[serde(default)]
    pub variety: Option<String>,

    #[serde(default)]
    pub process: Option<String>,

    #[serde(default)]
    pub producer: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_s3_path"))]
    pub image_s3_path: Option<String>,
}

fn validate_s3_path(path: &str) -> Result<(), ValidationError> {
    if path.starts_with("s3://") && path.len() > "s3://".len() {
        Ok(())
    } else {
        let mut err = ValidationError::new("s3_path");
        err.message = Some("image_s3_path must be an s3:// URI".into());
        Err(err)
    }
}

impl RoastPayload {
    /// Parse a payload from a JSON document
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidInput(format!("invalid roast payload: {}", e)))
    }
}

impl TryFrom<RoastPayload> for CoffeeRoastRecord {
    type Error = StoreError;

    fn try_from(payload: RoastPayload) -> Result<Self, Self::Error> {
        payload
            .validate()
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;

        let roast_date = payload
            .roast_date
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(parse_roast_date)
            .transpose()?;

        Ok(CoffeeRoastRecord {
            roast_name: payload.roast_name,
            country_of_origin: payload.country_of_origin,
            roast_date,
            flavour_notes: payload.flavour_notes,
            vendor_name: payload.vendor_name,
            variety: payload.variety,
            process: payload.process,
            producer: payload.producer,
            image_s3_path: payload.image_s3_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const EXTRACTED: &str = r#"{
        "coffee_roast_name": "Finca El Injerto",
        "country_of_origin": "Guatemala",
        "roast_date": "2024-05-14",
        "flavour_notes": ["chocolate", "stone fruit"],
        "vendor_name": "Onyx",
        "variety": "Bourbon",
        "process": "washed",
        "producer": "Aguirre family",
        "image_s3_path": "s3://coffee-bags/injerto.jpg"
    }"#;

    #[test]
    fn test_extracted_payload_converts() {
        let payload = RoastPayload::from_json(EXTRACTED).unwrap();
        assert_eq!(payload.roast_name, "Finca El Injerto");

        let record = CoffeeRoastRecord::try_from(payload).unwrap();
        assert_eq!(
            record.roast_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(record.flavour_notes.unwrap(), vec!["chocolate", "stone fruit"]);
        assert_eq!(record.image_s3_path.as_deref(), Some("s3://coffee-bags/injerto.jpg"));
    }

    #[test]
    fn test_missing_fields_stay_unset() {
        let payload = RoastPayload::from_json(r#"{"roast_name": "Kenya AA", "roast_date": null}"#).unwrap();
        let record = CoffeeRoastRecord::try_from(payload).unwrap();

        assert_eq!(record, CoffeeRoastRecord::new("Kenya AA"));
    }

    #[test]
    fn test_empty_roast_name_is_rejected() {
        let payload = RoastPayload {
            roast_name: String::new(),
            ..RoastPayload::default()
        };
        assert!(payload.validate().is_err());
        assert!(matches!(
            CoffeeRoastRecord::try_from(payload),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_image_path_must_be_s3() {
        let payload = RoastPayload {
            roast_name: "Sumatra".to_string(),
            image_s3_path: Some("https://example.com/bag.jpg".to_string()),
            ..RoastPayload::default()
        };
        assert!(payload.validate().is_err());
        assert!(CoffeeRoastRecord::try_from(payload).is_err());
    }

    #[test]
    fn test_bad_roast_date_is_invalid_input() {
        let payload = RoastPayload {
            roast_name: "Sumatra".to_string(),
            roast_date: Some("last Tuesday".to_string()),
            ..RoastPayload::default()
        };
        assert!(matches!(
            CoffeeRoastRecord::try_from(payload),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RoastPayload::from_json("{\"roast_name\": 3}"),
            Err(StoreError::InvalidInput(_))
        ));
    }
}
