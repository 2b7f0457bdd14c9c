//! Record fields, typed values, partial updates and attribute filters
//!
//! `roast_name` is deliberately absent from [`RoastField`]: it is the
//! partition key and never changes after creation.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{CoffeeRoastRecord, PARTITION_KEY};
use crate::error::{Result, StoreError};

/// Mutable attributes of a coffee roast record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoastField {
    CountryOfOrigin,
    RoastDate,
    FlavourNotes,
    VendorName,
    Variety,
    Process,
    Producer,
    ImageS3Path,
}

/// Shape of the value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Notes,
}

impl RoastField {
    pub const ALL: [RoastField; 8] = [
        RoastField::CountryOfOrigin,
        RoastField::RoastDate,
        RoastField::FlavourNotes,
        RoastField::VendorName,
        RoastField::Variety,
        RoastField::Process,
        RoastField::Producer,
        RoastField::ImageS3Path,
    ];

    /// Fields that `find_by` accepts
    pub const FILTERABLE: [RoastField; 5] = [
        RoastField::CountryOfOrigin,
        RoastField::VendorName,
        RoastField::Variety,
        RoastField::Process,
        RoastField::Producer,
    ];

    /// Attribute name in the table
    pub fn attribute_name(&self) -> &'static str {
        match self {
            RoastField::CountryOfOrigin => "country_of_origin",
            RoastField::RoastDate => "roast_date",
            RoastField::FlavourNotes => "flavour_notes",
            RoastField::VendorName => "vendor_name",
            RoastField::Variety => "variety",
            RoastField::Process => "process",
            RoastField::Producer => "producer",
            RoastField::ImageS3Path => "image_s3_path",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            RoastField::RoastDate => FieldKind::Date,
            RoastField::FlavourNotes => FieldKind::Notes,
            _ => FieldKind::Text,
        }
    }

    pub fn is_filterable(&self) -> bool {
        Self::FILTERABLE.contains(self)
    }
}

impl fmt::Display for RoastField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

impl std::str::FromStr for RoastField {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == PARTITION_KEY {
            return Err(StoreError::InvalidField(format!(
                "{} is the partition key and cannot be changed",
                PARTITION_KEY
            )));
        }

        RoastField::ALL
            .into_iter()
            .find(|field| field.attribute_name() == s)
            .ok_or_else(|| StoreError::InvalidField(s.to_string()))
    }
}

/// A typed field value.
///
/// `Unset` returns a field to "not set", which is distinct from an empty
/// string or an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(DateTime<Utc>),
    Notes(Vec<String>),
    Unset,
}

impl FieldValue {
    /// Parse a textual value according to the field's kind.
    ///
    /// Dates accept RFC 3339 or `YYYY-MM-DD`; flavour notes are a
    /// comma-separated list where the empty string means an empty list.
    pub fn parse(field: RoastField, raw: &str) -> Result<Self> {
        match field.kind() {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Date => parse_roast_date(raw).map(FieldValue::Date),
            FieldKind::Notes => Ok(FieldValue::Notes(parse_flavour_notes(raw))),
        }
    }

    fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Date(_) => Some(FieldKind::Date),
            FieldValue::Notes(_) => Some(FieldKind::Notes),
            FieldValue::Unset => None,
        }
    }

    /// Check that this value has the shape `field` expects
    pub fn check(&self, field: RoastField) -> Result<()> {
        match self.kind() {
            None => Ok(()),
            Some(kind) if kind == field.kind() => Ok(()),
            Some(kind) => Err(StoreError::InvalidInput(format!(
                "{} expects a {:?} value, got {:?}",
                field,
                field.kind(),
                kind
            ))),
        }
    }

    /// Encode for DynamoDB; `Unset` has no attribute value
    pub fn to_attribute_value(&self) -> Option<AttributeValue> {
        match self {
            FieldValue::Text(text) => Some(AttributeValue::S(text.clone())),
            FieldValue::Date(date) => Some(AttributeValue::S(
                date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            )),
            FieldValue::Notes(notes) => Some(AttributeValue::L(
                notes.iter().cloned().map(AttributeValue::S).collect(),
            )),
            FieldValue::Unset => None,
        }
    }

    /// Decode a stored attribute for `field`
    pub fn from_attribute_value(field: RoastField, value: &AttributeValue) -> Result<Self> {
        let corrupt = || StoreError::Corrupt(format!("attribute {} has unexpected type", field));

        match field.kind() {
            FieldKind::Text => value
                .as_s()
                .map(|s| FieldValue::Text(s.clone()))
                .map_err(|_| corrupt()),
            FieldKind::Date => {
                let raw = value.as_s().map_err(|_| corrupt())?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|date| FieldValue::Date(date.with_timezone(&Utc)))
                    .map_err(|e| StoreError::Corrupt(format!("invalid {}: {}", field, e)))
            }
            FieldKind::Notes => value
                .as_l()
                .map_err(|_| corrupt())?
                .iter()
                .map(|note| note.as_s().cloned().map_err(|_| corrupt()))
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::Notes),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Notes(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        FieldValue::Notes(value.into_iter().map(str::to_string).collect())
    }
}

/// Parse a roast date given as RFC 3339, a naive timestamp or `YYYY-MM-DD`.
///
/// Naive values are taken as UTC.
pub fn parse_roast_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| StoreError::InvalidInput(format!("invalid roast_date: {}", raw)))
}

fn parse_flavour_notes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string)
        .collect()
}

/// A partial update: the fields to change and their new values.
///
/// Setting the same field twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoastUpdate {
    changes: Vec<(RoastField, FieldValue)>,
}

impl RoastUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a new value
    pub fn set(mut self, field: RoastField, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.changes.iter_mut().find(|(f, _)| *f == field) {
            Some(change) => change.1 = value,
            None => self.changes.push((field, value)),
        }
        self
    }

    /// Return a field to "not set"
    pub fn unset(self, field: RoastField) -> Self {
        self.set(field, FieldValue::Unset)
    }

    /// Build an update from `(field name, textual value)` pairs.
    ///
    /// Unknown field names fail with `InvalidField`; malformed values with
    /// `InvalidInput`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs.into_iter().try_fold(Self::new(), |update, (name, raw)| {
            let field: RoastField = name.as_ref().parse()?;
            let value = FieldValue::parse(field, raw.as_ref())?;
            Ok(update.set(field, value))
        })
    }

    /// Check every value against its field's shape
    pub fn validate(&self) -> Result<()> {
        self.changes
            .iter()
            .try_for_each(|(field, value)| value.check(*field))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RoastField, &FieldValue)> {
        self.changes.iter().map(|(field, value)| (*field, value))
    }

    /// Names of the fields touched, for logging
    pub fn field_names(&self) -> Vec<&'static str> {
        self.changes.iter().map(|(f, _)| f.attribute_name()).collect()
    }
}

/// Equality predicate on one non-key text attribute.
///
/// Comparison is exact and case-sensitive; records where the field is not
/// set never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    field: RoastField,
    value: String,
}

impl AttributeFilter {
    pub fn equals(field: RoastField, value: impl Into<String>) -> Result<Self> {
        if !field.is_filterable() {
            return Err(StoreError::InvalidField(format!(
                "{} cannot be used as a filter",
                field
            )));
        }
        Ok(Self {
            field,
            value: value.into(),
        })
    }

    pub fn field(&self) -> RoastField {
        self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, record: &CoffeeRoastRecord) -> bool {
        matches!(record.field(self.field), FieldValue::Text(text) if text == self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_field_parsing() {
        assert_eq!("vendor_name".parse::<RoastField>().unwrap(), RoastField::VendorName);
        assert_eq!("image_s3_path".parse::<RoastField>().unwrap(), RoastField::ImageS3Path);
        assert!(matches!(
            "roast_name".parse::<RoastField>(),
            Err(StoreError::InvalidField(_))
        ));
        assert_eq!(
            "Vendor_Name".parse::<RoastField>().unwrap_err(),
            StoreError::InvalidField("Vendor_Name".to_string())
        );
    }

    #[test]
    fn test_parse_roast_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_roast_date("2024-03-15").unwrap(), midnight);
        assert_eq!(parse_roast_date("2024-03-15T00:00:00Z").unwrap(), midnight);
        assert_eq!(parse_roast_date("2024-03-15T08:00:00+08:00").unwrap(), midnight);
        assert_eq!(parse_roast_date("2024-03-15T00:00:00").unwrap(), midnight);
        assert!(matches!(
            parse_roast_date("last tuesday"),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_flavour_notes_parsing() {
        assert_eq!(
            FieldValue::parse(RoastField::FlavourNotes, "floral, citrus ,berry").unwrap(),
            FieldValue::from(vec!["floral", "citrus", "berry"])
        );
        assert_eq!(
            FieldValue::parse(RoastField::FlavourNotes, "").unwrap(),
            FieldValue::Notes(vec![])
        );
    }

    #[test]
    fn test_value_shape_check() {
        assert!(FieldValue::from("Ethiopia").check(RoastField::CountryOfOrigin).is_ok());
        assert!(FieldValue::Unset.check(RoastField::RoastDate).is_ok());
        assert!(matches!(
            FieldValue::from(vec!["floral"]).check(RoastField::VendorName),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_keeps_last_value() {
        let update = RoastUpdate::new()
            .set(RoastField::Process, "washed")
            .set(RoastField::Variety, "Bourbon")
            .set(RoastField::Process, "natural");

        assert_eq!(update.len(), 2);
        let values: Vec<_> = update.iter().collect();
        assert_eq!(values[0], (RoastField::Process, &FieldValue::from("natural")));
    }

    #[test]
    fn test_update_from_pairs() {
        let update = RoastUpdate::from_pairs([
            ("flavour_notes", "floral,citrus"),
            ("roast_date", "2024-03-15"),
        ])
        .unwrap();
        assert_eq!(update.field_names(), vec!["flavour_notes", "roast_date"]);

        let err = RoastUpdate::from_pairs([("altitude", "1900m")]).unwrap_err();
        assert_eq!(err, StoreError::InvalidField("altitude".to_string()));
    }

    #[test]
    fn test_attribute_round_trip_preserves_blank_and_empty() {
        for (field, value) in [
            (RoastField::VendorName, FieldValue::from("")),
            (RoastField::FlavourNotes, FieldValue::Notes(vec![])),
            (
                RoastField::RoastDate,
                FieldValue::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ),
        ] {
            let attr = value.to_attribute_value().unwrap();
            assert_eq!(FieldValue::from_attribute_value(field, &attr).unwrap(), value);
        }
        assert!(FieldValue::Unset.to_attribute_value().is_none());
    }

    #[test]
    fn test_wrong_attribute_type_is_corrupt() {
        let attr = AttributeValue::N("3".to_string());
        assert!(matches!(
            FieldValue::from_attribute_value(RoastField::Producer, &attr),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_filter_requires_filterable_field() {
        assert!(AttributeFilter::equals(RoastField::VendorName, "Onyx").is_ok());
        assert!(matches!(
            AttributeFilter::equals(RoastField::FlavourNotes, "floral"),
            Err(StoreError::InvalidField(_))
        ));
    }

    #[test]
    fn test_filter_is_exact_and_case_sensitive() {
        let filter = AttributeFilter::equals(RoastField::Process, "washed").unwrap();

        let mut record = CoffeeRoastRecord::new("Kenya AA");
        assert!(!filter.matches(&record));

        record.process = Some("Washed".to_string());
        assert!(!filter.matches(&record));

        record.process = Some("washed".to_string());
        assert!(filter.matches(&record));
    }
}
