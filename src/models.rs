//! Core data models.
//!
//! [`RestaurantRecord`] is the unit that flows through extraction,
//! deduplication and the record store, and the shape served to the browser.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One restaurant listing, as stored and served.
///
/// Field names on the wire follow the browser client (`priceLevel`,
/// `mapsUrl`, ...). Every field defaults when absent so that partially
/// malformed documents can still be read and screened record by record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RestaurantRecord {
    /// Provider-assigned document id; only the anchor strategy yields one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docid: Option<String>,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub cuisine: String,
    pub rating: f64,
    /// A run of `$` characters, e.g. `"$$"`.
    pub price_level: String,
    pub description: String,
    /// External deep link; also the deduplication key.
    pub maps_url: String,
    pub image_url: String,
}

impl RestaurantRecord {
    /// Checks the persistability invariant: every string field non-empty and
    /// every numeric field non-zero. Returns the first failing field.
    pub fn check(&self) -> Result<(), InvalidField> {
        let strings = [
            ("name", &self.name),
            ("address", &self.address),
            ("cuisine", &self.cuisine),
            ("priceLevel", &self.price_level),
            ("description", &self.description),
            ("mapsUrl", &self.maps_url),
            ("imageUrl", &self.image_url),
        ];
        for (field, value) in strings {
            if value.trim().is_empty() {
                return Err(InvalidField(field));
            }
        }

        let numbers = [("lat", self.lat), ("lng", self.lng), ("rating", self.rating)];
        for (field, value) in numbers {
            if value == 0.0 || !value.is_finite() {
                return Err(InvalidField(field));
            }
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}

/// Name of the field that made a record fail the validity invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidField(pub &'static str);

impl std::fmt::Display for InvalidField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing or empty field `{}`", self.0)
    }
}

/// A stored entry excluded during screening, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Position in the stored document.
    pub index: usize,
    pub reason: String,
    /// The entry's `mapsUrl`, when it has a usable one.
    pub maps_url: Option<String>,
}

/// Outcome of screening stored entries: the valid records, in document
/// order, and what was left out.
#[derive(Debug, Clone, Default)]
pub struct Screened {
    pub valid: Vec<RestaurantRecord>,
    pub rejected: Vec<Rejection>,
    /// Every stored entry as read, valid or not, in document order.
    pub entries: Vec<serde_json::Value>,
}

impl Screened {
    /// `mapsUrl` of every stored entry, rejected ones included.
    pub fn known_urls(&self) -> HashSet<&str> {
        self.valid
            .iter()
            .map(|r| r.maps_url.as_str())
            .chain(self.rejected.iter().filter_map(|r| r.maps_url.as_deref()))
            .collect()
    }
}

/// Metadata attached to the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub(crate) fn sample_record(maps_url: &str) -> RestaurantRecord {
    RestaurantRecord {
        docid: Some("12345".to_string()),
        name: "Joe's Pizza".to_string(),
        address: "7 Carmine St".to_string(),
        lat: 40.7305,
        lng: -74.0021,
        cuisine: "Pizza".to_string(),
        rating: 4.5,
        price_level: "$".to_string(),
        description: "Pizza, Counter service".to_string(),
        maps_url: maps_url.to_string(),
        image_url: "https://lh3.googleusercontent.com/p/joes".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_record_is_valid() {
        assert!(sample_record("https://maps.google.com/?cid=1").is_valid());
    }

    #[test]
    fn zero_rating_is_invalid() {
        let mut r = sample_record("https://maps.google.com/?cid=1");
        r.rating = 0.0;
        assert_eq!(r.check(), Err(InvalidField("rating")));
    }

    #[test]
    fn blank_string_field_is_invalid() {
        let mut r = sample_record("https://maps.google.com/?cid=1");
        r.price_level = "  ".to_string();
        assert_eq!(r.check(), Err(InvalidField("priceLevel")));
    }

    #[test]
    fn docid_is_not_required() {
        let mut r = sample_record("https://maps.google.com/?cid=1");
        r.docid = None;
        assert!(r.is_valid());
    }

    #[test]
    fn wire_format_uses_client_field_names() {
        let json = serde_json::to_value(sample_record("u")).unwrap();
        assert_eq!(json["priceLevel"], "$");
        assert_eq!(json["mapsUrl"], "u");
        assert_eq!(json["imageUrl"], "https://lh3.googleusercontent.com/p/joes");
        assert_eq!(json["docid"], "12345");

        let mut r = sample_record("u");
        r.docid = None;
        let json = serde_json::to_value(r).unwrap();
        assert!(json.get("docid").is_none());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let r: RestaurantRecord = serde_json::from_str(r#"{"name":"Solo"}"#).unwrap();
        assert_eq!(r.name, "Solo");
        assert_eq!(r.rating, 0.0);
        assert!(!r.is_valid());
    }
}
