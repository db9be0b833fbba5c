use crate::brand::normalize_brand;
use crate::constants::{BRAND_FIELDS, ID_FIELDS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw performer object as returned by the listing API
pub type RawPerformer = Value;

/// A performer record with its identity and brand pulled out.
///
/// All upstream fields are kept verbatim in `fields` and written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformerRecord {
    pub id: String,
    pub brand: Option<String>,
    pub fields: Map<String, Value>,
}

impl PerformerRecord {
    /// Build a record from an upstream object. Returns `None` when the value is
    /// not an object or carries no usable identifier.
    pub fn from_value(value: RawPerformer) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let id = record_id(&fields)?;
        let brand = record_brand(&fields);
        Some(Self { id, brand, fields })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// `itemId`, falling back to `id`. Integers are rendered in decimal.
pub fn record_id(fields: &Map<String, Value>) -> Option<String> {
    ID_FIELDS.iter().find_map(|key| match fields.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    })
}

pub fn record_brand(fields: &Map<String, Value>) -> Option<String> {
    BRAND_FIELDS
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str).and_then(normalize_brand))
}

/// Persisted catalog: the ordered identifier list consumed by page generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub max: usize,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl CatalogFile {
    pub fn new(brands: Vec<String>, max: usize, ids: Vec<String>) -> Self {
        Self {
            generated_at: Some(Utc::now()),
            brands,
            max,
            count: ids.len(),
            ids,
        }
    }
}

/// Persisted performer table: full records for the catalog's identifiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformerTableFile {
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub performers: Vec<RawPerformer>,
}

impl PerformerTableFile {
    pub fn new(brands: Vec<String>, records: Vec<PerformerRecord>) -> Self {
        let performers: Vec<RawPerformer> =
            records.into_iter().map(PerformerRecord::into_value).collect();
        Self {
            generated_at: Some(Utc::now()),
            brands,
            count: performers.len(),
            performers,
        }
    }

    /// Records with a usable identifier, in file order.
    pub fn records(self) -> Vec<PerformerRecord> {
        self.performers
            .into_iter()
            .filter_map(PerformerRecord::from_value)
            .collect()
    }
}
