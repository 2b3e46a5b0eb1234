//! # Documents: the unit of storage
//!
//! A [`Document`] is a JSON object stored under an id inside a named collection.
//! The store stamps every document with a `version` that starts at 1 and grows by
//! one on every write; batches use it as an optimistic-concurrency token.
//!
//! Records move in and out of documents through serde:
//!
//! - [`to_fields`] serialises any `Serialize` value into a field map, dropping a
//!   top-level `"id"` key (the id lives beside the fields, not inside them).
//! - [`Document::decode`] deserialises the fields back, re-inserting the document
//!   id under `"id"` so records with an `id` field are populated automatically.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// The field map of a document.
pub type Fields = Map<String, Value>;

/// A stored document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub fields: Fields,
}

impl Document {
    /// Look up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        if name == "id" {
            return None;
        }
        self.fields.get(name)
    }

    /// Deserialise the document into a record type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serialise a record into a document field map.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::Unavailable(format!(
            "records must serialise to a JSON object, got {}",
            other
        ))),
    }
}
