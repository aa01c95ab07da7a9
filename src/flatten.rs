//! Flattening of nested list responses
//!
//! One flat record per primary entry. Own fields land under their internal
//! name; fields reached through a link land under
//! `to_internal(link_name + "_" + field)`, so `contacts` + `email_one`
//! becomes `contactsEmailOne`. When several linked records write the same
//! key, the last one wins.
//!
//! The flattener does not look at what was selected. Narrowing to the
//! requested shape is done afterwards by [`Projection`](crate::projection::Projection).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::case::to_internal;
use crate::error::FlattenError;
use crate::raw::RawEntryList;

/// One flattened result row, keyed by internal field names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatRecord(Map<String, Value>);

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value at `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize into a caller-declared struct.
    ///
    /// The struct should use `#[serde(rename_all = "camelCase")]` and
    /// `Option` for every field: the remote may leave any field out.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.0.insert(key, value);
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }
}

impl From<Map<String, Value>> for FlatRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Flatten a decoded response.
pub fn flatten(raw: &RawEntryList) -> Vec<FlatRecord> {
    raw.entry_list
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut record = FlatRecord::new();

            for (key, value) in entry.name_value_list.iter() {
                record.insert(to_internal(key), value.clone());
            }

            // A missing expansion entry just means no linked fields.
            if let Some(expansion) = raw.relationship_list.get(i) {
                for link in &expansion.link_list {
                    for linked in &link.records {
                        for (key, value) in linked.link_value.iter() {
                            let composite = format!("{}_{}", link.name, key);
                            record.insert(to_internal(&composite), value.clone());
                        }
                    }
                }
            }

            record
        })
        .collect()
}

/// Decode and flatten a response body in one step.
pub fn flatten_value(value: Value) -> Result<Vec<FlatRecord>, FlattenError> {
    let raw = RawEntryList::from_value(value)?;
    Ok(flatten(&raw))
}
