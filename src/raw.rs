//! Raw `get_entry_list` response shape
//!
//! Mirrors what the remote sends, with external (snake_case) field names.
//! Consumed once by the flattener and then dropped.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FlattenError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntryList {
    #[serde(default)]
    pub result_count: Option<u64>,
    #[serde(default)]
    pub total_count: Option<Value>,
    #[serde(default)]
    pub next_offset: Option<u64>,
    #[serde(default, deserialize_with = "php_list")]
    pub entry_list: Vec<RawEntry>,
    #[serde(default, deserialize_with = "php_list")]
    pub relationship_list: Vec<RawRelationshipEntry>,
}

impl RawEntryList {
    pub fn from_value(value: Value) -> Result<Self, FlattenError> {
        Ok(serde_json::from_value(value)?)
    }

    /// `total_count` arrives as a string on most servers.
    pub fn total_count(&self) -> Option<u64> {
        match &self.total_count {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

/// One primary record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub name_value_list: NameValueList,
}

/// Relationship expansion for the primary record at the same index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationshipEntry {
    #[serde(default, deserialize_with = "php_list")]
    pub link_list: Vec<RawLink>,
}

/// All records reached through one link
#[derive(Debug, Clone, Deserialize)]
pub struct RawLink {
    pub name: String,
    #[serde(default, deserialize_with = "php_list")]
    pub records: Vec<RawLinkRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLinkRecord {
    #[serde(default)]
    pub link_value: NameValueList,
}

/// Ordered field name -> value pairs.
///
/// Accepts `{"f": {"name": "f", "value": v}}`, `[{"name": "f", "value": v}]`,
/// or a plain `{"f": v}` map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameValueList(pub Vec<(String, Value)>);

impl NameValueList {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `{name, value}` wrapper; anything else is taken as the bare value.
fn unwrap_pair(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 2 && map.contains_key("name") => {
            match map.remove("value") {
                Some(inner) => inner,
                None => Value::Object(map),
            }
        }
        other => other,
    }
}

impl<'de> Deserialize<'de> for NameValueList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameValueVisitor;

        impl<'de> Visitor<'de> for NameValueVisitor {
            type Value = NameValueList;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a name-value mapping or a list of {name, value} pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    pairs.push((key, unwrap_pair(value)));
                }
                Ok(NameValueList(pairs))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                #[derive(Deserialize)]
                struct Pair {
                    name: String,
                    #[serde(default)]
                    value: Value,
                }

                let mut pairs = Vec::new();
                while let Some(pair) = access.next_element::<Pair>()? {
                    pairs.push((pair.name, pair.value));
                }
                Ok(NameValueList(pairs))
            }
        }

        deserializer.deserialize_any(NameValueVisitor)
    }
}

/// A list that PHP may also encode as an index-keyed object or `false`/`null` when empty.
fn php_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(_, item)| serde_json::from_value(item).map_err(de::Error::custom))
            .collect(),
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a list",
        )),
    }
}
