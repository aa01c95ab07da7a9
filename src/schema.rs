//! Attribute schemas
//!
//! Declares which fields a module has and what kind of value each holds.
//! Field names are internal (camelCase).

use serde_json::Value;
use std::collections::BTreeMap;

/// Semantic value type of a module field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Id,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Enum,
    /// Id of a record in another module
    Relate,
    Any,
}

impl FieldType {
    /// Whether `value` is a valid representation of this type.
    ///
    /// The remote API sends almost every scalar as a string, so numeric and
    /// boolean types accept their string forms. `null` is always accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldType::Any, _) => true,
            (
                FieldType::Id
                | FieldType::Text
                | FieldType::Date
                | FieldType::DateTime
                | FieldType::Enum
                | FieldType::Relate,
                Value::String(_),
            ) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldType::Integer, Value::String(s)) => s.is_empty() || s.trim().parse::<i64>().is_ok(),
            (FieldType::Decimal, Value::Number(_)) => true,
            (FieldType::Decimal, Value::String(s)) => s.is_empty() || s.trim().parse::<f64>().is_ok(),
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Boolean, Value::String(s)) => {
                matches!(s.as_str(), "" | "0" | "1" | "true" | "false")
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Id => "id",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Enum => "enum",
            Self::Relate => "relate",
            Self::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// Ordered set of fields a module may have
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSchema {
    fields: BTreeMap<String, FieldType>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, FieldType)> for AttributeSchema {
    fn from_iter<I: IntoIterator<Item = (S, FieldType)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_backed_numbers() {
        assert!(FieldType::Integer.accepts(&json!("42")));
        assert!(FieldType::Integer.accepts(&json!(42)));
        assert!(!FieldType::Integer.accepts(&json!("4.2")));
        assert!(FieldType::Decimal.accepts(&json!("4.2")));
        assert!(!FieldType::Decimal.accepts(&json!("abc")));
        assert!(FieldType::Boolean.accepts(&json!("1")));
        assert!(!FieldType::Boolean.accepts(&json!("yes")));
    }

    #[test]
    fn test_null_and_any() {
        assert!(FieldType::Date.accepts(&Value::Null));
        assert!(FieldType::Any.accepts(&json!({"nested": true})));
        assert!(!FieldType::Text.accepts(&json!(["a"])));
    }

    #[test]
    fn test_schema_from_iter() {
        let schema: AttributeSchema = [("id", FieldType::Id), ("firstName", FieldType::Text)]
            .into_iter()
            .collect();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("firstName"), Some(FieldType::Text));
        assert!(!schema.contains("lastName"));
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["firstName", "id"]);
    }
}
