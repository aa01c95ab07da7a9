//! Output shape of a list query
//!
//! A [`Projection`] is the set of keys a flattened record is guaranteed to be
//! checked against: the selected own fields under their own names plus, for
//! each expanded relationship, the selected target fields under their
//! composite names. Every key is optional.
//!
//! Two relationships can land on the same composite key. The projection keeps
//! every declared type for that key and lists it in [`Projection::collisions`];
//! which value survives at runtime is decided by the flattener (last write
//! wins), not here.

use std::collections::BTreeMap;

use crate::case::{to_external, to_internal};
use crate::error::{ProjectionError, SelectionError};
use crate::flatten::FlatRecord;
use crate::query::ListQuery;
use crate::schema::FieldType;

/// Where a projected key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Own,
    /// Remote link name
    Relationship(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    /// Every `(source, type)` declaration that maps to this key, in query order
    pub declarations: Vec<(FieldSource, FieldType)>,
}

impl ProjectedField {
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        self.declarations.iter().any(|(_, t)| t.accepts(value))
    }

    pub fn is_collision(&self) -> bool {
        self.declarations.len() > 1
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    /// `None` when every own field was requested
    own_fields: Option<Vec<String>>,
    shape: BTreeMap<String, ProjectedField>,
}

/// Flattened key for `field` of the target reached through `relationship_name`.
///
/// Same rule the flattener applies to the raw response.
pub fn composite_key(relationship_name: &str, field: &str) -> String {
    to_internal(&format!("{}_{}", relationship_name, to_external(field)))
}

impl Projection {
    /// Compute the shape of one output record for `query`.
    pub fn new(query: &ListQuery) -> Result<Self, SelectionError> {
        query.validate()?;

        let module = query.module();
        let mut shape: BTreeMap<String, ProjectedField> = BTreeMap::new();

        let own_fields = if query.selects_all_fields() {
            for (name, field_type) in module.schema().iter() {
                declare(&mut shape, name.to_string(), FieldSource::Own, field_type);
            }
            None
        } else {
            for name in query.fields() {
                declare(&mut shape, name.clone(), FieldSource::Own, module.field_type(name)?);
            }
            Some(query.fields().to_vec())
        };

        for related in query.relationships() {
            // Type by the module's own declaration, not the one the query carries.
            let declared = module.relationship(&to_internal(related.relationship_name()))?;
            for field in related.fields() {
                let field_type = declared.target().field_type(field)?;
                declare(
                    &mut shape,
                    composite_key(related.relationship_name(), field),
                    FieldSource::Relationship(related.relationship_name().to_string()),
                    field_type,
                );
            }
        }

        let projection = Self { own_fields, shape };
        for key in projection.collisions() {
            tracing::warn!(
                module = module.name(),
                key,
                "Several selections map to the same flattened key; the last linked value wins"
            );
        }
        Ok(projection)
    }

    pub fn get(&self, key: &str) -> Option<&ProjectedField> {
        self.shape.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shape.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Keys declared by more than one selection
    pub fn collisions(&self) -> Vec<&str> {
        self.shape
            .iter()
            .filter(|(_, f)| f.is_collision())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Whether the caller narrowed own fields; when not, [`narrow`](Self::narrow) keeps everything.
    pub fn is_narrowing(&self) -> bool {
        self.own_fields.is_some()
    }

    /// Drop every key outside the shape, unless all own fields were requested.
    pub fn narrow(&self, mut record: FlatRecord) -> FlatRecord {
        if self.is_narrowing() {
            record.retain(|key| self.shape.contains_key(key));
        }
        record
    }

    /// Check every present key in the shape holds a value of a declared type.
    pub fn validate(&self, record: &FlatRecord) -> Result<(), ProjectionError> {
        for (key, value) in record.iter() {
            if let Some(field) = self.shape.get(key) {
                if !field.accepts(value) {
                    return Err(ProjectionError::TypeMismatch {
                        key: key.to_string(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn declare(
    shape: &mut BTreeMap<String, ProjectedField>,
    key: String,
    source: FieldSource,
    field_type: FieldType,
) {
    let field = shape.entry(key).or_insert_with(|| ProjectedField {
        declarations: Vec::new(),
    });
    // Own fields selected twice are the same declaration.
    if !field.declarations.contains(&(source.clone(), field_type)) {
        field.declarations.push((source, field_type));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_value;
    use crate::module::Module;
    use serde_json::json;
    use std::sync::Arc;

    fn accounts() -> Module {
        let contacts = Arc::new(Module::new(
            "Contacts",
            [
                ("id", FieldType::Id),
                ("emailOne", FieldType::Text),
                ("doNotCall", FieldType::Boolean),
            ]
            .into_iter()
            .collect(),
        ));
        let users = Arc::new(Module::new(
            "Users",
            [("id", FieldType::Id), ("userName", FieldType::Text)]
                .into_iter()
                .collect(),
        ));
        Module::new(
            "Accounts",
            [
                ("id", FieldType::Id),
                ("name", FieldType::Text),
                ("employees", FieldType::Integer),
            ]
            .into_iter()
            .collect(),
        )
        .with_relationship("contacts", contacts)
        .unwrap()
        .with_relationship("assigned_user", users)
        .unwrap()
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key("contacts", "emailOne"), "contactsEmailOne");
        assert_eq!(composite_key("contacts", "email1"), "contactsEmail1");
        assert_eq!(composite_key("accounts_contacts", "id"), "accountsContactsId");
    }

    #[test]
    fn test_shape() {
        let module = accounts();
        let query = ListQuery::new(&module)
            .select(["id", "name"])
            .with(module.select_related("contacts", ["emailOne"]).unwrap())
            .with(module.select_related("assigned_user", ["userName"]).unwrap());
        let projection = Projection::new(&query).unwrap();

        assert_eq!(
            projection.keys().collect::<Vec<_>>(),
            vec!["assignedUserUserName", "contactsEmailOne", "id", "name"]
        );
        assert_eq!(
            projection.get("contactsEmailOne").unwrap().declarations,
            vec![(
                FieldSource::Relationship("contacts".to_string()),
                FieldType::Text
            )]
        );
        assert!(projection.collisions().is_empty());
    }

    #[test]
    fn test_all_fields_when_selection_empty() {
        let module = accounts();
        let projection = Projection::new(&ListQuery::new(&module)).unwrap();
        assert!(!projection.is_narrowing());
        assert_eq!(projection.len(), 3);
    }

    #[test]
    fn test_collision_keeps_both_types() {
        let contacts = Arc::new(Module::new(
            "Contacts",
            [("userName", FieldType::Text)].into_iter().collect(),
        ));
        let module = Module::new(
            "Accounts",
            [("contactUserName", FieldType::Integer)].into_iter().collect(),
        )
        .with_relationship("contact", contacts)
        .unwrap();

        let query = ListQuery::new(&module)
            .select(["contactUserName"])
            .with(module.select_related("contact", ["userName"]).unwrap());
        let projection = Projection::new(&query).unwrap();

        assert_eq!(projection.collisions(), vec!["contactUserName"]);
        let field = projection.get("contactUserName").unwrap();
        assert_eq!(field.declarations.len(), 2);
        assert!(field.accepts(&json!("not a number")));
    }

    #[test]
    fn test_narrow_drops_unrequested_keys() {
        let module = accounts();
        let query = ListQuery::new(&module)
            .select(["id"])
            .with(module.select_related("contacts", ["emailOne"]).unwrap());
        let projection = Projection::new(&query).unwrap();

        let records = flatten_value(json!({
            "entry_list": [{"name_value_list": {"id": "1", "name": "Acme", "deleted": "0"}}],
            "relationship_list": [{"link_list": [{"name": "contacts", "records": [
                {"link_value": {"id": "c1", "email_one": "a@b.c"}}
            ]}]}]
        }))
        .unwrap();

        let narrowed = projection.narrow(records[0].clone());
        assert_eq!(narrowed.keys().collect::<Vec<_>>().len(), 2);
        assert_eq!(narrowed.get_str("id"), Some("1"));
        assert_eq!(narrowed.get_str("contactsEmailOne"), Some("a@b.c"));
        assert!(!narrowed.contains_key("contactsId"));
    }

    #[test]
    fn test_narrow_is_identity_for_all_fields() {
        let module = accounts();
        let projection = Projection::new(&ListQuery::new(&module)).unwrap();
        let records = flatten_value(json!({
            "entry_list": [{"name_value_list": {"id": "1", "custom_field_c": "x"}}]
        }))
        .unwrap();
        assert_eq!(projection.narrow(records[0].clone()), records[0]);
    }

    #[test]
    fn test_validate_types() {
        let module = accounts();
        let query = ListQuery::new(&module)
            .select(["employees"])
            .with(module.select_related("contacts", ["doNotCall"]).unwrap());
        let projection = Projection::new(&query).unwrap();

        let ok = flatten_value(json!({
            "entry_list": [{"name_value_list": {"employees": "12"}}],
            "relationship_list": [{"link_list": [{"name": "contacts", "records": [
                {"link_value": {"do_not_call": "0"}}
            ]}]}]
        }))
        .unwrap();
        assert!(projection.validate(&ok[0]).is_ok());

        let bad = flatten_value(json!({
            "entry_list": [{"name_value_list": {"employees": "many"}}]
        }))
        .unwrap();
        assert_eq!(
            projection.validate(&bad[0]),
            Err(ProjectionError::TypeMismatch {
                key: "employees".to_string(),
                value: json!("many"),
            })
        );
    }

    #[test]
    fn test_relationship_fields_typed_by_declared_target() {
        let module = accounts();
        let lookalike_contacts = Module::new(
            "Contacts",
            [
                ("emailOne", FieldType::Integer),
                ("nickname", FieldType::Text),
            ]
            .into_iter()
            .collect(),
        );
        let lookalike = Module::new("Accounts", module.schema().clone())
            .with_relationship("contacts", lookalike_contacts)
            .unwrap();

        let query = ListQuery::new(&module)
            .with(lookalike.select_related("contacts", ["emailOne"]).unwrap());
        let projection = Projection::new(&query).unwrap();
        assert_eq!(
            projection.get("contactsEmailOne").unwrap().declarations,
            vec![(
                FieldSource::Relationship("contacts".to_string()),
                FieldType::Text
            )]
        );

        let query = ListQuery::new(&module)
            .with(lookalike.select_related("contacts", ["nickname"]).unwrap());
        assert!(matches!(
            Projection::new(&query),
            Err(SelectionError::UnknownField { ref field, .. }) if field == "nickname"
        ));
    }

    #[test]
    fn test_rejects_invalid_query() {
        let module = accounts();
        let query = ListQuery::new(&module).select(["nope"]);
        assert!(Projection::new(&query).is_err());
    }
}
