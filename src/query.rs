//! Query descriptors
//!
//! [`RelationshipQuery`] is what [`Relationship::select`](crate::module::Relationship::select)
//! hands back: one link plus the target fields to expand. [`ListQuery`]
//! gathers everything a `get_entry_list` call needs.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::case::to_external;
use crate::error::SelectionError;
use crate::module::Module;

pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Sort direction of the ordering field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}


/// Fields to pull through one relationship
#[derive(Debug, Clone)]
pub struct RelationshipQuery {
    relationship_name: String,
    target: Arc<Module>,
    fields: Vec<String>,
}

impl RelationshipQuery {
    pub(crate) fn new(relationship_name: String, target: Arc<Module>, fields: Vec<String>) -> Self {
        Self {
            relationship_name,
            target,
            fields,
        }
    }

    /// Remote link name, unnormalized
    pub fn relationship_name(&self) -> &str {
        &self.relationship_name
    }

    pub fn target(&self) -> &Arc<Module> {
        &self.target
    }

    /// Selected target fields, internal names, in caller order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// `{name, value: [external field names]}` entry of `link_name_to_fields_array`.
    pub fn to_link_fields(&self) -> Value {
        json!({
            "name": self.relationship_name,
            "value": self.fields.iter().map(|f| to_external(f)).collect::<Vec<_>>(),
        })
    }
}

/// Parameters of one list call
#[derive(Debug, Clone)]
pub struct ListQuery {
    module: Module,
    filter: String,
    order_by: Option<(String, OrderDirection)>,
    offset: u32,
    fields: Vec<String>,
    relationships: Vec<RelationshipQuery>,
    max_results: u32,
    include_deleted: bool,
}

impl ListQuery {
    pub fn new(module: &Module) -> Self {
        Self {
            module: module.clone(),
            filter: String::new(),
            order_by: None,
            offset: 0,
            fields: Vec::new(),
            relationships: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            include_deleted: false,
        }
    }

    /// Raw SQL-ish filter passed through untouched (`accounts.name LIKE 'A%'`)
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sort ascending by an own field.
    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.order_by_direction(field, OrderDirection::Asc)
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order_by_direction(field, OrderDirection::Desc)
    }

    pub fn order_by_direction(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Own fields to fetch. Empty means all fields.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Expand one more relationship.
    pub fn with(mut self, relationship: RelationshipQuery) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn relationships(&self) -> &[RelationshipQuery] {
        &self.relationships
    }

    pub fn selects_all_fields(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check own fields, ordering field and relationship queries against the module.
    pub fn validate(&self) -> Result<(), SelectionError> {
        for field in &self.fields {
            self.module.field_type(field)?;
        }
        if let Some((order_by, _)) = &self.order_by {
            self.module.field_type(order_by)?;
        }
        for query in &self.relationships {
            let key = crate::case::to_internal(query.relationship_name());
            let declared = self.module.relationship(&key)?;
            if declared.remote_name() != query.relationship_name()
                || declared.target().name() != query.target().name()
            {
                return Err(SelectionError::TargetMismatch {
                    module: self.module.name().to_string(),
                    relationship: query.relationship_name().to_string(),
                    declared: declared.target().name().to_string(),
                    requested: query.target().name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Positional `rest_data` for `get_entry_list`, every field name in external form.
    pub fn to_rest_data(&self, session_id: &str) -> Value {
        json!([
            session_id,
            self.module.name(),
            self.filter,
            self.order_by
                .as_ref()
                .map(|(field, direction)| match direction {
                    OrderDirection::Asc => to_external(field),
                    OrderDirection::Desc => format!("{} DESC", to_external(field)),
                })
                .unwrap_or_default(),
            self.offset,
            self.fields.iter().map(|f| to_external(f)).collect::<Vec<_>>(),
            self.relationships
                .iter()
                .map(RelationshipQuery::to_link_fields)
                .collect::<Vec<_>>(),
            self.max_results,
            u8::from(self.include_deleted),
            false,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn fixtures() -> (Module, Arc<Module>) {
        let contacts = Arc::new(Module::new(
            "Contacts",
            [("id", FieldType::Id), ("emailOne", FieldType::Text)]
                .into_iter()
                .collect(),
        ));
        let accounts = Module::new(
            "Accounts",
            [
                ("id", FieldType::Id),
                ("name", FieldType::Text),
                ("dateEntered", FieldType::DateTime),
            ]
            .into_iter()
            .collect(),
        )
        .with_relationship("contacts", Arc::clone(&contacts))
        .unwrap();
        (accounts, contacts)
    }

    #[test]
    fn test_rest_data_uses_external_names() {
        let (accounts, _) = fixtures();
        let contacts = accounts.select_related("contacts", ["emailOne"]).unwrap();
        let query = ListQuery::new(&accounts)
            .filter("accounts.name LIKE 'A%'")
            .order_by("dateEntered")
            .offset(40)
            .select(["id", "dateEntered"])
            .with(contacts)
            .max_results(10);

        assert!(query.validate().is_ok());
        assert_eq!(
            query.to_rest_data("sess"),
            json!([
                "sess",
                "Accounts",
                "accounts.name LIKE 'A%'",
                "date_entered",
                40,
                ["id", "date_entered"],
                [{"name": "contacts", "value": ["email_one"]}],
                10,
                0,
                false,
            ])
        );
    }

    #[test]
    fn test_order_descending() {
        let (accounts, _) = fixtures();
        let query = ListQuery::new(&accounts).order_by_desc("dateEntered");
        assert!(query.validate().is_ok());
        assert_eq!(query.to_rest_data("s")[3], json!("date_entered DESC"));

        // Direction belongs in the builder, not in the field name.
        let err = ListQuery::new(&accounts).order_by("name DESC").validate().unwrap_err();
        assert!(matches!(err, SelectionError::UnknownField { .. }));
    }

    #[test]
    fn test_defaults() {
        let (accounts, _) = fixtures();
        let query = ListQuery::new(&accounts);
        assert!(query.selects_all_fields());
        let data = query.to_rest_data("s");
        assert_eq!(data[3], json!(""));
        assert_eq!(data[5], json!([]));
        assert_eq!(data[7], json!(DEFAULT_MAX_RESULTS));
    }

    #[test]
    fn test_validate_rejects_unknown_own_field() {
        let (accounts, _) = fixtures();
        let err = ListQuery::new(&accounts)
            .select(["name", "phoneOffice"])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            SelectionError::UnknownField {
                module: "Accounts".to_string(),
                field: "phoneOffice".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_rejects_foreign_relationship() {
        let (accounts, contacts) = fixtures();
        let leads = Module::new("Leads", [("id", FieldType::Id)].into_iter().collect())
            .with_relationship("notes", Arc::clone(&contacts))
            .unwrap();
        let foreign = leads.select_related("notes", ["id"]).unwrap();

        let err = ListQuery::new(&accounts).with(foreign).validate().unwrap_err();
        assert!(matches!(err, SelectionError::UnknownRelationship { .. }));
    }

    #[test]
    fn test_validate_rejects_mismatched_target() {
        let (accounts, _) = fixtures();
        let other = Module::new("Accounts", accounts.schema().clone())
            .with_relationship("contacts", Module::new("Users", Default::default()))
            .unwrap();
        let query = other.select_related("contacts", Vec::<String>::new()).unwrap();

        let err = ListQuery::new(&accounts).with(query).validate().unwrap_err();
        assert!(matches!(err, SelectionError::TargetMismatch { .. }));
    }
}
