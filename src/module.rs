//! Module and relationship descriptors
//!
//! A [`Module`] names an entity type on the remote side, declares its
//! attribute schema, and carries the relationships ("links") that can be
//! expanded alongside it. Descriptors are immutable values: adding a
//! relationship returns a new descriptor and leaves the original alone, so a
//! base descriptor can be shared freely and derived from independently.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::case::to_internal;
use crate::error::{ConfigError, SelectionError};
use crate::query::RelationshipQuery;
use crate::schema::{AttributeSchema, FieldType};

/// Descriptor of one remote module
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    schema: Arc<AttributeSchema>,
    /// Keyed by the internal form of the relationship's remote name.
    relationships: BTreeMap<String, Arc<Relationship>>,
}

impl Module {
    /// Create a descriptor with no relationships.
    pub fn new(remote_name: impl Into<String>, schema: AttributeSchema) -> Self {
        Self {
            name: remote_name.into(),
            schema: Arc::new(schema),
            relationships: BTreeMap::new(),
        }
    }

    /// Remote module name (e.g. `Accounts`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Derive a descriptor with one more relationship.
    ///
    /// The relationship is stored under `to_internal(remote_name)`. Fails if
    /// that key is already taken, even when the existing relationship points
    /// at the same target.
    pub fn with_relationship(
        &self,
        remote_name: impl Into<String>,
        target: impl Into<Arc<Module>>,
    ) -> Result<Module, ConfigError> {
        let remote_name = remote_name.into();
        let key = to_internal(&remote_name);

        if let Some(existing) = self.relationships.get(&key) {
            return Err(ConfigError::RelationshipCollision {
                module: self.name.clone(),
                key,
                existing: existing.remote_name.clone(),
                new: remote_name,
            });
        }

        // New map, shared entries.
        let mut relationships = self.relationships.clone();
        relationships.insert(
            key,
            Arc::new(Relationship {
                remote_name,
                target: target.into(),
            }),
        );

        Ok(Module {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            relationships,
        })
    }

    /// Look up a relationship by its internal key (`accountsContacts`).
    pub fn relationship(&self, key: &str) -> Result<&Relationship, SelectionError> {
        self.relationships
            .get(key)
            .map(Arc::as_ref)
            .ok_or_else(|| SelectionError::UnknownRelationship {
                module: self.name.clone(),
                relationship: key.to_string(),
            })
    }

    pub fn relationships(&self) -> impl Iterator<Item = (&str, &Relationship)> {
        self.relationships
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Shorthand for `relationship(key)?.select(fields)`.
    pub fn select_related<I, S>(&self, key: &str, fields: I) -> Result<RelationshipQuery, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationship(key)?.select(fields)
    }

    /// Type of an own field, or a selection error naming it.
    pub fn field_type(&self, field: &str) -> Result<FieldType, SelectionError> {
        self.schema
            .get(field)
            .ok_or_else(|| SelectionError::UnknownField {
                module: self.name.clone(),
                field: field.to_string(),
            })
    }
}

/// A named link from one module to another
#[derive(Debug)]
pub struct Relationship {
    remote_name: String,
    target: Arc<Module>,
}

impl Relationship {
    /// Link name as the remote system knows it (`accounts_contacts`)
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn target(&self) -> &Arc<Module> {
        &self.target
    }

    /// Pick fields of the target module to expand through this link.
    ///
    /// Every field must be declared on the target's schema. Duplicates are kept.
    pub fn select<I, S>(&self, fields: I) -> Result<RelationshipQuery, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields.into_iter().map(Into::into).collect::<Vec<String>>();
        for field in &fields {
            self.target.field_type(field)?;
        }
        Ok(RelationshipQuery::new(
            self.remote_name.clone(),
            Arc::clone(&self.target),
            fields,
        ))
    }
}
