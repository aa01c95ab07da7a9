//! Typed access layer over the SuiteCRM REST v4.1 API
//!
//! - [`Module`] descriptors declare a remote module, its fields and the
//!   relationships that can be expanded with it
//! - [`ListQuery`] selects own fields and, per relationship, target fields
//! - [`flatten`] turns the nested list response into one [`FlatRecord`] per entry
//! - [`Projection`] computes the record shape a query asks for and narrows
//!   flattened records to it
//! - [`CrmClient`] runs queries over a [`Transport`] and keeps the session
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use suitecrm_client::*;
//! # async fn run(config: CrmConfig) -> suitecrm_client::Result<()> {
//! let contacts = Arc::new(Module::new(
//!     "Contacts",
//!     [("id", FieldType::Id), ("email1", FieldType::Text)].into_iter().collect(),
//! ));
//! let accounts = Module::new(
//!     "Accounts",
//!     [("id", FieldType::Id), ("name", FieldType::Text)].into_iter().collect(),
//! )
//! .with_relationship("contacts", contacts)?;
//!
//! let query = ListQuery::new(&accounts)
//!     .select(["name"])
//!     .with(accounts.select_related("contacts", ["email1"])?);
//!
//! let client = CrmClient::new(&config)?;
//! for record in client.list_entries(&query).await? {
//!     println!("{:?} {:?}", record.get("name"), record.get("contactsEmail1"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod case;
pub mod client;
pub mod config;
pub mod error;
pub mod flatten;
pub mod module;
pub mod projection;
pub mod query;
pub mod raw;
pub mod schema;
pub mod transport;

pub use client::{CrmClient, EntryPage, Session};
pub use config::CrmConfig;
pub use error::{
    ConfigError, CrmError, FlattenError, ProjectionError, Result, SelectionError,
};
pub use flatten::{flatten, flatten_value, FlatRecord};
pub use module::{Module, Relationship};
pub use projection::{composite_key, FieldSource, ProjectedField, Projection};
pub use query::{ListQuery, OrderDirection, RelationshipQuery};
pub use schema::{AttributeSchema, FieldType};
pub use transport::{HttpTransport, Transport};
