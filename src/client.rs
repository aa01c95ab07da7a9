//! SuiteCRM client
//!
//! Owns one transport, one set of credentials and the session cache for them.
//! Session-scoped calls log in lazily and, if the server reports the session
//! as invalid, log in again and retry once. Every other error is returned
//! as-is.

use std::sync::Arc;

use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::case::to_external;
use crate::config::CrmConfig;
use crate::error::{CrmError, Result};
use crate::flatten::{flatten, FlatRecord};
use crate::module::Module;
use crate::projection::Projection;
use crate::query::ListQuery;
use crate::raw::{RawEntry, RawEntryList};
use crate::transport::{check_remote_error, HttpTransport, Transport};

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// One page of list results
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub records: Vec<FlatRecord>,
    pub result_count: Option<u64>,
    pub total_count: Option<u64>,
    pub next_offset: Option<u64>,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
    application_name: String,
}

pub struct CrmClient {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    session: Mutex<Option<Session>>,
}

impl CrmClient {
    /// HTTP client for the instance in `config`.
    pub fn new(config: &CrmConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &CrmConfig) -> Self {
        Self {
            transport,
            credentials: Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                application_name: config.application_name.clone(),
            },
            session: Mutex::new(None),
        }
    }

    /// Log in and cache the new session, replacing any cached one.
    pub async fn login(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        let session = self.authenticate().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Cached session, if any
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn clear_session(&self) {
        *self.session.lock().await = None;
    }

    /// End the remote session, if there is one, and forget it.
    pub async fn logout(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            tracing::info!(user = ?session.user_name, "Logging out of SuiteCRM");
            let body = self.transport.call("logout", json!([session.id])).await?;
            check_remote_error(body)?;
        }
        Ok(())
    }

    /// Run a list query and return one flat record per primary entry.
    pub async fn list_entries(&self, query: &ListQuery) -> Result<Vec<FlatRecord>> {
        Ok(self.list_entries_page(query).await?.records)
    }

    /// Like [`list_entries`](Self::list_entries), keeping the pagination counters.
    pub async fn list_entries_page(&self, query: &ListQuery) -> Result<EntryPage> {
        let projection = Projection::new(query)?;

        tracing::debug!(
            module = query.module().name(),
            fields = query.fields().len(),
            relationships = query.relationships().len(),
            "get_entry_list"
        );
        let body = self
            .call_with_session("get_entry_list", |session_id| query.to_rest_data(session_id))
            .await?;

        let raw = RawEntryList::from_value(body)?;
        let records = flatten(&raw)
            .into_iter()
            .map(|record| -> Result<FlatRecord> {
                let record = projection.narrow(record);
                projection.validate(&record)?;
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EntryPage {
            records,
            result_count: raw.result_count,
            total_count: raw.total_count(),
            next_offset: raw.next_offset,
        })
    }

    /// Run a list query and decode each record into `T`.
    pub async fn list_entries_as<T: DeserializeOwned>(&self, query: &ListQuery) -> Result<Vec<T>> {
        self.list_entries(query)
            .await?
            .iter()
            .map(|record| record.decode().map_err(CrmError::from))
            .collect()
    }

    /// Create or update one record; returns its id.
    ///
    /// Keys are internal field names and must be declared on `module`.
    /// Values are sent as given. Include `id` to update an existing record.
    pub async fn set_entry(&self, module: &Module, values: &Map<String, Value>) -> Result<String> {
        for key in values.keys() {
            module.field_type(key)?;
        }

        let name_value_list = values
            .iter()
            .map(|(k, v)| json!({"name": to_external(k), "value": v}))
            .collect::<Vec<_>>();

        tracing::debug!(module = module.name(), fields = values.len(), "set_entry");
        let body = self
            .call_with_session("set_entry", |session_id| {
                json!([session_id, module.name(), name_value_list])
            })
            .await?;

        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CrmError::UnexpectedResponse {
                method: "set_entry".to_string(),
                message: format!("no id in response: {}", body),
            })
    }

    async fn session_id(&self) -> Result<String> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.id.clone());
        }
        let session = self.authenticate().await?;
        let id = session.id.clone();
        *guard = Some(session);
        Ok(id)
    }

    async fn call_with_session<F>(&self, method: &str, rest_data: F) -> Result<Value>
    where
        F: Fn(&str) -> Value + Send + Sync,
    {
        let session_id = self.session_id().await?;
        let first = self
            .transport
            .call(method, rest_data(session_id.as_str()))
            .await
            .and_then(check_remote_error);

        match first {
            Err(err) if err.is_invalid_session() => {
                tracing::warn!(method, "Session rejected by server, logging in again");
                self.forget_session(&session_id).await;
                let session_id = self.session_id().await?;
                let body = self.transport.call(method, rest_data(session_id.as_str())).await?;
                check_remote_error(body)
            }
            other => other,
        }
    }

    /// Drop the cached session only if it is still the one that failed.
    async fn forget_session(&self, session_id: &str) {
        let mut guard = self.session.lock().await;
        if guard.as_ref().is_some_and(|s| s.id == session_id) {
            *guard = None;
        }
    }

    async fn authenticate(&self) -> Result<Session> {
        let Credentials {
            username,
            password,
            application_name,
        } = &self.credentials;

        let rest_data = json!([
            {"user_name": username, "password": password_digest(password)},
            application_name,
            [],
        ]);
        let body = check_remote_error(self.transport.call("login", rest_data).await?)?;

        let entry: RawEntry = serde_json::from_value(body.clone()).map_err(|e| {
            CrmError::UnexpectedResponse {
                method: "login".to_string(),
                message: e.to_string(),
            }
        })?;
        let id = entry
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CrmError::UnexpectedResponse {
                method: "login".to_string(),
                message: format!("no session id in response: {}", body),
            })?;

        let lookup = |name: &str| {
            entry
                .name_value_list
                .iter()
                .find(|(k, _)| *k == name)
                .and_then(|(_, v)| v.as_str())
                .map(str::to_string)
        };
        let session = Session {
            id,
            user_id: lookup("user_id"),
            user_name: lookup("user_name"),
        };

        tracing::info!(user = ?session.user_name, "Logged in to SuiteCRM");
        Ok(session)
    }
}

/// Hex MD5 of the password, as the login call expects.
pub fn password_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}
