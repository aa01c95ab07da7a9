//! Scripted transport and fixture modules shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use suitecrm_client::{CrmConfig, FieldType, Module, Result, Transport};
use url::Url;

/// Replays canned bodies in order and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, rest_data: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), rest_data));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for '{method}'"));
        Ok(reply)
    }
}

pub fn config() -> CrmConfig {
    CrmConfig::new(
        Url::parse("https://crm.example.com/").unwrap(),
        "admin",
        "password",
    )
}

pub fn login_reply(session_id: &str) -> Value {
    json!({
        "id": session_id,
        "module_name": "Users",
        "name_value_list": {
            "user_id": {"name": "user_id", "value": "1"},
            "user_name": {"name": "user_name", "value": "admin"}
        }
    })
}

pub fn invalid_session_reply() -> Value {
    json!({
        "name": "Invalid Session ID",
        "number": 11,
        "description": "The session ID is invalid"
    })
}

pub fn contacts() -> Arc<Module> {
    Arc::new(Module::new(
        "Contacts",
        [
            ("id", FieldType::Id),
            ("firstName", FieldType::Text),
            ("email1", FieldType::Text),
        ]
        .into_iter()
        .collect(),
    ))
}

pub fn accounts() -> Module {
    Module::new(
        "Accounts",
        [
            ("id", FieldType::Id),
            ("name", FieldType::Text),
            ("billingCity", FieldType::Text),
            ("employees", FieldType::Integer),
        ]
        .into_iter()
        .collect(),
    )
    .with_relationship("contacts", contacts())
    .unwrap()
}
