//! Transport to the remote RPC endpoint
//!
//! The [`Transport`] trait is the only seam between the client and the
//! network. [`HttpTransport`] speaks the REST v4.1 form protocol; tests plug
//! in scripted transports.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::CrmConfig;
use crate::error::{CrmError, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke `method` with positional `rest_data` and return the decoded JSON body.
    async fn call(&self, method: &str, rest_data: Value) -> Result<Value>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(config: &CrmConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.rest_url()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, rest_data: Value) -> Result<Value> {
        let rest_data = serde_json::to_string(&rest_data)?;
        let response = self
            .client
            .post(self.url.clone())
            .form(&[
                ("method", method),
                ("input_type", "JSON"),
                ("response_type", "JSON"),
                ("rest_data", rest_data.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        // Some methods (logout) answer with an empty body.
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| CrmError::UnexpectedResponse {
            method: method.to_string(),
            message: format!("{}. First 200 chars: {}", e, body.chars().take(200).collect::<String>()),
        })
    }
}

/// Turn a `{name, number, description}` error body into [`CrmError::Remote`].
pub fn check_remote_error(body: Value) -> Result<Value> {
    let is_error = body
        .as_object()
        .map(|o| o.contains_key("number") && o.contains_key("name") && o.contains_key("description"))
        .unwrap_or(false);
    if !is_error {
        return Ok(body);
    }

    let number = match &body["number"] {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => 0,
    };
    Err(CrmError::Remote {
        number,
        name: body["name"].as_str().unwrap_or_default().to_string(),
        description: body["description"].as_str().unwrap_or_default().to_string(),
    })
}
