//! Connection settings

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_APPLICATION_NAME: &str = "suitecrm-client";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path of the v4.1 REST entry point below the instance root
pub const REST_PATH: &str = "service/v4_1/rest.php";

#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Instance root, e.g. `https://crm.example.com/`
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub application_name: String,
    pub timeout: Duration,
}

impl CrmConfig {
    pub fn new(base_url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url,
            username: username.into(),
            password: password.into(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read settings from `SUITECRM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| ConfigError::MissingSetting {
                name: name.to_string(),
            })
        };

        let raw_url = required("SUITECRM_URL")?;
        let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidSetting {
            name: "SUITECRM_URL".to_string(),
            reason: e.to_string(),
        })?;

        let timeout = match lookup("SUITECRM_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidSetting {
                    name: "SUITECRM_TIMEOUT_SECS".to_string(),
                    reason: e.to_string(),
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url,
            username: required("SUITECRM_USERNAME")?,
            password: required("SUITECRM_PASSWORD")?,
            application_name: lookup("SUITECRM_APPLICATION")
                .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string()),
            timeout,
        })
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the REST entry point.
    pub fn rest_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(REST_PATH).map_err(|e| ConfigError::InvalidSetting {
            name: "base_url".to_string(),
            reason: e.to_string(),
        })
    }
}
