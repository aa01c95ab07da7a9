//! Error types for the SuiteCRM access layer
//!
//! Configuration and selection errors are raised by the builders before any
//! remote call is made. Remote errors carry the diagnostic text the server
//! sent back, untouched.

use serde_json::Value;
use thiserror::Error;

/// Remote error number SuiteCRM uses for an expired or unknown session.
pub const INVALID_SESSION_NUMBER: i64 = 11;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Flattening error: {0}")]
    Flatten(#[from] FlattenError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Remote error {number} ({name}): {description}")]
    Remote {
        number: i64,
        name: String,
        description: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response from '{method}': {message}")]
    UnexpectedResponse { method: String, message: String },
}

impl CrmError {
    /// True when the remote rejected the session token; the client re-logs in once on this.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, CrmError::Remote { number, .. } if *number == INVALID_SESSION_NUMBER)
    }
}

/// Build-time errors in module descriptors and settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Relationship '{new}' on module '{module}' normalizes to '{key}', already used by '{existing}'")]
    RelationshipCollision {
        module: String,
        key: String,
        existing: String,
        new: String,
    },

    #[error("Environment variable {name} not set")]
    MissingSetting { name: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}

/// A requested field or relationship is not declared on the target module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown field '{field}' on module '{module}'")]
    UnknownField { module: String, field: String },

    #[error("Unknown relationship '{relationship}' on module '{module}'")]
    UnknownRelationship {
        module: String,
        relationship: String,
    },

    #[error("Relationship '{relationship}' on module '{module}' targets '{declared}', query targets '{requested}'")]
    TargetMismatch {
        module: String,
        relationship: String,
        declared: String,
        requested: String,
    },
}

/// The raw response did not have the shape the flattener needs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for FlattenError {
    fn from(error: serde_json::Error) -> Self {
        FlattenError::Malformed(error.to_string())
    }
}

/// A flat record does not fit its projected shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Value {value} at '{key}' does not match any declared type")]
    TypeMismatch { key: String, value: Value },
}

pub type Result<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_session_detection() {
        let err = CrmError::Remote {
            number: 11,
            name: "Invalid Session ID".to_string(),
            description: "The session ID is invalid".to_string(),
        };
        assert!(err.is_invalid_session());

        let other = CrmError::Remote {
            number: 40,
            name: "Access Denied".to_string(),
            description: "You do not have access".to_string(),
        };
        assert!(!other.is_invalid_session());
    }

    #[test]
    fn test_remote_error_preserves_diagnostics() {
        let err = CrmError::Remote {
            number: 20,
            name: "Module Does Not Exist".to_string(),
            description: "This module is not available on this server".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Module Does Not Exist"));
        assert!(msg.contains("not available on this server"));
    }
}
