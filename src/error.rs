use std::path::PathBuf;

use thiserror::Error;

use crate::types::SqlValue;

/// Error type for ifxrs operations
#[derive(Debug, Error)]
pub enum IfxError {
    #[error("{0} is a required setting for an informix connection")]
    MissingSetting(&'static str),

    #[error("cannot find informix driver at {}", .0.display())]
    DriverNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {message} (sql: {sql})")]
    QueryFailed {
        message: String,
        sql: String,
        params: Vec<SqlValue>,
    },

    #[error("Cannot convert value to {target}: {detail}")]
    Conversion { target: &'static str, detail: String },

    #[error("Unsupported date extraction unit: {0}")]
    UnsupportedDateUnit(String),

    #[error("Bridge runtime error: {0}")]
    Runtime(String),
}

impl IfxError {
    /// Wrap a native execution failure, attaching the statement and
    /// parameters that triggered it.
    pub fn query(message: impl Into<String>, sql: &str, params: &[SqlValue]) -> Self {
        IfxError::QueryFailed {
            message: message.into(),
            sql: sql.to_string(),
            params: params.to_vec(),
        }
    }

    pub fn conversion(target: &'static str, detail: impl Into<String>) -> Self {
        IfxError::Conversion {
            target,
            detail: detail.into(),
        }
    }
}

/// Result type alias for ifxrs operations
pub type Result<T> = std::result::Result<T, IfxError>;
