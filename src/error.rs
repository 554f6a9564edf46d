use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum TaxiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response body error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State storage error: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No active document, skipping API {verb}.")]
    NoActiveDocument { verb: String },

    #[error("Taxi for Email: {status}  - {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    #[error("{status} - {reason}{}", message_suffix(.message))]
    ApiRejected {
        status: u16,
        reason: String,
        message: Option<String>,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Taxi for Email: {verb} already in progress")]
    Busy { verb: String },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" : {m}"))
        .unwrap_or_default()
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("No design system id set; run `taxi-eds set-id <ID>` first")]
    NoDesignSystem,
}

/// Persisted state errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State file IO error: {path} - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file is corrupt: {path} - {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("State value could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Rejected user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Value {label} is not a numeric design system id")]
    InvalidLabel { label: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TaxiError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// State result type alias
pub type StateResult<T> = std::result::Result<T, StateError>;
