use thiserror::Error;

use crate::api::RegistryError;
use crate::cache::QueryError;

/// Result type alias for punchline operations
pub type Result<T> = std::result::Result<T, PunchlineError>;

/// Errors that can occur during punchline operations
#[derive(Error, Debug)]
pub enum PunchlineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing required configuration
    #[error("{0}")]
    ConfigMissing(String),

    /// API error surfaced to the command line
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A query or mutation failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Bad endpoint name or kind
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to write config file: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Resource not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),
}

impl PunchlineError {
    /// Create an API error from HTTP status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a config missing error with helpful message
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::ConfigMissing(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Turn a failed query into a command error, naming the resource on 404
    pub fn from_query(error: QueryError, kind: &'static str, id: &str) -> Self {
        match error {
            QueryError::Http { status: 404, .. } => Self::not_found(kind, id),
            QueryError::Http { status, body } => Self::api(status, body),
            other => Self::Query(other),
        }
    }

    /// Process exit code: 2 for usage or configuration problems, 3 when
    /// something does not exist, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::ConfigMissing(_)
            | Self::InvalidArgument(_)
            | Self::Registry(_)
            | Self::Toml(_)
            | Self::Env(_) => 2,
            Self::NotFound { .. } => 3,
            Self::Api { status: 404, .. } => 3,
            Self::Query(error) if error.is_not_found() => 3,
            _ => 1,
        }
    }
}
