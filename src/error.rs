use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the module web server
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to load handler module {module}: {reason}")]
    Load { module: String, reason: String },

    #[error("Invalid handler module {module}: {reason}")]
    InvalidHandler { module: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServeError {
    pub fn load(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::Load {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_handler(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHandler {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status reported to the client for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound(_) => StatusCode::NOT_FOUND,
            ServeError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ServeError::Load { .. }
            | ServeError::InvalidHandler { .. }
            | ServeError::Io(_)
            | ServeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServeError>;
