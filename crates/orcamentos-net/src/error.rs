use thiserror::Error;

/// Errors produced while talking to the shared backend.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A write that should return the affected row returned nothing.
    #[error("Backend returned no rows")]
    EmptyResponse,
}

/// Fatal client configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, NetError>;
