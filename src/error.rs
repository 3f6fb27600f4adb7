use thiserror::Error;

/// Result type for mastokit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mastokit
#[derive(Error, Debug)]
pub enum Error {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors (reading attachment files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout errors
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The server answered with a non-success status
    #[error("API error ({status}): {error}")]
    Api {
        status: http::StatusCode,
        error: String,
        description: Option<String>,
    },

    /// Invalid request configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new timeout error
    pub fn timeout(duration: std::time::Duration) -> Self {
        Error::Timeout { duration }
    }

    /// Create a new API error
    pub fn api(
        status: http::StatusCode,
        error: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Error::Api {
            status,
            error: error.into(),
            description,
        }
    }

    /// Create a new invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is a network error
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Check if a local attachment file could not be read
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Check if this is a payload decoding error
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Json(_))
    }

    /// Status code of an API error, if this is one
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Check if the server rejected the credentials (401/403)
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN)
        )
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::InvalidRequest(format!("Invalid header value: {}", err))
    }
}
