//! Error types for redmine-mcp-tools.

use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned a non-success status. The message is shown to clients as-is.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Requested entity does not exist (no upstream status involved)
    #[error("{0}")]
    NotFound(String),

    /// Response body could not be understood
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an API error from an HTTP status and the raw response body.
    ///
    /// Redmine reports validation failures as `{"errors": [...]}`; those are
    /// joined into the message. Any other body is used verbatim.
    pub fn from_status(status: u16, body: impl AsRef<str>) -> Self {
        let body = body.as_ref().trim();
        let detail = serde_json::from_str::<ErrorsBody>(body)
            .ok()
            .filter(|parsed| !parsed.errors.is_empty())
            .map(|parsed| parsed.errors.join(", "))
            .unwrap_or_else(|| body.to_string());

        let message = if detail.is_empty() {
            format!("Redmine API error ({})", status)
        } else {
            format!("Redmine API error ({}): {}", status, detail)
        };

        Error::Api { status, message }
    }

    /// Upstream HTTP status, when the failure came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorsBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;
