//! Error types for the Dataverse client.

use thiserror::Error;

/// Result type for Dataverse client operations.
pub type Result<T> = std::result::Result<T, DataverseError>;

/// Dataverse client errors.
#[derive(Debug, Error)]
pub enum DataverseError {
    /// Configuration error (missing base URL, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API error (non-2xx response from the Web API)
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The create response carried no `OData-EntityId` header
    #[error("Response did not identify the created entity")]
    MissingEntityId,

    /// Parse error (malformed entity id, unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DataverseError {
    /// Whether the operation is worth retrying (transport failures and
    /// server-side/throttling statuses).
    pub fn is_transient(&self) -> bool {
        match self {
            DataverseError::Network(_) => true,
            DataverseError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
