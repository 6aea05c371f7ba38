//! Wire types for the Dataverse Web API.

use serde::Deserialize;

/// Error payload returned by the Web API on failure.
///
/// ```json
/// { "error": { "code": "0x80040217", "message": "..." } }
/// ```
#[derive(Debug, Deserialize)]
pub struct ODataErrorResponse {
    pub error: ODataError,
}

#[derive(Debug, Deserialize)]
pub struct ODataError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
