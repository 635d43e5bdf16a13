//! Upstream API error types.

/// Errors that can occur when talking to the carpark API.
///
/// These never leave the upstream layer: [`UpstreamClient::request`]
/// logs them and collapses every variant into "no result".
///
/// [`UpstreamClient::request`]: super::UpstreamClient::request
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The client could not be configured
    #[error("invalid client configuration: {0}")]
    Config(String),
}
