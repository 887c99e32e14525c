//! API error types.

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No API URL configured
    #[error("Sync not configured. Add sync.api_url to config or set GUTWISE_API_URL.")]
    NotConfigured,
    /// Request could not be sent or its response read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a non-success status
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    /// Update or delete payload without an `id` field
    #[error("Queued {0} has no record id")]
    MissingRecordId(String),
}
