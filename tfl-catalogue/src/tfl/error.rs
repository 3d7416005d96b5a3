//! TfL client error types.

/// Errors from the TfL HTTP client.
///
/// Every variant names the endpoint that failed; the rate limiter never
/// produces errors of its own and only forwards these.
#[derive(Debug, thiserror::Error)]
pub enum TflError {
    /// Request failed before an HTTP response arrived (connection,
    /// timeout, body read)
    #[error("HTTP error requesting {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Credentials were rejected
    #[error("unauthorized requesting {endpoint}: check TFL_APP_ID and TFL_APP_KEY")]
    Unauthorized { endpoint: String },

    /// API returned a non-success status
    #[error("API error {status} requesting {endpoint}: {message}")]
    Status {
        status: u16,
        endpoint: String,
        message: String,
    },

    /// Client could not be constructed from the given configuration
    #[error("invalid client configuration: {message}")]
    Config { message: String },
}
