use thiserror::Error;

/// Errors surfaced by the library API.
///
/// Warn-and-degrade behavior lives in the lenient helpers
/// (`api::endpoint::service_path`, `api::query::update_query`); everything
/// else returns one of these so callers can tell an empty result from a
/// failed one.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid search option: {0}")]
    UnknownEndpoint(String),

    #[error("Invalid or missing query parameters: {0}")]
    InvalidAddress(String),

    #[error("No API key provided")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response from {path} as JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    /// Only raised in strict mode; non-strict calls return the error
    /// response as a populated record instead.
    #[error("API returned status {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },
}
