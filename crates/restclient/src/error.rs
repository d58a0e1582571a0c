//! Error types for request dispatch and response handling.

/// Result alias used throughout the crate.
pub type Result<T, E = RestError> = std::result::Result<T, E>;

/// Errors raised while building, sending, or decoding a request.
///
/// URL and header problems are reported synchronously by `dispatch`, before
/// any network I/O. Everything else arrives through the in-flight handle.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The URL did not parse.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The scheme is neither `http` nor `https`.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The URL names no host.
    #[error("URL has no host: {0}")]
    MissingHost(String),

    /// A caller header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// Header name as given.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transport could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// `dispatch` was called outside a tokio runtime.
    #[error("dispatch requires a running tokio runtime")]
    NoRuntime,

    /// Connecting or sending failed.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The connection broke while the body was read.
    #[error("failed to read response body: {0}")]
    Read(#[source] reqwest::Error),

    /// The body was expected to be JSON and was not.
    #[error("failed to parse JSON (status {status}): {source}")]
    Json {
        /// Response status.
        status: u16,
        /// Raw body text.
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The spawned exchange panicked or was cancelled.
    #[error("request task did not complete: {0}")]
    Task(String),
}
