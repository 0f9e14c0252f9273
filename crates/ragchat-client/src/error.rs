//! Error types for backend calls.

/// Errors from the query, upload, schema, log and realtime endpoints.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, DNS...).
    #[error("{0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("Request failed with status code {status}")]
    Server { status: u16, detail: Option<String> },
    /// The server answered 2xx but the body did not match the contract.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// Socket channel handshake or framing failure.
    #[error("realtime error: {0}")]
    Realtime(String),
}

impl ApiError {
    /// Text shown to the user: the server's `detail` when it sent one,
    /// otherwise the error itself.
    pub fn detail_text(&self) -> String {
        match self {
            ApiError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
