use thiserror::Error;

/// Errors from the inference backend's HTTP API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, DNS, reset, client timeout).
    #[error("network: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    /// The backend reported an error in the middle of a streamed response.
    #[error("{0}")]
    Stream(String),

    /// The response body could not be decoded.
    #[error("invalid backend response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    Build(String),
}
