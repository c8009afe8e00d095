//! Error taxonomy for store API operations.
//!
//! Every failure an operation can produce is a variant of [`ApiError`], so
//! callers match on one type whether the problem was local configuration, the
//! transport, or the server's answer. Errors are returned, never logged or
//! swallowed inside the client.

use crate::transport::TransportError;

/// Unified error type for every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a status or body the protocol does not allow.
    #[error("invalid server response: {0}")]
    InvalidServerResponse(String),

    /// The server rejected the provided credentials.
    #[error("login failed: the server rejected the credentials")]
    LoginFailed,

    /// A 4xx status other than 401, 403 or 404.
    #[error("bad request (status {status})")]
    BadRequest { status: u16, message: Option<String> },

    /// 401: the request lacked a valid session token.
    #[error("unauthorized: a valid session is required")]
    Unauthorized,

    /// 403: the session is valid but not allowed to do this.
    #[error("forbidden: the session may not perform this operation")]
    Forbidden,

    /// 404: no resource instance with the given identifier.
    #[error("resource not found")]
    NotFound,

    /// 5xx: the server failed internally.
    #[error("server internal error (status {status})")]
    ServerInternalError { status: u16, message: Option<String> },

    /// A required configuration value was never set on the client.
    #[error("missing configuration: {0} is not set")]
    MissingConfiguration(&'static str),

    /// The operation arguments are invalid under the client's schema.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed before a response was obtained.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation was canceled before it completed.
    #[error("operation canceled")]
    Canceled,
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Canceled => ApiError::Canceled,
            TransportError::Failure(source) => ApiError::Transport(source),
        }
    }
}

/// Lifts a human-readable message out of an error body, when the server sent
/// one. Error bodies are JSON objects with an `error` field; anything else
/// yields `None`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}
