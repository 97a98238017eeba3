//! Error types for orchestrated HTTP calls.
//!
//! Errors never escape the call entry points of [`Client`](crate::Client); they are
//! carried inside [`Outcome::Failure`](crate::Outcome) and handed to `on_error`
//! callbacks. They are still ordinary `Result` errors for the builder and
//! configuration layers.

use http::StatusCode;
use serde_json::Value;

/// Fields of a structured error body consulted, in order, for a user-facing message.
const BODY_MESSAGE_FIELDS: [&str; 3] = ["message", "error", "detail"];

/// The main error type.
///
/// # Examples
///
/// ```
/// use outcall::{Error, TransportError};
/// use http::StatusCode;
///
/// let err = Error::from(TransportError::status(
///     StatusCode::INTERNAL_SERVER_ERROR,
///     r#"{"message":"insufficient stock"}"#,
/// ));
///
/// assert_eq!(err.user_message("Something went wrong"), "insufficient stock");
/// assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request descriptor or client was configured incorrectly.
    ///
    /// Raised before any network activity, e.g. when no URL and no call thunk
    /// were supplied.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport failed or the server answered with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be decoded.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code of the response
    /// * `raw_response` - The raw response body
    /// * `message` - The decoder's error message
    #[error("Failed to parse response (status {status}): {message}")]
    Parse {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body that failed to parse
        raw_response: String,
        /// The decoder's error message
        message: String,
    },

    /// The request body could not be serialized to JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Resolves the best human-readable message for this error.
    ///
    /// Transport errors are searched in priority order: the structured body's
    /// `message`, then `error`, then `detail`, then the transport's own message.
    /// `default` is used when none of them is a non-empty string.
    /// Configuration and parse errors use their own description.
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Error::Transport(err) => err.resolve_message(default),
            Error::Configuration(msg) => msg.clone(),
            Error::Parse { message, .. } if !message.is_empty() => message.clone(),
            Error::Parse { .. } => default.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Transport(err) => err.status,
            Error::Parse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Transport(err) => err.raw_body.as_deref(),
            Error::Parse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns `true` for errors raised before the transport was invoked.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::InvalidUrl(_) | Error::SerializationFailed(_)
        )
    }
}

/// What went wrong at the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, TLS failure and similar.
    Network,
    /// The call did not finish within its timeout.
    Timeout,
    /// The server answered with a non-2xx status.
    Status,
}

/// A typed transport failure.
///
/// Holds the status code, raw body and (when the body is JSON) the parsed body,
/// so message lookup is plain data access.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<StatusCode>,
    /// Raw response body, when a response was received.
    pub raw_body: Option<String>,
    /// Response body decoded as JSON, when possible.
    pub parsed_body: Option<Value>,
    /// The transport's own description of the failure.
    pub message: String,
}

impl TransportError {
    /// A network-level failure with no response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            status: None,
            raw_body: None,
            parsed_body: None,
            message: message.into(),
        }
    }

    /// A timeout with no response.
    pub fn timeout() -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: "Request timed out".to_string(),
            ..Self::network("")
        }
    }

    /// A non-2xx response. The body text becomes the transport message and is
    /// decoded as JSON when it parses.
    pub fn status(status: StatusCode, raw_body: impl Into<String>) -> Self {
        let raw_body = raw_body.into();
        let parsed_body = serde_json::from_str::<Value>(&raw_body).ok();
        let message = if raw_body.trim().is_empty() {
            format!("HTTP error {status}")
        } else {
            raw_body.clone()
        };

        Self {
            kind: TransportErrorKind::Status,
            status: Some(status),
            raw_body: Some(raw_body),
            parsed_body,
            message,
        }
    }

    /// Resolves the user-facing message; see [`Error::user_message`].
    pub fn resolve_message(&self, default: &str) -> String {
        if let Some(body) = self.parsed_body.as_ref().and_then(Value::as_object) {
            let found = BODY_MESSAGE_FIELDS
                .iter()
                .filter_map(|field| body.get(*field).and_then(Value::as_str))
                .find(|text| !text.is_empty());
            if let Some(text) = found {
                return text.to_string();
            }
        }

        if !self.message.is_empty() {
            return self.message.clone();
        }

        default.to_string()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::timeout()
        } else {
            TransportError::network(err.to_string())
        }
    }
}

/// A specialized `Result` type for builder and configuration operations.
pub type Result<T> = std::result::Result<T, Error>;
