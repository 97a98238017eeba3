//! The transport capability and its `reqwest` implementation.
//!
//! A [`Transport`] performs exactly one network call. It reports which
//! [`CallShape`] it follows so the executor knows whether status classification
//! is its own job or has already happened inside the transport.

use crate::{Error, Result, TransportError};
use async_trait::async_trait;
use http::header::LOCATION;
use http::{HeaderMap, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Calling convention of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// Every response is returned, whatever its status. The executor treats
    /// non-2xx as failure and decodes the body text itself.
    #[default]
    RawFetch,
    /// The transport raises a [`TransportError`] for non-2xx responses and may
    /// hand back a pre-decoded payload in [`RawResponse::payload`].
    Structured,
}

/// One outbound call, fully resolved.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: Url,
    /// Headers to send (defaults, caller headers and auth already merged)
    pub headers: HeaderMap,
    /// Optional JSON body
    pub body: Option<Value>,
    /// Per-call timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Creates a request with no headers, body or timeout.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A response as seen by the executor.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final HTTP status
    pub status: StatusCode,
    /// Whether the call was redirected at the protocol level
    pub redirected: bool,
    /// Final URL, or the redirect target when `redirected` is set
    pub url: Url,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body text
    pub body: String,
    /// Payload already decoded by a structured transport
    pub payload: Option<Value>,
}

impl RawResponse {
    /// Creates a non-redirected response with no headers.
    #[must_use]
    pub fn new(status: StatusCode, url: Url, body: impl Into<String>) -> Self {
        Self {
            status,
            redirected: false,
            url,
            headers: HeaderMap::new(),
            body: body.into(),
            payload: None,
        }
    }

    /// Marks the response as redirected to `location`.
    #[must_use]
    pub fn redirected_to(mut self, location: Url) -> Self {
        self.redirected = true;
        self.url = location;
        self
    }

    /// Attaches a pre-decoded payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns true if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The payload as JSON: the structured payload when present, otherwise the
    /// body text decoded as JSON.
    pub fn json(&self) -> std::result::Result<Value, serde_json::Error> {
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => serde_json::from_str(&self.body),
        }
    }
}

/// Performs one network call.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use outcall::{RawResponse, Transport, TransportError, TransportRequest};
///
/// struct Canned;
///
/// #[async_trait]
/// impl Transport for Canned {
///     async fn send(&self, req: TransportRequest) -> Result<RawResponse, TransportError> {
///         Ok(RawResponse::new(http::StatusCode::OK, req.url, r#"{"ok":true}"#))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// The calling convention this transport follows.
    fn shape(&self) -> CallShape {
        CallShape::RawFetch
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure or timeout, and, for
    /// [`CallShape::Structured`] transports, on any non-2xx response.
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
///
/// Redirects are followed; a response whose final URL differs from the
/// requested one, or an unfollowed 3xx carrying `Location`, is reported as
/// redirected.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    shape: CallShape,
}

impl ReqwestTransport {
    /// Creates a raw-fetch transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self::from_client(http_client))
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            shape: CallShape::RawFetch,
        }
    }

    /// Switches the calling convention.
    #[must_use]
    pub fn with_shape(mut self, shape: CallShape) -> Self {
        self.shape = shape;
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn shape(&self) -> CallShape {
        self.shape
    }

    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        // Unfollowed 3xx (e.g. a custom redirect policy)
        let location = if status.is_redirection() {
            headers
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| final_url.join(value).ok())
        } else {
            None
        };

        let body = response.text().await?;
        let redirected = location.is_some() || !same_resource(&final_url, &request.url);

        if self.shape == CallShape::Structured && !status.is_success() && !redirected {
            return Err(TransportError::status(status, body));
        }

        let mut raw = RawResponse::new(status, final_url, body);
        raw.headers = headers;
        if redirected {
            raw.redirected = true;
            if let Some(location) = location {
                raw.url = location;
            }
        }
        if self.shape == CallShape::Structured {
            raw.payload = serde_json::from_str(&raw.body).ok();
        }

        Ok(raw)
    }
}

/// Compares two URLs ignoring fragments, which never reach the server.
fn same_resource(a: &Url, b: &Url) -> bool {
    let (mut a, mut b) = (a.clone(), b.clone());
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_resource_ignores_fragment() {
        let sent = Url::parse("https://example.com/docs#section").unwrap();
        let landed = Url::parse("https://example.com/docs").unwrap();
        assert!(same_resource(&landed, &sent));
    }

    #[test]
    fn test_same_resource_detects_moved_path() {
        let sent = Url::parse("https://example.com/account").unwrap();
        let landed = Url::parse("https://example.com/login").unwrap();
        assert!(!same_resource(&landed, &sent));
    }
}
