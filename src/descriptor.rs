//! Request descriptors: what to call and what to do with the result.

use crate::auth::AuthDescriptor;
use crate::transport::RawResponse;
use crate::{Error, TransportError};
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Boxed error returned by custom response parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future produced by a [`CallThunk`].
pub type CallFuture = BoxFuture<'static, Result<RawResponse, TransportError>>;

/// A pre-built call that bypasses URL resolution and the client's transport.
pub type CallThunk = Box<dyn FnOnce() -> CallFuture + Send>;

/// Maps a raw response to the caller's result type.
pub type ParseFn<T> = Box<dyn FnOnce(&RawResponse) -> Result<T, BoxError> + Send>;

type SuccessFn<T> = Box<dyn FnOnce(&T, &RawResponse) + Send>;
type ErrorFn = Box<dyn FnOnce(&Error) + Send>;
type RedirectFn = Box<dyn FnOnce(&str) + Send>;

/// What a descriptor calls.
pub enum Target {
    /// A pre-built call.
    Thunk(CallThunk),
    /// A URL (absolute, or relative to the client's base URL) and optional JSON body.
    Endpoint { url: String, body: Option<Value> },
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Thunk(_) => f.write_str("Thunk"),
            Target::Endpoint { url, body } => f
                .debug_struct("Endpoint")
                .field("url", url)
                .field("body", body)
                .finish(),
        }
    }
}

/// Terminal callbacks; at most one fires per call.
pub(crate) struct Callbacks<T> {
    pub(crate) on_success: Option<SuccessFn<T>>,
    pub(crate) on_error: Option<ErrorFn>,
    pub(crate) on_redirect: Option<RedirectFn>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_redirect: None,
        }
    }
}

/// Describes one call. Consumed by [`Client::execute`](crate::Client::execute).
///
/// # Examples
///
/// ```
/// use outcall::RequestDescriptor;
/// use http::Method;
/// use serde_json::{json, Value};
///
/// let descriptor = RequestDescriptor::<Value>::new(Method::POST, "/api/orders")
///     .json_body(&json!({"qty": 2}))?
///     .success_message("Order placed")
///     .on_error(|err| eprintln!("order failed: {err}"));
/// # Ok::<(), outcall::Error>(())
/// ```
pub struct RequestDescriptor<T = Value> {
    pub(crate) target: Target,
    pub(crate) method: Method,
    pub(crate) headers: HeaderMap,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) parse_response: Option<ParseFn<T>>,
    pub(crate) callbacks: Callbacks<T>,
    pub(crate) success_message: Option<String>,
    pub(crate) error_message: Option<String>,
    pub(crate) show_notifications: Option<bool>,
}

impl<T> RequestDescriptor<T> {
    /// Creates a descriptor for `method` on `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self::with_target(
            method,
            Target::Endpoint {
                url: url.into(),
                body: None,
            },
        )
    }

    /// Creates a descriptor around a pre-built call.
    pub fn from_thunk<F>(thunk: F) -> Self
    where
        F: FnOnce() -> CallFuture + Send + 'static,
    {
        Self::with_target(Method::GET, Target::Thunk(Box::new(thunk)))
    }

    fn with_target(method: Method, target: Target) -> Self {
        Self {
            target,
            method,
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            timeout: None,
            parse_response: None,
            callbacks: Callbacks::default(),
            success_message: None,
            error_message: None,
            show_notifications: None,
        }
    }

    /// Sets the JSON request body. Ignored for thunk targets.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn json_body(mut self, body: &impl Serialize) -> Result<Self, Error> {
        let value =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        if let Target::Endpoint { body, .. } = &mut self.target {
            *body = Some(value);
        }
        Ok(self)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sets a per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the default JSON decoding of the response.
    pub fn parse_response<F>(mut self, parse: F) -> Self
    where
        F: FnOnce(&RawResponse) -> Result<T, BoxError> + Send + 'static,
    {
        self.parse_response = Some(Box::new(parse));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&T, &RawResponse) + Send + 'static,
    {
        self.callbacks.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.callbacks.on_error = Some(Box::new(f));
        self
    }

    pub fn on_redirect<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&str) + Send + 'static,
    {
        self.callbacks.on_redirect = Some(Box::new(f));
        self
    }

    /// Message for the success notification; defaults to the client's.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Fallback message for the error notification; defaults to the client's.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Overrides whether notifications fire. Internal calls default to `true`,
    /// external calls to `false`.
    pub fn show_notifications(mut self, show: bool) -> Self {
        self.show_notifications = Some(show);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The call target.
    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl<T> fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("query_params", &self.query_params)
            .field("timeout", &self.timeout)
            .field("show_notifications", &self.show_notifications)
            .finish_non_exhaustive()
    }
}

/// A third-party call: a [`RequestDescriptor`] plus base URL and auth.
///
/// Caller headers are merged first and resolved auth headers override them.
/// Unless set explicitly, notifications are off and the timeout is the
/// client's external timeout (30 seconds by default).
#[derive(Debug)]
pub struct ExternalRequest<T = Value> {
    pub(crate) request: RequestDescriptor<T>,
    pub(crate) base_url: Option<String>,
    pub(crate) auth: Option<AuthDescriptor>,
}

impl<T> ExternalRequest<T> {
    pub fn new(request: RequestDescriptor<T>) -> Self {
        Self {
            request,
            base_url: None,
            auth: None,
        }
    }

    /// Base URL for this call, overriding the client's.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Authentication for an endpoint target. A thunk target builds its own
    /// request, so auth set here is not applied to it.
    pub fn auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }
}

impl<T> From<RequestDescriptor<T>> for ExternalRequest<T> {
    fn from(request: RequestDescriptor<T>) -> Self {
        Self::new(request)
    }
}
