//! The request executor.
//!
//! [`Client`] runs one [`RequestDescriptor`] to completion and produces exactly
//! one [`Outcome`]. Nothing it does on a call path returns an error: failures,
//! redirects and configuration mistakes all come back as an outcome, a
//! notification and a callback. Use [`ClientBuilder`] to configure clients.

use crate::auth::ResolvedAuth;
use crate::config::{
    ClientConfig, DEFAULT_ERROR_MESSAGE, DEFAULT_EXTERNAL_TIMEOUT, DEFAULT_SUCCESS_MESSAGE,
};
use crate::descriptor::{Callbacks, ExternalRequest, ParseFn, RequestDescriptor, Target};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::outcome::{Dispatch, Outcome};
use crate::transport::{CallShape, RawResponse, ReqwestTransport, Transport, TransportRequest};
use crate::{Error, Result, TransportError};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Reported when an endpoint target has no URL.
pub const URL_REQUIRED: &str = "URL is required when no request function is provided";

/// Payload field carrying an application-level redirect.
pub const REDIRECT_HINT_FIELD: &str = "redirectTo";

const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Executes request descriptors through a [`Transport`].
///
/// The client is cheap to clone and designed to be reused; clones share the
/// transport, notifier and defaults.
///
/// # Examples
///
/// ```no_run
/// use outcall::{Client, RequestDescriptor};
/// use http::Method;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Order {
///     id: String,
/// }
///
/// # async fn example() -> Result<(), outcall::Error> {
/// let client = Client::builder()
///     .base_url("https://shop.example.com")?
///     .build()?;
///
/// let order: Option<Order> = client
///     .call(
///         RequestDescriptor::new(Method::POST, "/api/orders")
///             .json_body(&json!({"qty": 2}))?
///             .success_message("Order placed")
///             .on_redirect(|location| println!("go to {location}")),
///     )
///     .await;
///
/// if let Some(order) = order {
///     println!("created {}", order.id);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    notifier: Arc<dyn Notifier>,
    success_message: String,
    error_message: String,
    external_timeout: Duration,
    internal_timeout: Option<Duration>,
}

/// Per-call settings that differ between internal and external calls.
struct CallContext {
    base_url: Option<String>,
    auth: ResolvedAuth,
    timeout: Option<Duration>,
    show_notifications: bool,
}

/// Messages and gating for the notification side effect.
struct Messages {
    success: String,
    error: String,
    show: bool,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Executes an internal call and returns its outcome.
    ///
    /// Notifications default to on. The timeout is the descriptor's, else the
    /// client's internal timeout, which is unset by default.
    pub async fn execute<T>(&self, descriptor: RequestDescriptor<T>) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let context = CallContext {
            base_url: None,
            auth: ResolvedAuth::default(),
            timeout: descriptor.timeout.or(self.inner.internal_timeout),
            show_notifications: descriptor.show_notifications.unwrap_or(true),
        };
        self.run(descriptor, context).await
    }

    /// Executes an internal call, returning the payload or `None`.
    pub async fn call<T>(&self, descriptor: RequestDescriptor<T>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.execute(descriptor).await.into_data()
    }

    /// Executes an external call and returns its outcome.
    ///
    /// Notifications default to off and the timeout to the client's external
    /// timeout. Resolved auth headers override caller headers.
    pub async fn execute_external<T>(&self, request: ExternalRequest<T>) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let ExternalRequest {
            request: descriptor,
            base_url,
            auth,
        } = request;

        if let (Some(auth), Target::Thunk(_)) = (&auth, &descriptor.target) {
            tracing::warn!(
                scheme = auth.scheme(),
                "Auth is not applied to a request thunk; the thunk sets its own headers"
            );
        }

        let auth = auth.map(|auth| auth.resolve()).unwrap_or_default();
        let context = CallContext {
            base_url,
            auth,
            timeout: Some(descriptor.timeout.unwrap_or(self.inner.external_timeout)),
            show_notifications: descriptor.show_notifications.unwrap_or(false),
        };
        self.run(descriptor, context).await
    }

    /// Executes an external call, returning the payload or `None`.
    pub async fn call_external<T>(&self, request: ExternalRequest<T>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.execute_external(request).await.into_data()
    }

    async fn run<T>(&self, descriptor: RequestDescriptor<T>, context: CallContext) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let RequestDescriptor {
            target,
            method,
            headers,
            query_params,
            timeout: _,
            parse_response,
            callbacks,
            success_message,
            error_message,
            show_notifications: _,
        } = descriptor;

        let messages = Messages {
            success: success_message.unwrap_or_else(|| self.inner.success_message.clone()),
            error: error_message.unwrap_or_else(|| self.inner.error_message.clone()),
            show: context.show_notifications,
        };

        let (result, shape) = self
            .perform(target, method, headers, &query_params, &context)
            .await;
        let dispatch = classify(result, shape, parse_response, &messages);

        self.finish(dispatch, callbacks)
    }

    /// Emits the suggested notification, then fires the terminal callback.
    fn finish<T>(&self, dispatch: Dispatch<T>, callbacks: Callbacks<T>) -> Outcome<T> {
        let Dispatch {
            outcome,
            notification,
        } = dispatch;

        if let Some(notification) = &notification {
            self.inner.notifier.notify(notification);
        }

        match &outcome {
            Outcome::Success { data, response } => {
                if let Some(on_success) = callbacks.on_success {
                    on_success(data, response);
                }
            }
            Outcome::Redirect { location } => {
                if let Some(on_redirect) = callbacks.on_redirect {
                    on_redirect(location);
                }
            }
            Outcome::Failure { cause, .. } => {
                if let Some(on_error) = callbacks.on_error {
                    on_error(cause);
                }
            }
        }

        outcome
    }

    /// Performs the call. Returns the shape the result must be classified with.
    async fn perform(
        &self,
        target: Target,
        method: Method,
        headers: HeaderMap,
        query_params: &[(String, String)],
        context: &CallContext,
    ) -> (std::result::Result<RawResponse, Error>, CallShape) {
        if !SUPPORTED_METHODS.contains(&method) {
            let cause = Error::Configuration(format!("Unsupported HTTP method: {method}"));
            return (Err(cause), CallShape::RawFetch);
        }

        match target {
            Target::Thunk(thunk) => {
                tracing::debug!(method = %method, "Executing request function");
                let call = thunk();
                let result = match context.timeout {
                    Some(timeout) => tokio::time::timeout(timeout, call)
                        .await
                        .unwrap_or_else(|_| Err(TransportError::timeout())),
                    None => call.await,
                };
                (result.map_err(Error::from), CallShape::RawFetch)
            }
            Target::Endpoint { url, body } => {
                let shape = self.inner.transport.shape();
                let request =
                    match self.build_request(method, &url, body, headers, query_params, context) {
                        Ok(request) => request,
                        Err(cause) => return (Err(cause), shape),
                    };

                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    auth_headers = ?context.auth.redacted,
                    timeout_ms = request.timeout.map(|t| t.as_millis() as u64),
                    "Executing HTTP request"
                );

                let start_time = Instant::now();
                let result = self.inner.transport.send(request).await;

                if let Ok(response) = &result {
                    tracing::info!(
                        status = response.status.as_u16(),
                        redirected = response.redirected,
                        latency_ms = start_time.elapsed().as_millis() as u64,
                        "Received HTTP response"
                    );
                }

                (result.map_err(Error::from), shape)
            }
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        headers: HeaderMap,
        query_params: &[(String, String)],
        context: &CallContext,
    ) -> Result<TransportRequest> {
        if url.trim().is_empty() {
            return Err(Error::Configuration(URL_REQUIRED.to_string()));
        }

        let mut url = self.resolve_url(url, context.base_url.as_deref())?;
        if !query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query_params {
                pairs.append_pair(key, value);
            }
        }

        let mut request = TransportRequest::new(method, url);
        request.headers = self.inner.default_headers.clone();
        request.headers.extend(headers);
        request.headers.extend(context.auth.headers.clone());
        request.body = body;
        request.timeout = context.timeout;

        Ok(request)
    }

    /// Absolute URLs are used as-is; relative ones are appended to the base path.
    fn resolve_url(&self, url: &str, base_override: Option<&str>) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => return Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(e.into()),
        }

        let base = match base_override {
            Some(base) => Url::parse(base)?,
            None => self.inner.base_url.clone().ok_or_else(|| {
                Error::Configuration(format!("Relative URL '{url}' requires a base URL"))
            })?,
        };

        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Base URL '{base}' cannot take a relative path"
            )));
        }

        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // The base keeps its own query; the relative part's query follows it
        let mut joined = base.clone();
        joined.set_path(&format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        ));
        let query = match (base.query(), query) {
            (Some(base_query), Some(query)) => Some(format!("{base_query}&{query}")),
            (base_query, query) => base_query.or(query).map(str::to_owned),
        };
        joined.set_query(query.as_deref().filter(|q| !q.is_empty()));
        joined.set_fragment(fragment);
        Ok(joined)
    }

    /// Makes a GET request to the specified URL.
    pub async fn get<T>(&self, url: impl Into<String>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.call(RequestDescriptor::new(Method::GET, url)).await
    }

    /// Makes a POST request to the specified URL with a JSON body.
    pub async fn post<B, T>(&self, url: impl Into<String>, body: &B) -> Option<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.call_with_body(Method::POST, url.into(), body).await
    }

    /// Makes a PUT request to the specified URL with a JSON body.
    pub async fn put<B, T>(&self, url: impl Into<String>, body: &B) -> Option<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.call_with_body(Method::PUT, url.into(), body).await
    }

    /// Makes a PATCH request to the specified URL with a JSON body.
    pub async fn patch<B, T>(&self, url: impl Into<String>, body: &B) -> Option<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.call_with_body(Method::PATCH, url.into(), body).await
    }

    /// Makes a DELETE request to the specified URL.
    pub async fn delete<T>(&self, url: impl Into<String>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.call(RequestDescriptor::new(Method::DELETE, url)).await
    }

    async fn call_with_body<B, T>(&self, method: Method, url: String, body: &B) -> Option<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        match RequestDescriptor::new(method, url).json_body(body) {
            Ok(descriptor) => self.call(descriptor).await,
            Err(cause) => {
                let messages = Messages {
                    success: self.inner.success_message.clone(),
                    error: self.inner.error_message.clone(),
                    show: true,
                };
                let dispatch = failure::<T>(cause, &messages);
                self.finish(dispatch, Callbacks::default()).into_data()
            }
        }
    }
}

/// Turns a transport result into an outcome and its suggested notification.
///
/// Non-2xx responses are failures only for [`CallShape::RawFetch`]; structured
/// transports have already raised for them. A protocol redirect or a
/// `redirectTo` string in the payload wins over success.
fn classify<T>(
    result: std::result::Result<RawResponse, Error>,
    shape: CallShape,
    parse_response: Option<ParseFn<T>>,
    messages: &Messages,
) -> Dispatch<T>
where
    T: DeserializeOwned,
{
    let response = match result {
        Ok(response) => response,
        Err(cause) => return failure(cause, messages),
    };

    if shape == CallShape::RawFetch && !response.is_success() && !response.redirected {
        let error = TransportError::status(response.status, response.body);
        if response.status.is_client_error() {
            tracing::error!(
                status = response.status.as_u16(),
                response = ?error.raw_body,
                "Client error (4xx)"
            );
        } else {
            tracing::warn!(
                status = response.status.as_u16(),
                response = ?error.raw_body,
                "Server error (5xx)"
            );
        }
        return failure(Error::Transport(error), messages);
    }

    if response.redirected {
        return redirect(response.url.to_string());
    }

    if let Some(location) = redirect_hint(&response) {
        return redirect(location);
    }

    let decoded = match parse_response {
        Some(parse) => parse(&response).map_err(|e| e.to_string()),
        None => default_decode(&response, shape).map_err(|e| e.to_string()),
    };

    match decoded {
        Ok(data) => Dispatch {
            notification: messages
                .show
                .then(|| Notification::success(messages.success.clone())),
            outcome: Outcome::Success { data, response },
        },
        Err(message) => {
            tracing::error!(
                error = %message,
                raw_response = %response.body,
                "Failed to parse response"
            );
            let cause = Error::Parse {
                status: response.status,
                raw_response: response.body,
                message,
            };
            failure(cause, messages)
        }
    }
}

fn failure<T>(cause: Error, messages: &Messages) -> Dispatch<T> {
    let message = cause.user_message(&messages.error);
    tracing::warn!(error = %cause, user_message = %message, "Request failed");

    Dispatch {
        notification: messages.show.then(|| Notification::error(message.clone())),
        outcome: Outcome::Failure { message, cause },
    }
}

fn redirect<T>(location: String) -> Dispatch<T> {
    tracing::info!(location = %location, "Request redirected");
    Dispatch {
        outcome: Outcome::Redirect { location },
        notification: None,
    }
}

fn redirect_hint(response: &RawResponse) -> Option<String> {
    let payload = response.json().ok()?;
    let location = payload.get(REDIRECT_HINT_FIELD)?.as_str()?;
    (!location.is_empty()).then(|| location.to_string())
}

/// JSON-decodes the body, or passes a structured payload through. An empty
/// body decodes as `null`.
fn default_decode<T>(response: &RawResponse, shape: CallShape) -> serde_json::Result<T>
where
    T: DeserializeOwned,
{
    match (&response.payload, shape) {
        (Some(payload), CallShape::Structured) => serde_json::from_value(payload.clone()),
        _ if response.body.trim().is_empty() => serde_json::from_value(Value::Null),
        _ => serde_json::from_str(&response.body),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use outcall::{ClientBuilder, SilentNotifier};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), outcall::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .external_timeout(Duration::from_secs(10))
///     .default_header("User-Agent", "my-app/1.0")?
///     .error_message("Could not reach the server")
///     .notifier(SilentNotifier)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    transport: Option<Arc<dyn Transport>>,
    call_shape: CallShape,
    notifier: Arc<dyn Notifier>,
    success_message: String,
    error_message: String,
    external_timeout: Duration,
    internal_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            transport: None,
            call_shape: CallShape::RawFetch,
            notifier: Arc::new(TracingNotifier),
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            external_timeout: DEFAULT_EXTERNAL_TIMEOUT,
            internal_timeout: None,
        }
    }

    /// Creates a builder from plain configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or a default header is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::new()
            .call_shape(config.call_shape)
            .success_message(config.success_message.clone())
            .error_message(config.error_message.clone())
            .external_timeout(config.external_timeout());

        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url)?;
        }
        if let Some(timeout) = config.internal_timeout() {
            builder = builder.internal_timeout(timeout);
        }
        for (name, value) in &config.default_headers {
            builder = builder.default_header(name, value)?;
        }

        Ok(builder)
    }

    /// Sets the base URL relative request URLs are appended to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Uses a custom transport instead of the default [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Calling convention of the default transport. Ignored when a custom
    /// transport is set.
    pub fn call_shape(mut self, shape: CallShape) -> Self {
        self.call_shape = shape;
        self
    }

    /// Sets where notifications go. Defaults to [`TracingNotifier`].
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Timeout for external calls that do not set their own. Defaults to 30 seconds.
    pub fn external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout = timeout;
        self
    }

    /// Timeout for internal calls that do not set their own. Unset by default.
    pub fn internal_timeout(mut self, timeout: Duration) -> Self {
        self.internal_timeout = Some(timeout);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?.with_shape(self.call_shape)),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url: self.base_url,
                default_headers: self.default_headers,
                notifier: self.notifier,
                success_message: self.success_message,
                error_message: self.error_message,
                external_timeout: self.external_timeout,
                internal_timeout: self.internal_timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
