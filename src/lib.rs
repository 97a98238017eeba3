//! # Outcall - request orchestration that never throws
//!
//! Outcall wraps an outbound HTTP call with authentication-strategy selection,
//! response parsing, success/error/redirect classification and user-facing
//! notification side effects. Every call produces exactly one [`Outcome`] and
//! fires at most one terminal callback; the call entry points return the parsed
//! payload or `None` and never return an error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outcall::{Client, RequestDescriptor};
//! use http::Method;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Debug, Deserialize)]
//! struct Order {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), outcall::Error> {
//!     let client = Client::builder()
//!         .base_url("https://shop.example.com")?
//!         .build()?;
//!
//!     // Notifications are on by default for internal calls
//!     let order: Option<Order> = client
//!         .call(
//!             RequestDescriptor::new(Method::POST, "/api/orders")
//!                 .json_body(&json!({"qty": 2}))?
//!                 .success_message("Order placed")
//!                 .on_error(|err| eprintln!("order failed: {err}")),
//!         )
//!         .await;
//!
//!     println!("{order:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## External calls
//!
//! Third-party calls carry a base URL, an [`AuthDescriptor`] and a timeout
//! (30 seconds unless set). Notifications are off unless opted in.
//!
//! ```no_run
//! use outcall::{AuthDescriptor, Client, ExternalRequest, RequestDescriptor};
//! use http::Method;
//! use serde_json::Value;
//!
//! # async fn example(client: Client) {
//! let request = ExternalRequest::new(RequestDescriptor::<Value>::new(Method::GET, "/v2/rates"))
//!     .base_url("https://rates.example.net")
//!     .auth(AuthDescriptor::api_key("abc123", Some("X-Key".to_string())));
//!
//! if let Some(rates) = client.call_external(request).await {
//!     println!("{rates}");
//! }
//! # }
//! ```
//!
//! ## Features
//!
//! - **Single outcome per call** - `Success`, `Redirect` or `Failure`, with the matching callback
//! - **Redirect detection** - protocol redirects and `redirectTo` payload hints
//! - **Message resolution** - the error body's `message`, `error` or `detail`,
//!   then the transport message, then a default
//! - **Auth strategies** - bearer, basic, API key, OAuth2 and raw headers,
//!   with a redacted copy for logs
//! - **Pluggable transport** - raw-fetch or structured calling conventions; `reqwest` by default
//! - **Pluggable notifications** - the client suggests, a [`Notifier`] renders
//! - **Structured logging** with `tracing`

mod auth;
mod client;
pub mod config;
mod descriptor;
mod error;
pub mod notify;
mod outcome;
pub mod token;
pub mod transport;

pub use auth::{AuthDescriptor, ResolvedAuth, DEFAULT_API_KEY_HEADER, REDACTED};
pub use client::{Client, ClientBuilder, REDIRECT_HINT_FIELD, URL_REQUIRED};
pub use config::ClientConfig;
pub use descriptor::{
    BoxError, CallFuture, CallThunk, ExternalRequest, ParseFn, RequestDescriptor, Target,
};
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use notify::{Notification, NotificationKind, Notifier, SilentNotifier, TracingNotifier};
pub use outcome::{Dispatch, Outcome};
pub use transport::{CallShape, RawResponse, ReqwestTransport, Transport, TransportRequest};
