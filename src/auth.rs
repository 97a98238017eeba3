//! Authentication strategies for external calls.
//!
//! An [`AuthDescriptor`] selects one scheme; [`AuthDescriptor::resolve`] turns it
//! into the headers to merge into the outbound request, plus a copy safe to log.

use base64::{engine::general_purpose, Engine as _};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Replaces secret header values in the diagnostic copy.
pub const REDACTED: &str = "[REDACTED]";

/// Header used by [`AuthDescriptor::ApiKey`] when no header name is given.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Authentication scheme for an external call.
///
/// Incomplete descriptors (an empty token, a missing password) resolve to no
/// headers rather than an error.
///
/// Descriptors deserialize from the tagged JSON form callers already use:
///
/// ```
/// use outcall::AuthDescriptor;
///
/// let auth: AuthDescriptor = serde_json::from_str(
///     r#"{"type":"apiKey","apiKey":"abc123","apiKeyHeader":"X-Key"}"#,
/// ).unwrap();
///
/// let resolved = auth.resolve();
/// assert_eq!(resolved.headers["x-key"], "abc123");
/// assert_eq!(resolved.redacted["x-key"], "[REDACTED]");
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthDescriptor {
    /// `Authorization: Bearer <token>`.
    Bearer {
        #[serde(default)]
        token: String,
    },
    /// `Authorization: Basic <base64(username:password)>`.
    Basic {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    /// `<header_name>: <key>`, defaulting to [`DEFAULT_API_KEY_HEADER`].
    ApiKey {
        #[serde(default, rename = "apiKey")]
        key: String,
        #[serde(default, rename = "apiKeyHeader")]
        header_name: Option<String>,
    },
    /// Same wire effect as [`AuthDescriptor::Bearer`].
    #[serde(rename = "oauth2")]
    OAuth2 {
        #[serde(default)]
        token: String,
    },
    /// Headers passed through verbatim and unredacted.
    RawHeaders {
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl AuthDescriptor {
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthDescriptor::Bearer {
            token: token.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthDescriptor::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn api_key(key: impl Into<String>, header_name: Option<String>) -> Self {
        AuthDescriptor::ApiKey {
            key: key.into(),
            header_name,
        }
    }

    pub fn oauth2(token: impl Into<String>) -> Self {
        AuthDescriptor::OAuth2 {
            token: token.into(),
        }
    }

    pub fn raw_headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        AuthDescriptor::RawHeaders {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Name of the active scheme, for logs.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthDescriptor::Bearer { .. } => "bearer",
            AuthDescriptor::Basic { .. } => "basic",
            AuthDescriptor::ApiKey { .. } => "apiKey",
            AuthDescriptor::OAuth2 { .. } => "oauth2",
            AuthDescriptor::RawHeaders { .. } => "rawHeaders",
        }
    }

    /// Produces the headers for this scheme and their redacted copy.
    ///
    /// Resolution is deterministic: resolving the same descriptor twice yields
    /// identical maps. Header names or values that are not valid HTTP are
    /// skipped with a warning.
    pub fn resolve(&self) -> ResolvedAuth {
        let mut resolved = ResolvedAuth::default();

        match self {
            AuthDescriptor::Bearer { token } | AuthDescriptor::OAuth2 { token } => {
                if !token.is_empty() {
                    resolved.insert_secret(AUTHORIZATION, &format!("Bearer {token}"));
                }
            }
            AuthDescriptor::Basic { username, password } => {
                if !username.is_empty() && !password.is_empty() {
                    let encoded =
                        general_purpose::STANDARD.encode(format!("{username}:{password}"));
                    resolved.insert_secret(AUTHORIZATION, &format!("Basic {encoded}"));
                }
            }
            AuthDescriptor::ApiKey { key, header_name } => {
                if !key.is_empty() {
                    let name = header_name
                        .as_deref()
                        .filter(|name| !name.is_empty())
                        .unwrap_or(DEFAULT_API_KEY_HEADER);
                    match HeaderName::try_from(name) {
                        Ok(name) => resolved.insert_secret(name, key),
                        Err(e) => tracing::warn!(
                            header = name,
                            error = %e,
                            "Skipping invalid API key header name"
                        ),
                    }
                }
            }
            AuthDescriptor::RawHeaders { headers } => {
                for (name, value) in headers {
                    match (
                        HeaderName::try_from(name.as_str()),
                        HeaderValue::try_from(value.as_str()),
                    ) {
                        (Ok(name), Ok(value)) => {
                            resolved.redacted.insert(name.clone(), value.clone());
                            resolved.headers.insert(name, value);
                        }
                        _ => tracing::warn!(header = %name, "Skipping invalid raw auth header"),
                    }
                }
            }
        }

        resolved
    }
}

// Secrets stay out of debug output.
impl fmt::Debug for AuthDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthDescriptor::Bearer { .. } => {
                f.debug_struct("Bearer").field("token", &REDACTED).finish()
            }
            AuthDescriptor::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &REDACTED)
                .finish(),
            AuthDescriptor::ApiKey { header_name, .. } => f
                .debug_struct("ApiKey")
                .field("key", &REDACTED)
                .field("header_name", header_name)
                .finish(),
            AuthDescriptor::OAuth2 { .. } => {
                f.debug_struct("OAuth2").field("token", &REDACTED).finish()
            }
            AuthDescriptor::RawHeaders { headers } => {
                f.debug_struct("RawHeaders").field("headers", headers).finish()
            }
        }
    }
}

/// Headers produced by an [`AuthDescriptor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAuth {
    /// Headers to merge into the outbound request.
    pub headers: HeaderMap,
    /// The same headers with secret values replaced by [`REDACTED`].
    pub redacted: HeaderMap,
}

impl ResolvedAuth {
    fn insert_secret(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::try_from(value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(name.clone(), value);
                self.redacted.insert(name, HeaderValue::from_static(REDACTED));
            }
            Err(e) => {
                tracing::warn!(header = %name, error = %e, "Skipping invalid auth header value")
            }
        }
    }

    /// Returns `true` when the descriptor contributed no headers.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
