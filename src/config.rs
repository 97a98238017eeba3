//! Plain-value client configuration, loadable from TOML.

use crate::transport::CallShape;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Success notification text when none is configured.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Success";

/// Error notification fallback when no better message is found.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong";

/// Timeout applied to external calls that do not set one.
pub const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings.
///
/// Every field has a default, so an empty document is valid:
///
/// ```
/// use outcall::ClientConfig;
///
/// let config = ClientConfig::from_toml_str(r#"
///     base_url = "https://api.example.com/v1"
///     error_message = "Request failed"
///
///     [default_headers]
///     User-Agent = "shop-frontend/2.0"
/// "#)?;
///
/// assert_eq!(config.success_message, "Success");
/// assert_eq!(config.external_timeout_secs, 30);
/// # Ok::<(), outcall::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL relative request URLs are appended to.
    pub base_url: Option<String>,
    /// Headers sent with every request.
    pub default_headers: BTreeMap<String, String>,
    /// Default success notification text.
    pub success_message: String,
    /// Default error notification fallback.
    pub error_message: String,
    /// Timeout for external calls, in seconds.
    pub external_timeout_secs: u64,
    /// Timeout for internal calls, in seconds. Unset means no timeout.
    pub internal_timeout_secs: Option<u64>,
    /// Calling convention of the default transport.
    pub call_shape: CallShape,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_headers: BTreeMap::new(),
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            external_timeout_secs: DEFAULT_EXTERNAL_TIMEOUT.as_secs(),
            internal_timeout_secs: None,
            call_shape: CallShape::RawFetch,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Configuration(format!("Invalid config: {e}")))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    pub fn internal_timeout(&self) -> Option<Duration> {
        self.internal_timeout_secs.map(Duration::from_secs)
    }
}
