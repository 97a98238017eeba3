//! The terminal result of one call.
//!
//! Every call produces exactly one [`Outcome`]. The entry points return
//! [`Outcome::into_data`] so a failure or redirect surfaces as `None` instead of
//! an error.

use crate::notify::Notification;
use crate::transport::RawResponse;
use crate::Error;

/// Tagged result of one call.
///
/// # Examples
///
/// ```
/// use outcall::{Error, Outcome};
///
/// let outcome: Outcome<u32> = Outcome::Failure {
///     message: "URL is required".to_string(),
///     cause: Error::Configuration("URL is required".to_string()),
/// };
///
/// assert!(outcome.is_failure());
/// assert_eq!(outcome.into_data(), None);
/// ```
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call succeeded and the payload was decoded.
    Success {
        /// The decoded payload.
        data: T,
        /// The response it was decoded from.
        response: RawResponse,
    },
    /// The call was redirected, at the protocol level or by a `redirectTo` hint.
    Redirect {
        /// Where the caller should go.
        location: String,
    },
    /// The call failed.
    Failure {
        /// Best human-readable message.
        message: String,
        /// What went wrong.
        cause: Error,
    },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Outcome::Redirect { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// The payload, if the call succeeded.
    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The redirect location, if the call was redirected.
    pub fn location(&self) -> Option<&str> {
        match self {
            Outcome::Redirect { location } => Some(location),
            _ => None,
        }
    }

    /// The failure cause, if the call failed.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failure { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Consumes the outcome, returning the payload or the `None` sentinel.
    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Maps the success payload, keeping the response.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success { data, response } => Outcome::Success {
                data: f(data),
                response,
            },
            Outcome::Redirect { location } => Outcome::Redirect { location },
            Outcome::Failure { message, cause } => Outcome::Failure { message, cause },
        }
    }
}

/// A classified outcome plus the notification it suggests.
///
/// Classification stays free of side effects; the client emits the
/// notification and fires callbacks afterwards.
#[derive(Debug)]
pub struct Dispatch<T> {
    pub outcome: Outcome<T>,
    pub notification: Option<Notification>,
}
