//! Classified error taxonomy.
//!
//! Every failure that leaves this crate is a [`ClassifiedError`]. Callers can
//! branch on [`ErrorKind`] or the `retryable` flag without string matching,
//! show `user_message()` to people, and log `technical_message()`.
//!
//! | Kind       | Retried by the controller | Typical source                    |
//! |------------|---------------------------|-----------------------------------|
//! | Network    | yes                       | fetch/transport failure           |
//! | RateLimit  | yes                       | HTTP 429, RESOURCE_EXHAUSTED      |
//! | Auth       | no                        | HTTP 401/403, missing API key     |
//! | Validation | no                        | HTTP 400, schema violations       |
//! | RemoteApi  | only for 503              | any other HTTP status             |
//! | Unknown    | no                        | unrecognised shape                |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::user_message;
use crate::locale::Language;
use crate::raw::RawError;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    RateLimit,
    Auth,
    Validation,
    RemoteApi,
    Unknown,
}

impl ErrorKind {
    /// Kinds the retry controller absorbs regardless of status.
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Auth => write!(f, "auth"),
            Self::Validation => write!(f, "validation"),
            Self::RemoteApi => write!(f, "remote_api"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One unmet field constraint, addressed by dotted path (`items.0.ratio`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A failure mapped into the taxonomy.
///
/// Fields are private and there are no setters: the `with_*` helpers consume
/// the value, so an error cannot change once it has been handed out.
#[derive(Debug, Clone, Error)]
#[error("[{kind}] {technical_message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    technical_message: String,
    user_message: String,
    custom_message: bool,
    http_status: Option<u16>,
    retryable: bool,
    violations: Vec<FieldViolation>,
    #[source]
    cause: Option<RawError>,
}

impl ClassifiedError {
    /// Build an error with the standard user message for `kind`.
    pub fn new(kind: ErrorKind, technical_message: impl Into<String>, language: Language) -> Self {
        Self {
            kind,
            technical_message: technical_message.into(),
            user_message: user_message(kind, None, language),
            custom_message: false,
            http_status: None,
            retryable: false,
            violations: Vec::new(),
            cause: None,
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self.custom_message = true;
        self
    }

    /// Record the HTTP status. The standard message is re-derived for it
    /// unless an explicit one was set with `with_user_message`.
    pub fn with_status(mut self, status: Option<u16>, language: Language) -> Self {
        self.http_status = status;
        if !self.custom_message {
            self.user_message = user_message(self.kind, status, language);
        }
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_violations(mut self, violations: Vec<FieldViolation>) -> Self {
        self.violations = violations;
        self
    }

    pub fn with_cause(mut self, cause: RawError) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Full diagnostic text. Not meant for end users.
    pub fn technical_message(&self) -> &str {
        &self.technical_message
    }

    /// Short localized text safe to show to end users.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Path-qualified schema violations (empty for non-validation errors).
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn cause(&self) -> Option<&RawError> {
        self.cause.as_ref()
    }
}
