// ── Core error types ──
//
// User-facing errors from nutridash-core. Consumers never see raw HTTP
// status codes or JSON parse failures: the `From<nutridash_api::Error>`
// impl sorts transport failures into the dashboard's error taxonomy, and
// `user_message()` renders each variant as the text shown to staff.

use thiserror::Error;

use crate::model::ResourceKind;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Session is gone; stop paging and ask the user to sign in.
    Unauthorized,
    /// Network hiccup or overloaded backend; safe to retry.
    Transient,
    /// Retrying the same request won't help.
    Permanent,
    /// Superseded or aborted; not an error from the user's point of view.
    Cancelled,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    // ── Backend rejections ───────────────────────────────────────────
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// HTTP 400/409/422. `field` binds the message to a form field.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        status: u16,
    },

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Transport ────────────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Flow control ─────────────────────────────────────────────────
    #[error("Request cancelled")]
    Cancelled,

    /// The crawl hit its page guard before the backend reported a last page.
    #[error("Incomplete {kind} crawl: stopped after {pages} pages ({items} items)")]
    IncompleteCrawl {
        kind: ResourceKind,
        pages: u32,
        items: usize,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::Unauthorized { .. } => FailureClass::Unauthorized,
            Self::Cancelled => FailureClass::Cancelled,
            Self::ConnectionFailed { .. } | Self::Timeout | Self::IncompleteCrawl { .. } => {
                FailureClass::Transient
            }
            Self::Server { status, .. } if matches!(status, 502..=504) => FailureClass::Transient,
            _ => FailureClass::Permanent,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Form field a validation message belongs to, if the backend named one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message suitable for an alert or a form hint.
    ///
    /// Cancellation renders as an empty string; callers filter it out
    /// before it reaches UI error state.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => "You are not authorized. Please sign in again.".into(),
            Self::NotFound { .. } => "Resource not found.".into(),
            Self::Validation { message, .. } | Self::Api { message, .. } => message.clone(),
            Self::PayloadTooLarge => "File too large.".into(),
            Self::Server { .. } => "System error, please try again later.".into(),
            Self::ConnectionFailed { .. } | Self::Timeout => {
                "Cannot reach the server. Check your connection.".into()
            }
            Self::Cancelled => String::new(),
            Self::IncompleteCrawl { kind, pages, .. } => {
                format!("Could not load the full {kind} list (stopped after {pages} pages).")
            }
            Self::Config { message } => format!("Configuration error: {message}"),
            Self::Internal(_) => "Unexpected response from the server.".into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nutridash_api::Error> for CoreError {
    fn from(err: nutridash_api::Error) -> Self {
        use nutridash_api::Error as Api;

        match err {
            Api::Unauthorized { message, .. } | Api::RefreshFailed { message } => {
                CoreError::Unauthorized { message }
            }
            Api::TokenStore(message) => CoreError::Internal(format!("token store: {message}")),
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            Api::Http {
                status,
                message,
                code,
                field,
            } => match status {
                404 => CoreError::NotFound { message },
                413 => CoreError::PayloadTooLarge,
                400 | 409 | 422 => CoreError::Validation {
                    // Conflicts without an explicit field are duplicate names.
                    field: field.or_else(|| (status == 409).then(|| "name".to_owned())),
                    message,
                    status,
                },
                500..=599 => CoreError::Server { status, message },
                _ => CoreError::Api {
                    message,
                    code,
                    status: Some(status),
                },
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
