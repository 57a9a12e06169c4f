//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nutridash_config::ConfigError;
use nutridash_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(nutridash::connection_failed),
        help(
            "Check that the admin API is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(nutridash::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in or session expired")]
    #[diagnostic(
        code(nutridash::auth_failed),
        help("Run: nutridash auth login --profile {profile}")
    )]
    AuthFailed { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(nutridash::not_found),
        help("Run: nutridash list {kind} to see what exists")
    )]
    NotFound { kind: String, message: String },

    #[error("{message}")]
    #[diagnostic(code(nutridash::conflict), help("Field: {field}"))]
    Conflict { field: String, message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nutridash::validation))]
    Validation { field: String, reason: String },

    #[error("Payload too large")]
    #[diagnostic(code(nutridash::payload_too_large))]
    PayloadTooLarge,

    // ── API ──────────────────────────────────────────────────────────
    #[error("Server error (HTTP {status})")]
    #[diagnostic(
        code(nutridash::server),
        help("System error, please try again later.")
    )]
    Server { status: u16 },

    #[error("API error: {message}")]
    #[diagnostic(code(nutridash::api_error))]
    ApiError { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(nutridash::incomplete_crawl),
        help("The backend never reported a last page. Raise crawl_max_pages in the profile.")
    )]
    IncompleteCrawl { message: String },

    #[error("Search failed: {message}")]
    #[diagnostic(code(nutridash::search))]
    Search { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nutridash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nutridash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No configuration found")]
    #[diagnostic(
        code(nutridash::no_config),
        help(
            "Create one with: nutridash config init\n\
             Or pass --api-url.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(nutridash::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(nutridash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(nutridash::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name and resource kind the failing command used.
    pub fn in_context(self, profile: &str, kind: &str) -> Self {
        match self {
            Self::AuthFailed { .. } => Self::AuthFailed {
                profile: profile.into(),
            },
            Self::NotFound { message, .. } => Self::NotFound {
                kind: kind.into(),
                message,
            },
            other => other,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.user_message();
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::Unauthorized { .. } => Self::AuthFailed {
                profile: "default".into(),
            },
            CoreError::NotFound { .. } => Self::NotFound {
                kind: String::new(),
                message,
            },
            CoreError::Validation {
                field,
                status: 409,
                ..
            } => Self::Conflict {
                field: field.unwrap_or_else(|| "name".into()),
                message,
            },
            CoreError::Validation { field, .. } => Self::Validation {
                field: field.unwrap_or_else(|| "input".into()),
                reason: message,
            },
            CoreError::PayloadTooLarge => Self::PayloadTooLarge,
            CoreError::Server { status, .. } => Self::Server { status },
            CoreError::IncompleteCrawl { .. } => Self::IncompleteCrawl { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Api { message, .. } => Self::ApiError { message },
            CoreError::Cancelled => Self::ApiError {
                message: "request cancelled".into(),
            },
            CoreError::Internal(detail) => Self::ApiError { message: detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_keeps_field_and_exit_code() {
        let err = CliError::from(CoreError::Validation {
            message: "Name already exists".into(),
            field: Some("name".into()),
            status: 409,
        });
        assert!(matches!(err, CliError::Conflict { ref field, .. } if field == "name"));
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
    }

    #[test]
    fn unauthorized_names_the_profile() {
        let err = CliError::from(CoreError::Unauthorized {
            message: "expired".into(),
        })
        .in_context("staging", "foods");
        assert!(matches!(err, CliError::AuthFailed { ref profile } if profile == "staging"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "api_url".into(),
            reason: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
