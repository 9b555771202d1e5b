//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use moviesync_config::ConfigError;
use moviesync_core::{CacheError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to server at {url}")]
    #[diagnostic(
        code(moviesync::connection_failed),
        help(
            "Check that the server is running and accessible.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(moviesync::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(moviesync::auth_failed),
        help("The token was rejected. Sign in again and pass the new token with --token.")
    )]
    AuthFailed { message: String },

    #[error("No token available for profile '{profile}'")]
    #[diagnostic(
        code(moviesync::no_credentials),
        help(
            "Pass --token, set MOVIESYNC_TOKEN, or configure token / token_env\n\
             for the profile in your config file."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Movie '{identifier}' not found")]
    #[diagnostic(
        code(moviesync::not_found),
        help("Run: moviesync list to see available movies")
    )]
    NotFound { identifier: String },

    #[error("Server error: {message}")]
    #[diagnostic(code(moviesync::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(moviesync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(moviesync::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(moviesync::no_config),
        help(
            "Pass --server, set MOVIESYNC_SERVER, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(moviesync::config))]
    Config(ConfigError),

    // ── Local ────────────────────────────────────────────────────────
    #[error("Offline cache error: {message}")]
    #[diagnostic(
        code(moviesync::cache),
        help("Check permissions on the cache directory, or pass --cache-dir.")
    )]
    Cache { message: String },

    #[error("Push channel error: {reason}")]
    #[diagnostic(code(moviesync::channel))]
    Channel { reason: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(moviesync::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(moviesync::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Channel { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::NotFound { identifier } => CliError::NotFound { identifier },
            CoreError::Remote { message, status } => CliError::ApiError { message, status },
            CoreError::MissingId { operation } => CliError::Validation {
                field: "id".into(),
                reason: format!("cannot {operation} a movie without an id"),
            },
            CoreError::NotAuthenticated => CliError::NoCredentials {
                profile: "current".into(),
            },
            CoreError::Cache { message } => CliError::Cache { message },
            CoreError::Channel { reason } => CliError::Channel { reason },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        CliError::Cache {
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::Timeout, exit_code::TIMEOUT),
            (
                CoreError::AuthenticationFailed {
                    message: "expired".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::NotFound {
                    identifier: "x1".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::MissingId {
                    operation: "update".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Remote {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }
}
