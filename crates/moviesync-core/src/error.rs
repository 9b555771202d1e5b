// ── Core error types ──
//
// Errors surfaced by the sync core. Consumers read them out of session
// state, so they are plain data: cloneable and comparable. The
// `From<moviesync_api::Error>` impl flattens transport-layer errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Remote errors ────────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Server request timed out")]
    Timeout,

    #[error("Movie not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Server error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Cannot {operation} a movie without an id")]
    MissingId { operation: String },

    #[error("No active session -- set a credential first")]
    NotAuthenticated,

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Push channel error: {reason}")]
    Channel { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Failure of a request/response call to the server.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::AuthenticationFailed { .. }
                | Self::Timeout
                | Self::NotFound { .. }
                | Self::Remote { .. }
        )
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, Self::Cache { .. })
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<moviesync_api::Error> for CoreError {
    fn from(err: moviesync_api::Error) -> Self {
        use moviesync_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Remote {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::Status { status: 404, body } => CoreError::NotFound { identifier: body },
            ApiError::Status { status, body } => CoreError::Remote {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::MissingId { operation } => CoreError::MissingId {
                operation: operation.into(),
            },
            ApiError::WebSocketConnect(reason) | ApiError::WebSocketSend(reason) => {
                CoreError::Channel { reason }
            }
            ApiError::WebSocketClosed { code, reason } => CoreError::Channel {
                reason: format!("closed (code {code}): {reason}"),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Remote {
                message: format!("Unexpected response: {message}"),
                status: None,
            },
        }
    }
}
