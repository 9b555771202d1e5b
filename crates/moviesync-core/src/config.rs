// ── Runtime sync configuration ──
//
// These types describe *where* the server lives and how to talk to it.
// They never touch disk. The CLI builds a `SyncConfig` (usually via
// `moviesync-config`) and hands it in; the credential is supplied
// separately through `SyncCoordinator::set_credential`.

use std::time::Duration;

use moviesync_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Configuration for one movie server.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server root for the record endpoints (e.g. `http://localhost:3000`).
    pub server_url: Url,
    /// Push channel URL (e.g. `ws://localhost:3000/`).
    pub push_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Reopen the push channel after it drops. `None` keeps a single
    /// attempt per session.
    pub push_reconnect: Option<ReconnectConfig>,
}

impl SyncConfig {
    /// Config for `server_url` with the push URL derived from it.
    pub fn for_server(server_url: Url) -> Result<Self, CoreError> {
        let push_url = moviesync_api::push_url_for(&server_url)?;
        Ok(Self {
            server_url,
            push_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            push_reconnect: None,
        })
    }

    /// Build the HTTP transport settings.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
