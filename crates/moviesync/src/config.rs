//! Resolve the effective server config, cache directory and token from
//! the config file, the selected profile, and CLI flag overrides.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use moviesync_config::{Config, Defaults};
use moviesync_core::{SyncConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs before touching the network.
pub struct Resolved {
    pub profile_name: String,
    pub sync: SyncConfig,
    pub cache_dir: PathBuf,
    /// Token from `--token` or the profile's credential chain. The
    /// cached credential is consulted later, once the cache is open.
    pub token: Option<SecretString>,
}

fn load(global: &GlobalOpts) -> Config {
    match &global.config {
        Some(path) => moviesync_config::load_config_from(path).unwrap_or_default(),
        None => moviesync_config::load_config_or_default(),
    }
}

fn config_display_path(global: &GlobalOpts) -> String {
    global
        .config
        .clone()
        .unwrap_or_else(moviesync_config::config_path)
        .display()
        .to_string()
}

/// Build the effective configuration for this invocation.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load(global);
    let profile_name = cfg.profile_name(global.profile.as_deref());

    let (mut sync, profile_token, profile_cache) = match cfg.profiles.get(&profile_name) {
        Some(profile) => {
            debug!(profile = %profile_name, "Using profile");
            let sync = moviesync_config::profile_to_sync_config(profile, &cfg.defaults)?;
            let token = moviesync_config::resolve_token(profile, &profile_name).ok();
            let cache = moviesync_config::cache_dir(profile, &profile_name);
            (sync, token, Some(cache))
        }
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_display_path(global),
            })?;
            (server_config(server, &cfg.defaults)?, None, None)
        }
    };

    // ── CLI overrides ────────────────────────────────────────────────
    if let Some(server) = global.server.as_deref() {
        let overridden = server_config(server, &cfg.defaults)?;
        sync.server_url = overridden.server_url;
        sync.push_url = overridden.push_url;
    }
    if global.insecure {
        sync.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        sync.timeout = Duration::from_secs(secs);
    }

    let cache_dir = global
        .cache_dir
        .clone()
        .or(profile_cache)
        .unwrap_or_else(|| moviesync_config::default_cache_dir(&profile_name));

    let token = global
        .token
        .clone()
        .map(SecretString::from)
        .or(profile_token);

    Ok(Resolved {
        profile_name,
        sync,
        cache_dir,
        token,
    })
}

/// Cache directory alone, for commands that never reach the server.
pub fn resolve_cache_dir(global: &GlobalOpts) -> PathBuf {
    if let Some(dir) = &global.cache_dir {
        return dir.clone();
    }
    let cfg = load(global);
    let name = cfg.profile_name(global.profile.as_deref());
    cfg.profiles.get(&name).map_or_else(
        || moviesync_config::default_cache_dir(&name),
        |profile| moviesync_config::cache_dir(profile, &name),
    )
}

fn server_config(server: &str, defaults: &Defaults) -> Result<SyncConfig, CliError> {
    let url: url::Url = server.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })?;
    let mut sync = SyncConfig::for_server(url)?;
    sync.timeout = Duration::from_secs(defaults.timeout);
    if defaults.insecure {
        sync.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(sync)
}
