//! Shared configuration for moviesync consumers.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `moviesync_core::SyncConfig`. The CLI layers its
//! global flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use moviesync_core::{ReconnectConfig, SyncConfig, TlsVerification};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const KEYRING_SERVICE: &str = "moviesync";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, then the configured
    /// default, then `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "http://localhost:3000").
    pub server: String,

    /// Directory for the offline cache. Defaults to the platform cache dir.
    pub cache_dir: Option<PathBuf>,

    /// Session token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Reopen the push channel after it drops. Absent = single attempt.
    pub push_reconnect: Option<ReconnectProfile>,
}

/// Push reconnection settings as written in TOML.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconnectProfile {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

impl ReconnectProfile {
    pub fn to_reconnect_config(&self) -> ReconnectConfig {
        let defaults = ReconnectConfig::default();
        ReconnectConfig {
            initial_delay: self
                .initial_delay_ms
                .map_or(defaults.initial_delay, Duration::from_millis),
            max_delay: self
                .max_delay_ms
                .map_or(defaults.max_delay, Duration::from_millis),
            max_retries: self.max_retries.or(defaults.max_retries),
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "moviesync", "moviesync")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default offline cache directory for a profile.
pub fn default_cache_dir(profile_name: &str) -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".cache").join(profile_name),
        |dirs| dirs.cache_dir().join(profile_name),
    )
}

/// The profile's cache directory, or the platform default.
pub fn cache_dir(profile: &Profile, profile_name: &str) -> PathBuf {
    profile
        .cache_dir
        .clone()
        .unwrap_or_else(|| default_cache_dir(profile_name))
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("moviesync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `MOVIESYNC_`-prefixed variables
/// (`MOVIESYNC_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "Loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MOVIESYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the session token: `token_env` variable, then the system
/// keyring, then plaintext in the profile.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        || keyring_token(profile_name),
    )
}

fn keyring_token(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .and_then(|entry| entry.get_password())
        .ok()
}

fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(val) = profile.token_env.as_deref().and_then(&env) {
        debug!(profile = profile_name, "Token from environment");
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring() {
        debug!(profile = profile_name, "Token from keyring");
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SyncConfig` from a profile and the global defaults.
///
/// The credential is not part of it; resolve it with [`resolve_token`].
pub fn profile_to_sync_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SyncConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let mut config = SyncConfig::for_server(url).map_err(|e| ConfigError::Validation {
        field: "server".into(),
        reason: e.to_string(),
    })?;

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.push_reconnect = profile
        .push_reconnect
        .as_ref()
        .map(ReconnectProfile::to_reconnect_config);

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
timeout = 12

[profiles.home]
server = "http://localhost:3000"
token_env = "HOME_MOVIE_TOKEN"

[profiles.home.push_reconnect]
max_retries = 5
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        let name = config.profile_name(None);
        assert_eq!(name, "home");

        let home = config.profile(&name).unwrap();
        assert_eq!(home.server, "http://localhost:3000");
        assert_eq!(config.defaults.timeout, 12);
        assert_eq!(
            home.push_reconnect.as_ref().and_then(|r| r.max_retries),
            Some(5)
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.profile_name(None), "default");
        assert!(config.profiles.is_empty());
        assert!(matches!(
            config.profile("default"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), profile("https://movies.example.com"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profile("default").unwrap().server,
            "https://movies.example.com"
        );
    }

    #[test]
    fn token_chain_prefers_env_then_keyring_then_plaintext() {
        let mut p = profile("http://localhost:3000");
        p.token_env = Some("MOVIE_TOKEN".into());
        p.token = Some("plain".into());

        let from_env = resolve_token_with(
            &p,
            "default",
            |name| (name == "MOVIE_TOKEN").then(|| "env".to_string()),
            || Some("ring".into()),
        )
        .unwrap();
        assert_eq!(from_env.expose_secret(), "env");

        let from_ring = resolve_token_with(&p, "default", |_| None, || Some("ring".into())).unwrap();
        assert_eq!(from_ring.expose_secret(), "ring");

        let from_plain = resolve_token_with(&p, "default", |_| None, || None).unwrap();
        assert_eq!(from_plain.expose_secret(), "plain");
    }

    #[test]
    fn no_token_anywhere_is_an_error() {
        let err = resolve_token_with(&profile("http://x"), "work", |_| None, || None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "work"));
    }

    #[test]
    fn sync_config_follows_profile() {
        let mut p = profile("https://movies.example.com");
        p.timeout = Some(7);
        p.ca_cert = Some("/etc/ca.pem".into());
        p.push_reconnect = Some(ReconnectProfile {
            initial_delay_ms: Some(250),
            ..ReconnectProfile::default()
        });

        let config = profile_to_sync_config(&p, &Defaults::default()).unwrap();
        assert_eq!(config.push_url.as_str(), "wss://movies.example.com/");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));

        let reconnect = config.push_reconnect.unwrap();
        assert_eq!(reconnect.initial_delay, Duration::from_millis(250));
        assert_eq!(reconnect.max_delay, ReconnectConfig::default().max_delay);
    }

    #[test]
    fn insecure_default_applies_without_override() {
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let config = profile_to_sync_config(&profile("https://localhost:3000"), &defaults).unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert!(config.push_reconnect.is_none());
    }

    #[test]
    fn bad_server_url_is_rejected() {
        let err = profile_to_sync_config(&profile("not a url"), &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
    }

    #[test]
    fn cache_dir_prefers_profile_setting() {
        let mut p = profile("http://x");
        assert!(cache_dir(&p, "work").ends_with("work"));

        p.cache_dir = Some("/tmp/movies".into());
        assert_eq!(cache_dir(&p, "work"), PathBuf::from("/tmp/movies"));
    }
}
