// ============================
// sessiongate-backend/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, e.g. `SESSIONGATE_JWT_SECRET`
pub const ENV_PREFIX: &str = "SESSIONGATE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MIN_SECRET_BYTES: usize = 32;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Session record TTL in seconds
    pub session_ttl_secs: u64,
    /// Bearer token lifetime in seconds
    pub token_ttl_secs: u64,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    pub cookies: CookieSettings,
    pub storage: StorageSettings,
    pub provider: ProviderSettings,
}

/// Cookie and header names of the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub access_name: String,
    pub csrf_name: String,
    pub csrf_header: String,
    /// Set the `Secure` attribute; enable behind TLS
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Root directory for the file backend
    pub path: PathBuf,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GoTrue-compatible REST identity provider
    Http,
    /// In-process accounts, for local development
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_json: false,
            session_ttl_secs: 60 * 60 * 24, // 1 day
            token_ttl_secs: 60 * 15,        // 15 minutes
            jwt_secret: String::new(),
            cookies: CookieSettings::default(),
            storage: StorageSettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_name: "access_token".to_string(),
            csrf_name: "csrf_token".to_string(),
            csrf_header: "x-csrf-token".to_string(),
            secure: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
            sweep_interval_secs: 300,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Http,
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings from `config.{toml,yaml,json}` in the working directory,
    /// then `SESSIONGATE_*` environment variables
    pub fn load() -> Result<Self> {
        let figment = Self::base()
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Json::file("config.json"));
        Self::finish(figment)
    }

    /// Load settings from an explicit file; the format follows the extension
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::base().merge(Yaml::file(path)),
            Some("json") => Self::base().merge(Json::file(path)),
            _ => Self::base().merge(Toml::file(path)),
        };
        Self::finish(figment)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn finish(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run safely with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        if self.token_ttl_secs == 0 {
            bail!("token_ttl_secs must be greater than zero");
        }
        if self.token_ttl_secs >= self.session_ttl_secs {
            bail!("token_ttl_secs must be shorter than session_ttl_secs");
        }
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            bail!("jwt_secret must be at least {MIN_SECRET_BYTES} bytes");
        }
        if self.cookies.access_name.is_empty()
            || self.cookies.csrf_name.is_empty()
            || self.cookies.csrf_header.is_empty()
        {
            bail!("cookie and header names must not be empty");
        }
        if self.storage.sweep_interval_secs == 0 {
            bail!("storage.sweep_interval_secs must be greater than zero");
        }
        if self.provider.kind == ProviderKind::Http && self.provider.base_url.is_empty() {
            bail!("provider.base_url is required for the http provider");
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
