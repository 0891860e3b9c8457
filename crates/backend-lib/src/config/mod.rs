// ============================
// crates/backend-lib/src/config/mod.rs
// ============================
//! Configuration management.
//!
//! Layering, lowest priority first: built-in defaults, a TOML file,
//! `CLOUDKIT_`-prefixed environment variables (`__` separates sections,
//! e.g. `CLOUDKIT_SESSION__TTL_SECS=3600`).
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::{SessionCookieConfig, DEFAULT_SESSION_COOKIE_NAME};


/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CLOUDKIT_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub password: PasswordSettings,
    pub validation: ValidationSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root of the flat-file user store
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_secs: u64,
    /// Mark the cookie `Secure`; turn off only for plain-HTTP development
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// scrypt cost exponent
    pub scrypt_log_n: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Parse route params against the route schema instead of passing them through
    pub enforce_params: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            ttl_secs: 60 * 60 * 24 * 30, // 30 days
            secure: true,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self { scrypt_log_n: 17 }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cookie_config(&self) -> SessionCookieConfig {
        SessionCookieConfig {
            name: self.cookie_name.clone(),
            secure: self.secure,
            max_age_secs: i64::try_from(self.ttl_secs).unwrap_or(i64::MAX),
        }
    }
}

impl Settings {
    /// Load from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::figment(Path::new(DEFAULT_CONFIG_FILE))
            .extract()
            .context("failed to load settings")
            .and_then(Self::validated)
    }

    /// Load from an explicit file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        Self::figment(path)
            .extract()
            .with_context(|| format!("failed to load settings from {}", path.display()))
            .and_then(Self::validated)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log.level);
        }
        if self.session.ttl_secs == 0 {
            bail!("session.ttl_secs must be greater than zero");
        }
        if self.session.cookie_name.is_empty() {
            bail!("session.cookie_name must not be empty");
        }
        if !(1..=24).contains(&self.password.scrypt_log_n) {
            bail!("password.scrypt_log_n must be between 1 and 24");
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Socket address built from `server.host` and `server.port`
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.server.host, self.server.port))
    }
}
