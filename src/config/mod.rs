//! Configuration loading.
//!
//! Loads from `./wa-inbox.toml` (or `$WA_INBOX_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default Evolution API base URL when nothing is configured.
pub const DEFAULT_EVOLUTION_URL: &str = "http://localhost:8080";

/// Default SQLite database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://wa-inbox.db";

/// Errors raised when configuration is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No Evolution API key was configured.
    #[error("Evolution API key is not configured (set EVOLUTION_API_KEY)")]
    MissingApiKey,
}

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data store settings.
    pub database: DatabaseConfig,
    /// Messaging provider (Evolution API) settings.
    pub evolution: EvolutionConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = Self::config_path_with(env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config path using a custom env resolver.
    ///
    /// Checks `$WA_INBOX_CONFIG_PATH` first, then `./wa-inbox.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("WA_INBOX_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("wa-inbox.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WA_INBOX_DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = env("EVOLUTION_API_URL").filter(|v| !v.is_empty()) {
            self.evolution.server_url = v;
        }
        if let Some(v) = env("EVOLUTION_API_KEY").filter(|v| !v.is_empty()) {
            self.evolution.api_key = Some(v);
        }
        if let Some(v) = env("WA_INBOX_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("WA_INBOX_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── Database config ─────────────────────────────────────────────

/// Data store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

// ── Evolution config ────────────────────────────────────────────

/// Connection settings shared by every messaging instance.
///
/// Server URL and API key are never read from instance rows; they always come
/// from here.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Evolution API base URL.
    pub server_url: String,
    /// Evolution API key. No built-in default.
    pub api_key: Option<String>,
}

impl EvolutionConfig {
    /// Build a config from explicit values.
    pub fn new(server_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key,
        }
    }

    /// Returns the configured API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when the key is unset or empty.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_EVOLUTION_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for EvolutionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionConfig")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .finish()
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotating JSON logs. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
