//! Messaging-instance connection config.
//!
//! Instance rows only carry identity (id, name, phone). The server URL and API
//! key are always taken from [`EvolutionConfig`], whatever the store holds.

use serde::Serialize;

use crate::config::{ConfigError, EvolutionConfig};
use crate::store::InstanceRow;

/// Sentinel id of the instance synthesized from configuration alone.
pub const FALLBACK_INSTANCE_ID: &str = "env-fallback";

/// Instance name used when the caller does not supply one.
pub const DEFAULT_INSTANCE_NAME: &str = "default";

/// Status reported for every resolved instance.
pub const CONNECTED: &str = "connected";

/// Everything a handler needs to talk to one provider instance.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct InstanceConfig {
    /// Instance id.
    pub id: String,
    /// Instance name as known to the provider.
    pub name: String,
    /// Phone number linked to the instance (may be empty).
    pub phone_number: String,
    /// Provider base URL.
    pub server_url: String,
    /// Provider API key.
    pub api_key: String,
    /// Connection status.
    pub status: String,
}

impl InstanceConfig {
    /// Synthesize an instance when no stored instance is available.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no API key is configured.
    pub fn fallback(name: Option<&str>, evolution: &EvolutionConfig) -> Result<Self, ConfigError> {
        let api_key = evolution.require_api_key()?;
        Ok(Self {
            id: FALLBACK_INSTANCE_ID.to_owned(),
            name: name.unwrap_or(DEFAULT_INSTANCE_NAME).to_owned(),
            phone_number: String::new(),
            server_url: evolution.server_url.clone(),
            api_key: api_key.to_owned(),
            status: CONNECTED.to_owned(),
        })
    }

    /// Combine a stored instance row with the configured connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no API key is configured.
    pub fn from_row(row: InstanceRow, evolution: &EvolutionConfig) -> Result<Self, ConfigError> {
        let api_key = evolution.require_api_key()?;
        Ok(Self {
            id: row.id,
            name: row.name,
            phone_number: row.phone_number.unwrap_or_default(),
            server_url: evolution.server_url.clone(),
            api_key: api_key.to_owned(),
            status: CONNECTED.to_owned(),
        })
    }

    /// Copy of this config safe to print or log.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: "__REDACTED__".to_owned(),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phone_number", &self.phone_number)
            .field("server_url", &self.server_url)
            .field("api_key", &"__REDACTED__")
            .field("status", &self.status)
            .finish()
    }
}
