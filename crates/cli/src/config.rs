use anyhow::{Context, Result};
use brokersync_brokers_common::MockBrokerConfig;
use brokersync_brokers_zerodha::ZerodhaConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Full application configuration, as read from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub zerodha: ZerodhaConfig,
    pub mock: MockBrokerConfig,
}

/// Values taken from CLI flags or the environment. Each one set wins over
/// the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Vec<String>,
    pub zerodha_api_key: Option<String>,
    pub zerodha_api_secret: Option<String>,
}

impl AppConfig {
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// `bind` beats `port`, which binds all interfaces.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        } else if let Some(port) = overrides.port {
            self.server.bind = format!("0.0.0.0:{}", port);
        }

        let origins: Vec<String> = overrides
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !origins.is_empty() {
            self.server.allowed_origins = origins;
        }

        if let Some(key) = overrides.zerodha_api_key {
            self.zerodha.api_key = key;
        }
        if let Some(secret) = overrides.zerodha_api_secret {
            self.zerodha.api_secret = secret;
        }
    }
}
