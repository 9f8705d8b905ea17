//! Layered configuration loading.
//!
//! Settings come from `courier.yaml`, looked up in `$COURIER_CONF_DIR` and
//! falling back to the working directory, with `COURIER_`-prefixed
//! environment variables overriding individual keys.

#![allow(clippy::result_large_err)] // figment::Error is external and large

use std::env;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use gateway_client::GatewayConfig;
use serde::{Deserialize, Serialize};
use service_catalog::ServiceConfig;
use text_crypto::CryptoConfig;
use thiserror::Error;

/// Name of the configuration file.
const CONFIG_FILE: &str = "courier.yaml";

/// Environment variable naming the directory that holds the config file.
const CONF_DIR_VAR: &str = "COURIER_CONF_DIR";

/// Errors raised while loading configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),
}

/// Top-level configuration for the daemon.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourierConfig {
    /// The gateway-side phone number contacts send commands to.
    pub gateway_number: String,
    /// Whether message bodies are PGP-armored end to end.
    #[serde(default)]
    pub text_encryption: bool,
    /// Connection settings for the SMS gateway server.
    pub gateway: GatewayConfig,
    /// Key material and armor options; only consulted when
    /// `text_encryption` is on.
    #[serde(flatten)]
    pub encryption: CryptoConfig,
    /// The backend services and their command tables.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl CourierConfig {
    /// Load configuration from the standard location with env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match env::var(CONF_DIR_VAR) {
            Ok(dir) => PathBuf::from(dir).join(CONFIG_FILE),
            Err(_) => PathBuf::from(CONFIG_FILE),
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit file path with env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Figment::new()
            .merge(Yaml::file(path))
            .merge(env_provider())
            .extract()?;
        Ok(config)
    }
}

/// `COURIER_`-prefixed environment overrides.
///
/// Uses an explicit key map instead of `Env::split("_")`: most keys are flat
/// and contain underscores themselves (`gateway_number`, `text_encryption`),
/// so only the gateway connection section is dotted.
fn env_provider() -> Env {
    Env::prefixed("COURIER_").map(|key| match key.as_str() {
        "gateway_hostname" => "gateway.hostname".into(),
        "gateway_port" => "gateway.port".into(),
        key => key.into(),
    })
}
