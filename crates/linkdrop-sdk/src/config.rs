//! SDK configuration.
//!
//! A config can be built in code, deserialized from JSON (camelCase keys), or read from
//! `LINKDROP_*` environment variables:
//!
//! - `LINKDROP_BASE_URL` - claim URL base, required
//! - `LINKDROP_API_URL` - escrow API root (default: `https://escrow-api.linkdrop.io/v3`)
//! - `LINKDROP_API_KEY` - bearer token for the escrow API
//! - `LINKDROP_ENVIRONMENT` - `production`, `production-coinbase-wallet`, or a custom tag
//! - `LINKDROP_ESCROW_ADDRESS` / `LINKDROP_ESCROW_NFT_ADDRESS` - escrow overrides
//! - `LINKDROP_REQUEST_TIMEOUT_MS` - escrow API request timeout (default: `10000`)

use alloy_primitives::Address;
use linkdrop_eip155::escrow::{
    COINBASE_WALLET_ESCROW_ADDRESS, COINBASE_WALLET_ESCROW_NFT_ADDRESS, DEFAULT_ESCROW_ADDRESS,
    DEFAULT_ESCROW_NFT_ADDRESS,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://escrow-api.linkdrop.io/v3";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const PRODUCTION_ENVIRONMENT: &str = "production";
pub const COINBASE_WALLET_PRODUCTION_ENVIRONMENT: &str = "production-coinbase-wallet";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    InvalidVar { name: &'static str, value: String },
    #[error("Base URL must not be empty")]
    EmptyBaseUrl,
    #[error("API URL `{0}` is not an http(s) URL")]
    InvalidApiUrl(String),
    #[error("Encryption key length range {min}..={max} is empty")]
    InvalidKeyLengthRange { min: usize, max: usize },
}

/// Limits on sender notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageConfig {
    pub min_encryption_key_length: usize,
    pub max_encryption_key_length: usize,
    pub max_text_length: usize,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            min_encryption_key_length: 6,
            max_encryption_key_length: 43,
            max_text_length: 140,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    pub base_url: String,
    #[serde(default = "config_defaults::api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "config_defaults::escrow_address")]
    pub escrow_address: Address,
    #[serde(default = "config_defaults::escrow_nft_address")]
    pub escrow_nft_address: Address,
    #[serde(default = "config_defaults::environment")]
    pub environment: String,
    #[serde(default)]
    pub message: MessageConfig,
    #[serde(default = "config_defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

mod config_defaults {
    use super::*;

    pub fn api_url() -> String {
        DEFAULT_API_URL.to_string()
    }

    pub fn escrow_address() -> Address {
        DEFAULT_ESCROW_ADDRESS
    }

    pub fn escrow_nft_address() -> Address {
        DEFAULT_ESCROW_NFT_ADDRESS
    }

    pub fn environment() -> String {
        DEFAULT_ENVIRONMENT.to_string()
    }

    pub fn request_timeout_ms() -> u64 {
        DEFAULT_REQUEST_TIMEOUT_MS
    }
}

impl SdkConfig {
    /// Development defaults under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_url: config_defaults::api_url(),
            api_key: None,
            escrow_address: DEFAULT_ESCROW_ADDRESS,
            escrow_nft_address: DEFAULT_ESCROW_NFT_ADDRESS,
            environment: config_defaults::environment(),
            message: MessageConfig::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn production(base_url: impl Into<String>) -> Self {
        Self::new(base_url).with_environment(PRODUCTION_ENVIRONMENT)
    }

    pub fn coinbase_wallet_production(base_url: impl Into<String>) -> Self {
        Self::new(base_url)
            .with_escrow_address(COINBASE_WALLET_ESCROW_ADDRESS)
            .with_escrow_nft_address(COINBASE_WALLET_ESCROW_NFT_ADDRESS)
            .with_environment(COINBASE_WALLET_PRODUCTION_ENVIRONMENT)
    }

    pub fn with_escrow_address(mut self, escrow: Address) -> Self {
        self.escrow_address = escrow;
        self
    }

    pub fn with_escrow_nft_address(mut self, escrow: Address) -> Self {
        self.escrow_nft_address = escrow;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_message_config(mut self, message: MessageConfig) -> Self {
        self.message = message;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reads the `LINKDROP_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = var("LINKDROP_BASE_URL").ok_or(ConfigError::MissingVar("LINKDROP_BASE_URL"))?;
        let mut config = match var("LINKDROP_ENVIRONMENT").as_deref() {
            None => Self::new(base_url),
            Some(PRODUCTION_ENVIRONMENT) => Self::production(base_url),
            Some(COINBASE_WALLET_PRODUCTION_ENVIRONMENT) => Self::coinbase_wallet_production(base_url),
            Some(tag) => Self::new(base_url).with_environment(tag),
        };
        if let Some(api_url) = var("LINKDROP_API_URL") {
            config.api_url = api_url;
        }
        config.api_key = var("LINKDROP_API_KEY");
        if let Some(value) = var("LINKDROP_ESCROW_ADDRESS") {
            config.escrow_address = parse_var("LINKDROP_ESCROW_ADDRESS", value)?;
        }
        if let Some(value) = var("LINKDROP_ESCROW_NFT_ADDRESS") {
            config.escrow_nft_address = parse_var("LINKDROP_ESCROW_NFT_ADDRESS", value)?;
        }
        if let Some(value) = var("LINKDROP_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_var("LINKDROP_REQUEST_TIMEOUT_MS", value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        match url::Url::parse(&self.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidApiUrl(self.api_url.clone())),
        }
        let MessageConfig {
            min_encryption_key_length: min,
            max_encryption_key_length: max,
            ..
        } = self.message;
        if min == 0 || min > max {
            return Err(ConfigError::InvalidKeyLengthRange { min, max });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVar { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SdkConfig::new("https://p2p.linkdrop.io");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.environment, "development");
        assert_eq!(config.escrow_address, DEFAULT_ESCROW_ADDRESS);
        assert_eq!(config.message.max_text_length, 140);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let production = SdkConfig::production("https://p2p.linkdrop.io");
        assert_eq!(production.environment, "production");
        assert_eq!(production.escrow_nft_address, DEFAULT_ESCROW_NFT_ADDRESS);

        let cbw = SdkConfig::coinbase_wallet_production("https://p2p.linkdrop.io");
        assert_eq!(cbw.environment, "production-coinbase-wallet");
        assert_eq!(cbw.escrow_address, COINBASE_WALLET_ESCROW_ADDRESS);
        assert_eq!(cbw.escrow_nft_address, COINBASE_WALLET_ESCROW_NFT_ADDRESS);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"baseUrl":"https://p2p.linkdrop.io","apiKey":"secret",
            "message":{"maxTextLength":200}}"#;
        let config: SdkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.message.max_text_length, 200);
        assert_eq!(config.message.min_encryption_key_length, 6);
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn test_from_lookup() {
        let config = SdkConfig::from_lookup(lookup(&[
            ("LINKDROP_BASE_URL", "https://wallet.example"),
            ("LINKDROP_ENVIRONMENT", "production-coinbase-wallet"),
            ("LINKDROP_API_KEY", "key"),
            ("LINKDROP_REQUEST_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.escrow_address, COINBASE_WALLET_ESCROW_ADDRESS);
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));

        let custom = SdkConfig::from_lookup(lookup(&[
            ("LINKDROP_BASE_URL", "https://wallet.example"),
            ("LINKDROP_ENVIRONMENT", "staging"),
            ("LINKDROP_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(custom.environment, "staging");
        assert_eq!(custom.escrow_address, DEFAULT_ESCROW_ADDRESS);
        assert_eq!(custom.api_key, None);
    }

    #[test]
    fn test_from_lookup_errors() {
        assert_eq!(
            SdkConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingVar("LINKDROP_BASE_URL"))
        );
        assert_eq!(
            SdkConfig::from_lookup(lookup(&[
                ("LINKDROP_BASE_URL", "https://wallet.example"),
                ("LINKDROP_ESCROW_ADDRESS", "0x1234"),
            ])),
            Err(ConfigError::InvalidVar {
                name: "LINKDROP_ESCROW_ADDRESS",
                value: "0x1234".to_string()
            })
        );
        assert_eq!(
            SdkConfig::from_lookup(lookup(&[
                ("LINKDROP_BASE_URL", "https://wallet.example"),
                ("LINKDROP_API_URL", "ftp://escrow"),
            ])),
            Err(ConfigError::InvalidApiUrl("ftp://escrow".to_string()))
        );
    }

    #[test]
    fn test_validate_key_length_range() {
        let config = SdkConfig::new("https://p2p.linkdrop.io").with_message_config(MessageConfig {
            min_encryption_key_length: 20,
            max_encryption_key_length: 10,
            max_text_length: 140,
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidKeyLengthRange { min: 20, max: 10 })
        );
        assert_eq!(SdkConfig::new(" ").validate(), Err(ConfigError::EmptyBaseUrl));
    }
}
