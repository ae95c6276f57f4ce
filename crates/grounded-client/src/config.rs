//! Client configuration

use crate::error::ClientError;
use grounded_message::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`ClientConfig::base_url`]
pub const API_URL_ENV: &str = "GROUNDED_API_URL";

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection settings for the grounded messaging API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without a trailing path
    pub base_url: String,
    /// `top_k` sent when a request leaves it unset
    pub default_top_k: u32,
    /// Whole-request timeout for non-streaming calls
    pub request_timeout_secs: u64,
    /// Connection establishment timeout, streams included
    pub connect_timeout_secs: u64,
}

impl ClientConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_top_k(mut self, top_k: u32) -> Self {
        self.default_top_k = top_k;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Defaults, with the base URL taken from `GROUNDED_API_URL` when set
    pub fn from_env() -> Result<Self, ClientError> {
        let config = match std::env::var(API_URL_ENV) {
            Ok(url) => Self::default().with_base_url(url),
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(e) => return Err(ClientError::Config(format!("{API_URL_ENV}: {e}"))),
        };
        config.validated()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(document: &str) -> Result<Self, ClientError> {
        toml::from_str::<Self>(document)
            .map_err(|e| ClientError::Config(e.to_string()))?
            .validated()
    }

    /// Reject values the client cannot work with
    pub fn validated(mut self) -> Result<Self, ClientError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        self.base_url = trimmed.to_string();
        if self.default_top_k == 0 {
            return Err(ClientError::Config("default_top_k must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ClientError::Config("timeouts must be positive".to_string()));
        }
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_top_k: DEFAULT_TOP_K,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn toml_overrides_and_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://api.example.org/"
            default_top_k = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.org");
        assert_eq!(config.default_top_k, 8);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            ClientConfig::from_toml_str("default_top_k = 0"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str(r#"base_url = "localhost""#),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("request_timeout_secs = \"soon\""),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn builder_chain() {
        let config = ClientConfig::new()
            .with_base_url("http://127.0.0.1:9000")
            .with_default_top_k(3)
            .with_request_timeout_secs(5)
            .with_connect_timeout_secs(1)
            .validated()
            .unwrap();
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.request_timeout_secs, 5);
    }
}
