//! Configuration Builder
//!
//! Fluent builder for gateway configuration.

use std::time::Duration;

use crate::error::{ConfigurationError, GatewayError, GatewayResult};
use crate::types::{
    parse_base_url, GatewayConfig, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_REFRESH_PATH,
    DEFAULT_TIMEOUT,
};

/// Gateway configuration builder.
pub struct GatewayConfigBuilder {
    base_url: Option<String>,
    refresh_path: String,
    timeout: Duration,
    refresh_buffer: Option<Duration>,
    max_response_size: usize,
}

impl Default for GatewayConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            refresh_buffer: None,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Set backend base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set renewal endpoint path.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Renew proactively when the access credential expires within `buffer`.
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = Some(buffer);
        self
    }

    /// Set maximum response body size.
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Build the gateway configuration.
    pub fn build(self) -> GatewayResult<GatewayConfig> {
        let base_url = self.base_url.ok_or_else(|| {
            GatewayError::Configuration(ConfigurationError::MissingRequired {
                field: "base_url".to_string(),
            })
        })?;

        let config = GatewayConfig {
            base_url: parse_base_url(&base_url)?,
            refresh_path: self.refresh_path,
            timeout: self.timeout,
            refresh_buffer: self.refresh_buffer,
            max_response_size: self.max_response_size,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Create a new gateway configuration builder.
pub fn gateway_config() -> GatewayConfigBuilder {
    GatewayConfigBuilder::new()
}
