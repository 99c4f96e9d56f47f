//! Configuration Types
//!
//! Gateway configuration types.

use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, GatewayError, GatewayResult};

/// Default path of the credential renewal endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default request timeout, shared by the renewal call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum response body size (1MB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1_048_576;

/// Status that signals an expired or rejected access credential.
pub const AUTH_FAILURE_STATUS: u16 = 401;

/// Gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the REST backend.
    pub base_url: Url,
    /// Path of the renewal endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// HTTP timeout for every call, including renewal.
    pub timeout: Duration,
    /// Renew ahead of time when the access credential expires within this
    /// window. `None` renews only after a 401.
    pub refresh_buffer: Option<Duration>,
    /// Maximum accepted response body size.
    pub max_response_size: usize,
}

impl GatewayConfig {
    /// Create configuration with defaults for the given backend.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            refresh_buffer: None,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - GATEWAY_BASE_URL (required)
    /// - GATEWAY_REFRESH_PATH (optional, defaults to /auth/refresh)
    /// - GATEWAY_TIMEOUT_SECS (optional, defaults to 30)
    /// - GATEWAY_REFRESH_BUFFER_SECS (optional, proactive renewal disabled when unset)
    pub fn from_env() -> GatewayResult<Self> {
        let base_url = std::env::var("GATEWAY_BASE_URL").map_err(|_| {
            GatewayError::Configuration(ConfigurationError::MissingRequired {
                field: "GATEWAY_BASE_URL".to_string(),
            })
        })?;

        let mut config = Self::new(parse_base_url(&base_url)?);

        if let Ok(path) = std::env::var("GATEWAY_REFRESH_PATH") {
            config.refresh_path = path;
        }

        if let Ok(secs) = std::env::var("GATEWAY_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_secs("GATEWAY_TIMEOUT_SECS", &secs)?);
        }

        if let Ok(secs) = std::env::var("GATEWAY_REFRESH_BUFFER_SECS") {
            config.refresh_buffer = Some(Duration::from_secs(parse_secs(
                "GATEWAY_REFRESH_BUFFER_SECS",
                &secs,
            )?));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.timeout.is_zero() {
            return Err(GatewayError::Configuration(
                ConfigurationError::InvalidConfig {
                    message: "Timeout must be greater than 0".to_string(),
                },
            ));
        }

        if self.refresh_path.trim().is_empty() {
            return Err(GatewayError::Configuration(
                ConfigurationError::MissingRequired {
                    field: "refresh_path".to_string(),
                },
            ));
        }

        if self.max_response_size == 0 {
            return Err(GatewayError::Configuration(
                ConfigurationError::InvalidConfig {
                    message: "Maximum response size must be greater than 0".to_string(),
                },
            ));
        }

        self.refresh_url().map(|_| ())
    }

    /// Resolve a request target against the base URL.
    ///
    /// Absolute URLs are used as-is; anything else is appended to the base
    /// URL's path.
    pub fn resolve(&self, target: &str) -> GatewayResult<Url> {
        if let Ok(url) = Url::parse(target) {
            return Ok(url);
        }

        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            target.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|_| {
            GatewayError::Configuration(ConfigurationError::InvalidEndpoint { url: joined })
        })
    }

    /// Check whether `target` resolves to the backend's origin.
    ///
    /// Only such targets carry the bearer credential.
    pub fn is_backend_target(&self, target: &str) -> GatewayResult<bool> {
        Ok(self.resolve(target)?.origin() == self.base_url.origin())
    }

    /// URL of the renewal endpoint.
    pub fn refresh_url(&self) -> GatewayResult<Url> {
        self.resolve(&self.refresh_path)
    }
}

/// Parse and check a backend base URL.
pub fn parse_base_url(raw: &str) -> GatewayResult<Url> {
    let url = Url::parse(raw).map_err(|_| {
        GatewayError::Configuration(ConfigurationError::InvalidEndpoint {
            url: raw.to_string(),
        })
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::Configuration(
            ConfigurationError::InvalidEndpoint {
                url: raw.to_string(),
            },
        ));
    }

    Ok(url)
}

fn parse_secs(name: &str, raw: &str) -> GatewayResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        GatewayError::Configuration(ConfigurationError::InvalidConfig {
            message: format!("{} must be a whole number of seconds, got {:?}", name, raw),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> GatewayConfig {
        GatewayConfig::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_backend_target_matches_origin() {
        let config = config("https://api.example.com/v1");

        assert!(config.is_backend_target("/courses").unwrap());
        assert!(config.is_backend_target("https://api.example.com/other").unwrap());
        assert!(!config.is_backend_target("https://cdn.example.net/file").unwrap());
        assert!(!config.is_backend_target("http://api.example.com/courses").unwrap());
        assert!(!config.is_backend_target("https://api.example.com:8443/courses").unwrap());
    }

    #[test]
    fn test_resolve_relative_paths() {
        let config = config("https://api.example.com/v1/");
        assert_eq!(
            config.resolve("/courses").unwrap().as_str(),
            "https://api.example.com/v1/courses"
        );
        assert_eq!(
            config.refresh_url().unwrap().as_str(),
            "https://api.example.com/v1/auth/refresh"
        );
    }

    #[test]
    fn test_resolve_absolute_url() {
        let config = config("https://api.example.com");
        assert_eq!(
            config.resolve("https://cdn.example.com/file").unwrap().as_str(),
            "https://cdn.example.com/file"
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = config("https://api.example.com");
        config.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("http://localhost:8080").is_ok());
    }
}
