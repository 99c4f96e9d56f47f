//! Gateway Request
//!
//! An outbound call as seen by the dispatcher, carrying the one-shot replay flag.

use secrecy::SecretString;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{HttpMethod, HttpRequest};
use crate::error::{GatewayError, GatewayResult, ProtocolError};
use crate::types::{bearer, GatewayConfig};

/// Outbound request.
#[derive(Clone)]
pub struct GatewayRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the configured base URL, or an absolute URL.
    pub target: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Per-request timeout; the gateway timeout applies when unset.
    pub timeout: Option<Duration>,
    retried: bool,
}

impl GatewayRequest {
    /// Create request.
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
            retried: false,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, target)
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a raw body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and content type.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> GatewayResult<Self> {
        let encoded = serde_json::to_string(body).map_err(|e| {
            GatewayError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })?;
        self.body = Some(encoded);
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether this request has already been replayed after a renewal.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the request as replayed. There is no way back.
    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Current Authorization header value.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str())
    }

    /// Replace any Authorization header with a bearer credential.
    pub(crate) fn set_bearer(&mut self, token: &SecretString) {
        self.headers
            .retain(|key, _| !key.eq_ignore_ascii_case("authorization"));
        self.headers
            .insert("authorization".to_string(), bearer(token));
    }

    /// Build the wire request.
    pub(crate) fn to_http(&self, config: &GatewayConfig) -> GatewayResult<HttpRequest> {
        Ok(HttpRequest {
            method: self.method,
            url: config.resolve(&self.target)?.to_string(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            timeout: Some(self.timeout.unwrap_or(config.timeout)),
        })
    }
}

impl std::fmt::Debug for GatewayRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: HashMap<&str, &str> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.as_str(), "[REDACTED]")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("GatewayRequest")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &headers)
            .field("has_body", &self.body.is_some())
            .field("timeout", &self.timeout)
            .field("retried", &self.retried)
            .finish()
    }
}
