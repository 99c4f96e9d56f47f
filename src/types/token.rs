//! Credential Types
//!
//! Credential pair, its persisted form, and the renewal wire format.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Access and refresh credential pair issued at login or by a renewal.
#[derive(Clone)]
pub struct CredentialPair {
    access_token: SecretString,
    refresh_token: SecretString,
    /// Lifetime of the access credential in seconds.
    pub expires_in: u64,
}

impl CredentialPair {
    /// Create new credential pair.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires_in,
        }
    }

    /// Access credential.
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Refresh credential.
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

impl From<RefreshResponse> for CredentialPair {
    fn from(response: RefreshResponse) -> Self {
        Self::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        )
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Credential pair as held by a credential store.
#[derive(Clone)]
pub struct StoredCredentials {
    access_token: SecretString,
    refresh_token: SecretString,
    /// Absolute expiry of the access credential, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// Create from raw parts.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires_at,
        }
    }

    /// Stamp a freshly issued pair with its absolute expiry.
    ///
    /// An `expires_in` of zero means the lifetime is unknown.
    pub fn from_pair(pair: &CredentialPair) -> Self {
        let expires_at = (pair.expires_in > 0)
            .then(|| Utc::now() + Duration::seconds(pair.expires_in as i64));

        Self {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            expires_at,
        }
    }

    /// Access credential.
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Refresh credential.
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    /// Check whether a refresh credential is present.
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.expose_secret().is_empty()
    }

    /// Check whether `token` is the access credential currently held.
    pub fn holds_access_token(&self, token: &str) -> bool {
        self.access_token.expose_secret() == token
    }

    /// Check if the access credential is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now())
            .unwrap_or(false)
    }

    /// Check if the access credential expires within `buffer`.
    pub fn is_expiring_soon(&self, buffer: std::time::Duration) -> bool {
        let buffer = Duration::from_std(buffer).unwrap_or_else(|_| Duration::zero());
        self.expires_at
            .map(|exp| exp <= Utc::now() + buffer)
            .unwrap_or(false)
    }

    /// Format the access credential as an Authorization header value.
    pub fn authorization_header(&self) -> String {
        bearer(&self.access_token)
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Format a bearer Authorization header value.
pub fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

/// Body of the renewal call.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Successful renewal response.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}
