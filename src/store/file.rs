//! File-backed credential store.
//!
//! Persists the pair as a small JSON document with stable keys. Writes land in
//! a sibling temp file that is renamed over the target, so a concurrent reader
//! sees either the old pair or the new one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult, StorageError};
use crate::store::CredentialStore;
use crate::types::{CredentialPair, StoredCredentials};

/// Key of the access credential.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key of the refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Key of the access credential expiry.
pub const EXPIRES_AT_KEY: &str = "expiresAt";

#[derive(Serialize, Deserialize)]
struct PersistedCredentials {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Credential store backed by a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
    guard: RwLock<()>,
}

impl FileCredentialStore {
    /// Create store persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: RwLock::new(()),
        }
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&temp, &self.path).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Option<StoredCredentials> {
        let _read = self.guard.read().await;

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Credential file unreadable");
                return None;
            }
        };

        match serde_json::from_str::<PersistedCredentials>(&raw) {
            Ok(persisted) => Some(StoredCredentials::new(
                persisted.access_token,
                persisted.refresh_token,
                persisted.expires_at,
            )),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Credential file corrupted");
                None
            }
        }
    }

    async fn save(&self, pair: &CredentialPair) -> GatewayResult<()> {
        let stored = StoredCredentials::from_pair(pair);
        let persisted = PersistedCredentials {
            access_token: stored.access_token().expose_secret().clone(),
            refresh_token: stored.refresh_token().expose_secret().clone(),
            expires_at: stored.expires_at,
        };

        let contents = serde_json::to_vec(&persisted).map_err(|e| {
            GatewayError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;

        let _write = self.guard.write().await;
        self.write_atomically(&contents).await.map_err(|e| {
            GatewayError::Storage(StorageError::WriteFailed {
                message: format!("{}: {}", self.path.display(), e),
            })
        })?;

        debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    async fn clear(&self) {
        let _write = self.guard.write().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Credentials cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to clear credential file")
            }
        }
    }
}
