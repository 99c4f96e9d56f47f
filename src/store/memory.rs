//! In-memory credential stores.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::{GatewayError, GatewayResult, StorageError};
use crate::store::CredentialStore;
use crate::types::{CredentialPair, StoredCredentials};

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<Option<StoredCredentials>>,
}

impl InMemoryCredentialStore {
    /// Create new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store holding `pair`.
    pub fn with_credentials(pair: &CredentialPair) -> Self {
        Self {
            credentials: RwLock::new(Some(StoredCredentials::from_pair(pair))),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Option<StoredCredentials> {
        self.credentials.read().clone()
    }

    async fn save(&self, pair: &CredentialPair) -> GatewayResult<()> {
        *self.credentials.write() = Some(StoredCredentials::from_pair(pair));
        Ok(())
    }

    async fn clear(&self) {
        *self.credentials.write() = None;
    }
}

/// Mock credential store for testing.
#[derive(Default)]
pub struct MockCredentialStore {
    credentials: RwLock<Option<StoredCredentials>>,
    load_count: Mutex<usize>,
    save_history: Mutex<Vec<CredentialPair>>,
    clear_count: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MockCredentialStore {
    /// Create new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate credentials.
    pub fn add_credentials(&self, stored: StoredCredentials) -> &Self {
        *self.credentials.write() = Some(stored);
        self
    }

    /// Make every save fail.
    pub fn set_fail_saves(&self, fail: bool) -> &Self {
        *self.fail_saves.lock() = fail;
        self
    }

    /// Current contents, bypassing the load counter.
    pub fn peek(&self) -> Option<StoredCredentials> {
        self.credentials.read().clone()
    }

    /// Number of loads.
    pub fn load_count(&self) -> usize {
        *self.load_count.lock()
    }

    /// Pairs saved so far.
    pub fn get_save_history(&self) -> Vec<CredentialPair> {
        self.save_history.lock().clone()
    }

    /// Number of clears.
    pub fn clear_count(&self) -> usize {
        *self.clear_count.lock()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self) -> Option<StoredCredentials> {
        *self.load_count.lock() += 1;
        self.credentials.read().clone()
    }

    async fn save(&self, pair: &CredentialPair) -> GatewayResult<()> {
        if *self.fail_saves.lock() {
            return Err(GatewayError::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }

        self.save_history.lock().push(pair.clone());
        *self.credentials.write() = Some(StoredCredentials::from_pair(pair));
        Ok(())
    }

    async fn clear(&self) {
        *self.clear_count.lock() += 1;
        *self.credentials.write() = None;
    }
}

/// Create in-memory credential store.
pub fn create_in_memory_credential_store() -> InMemoryCredentialStore {
    InMemoryCredentialStore::new()
}

/// Create mock credential store for testing.
pub fn create_mock_credential_store() -> MockCredentialStore {
    MockCredentialStore::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn test_in_memory_save_and_load() {
        let store = InMemoryCredentialStore::new();
        assert!(store.load().await.is_none());

        store
            .save(&CredentialPair::new("access-1", "refresh-1", 3600))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.access_token().expose_secret(), "access-1");
        assert_eq!(loaded.refresh_token().expose_secret(), "refresh-1");
    }

    #[tokio::test]
    async fn test_in_memory_save_replaces_both_tokens() {
        let store =
            InMemoryCredentialStore::with_credentials(&CredentialPair::new("a1", "r1", 60));
        store.save(&CredentialPair::new("a2", "r2", 60)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.access_token().expose_secret(), "a2");
        assert_eq!(loaded.refresh_token().expose_secret(), "r2");
    }

    #[tokio::test]
    async fn test_in_memory_clear_is_idempotent() {
        let store =
            InMemoryCredentialStore::with_credentials(&CredentialPair::new("a", "r", 60));
        store.clear().await;
        store.clear().await;
        assert!(store.load().await.is_none());
    }

    #[test]
    fn test_in_memory_store_from_blocking_context() {
        let store =
            InMemoryCredentialStore::with_credentials(&CredentialPair::new("a", "r", 0));
        let loaded = tokio_test::block_on(store.load()).unwrap();
        assert!(loaded.expires_at.is_none());
        assert!(loaded.has_refresh_token());
    }

    #[tokio::test]
    async fn test_mock_store_records_history() {
        let store = MockCredentialStore::new();
        store.save(&CredentialPair::new("a", "r", 60)).await.unwrap();
        let _ = store.load().await;
        store.clear().await;

        assert_eq!(store.get_save_history().len(), 1);
        assert_eq!(store.load_count(), 1);
        assert_eq!(store.clear_count(), 1);
        assert!(store.peek().is_none());
    }

    #[tokio::test]
    async fn test_mock_store_failure() {
        let store = MockCredentialStore::new();
        store.set_fail_saves(true);

        let result = store.save(&CredentialPair::new("a", "r", 60)).await;
        assert!(matches!(result, Err(GatewayError::Storage(_))));
        assert!(store.peek().is_none());
    }
}
