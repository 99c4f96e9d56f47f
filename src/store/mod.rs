//! Credential Store
//!
//! Durable client-side storage of the access/refresh credential pair.
//!
//! Both tokens are written together and cleared together. A store never
//! reports a read failure: an unreadable medium is the same as no session.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::types::{CredentialPair, StoredCredentials};

pub use file::{FileCredentialStore, ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY};
pub use memory::{
    create_in_memory_credential_store, create_mock_credential_store, InMemoryCredentialStore,
    MockCredentialStore,
};

/// Credential store interface.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the persisted credentials, or `None` when absent or unreadable.
    async fn load(&self) -> Option<StoredCredentials>;

    /// Replace both credentials atomically.
    async fn save(&self, pair: &CredentialPair) -> GatewayResult<()>;

    /// Remove both credentials. Idempotent.
    async fn clear(&self);
}
