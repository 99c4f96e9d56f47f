//! Authenticated Request Gateway
//!
//! Bearer-credential request gateway for the course-management client.
//!
//! # Features
//!
//! - Per-request `Authorization: Bearer` injection from a credential store
//! - Single-flight credential renewal: any number of concurrent 401s trigger
//!   exactly one call to the renewal endpoint
//! - One-shot replay of rejected requests with the renewed credential
//! - Session invalidation signal, raised once, when renewal is impossible
//! - Optional proactive renewal ahead of credential expiry
//! - In-memory and file-backed credential stores
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_gateway::{gateway_config, BroadcastSessionListener, CredentialPair, GatewayClient};
//! use auth_gateway::FileCredentialStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = gateway_config()
//!         .base_url("https://courses.example.com/api")
//!         .build()?;
//!
//!     let listener = Arc::new(BroadcastSessionListener::default());
//!     let mut invalidated = listener.subscribe();
//!
//!     let client = GatewayClient::with_store(
//!         config,
//!         FileCredentialStore::new("credentials.json"),
//!         listener,
//!     )?;
//!
//!     client
//!         .login(&CredentialPair::new("access-token", "refresh-token", 900))
//!         .await?;
//!
//!     let response = client.get("/courses").await?;
//!     println!("Status: {}", response.status);
//!
//!     tokio::spawn(async move {
//!         if let Ok(event) = invalidated.recv().await {
//!             println!("Session ended: {}", event.reason.as_str());
//!         }
//!     });
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credential and configuration types
//! - `error`: error hierarchy
//! - `core`: HTTP transport
//! - `store`: credential persistence
//! - `renewal`: single-flight renewal coordinator
//! - `dispatch`: request dispatcher and replay policy
//! - `session`: session invalidation listeners
//! - `telemetry`: gateway metrics
//! - `builders`: fluent configuration builder
//! - `client`: high-level client combining all of the above

pub mod builders;
pub mod client;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod renewal;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main client
pub use client::GatewayClient;

// Re-export builders
pub use builders::{gateway_config, GatewayConfigBuilder};

// Re-export errors
pub use error::{
    get_user_message, ConfigurationError, GatewayError, GatewayResult, NetworkError,
    ProtocolError, SessionError, StorageError,
};

// Re-export types
pub use types::{
    // Config
    GatewayConfig, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_REFRESH_PATH, DEFAULT_TIMEOUT,
    // Credentials
    CredentialPair, RefreshRequest, RefreshResponse, StoredCredentials,
};

// Re-export core components
pub use crate::core::{
    create_mock_transport, create_transport, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export credential stores
pub use store::{
    create_in_memory_credential_store, create_mock_credential_store, CredentialStore,
    FileCredentialStore, InMemoryCredentialStore, MockCredentialStore,
};

// Re-export renewal and dispatch
pub use dispatch::{GatewayRequest, RequestDispatcher};
pub use renewal::{RenewalCoordinator, RenewalPhase};

// Re-export session signal
pub use session::{
    BroadcastSessionListener, InvalidationReason, MockSessionListener, NoOpSessionListener,
    SessionInvalidated, SessionListener,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_metrics, no_op_metrics, GatewayMetrics, InMemoryMetrics, MetricEntry,
    MetricLabels, NoOpMetrics,
};
