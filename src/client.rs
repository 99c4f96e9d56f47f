//! Gateway Client
//!
//! High-level client combining credential storage, dispatch and renewal.

use serde::Serialize;
use std::sync::Arc;

use crate::core::{HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::dispatch::{GatewayRequest, RequestDispatcher};
use crate::error::GatewayResult;
use crate::renewal::{RenewalCoordinator, RenewalPhase};
use crate::session::{NoOpSessionListener, SessionListener};
use crate::store::{CredentialStore, InMemoryCredentialStore};
use crate::telemetry::{GatewayMetrics, NoOpMetrics};
use crate::types::{CredentialPair, GatewayConfig};

/// Authenticated client for the course-management backend.
///
/// Cheap to clone; clones share credentials and the renewal state.
pub struct GatewayClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: CredentialStore = InMemoryCredentialStore,
> {
    config: Arc<GatewayConfig>,
    dispatcher: RequestDispatcher<T, S>,
}

impl<T: HttpTransport, S: CredentialStore> Clone for GatewayClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl GatewayClient<ReqwestHttpTransport, InMemoryCredentialStore> {
    /// Create a client with an in-memory store and no session listener.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        Self::with_store(
            config,
            InMemoryCredentialStore::new(),
            Arc::new(NoOpSessionListener),
        )
    }
}

impl<S: CredentialStore + 'static> GatewayClient<ReqwestHttpTransport, S> {
    /// Create a client over the reqwest transport with the given store and
    /// session listener.
    pub fn with_store(
        config: GatewayConfig,
        store: S,
        listener: Arc<dyn SessionListener>,
    ) -> GatewayResult<Self> {
        config.validate()?;
        let transport =
            ReqwestHttpTransport::with_options(config.timeout, config.max_response_size)?;

        Ok(Self::with_components(
            config,
            Arc::new(transport),
            Arc::new(store),
            listener,
            Arc::new(NoOpMetrics),
        ))
    }
}

impl<T, S> GatewayClient<T, S>
where
    T: HttpTransport + 'static,
    S: CredentialStore + 'static,
{
    /// Create a client with custom implementations.
    pub fn with_components(
        config: GatewayConfig,
        transport: Arc<T>,
        store: Arc<S>,
        listener: Arc<dyn SessionListener>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        let config = Arc::new(config);
        let coordinator = RenewalCoordinator::new(
            config.clone(),
            transport.clone(),
            store,
            listener,
            metrics.clone(),
        );
        let dispatcher = RequestDispatcher::new(config.clone(), transport, coordinator, metrics);

        Self { config, dispatcher }
    }

    /// Get the gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get the credential store.
    pub fn store(&self) -> &Arc<S> {
        self.dispatcher.coordinator().store()
    }

    /// Current renewal phase.
    pub fn renewal_phase(&self) -> RenewalPhase {
        self.dispatcher.coordinator().phase()
    }

    /// Store the credential pair issued at login.
    pub async fn login(&self, pair: &CredentialPair) -> GatewayResult<()> {
        self.dispatcher.coordinator().begin_session(pair).await
    }

    /// Forget stored credentials without raising the session signal.
    pub async fn logout(&self) {
        self.dispatcher.coordinator().end_session().await
    }

    /// Check whether credentials are stored.
    pub async fn is_authenticated(&self) -> bool {
        self.store().load().await.is_some()
    }

    /// Send a request.
    pub async fn send(&self, request: GatewayRequest) -> GatewayResult<HttpResponse> {
        self.dispatcher.send(request).await
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> GatewayResult<HttpResponse> {
        self.send(GatewayRequest::get(path)).await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> GatewayResult<HttpResponse> {
        self.send(GatewayRequest::delete(path)).await
    }

    /// POST a JSON body to `path`.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<HttpResponse> {
        self.send(GatewayRequest::post(path).json(body)?).await
    }

    /// PUT a JSON body to `path`.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<HttpResponse> {
        self.send(GatewayRequest::put(path).json(body)?).await
    }

    /// PATCH a JSON body to `path`.
    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<HttpResponse> {
        self.send(GatewayRequest::patch(path).json(body)?).await
    }
}
