//! Request Dispatcher
//!
//! Attaches the stored access credential to each outbound request and routes
//! authentication failures into the renewal coordinator.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::replay;
use super::request::GatewayRequest;
use crate::core::{HttpResponse, HttpTransport};
use crate::error::{GatewayError, GatewayResult, SessionError};
use crate::renewal::RenewalCoordinator;
use crate::session::InvalidationReason;
use crate::store::CredentialStore;
use crate::telemetry::GatewayMetrics;
use crate::types::GatewayConfig;

/// Sends requests with bearer credentials and recovers from expiry.
pub struct RequestDispatcher<T, S> {
    config: Arc<GatewayConfig>,
    transport: Arc<T>,
    coordinator: RenewalCoordinator<T, S>,
    metrics: Arc<dyn GatewayMetrics>,
}

impl<T, S> Clone for RequestDispatcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            coordinator: self.coordinator.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T, S> RequestDispatcher<T, S>
where
    T: HttpTransport + 'static,
    S: CredentialStore + 'static,
{
    /// Create new dispatcher.
    pub fn new(
        config: Arc<GatewayConfig>,
        transport: Arc<T>,
        coordinator: RenewalCoordinator<T, S>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            config,
            transport,
            coordinator,
            metrics,
        }
    }

    /// Renewal coordinator behind this dispatcher.
    pub fn coordinator(&self) -> &RenewalCoordinator<T, S> {
        &self.coordinator
    }

    pub(crate) fn metrics(&self) -> &dyn GatewayMetrics {
        self.metrics.as_ref()
    }

    /// Send a request.
    ///
    /// Any status other than 401 comes back as `Ok`, untouched. A 401 is
    /// answered by renewing the credential (or joining the renewal already
    /// running) and replaying the request once.
    ///
    /// Requests to an origin other than the configured base URL are sent
    /// without credentials and never trigger renewal.
    pub async fn send(&self, mut request: GatewayRequest) -> GatewayResult<HttpResponse> {
        if !self.config.is_backend_target(&request.target)? {
            trace!(path = %request.target, "Foreign origin; sending without credentials");
            return self.transmit(&request).await;
        }

        let attached = self.authorize(&mut request).await?;

        let response = self.transmit(&request).await?;
        if !response.is_auth_failure() {
            return Ok(response);
        }

        self.metrics.record_auth_failure(false);

        debug!(
            method = request.method.as_str(),
            path = %request.target,
            "Request unauthorized; awaiting fresh credential"
        );
        let token = self.renewed_credential(attached.as_ref()).await?;
        replay::replay(self, request, token).await
    }

    /// Send a request that has already been replayed. A 401 here ends the
    /// session.
    pub(crate) async fn resend(&self, request: GatewayRequest) -> GatewayResult<HttpResponse> {
        let response = self.transmit(&request).await?;
        if response.is_auth_failure() {
            self.metrics.record_auth_failure(true);
            return self.reject_replayed().await;
        }
        Ok(response)
    }

    pub(crate) async fn reject_replayed(&self) -> GatewayResult<HttpResponse> {
        warn!("Replayed request was rejected; ending session");
        self.coordinator
            .invalidate_session(InvalidationReason::ReplayRejected)
            .await;
        Err(GatewayError::Session(SessionError::ReplayUnauthorized))
    }

    /// Attach the stored access credential, renewing it first when it is
    /// about to expire and proactive renewal is enabled.
    async fn authorize(&self, request: &mut GatewayRequest) -> GatewayResult<Option<SecretString>> {
        let Some(stored) = self.coordinator.store().load().await else {
            trace!(path = %request.target, "No stored credential; sending unauthenticated");
            return Ok(None);
        };

        let token = match self.config.refresh_buffer {
            Some(buffer) if stored.has_refresh_token() && stored.is_expiring_soon(buffer) => {
                debug!("Access credential about to expire; renewing before send");
                self.coordinator.obtain_fresh_credential().await?
            }
            _ => stored.access_token().clone(),
        };

        request.set_bearer(&token);
        Ok(Some(token))
    }

    /// Credential to replay with after a 401.
    ///
    /// If the store already holds a different access credential than the one
    /// the request carried, a renewal finished while the request was on the
    /// wire and its result is reused.
    async fn renewed_credential(
        &self,
        attached: Option<&SecretString>,
    ) -> GatewayResult<SecretString> {
        if let Some(attached) = attached {
            if let Some(current) = self.coordinator.store().load().await {
                if !current.holds_access_token(attached.expose_secret()) {
                    debug!("Credential renewed while request was in flight; reusing it");
                    return Ok(current.access_token().clone());
                }
            }
        }

        self.coordinator.obtain_fresh_credential().await
    }

    async fn transmit(&self, request: &GatewayRequest) -> GatewayResult<HttpResponse> {
        let http = request.to_http(&self.config)?;
        let method = request.method.as_str();

        let start = Instant::now();
        let result = self.transport.send(http).await;
        self.metrics
            .record_request_duration(method, start.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(response) => {
                self.metrics.record_request(method, response.status);
                trace!(
                    method,
                    path = %request.target,
                    status = response.status,
                    retried = request.is_retried(),
                    "Request completed"
                );
            }
            Err(error) => {
                debug!(
                    method,
                    path = %request.target,
                    code = error.error_code(),
                    "Request failed"
                );
            }
        }

        result
    }
}
