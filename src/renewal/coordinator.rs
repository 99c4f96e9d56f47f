//! Renewal Coordinator
//!
//! Single-flight credential renewal.
//!
//! Every caller that needs a fresh access credential registers a waiter. The
//! first waiter to find the coordinator idle flips it to in-flight and spawns
//! the one renewal task; everyone else just waits. When the renewal settles,
//! the waiter queue is drained under the same lock that guards the phase, so
//! no waiter can slip in after the drain and be lost.
//!
//! Login, logout and invalidation each start a new session epoch. A renewal
//! only saves its result, or clears the store on failure, if the epoch it
//! started in is still current.

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{
    into_renewal_failure, GatewayError, GatewayResult, ProtocolError, SessionError,
};
use crate::session::{InvalidationReason, SessionInvalidated, SessionListener};
use crate::store::CredentialStore;
use crate::telemetry::GatewayMetrics;
use crate::types::{CredentialPair, GatewayConfig, RefreshRequest, RefreshResponse};

/// Phase of the renewal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalPhase {
    /// No renewal outstanding.
    Idle,
    /// One renewal call outstanding; waiters may be queued.
    ///
    /// A failed renewal clears the credentials before leaving this phase and
    /// goes straight back to `Idle`.
    InFlight,
}

type Waiter = oneshot::Sender<GatewayResult<SecretString>>;

struct RenewalState {
    phase: RenewalPhase,
    waiters: Vec<Waiter>,
    /// Set once the session signal has fired; re-armed by `begin_session`.
    invalidated: bool,
    renewals_issued: u64,
    /// Bumped by every login, logout and invalidation.
    epoch: u64,
}

struct Inner<T, S> {
    config: Arc<GatewayConfig>,
    transport: Arc<T>,
    store: Arc<S>,
    listener: Arc<dyn SessionListener>,
    metrics: Arc<dyn GatewayMetrics>,
    state: Mutex<RenewalState>,
    /// Serializes store writes that depend on the epoch.
    session: AsyncMutex<()>,
}

/// Coordinates credential renewal across concurrent callers.
///
/// Cheap to clone; clones share one state machine.
pub struct RenewalCoordinator<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for RenewalCoordinator<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> RenewalCoordinator<T, S>
where
    T: HttpTransport + 'static,
    S: CredentialStore + 'static,
{
    /// Create new coordinator.
    pub fn new(
        config: Arc<GatewayConfig>,
        transport: Arc<T>,
        store: Arc<S>,
        listener: Arc<dyn SessionListener>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                listener,
                metrics,
                state: Mutex::new(RenewalState {
                    phase: RenewalPhase::Idle,
                    waiters: Vec::new(),
                    invalidated: false,
                    renewals_issued: 0,
                    epoch: 0,
                }),
                session: AsyncMutex::new(()),
            }),
        }
    }

    /// Credential store shared with the dispatcher.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Current phase.
    pub fn phase(&self) -> RenewalPhase {
        self.inner.state.lock().phase
    }

    /// Number of callers currently queued behind a renewal.
    pub fn waiter_count(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }

    /// Number of renewal calls put on the wire so far.
    pub fn renewal_count(&self) -> u64 {
        self.inner.state.lock().renewals_issued
    }

    /// Obtain a fresh access credential.
    ///
    /// Starts a renewal if none is outstanding, otherwise joins the one in
    /// flight. Resolves with the renewed access credential, or with the
    /// renewal's failure, which is the same for every caller that joined.
    pub async fn obtain_fresh_credential(&self) -> GatewayResult<SecretString> {
        let (tx, rx) = oneshot::channel();

        let leader = {
            let mut state = self.inner.state.lock();
            state.waiters.push(tx);
            match state.phase {
                RenewalPhase::InFlight => None,
                RenewalPhase::Idle => {
                    state.phase = RenewalPhase::InFlight;
                    Some(state.epoch)
                }
            }
        };

        if let Some(epoch) = leader {
            debug!(epoch, "Starting credential renewal");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run_renewal(epoch).await });
        } else {
            debug!("Joining in-flight credential renewal");
            self.inner.metrics.record_renewal_joined();
        }

        rx.await
            .unwrap_or(Err(GatewayError::Session(SessionError::RenewalAborted)))
    }

    /// Store credentials issued at login and re-arm the session signal.
    ///
    /// A renewal still in flight from the previous session will not
    /// overwrite these credentials.
    pub async fn begin_session(&self, pair: &CredentialPair) -> GatewayResult<()> {
        let _session = self.inner.session.lock().await;
        self.inner.store.save(pair).await?;
        {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.invalidated = false;
        }
        info!("Session established");
        Ok(())
    }

    /// Clear credentials on explicit logout. Does not raise the session signal.
    ///
    /// A renewal still in flight is discarded when it completes.
    pub async fn end_session(&self) {
        let _session = self.inner.session.lock().await;
        self.inner.store.clear().await;
        {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.invalidated = true;
        }
        info!("Session ended");
    }

    /// Clear credentials and raise the session signal for `reason`.
    ///
    /// The signal fires at most once per session, however many terminal
    /// failures race to report it. A renewal still in flight is discarded
    /// when it completes.
    pub async fn invalidate_session(&self, reason: InvalidationReason) {
        {
            let _session = self.inner.session.lock().await;
            self.inner.store.clear().await;
            self.inner.state.lock().epoch += 1;
        }
        self.inner.signal_invalidated(reason);
    }
}

impl<T, S> Inner<T, S>
where
    T: HttpTransport + 'static,
    S: CredentialStore + 'static,
{
    async fn run_renewal(self: Arc<Self>, epoch: u64) {
        let mut guard = InFlightGuard {
            state: &self.state,
            armed: true,
        };

        match self.renew(epoch).await {
            Ok(pair) => {
                let waiters = guard.settle();
                info!(waiters = waiters.len(), "Credential renewal succeeded");

                let token = pair.access_token().clone();
                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }
            }
            Err(error) => {
                let current = self.end_epoch(epoch).await;
                let waiters = guard.settle();
                warn!(
                    code = error.error_code(),
                    error = %error,
                    waiters = waiters.len(),
                    current,
                    "Credential renewal failed"
                );

                for waiter in waiters {
                    let _ = waiter.send(Err(error.clone()));
                }
                if current {
                    self.signal_invalidated(InvalidationReason::from_error(&error));
                }
            }
        }
    }

    /// Clear the store for a failed renewal, unless the session it belonged
    /// to has already ended. Returns whether `epoch` was still current.
    async fn end_epoch(&self, epoch: u64) -> bool {
        let _session = self.session.lock().await;
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.epoch += 1;
        }
        self.store.clear().await;
        true
    }

    async fn renew(&self, epoch: u64) -> GatewayResult<CredentialPair> {
        let refresh_token = self
            .store
            .load()
            .await
            .filter(|stored| stored.has_refresh_token())
            .map(|stored| stored.refresh_token().expose_secret().clone())
            .ok_or(GatewayError::Session(SessionError::NoRefreshToken))?;

        let url = self.config.refresh_url().map_err(into_renewal_failure)?;
        let body = serde_json::to_string(&RefreshRequest { refresh_token }).map_err(|e| {
            into_renewal_failure(GatewayError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            }))
        })?;

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("accept".to_string(), "application/json".to_string());

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers,
            body: Some(body),
            timeout: Some(self.config.timeout),
        };

        self.state.lock().renewals_issued += 1;
        let result = self.call_refresh_endpoint(request).await;
        self.metrics.record_renewal(result.is_ok());

        let pair = result?;

        let _session = self.session.lock().await;
        if self.state.lock().epoch != epoch {
            debug!(epoch, "Session ended during renewal; discarding renewed credentials");
            return Err(GatewayError::Session(SessionError::SessionEnded));
        }
        self.store.save(&pair).await.map_err(into_renewal_failure)?;
        Ok(pair)
    }

    async fn call_refresh_endpoint(&self, request: HttpRequest) -> GatewayResult<CredentialPair> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(into_renewal_failure)?;

        if !response.is_success() {
            return Err(GatewayError::Session(SessionError::RenewalRejected {
                status: response.status,
            }));
        }

        let parsed: RefreshResponse = response.json().map_err(into_renewal_failure)?;
        if parsed.access_token.is_empty() {
            return Err(into_renewal_failure(GatewayError::Protocol(
                ProtocolError::MissingField {
                    field: "accessToken".to_string(),
                },
            )));
        }
        if parsed.refresh_token.is_empty() {
            return Err(into_renewal_failure(GatewayError::Protocol(
                ProtocolError::MissingField {
                    field: "refreshToken".to_string(),
                },
            )));
        }

        Ok(CredentialPair::from(parsed))
    }

    fn signal_invalidated(&self, reason: InvalidationReason) {
        {
            let mut state = self.state.lock();
            if state.invalidated {
                debug!(reason = reason.as_str(), "Session already invalidated");
                return;
            }
            state.invalidated = true;
        }

        info!(reason = reason.as_str(), "Session invalidated");
        self.metrics.record_session_invalidated(reason.as_str());
        self.listener
            .on_session_invalidated(&SessionInvalidated::new(reason));
    }
}

/// Returns the coordinator to `Idle` if the renewal task is torn down before
/// settling. Dropping the queued senders wakes every waiter with
/// [`SessionError::RenewalAborted`].
struct InFlightGuard<'a> {
    state: &'a Mutex<RenewalState>,
    armed: bool,
}

impl InFlightGuard<'_> {
    /// Leave `InFlight` and take every queued waiter in one step.
    fn settle(&mut self) -> Vec<Waiter> {
        self.armed = false;
        let mut state = self.state.lock();
        state.phase = RenewalPhase::Idle;
        std::mem::take(&mut state.waiters)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.phase = RenewalPhase::Idle;
            state.waiters.clear();
        }
    }
}
