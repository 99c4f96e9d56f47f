//! Replay Policy
//!
//! A request rejected with 401 is re-sent exactly once, carrying the renewed
//! credential. A second rejection ends the session instead of renewing again.

use secrecy::SecretString;
use tracing::debug;

use super::dispatcher::RequestDispatcher;
use super::request::GatewayRequest;
use crate::core::{HttpResponse, HttpTransport};
use crate::error::GatewayResult;
use crate::store::CredentialStore;

/// Re-send `request` once with `new_token`.
pub(crate) async fn replay<T, S>(
    dispatcher: &RequestDispatcher<T, S>,
    mut request: GatewayRequest,
    new_token: SecretString,
) -> GatewayResult<HttpResponse>
where
    T: HttpTransport + 'static,
    S: CredentialStore + 'static,
{
    request.mark_retried();
    request.set_bearer(&new_token);
    debug!(
        method = request.method.as_str(),
        path = %request.target,
        "Replaying request with renewed credential"
    );

    let result = dispatcher.resend(request).await;
    dispatcher.metrics().record_replay(result.is_ok());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use crate::error::{GatewayError, SessionError};
    use crate::renewal::RenewalCoordinator;
    use crate::session::{InvalidationReason, MockSessionListener};
    use crate::store::MockCredentialStore;
    use crate::telemetry::InMemoryMetrics;
    use crate::types::{GatewayConfig, StoredCredentials};
    use std::sync::Arc;
    use url::Url;

    fn dispatcher() -> (
        RequestDispatcher<MockHttpTransport, MockCredentialStore>,
        Arc<MockHttpTransport>,
        Arc<MockSessionListener>,
        Arc<InMemoryMetrics>,
    ) {
        let config = Arc::new(GatewayConfig::new(
            Url::parse("https://api.example.com").unwrap(),
        ));
        let transport = Arc::new(MockHttpTransport::new());
        let store = Arc::new(MockCredentialStore::new());
        store.add_credentials(StoredCredentials::new("access-1", "refresh-1", None));
        let listener = Arc::new(MockSessionListener::new());
        let metrics = Arc::new(InMemoryMetrics::new());

        let coordinator = RenewalCoordinator::new(
            config.clone(),
            transport.clone(),
            store,
            listener.clone(),
            metrics.clone(),
        );
        let dispatcher =
            RequestDispatcher::new(config, transport.clone(), coordinator, metrics.clone());
        (dispatcher, transport, listener, metrics)
    }

    fn token(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    #[tokio::test]
    async fn test_replay_overwrites_authorization_and_marks_retried() {
        let (dispatcher, transport, _, _) = dispatcher();
        transport.set_default_response(HttpResponse::new(204));

        let request = GatewayRequest::delete("/courses/3").header("Authorization", "Bearer access-1");
        let response = replay(&dispatcher, request, token("access-2")).await.unwrap();

        assert_eq!(response.status, 204);
        let sent = transport.get_last_request().unwrap();
        assert_eq!(sent.headers.len(), 1);
        assert_eq!(sent.header("authorization"), Some("Bearer access-2"));
    }

    #[tokio::test]
    async fn test_replay_passes_non_auth_failures_through() {
        let (dispatcher, transport, listener, metrics) = dispatcher();
        transport.set_default_response(HttpResponse::new(503));

        let response = replay(&dispatcher, GatewayRequest::get("/courses"), token("access-2"))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(transport.get_requests().len(), 1);
        assert_eq!(listener.count(), 0);
        assert_eq!(
            metrics.count_with_label("gateway_replays_total", "success", "true"),
            1
        );
    }

    #[tokio::test]
    async fn test_replay_rejected_never_renews() {
        let (dispatcher, transport, listener, metrics) = dispatcher();
        transport.set_default_response(HttpResponse::new(401));

        let result = replay(&dispatcher, GatewayRequest::get("/courses"), token("access-2")).await;

        assert_eq!(
            result.unwrap_err(),
            GatewayError::Session(SessionError::ReplayUnauthorized)
        );
        assert_eq!(transport.get_requests().len(), 1);
        assert!(transport.get_requests_to("/auth/refresh").is_empty());
        assert_eq!(listener.count(), 1);
        assert_eq!(
            listener.get_events()[0].reason,
            InvalidationReason::ReplayRejected
        );
        assert_eq!(
            metrics.count_with_label("gateway_replays_total", "success", "false"),
            1
        );
    }
}
