//! Gateway Error Types
//!
//! Error hierarchy for the authenticated request gateway.
//!
//! Every error is `Clone`: a single renewal failure settles every caller that
//! queued behind it, and each of them receives the same error value.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl GatewayError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "GATEWAY_CONFIG",
            Self::Network(_) => "GATEWAY_NETWORK",
            Self::Protocol(_) => "GATEWAY_PROTOCOL",
            Self::Storage(_) => "GATEWAY_STORAGE",
            Self::Session(_) => "GATEWAY_SESSION",
        }
    }

    /// Check if the error ended the authenticated session.
    ///
    /// Session-terminal errors have already cleared the stored credentials and
    /// raised the session-invalidated signal; callers must not retry them.
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Check if error requires the user to sign in again.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Self::Session(SessionError::RenewalAborted) => false,
            Self::Session(_) => true,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Network/transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Protocol/response parsing error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Credential storage error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Write failed: {message}")]
    WriteFailed { message: String },
}

/// Session-terminal error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No refresh credential available")]
    NoRefreshToken,

    #[error("Credential renewal rejected with HTTP {status}")]
    RenewalRejected { status: u16 },

    #[error("Credential renewal failed: {message}")]
    RenewalFailed { message: String },

    #[error("Request rejected again after credential renewal")]
    ReplayUnauthorized,

    #[error("Credential renewal was aborted before completing")]
    RenewalAborted,

    #[error("Session ended while credential renewal was in flight")]
    SessionEnded,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Wrap a renewal-path failure as a session-terminal error.
///
/// Session errors pass through unchanged. Anything else (a timeout, a
/// malformed body, a failed save) becomes [`SessionError::RenewalFailed`]
/// carrying the original message.
pub fn into_renewal_failure(error: GatewayError) -> GatewayError {
    match error {
        GatewayError::Session(_) => error,
        other => GatewayError::Session(SessionError::RenewalFailed {
            message: other.to_string(),
        }),
    }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &GatewayError) -> String {
    match error {
        GatewayError::Session(SessionError::NoRefreshToken) => {
            "You are not signed in. Please sign in to continue.".to_string()
        }
        GatewayError::Session(SessionError::RenewalAborted) => {
            "The request was interrupted. Please try again.".to_string()
        }
        GatewayError::Session(_) => "Your session has expired. Please sign in again.".to_string(),
        GatewayError::Network(NetworkError::Timeout { .. }) => {
            "The request timed out. Please check your connection and try again.".to_string()
        }
        GatewayError::Network(_) => {
            "Unable to reach the server. Please check your connection.".to_string()
        }
        _ => "An unexpected error occurred. Please try again.".to_string(),
    }
}
