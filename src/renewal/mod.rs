//! Credential Renewal
//!
//! The single-flight renewal state machine and the session invalidation path.

pub mod coordinator;

pub use coordinator::{RenewalCoordinator, RenewalPhase};
