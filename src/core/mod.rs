//! Gateway Core Components
//!
//! Core infrastructure for outbound HTTP calls.

pub mod transport;

pub use transport::*;
