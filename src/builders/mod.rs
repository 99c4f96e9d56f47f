//! Builders
//!
//! Fluent builder patterns for gateway configuration.

pub mod config;

pub use config::{gateway_config, GatewayConfigBuilder};
