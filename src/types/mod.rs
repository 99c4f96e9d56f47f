//! Gateway Types
//!
//! Credential and configuration types.

pub mod config;
pub mod token;

pub use config::*;
pub use token::*;
