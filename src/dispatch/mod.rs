//! Request Dispatch
//!
//! Bearer credential injection, 401 detection and the one-shot replay.

pub mod dispatcher;
pub mod request;
mod replay;

pub use dispatcher::RequestDispatcher;
pub use request::GatewayRequest;
