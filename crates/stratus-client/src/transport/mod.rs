//! Pluggable HTTP transports
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            TransportClient              │
//! ├─────────────────────────────────────────┤
//! │            Transport Trait              │
//! ├────────────────────┬────────────────────┤
//! │  ReqwestTransport  │   MockTransport    │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! Backends are chosen by name through a [`TransportRegistry`].

mod mock;
mod options;
mod registry;
mod reqwest_backend;

pub use mock::MockTransport;
pub use options::{OptionKey, TransportOption, TransportOptions};
pub use registry::{TransportFactory, TransportRegistry};
pub use reqwest_backend::ReqwestTransport;

use async_trait::async_trait;
use stratus_core::{Request, Response, Result};

/// A backend that carries one request to the server and returns the response
///
/// Implementations return every completed exchange as a `Response`,
/// whatever its status; only failures below HTTP (DNS, connect, TLS,
/// timeout) become `Error::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name the backend is registered under
    fn name(&self) -> &'static str;

    /// Send a request and wait for the complete response
    async fn send(&self, request: &Request) -> Result<Response>;

    /// Apply new options to a live backend
    fn reconfigure(&self, options: &TransportOptions) -> Result<()> {
        let _ = options;
        Ok(())
    }
}
