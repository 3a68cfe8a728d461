//! # Stratus Client SDK
//!
//! A client SDK for OpenStack-style cloud services.
//!
//! ## Features
//!
//! - **Pluggable transports**: backends chosen by name from a registry
//!   (`reqwest` for real HTTP, `mock` for tests)
//! - **Identity**: token issue, expiry tracking, service catalog, rescoping,
//!   and offline snapshots
//! - **Object storage**: containers and objects, discovered from the catalog
//! - **Explicit configuration**: a plain [`Config`] and an application-owned
//!   [`Context`] instead of global state
//!
//! ## Example
//!
//! ```rust,ignore
//! use stratus_client::{Config, Context};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("https://identity.example.com/v2.0")
//!         .with_user("alice", "secret")
//!         .with_tenant_name("demo");
//!     let mut ctx = Context::new(config)?;
//!
//!     // Authenticates on first use
//!     let identity = ctx.identity().await?;
//!     println!("token expires at {:?}", identity.expires());
//!
//!     let storage = ctx.object_storage().await?;
//!     storage.save_object("docs", "hello.txt", "Hello, World!", None).await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod context;
pub mod identity;
mod object_storage;
pub mod transport;
mod types;

pub use client::{RequestOptions, TransportClient};
pub use config::{Config, CONFIG_KEYS, ENV_PREFIX};
pub use context::Context;
pub use identity::{
    CatalogEndpoint, CatalogEntry, Credentials, IdentityService, IdentitySnapshot, Scope, Tenant,
    TokenDetails,
};
pub use object_storage::{ObjectStorage, OBJECT_STORE_SERVICE};
pub use transport::{
    MockTransport, OptionKey, ReqwestTransport, Transport, TransportOption, TransportOptions,
    TransportRegistry,
};
pub use types::*;

// Re-export the core types callers need alongside the client
pub use stratus_core::{
    Error, ErrorKind, Message, Method, Request, RequestError, Response, Result, Url,
};
