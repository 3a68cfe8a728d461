//! # Stratus Core
//!
//! Protocol-neutral building blocks for the Stratus cloud SDK.
//!
//! This crate provides:
//! - **Url**: Parsing, incremental path/query composition, and canonical serialization
//! - **Messages**: `Request` / `Response` wrappers with case-insensitive headers
//! - **Errors**: A single library error type with a typed HTTP failure taxonomy
//! - **Error mapping**: Status-code classification of completed exchanges
//!
//! Nothing in here performs I/O; transports and service clients live in
//! `stratus-client`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Identity / Object Storage clients   │
//! ├─────────────────────────────────────────┤
//! │            Transport Client             │
//! ├───────────────────┬─────────────────────┤
//! │   Error Mapper    │  Request / Response │
//! ├───────────────────┴─────────────────────┤
//! │                  Url                    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use stratus_core::{mapper, Method, Request, Response, Url};
//!
//! let url: Url = "https://identity.example.com/v2.0".parse().unwrap();
//! let request = Request::new(Method::Get, url.join_path("tenants"));
//! let response = Response::new(404);
//!
//! let err = mapper::classify(&request, &response).unwrap();
//! assert!(err.kind().is_not_found());
//! ```

pub mod error;
pub mod mapper;
pub mod message;
pub mod url;

pub use error::{Error, ErrorKind, RequestError, Result};
pub use message::{Message, Method, Request, Response};
pub use url::{Query, QueryValue, Url, UrlParts};

/// Header carrying the identity token on authenticated requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Default User-Agent sent by the transport client
pub const USER_AGENT: &str = concat!("stratus/", env!("CARGO_PKG_VERSION"));
