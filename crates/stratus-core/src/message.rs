//! HTTP message abstraction
//!
//! [`Request`] and [`Response`] are plain values: transports turn a
//! `Request` into a `Response` and nothing here touches the network.

use crate::{Error, Result, Url};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Common surface of requests and responses
///
/// Header names are case-insensitive. `set_header` replaces every value of
/// a name, `add_header` appends another value to it.
pub trait Message {
    /// All headers
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to all headers
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Message body
    fn body(&self) -> &Bytes;

    /// HTTP protocol version
    fn protocol_version(&self) -> Version;

    /// First value of a header, if present and valid UTF-8
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a header in order
    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Check if a header is present
    fn has_header(&self, name: &str) -> bool {
        self.headers().contains_key(name)
    }

    /// Set a header, replacing existing values
    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().insert(name, value);
        Ok(())
    }

    /// Append a value to a header
    fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().append(name, value);
        Ok(())
    }

    /// Remove a header; returns whether it was present
    fn remove_header(&mut self, name: &str) -> bool {
        self.headers_mut().remove(name).is_some()
    }
}

/// Headers whose values are credentials
const SENSITIVE_HEADERS: [&str; 4] = [
    "authorization",
    "proxy-authorization",
    "x-auth-token",
    "x-subject-token",
];

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidArgument(format!("invalid header name '{name}': {e}")))?;
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidArgument(format!("invalid value for header '{name}': {e}")))?;
    // Sensitive values print as `Sensitive` in Debug output
    value.set_sensitive(SENSITIVE_HEADERS.contains(&name.as_str()));
    Ok((name, value))
}

/// Request methods understood by the cloud services
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Copy,
}

impl Method {
    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Copy => "COPY",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Get,
            Self::Head,
            Self::Post,
            Self::Put,
            Self::Delete,
            Self::Copy,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| Error::InvalidArgument(format!("unsupported method '{s}'")))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request
///
/// `Debug` leaves out the body and any URL credentials.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    version: Version,
}

impl Request {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            version: Version::HTTP_11,
        }
    }

    /// Request method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable target URL
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Replace the body
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Set the protocol version
    pub fn set_protocol_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Builder form of [`Message::set_header`]
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Builder form of [`Request::set_body`]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.set_body(body);
        self
    }

    /// Serialize `value` as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Bytes::from(serde_json::to_vec(value)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.without_credentials().to_string())
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl Message for Request {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn body(&self) -> &Bytes {
        &self.body
    }

    fn protocol_version(&self) -> Version {
        self.version
    }
}

/// A completed response
#[derive(Clone)]
pub struct Response {
    status: u16,
    reason: String,
    headers: HeaderMap,
    body: Bytes,
    version: Version,
    json: OnceLock<serde_json::Value>,
}

impl Response {
    /// Create a response with the canonical reason phrase for `status`
    pub fn new(status: u16) -> Self {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            reason,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            version: Version::HTTP_11,
            json: OnceLock::new(),
        }
    }

    /// Override the reason phrase
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Builder form of [`Message::set_header`]
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.json = OnceLock::new();
        self
    }

    /// Serialize `value` as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Bytes::from(serde_json::to_vec(value)?);
        self.json = OnceLock::new();
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Set the protocol version
    pub fn with_protocol_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Numeric status code
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body decoded as JSON, parsed on first use and cached
    pub fn json(&self) -> Result<&serde_json::Value> {
        if let Some(value) = self.json.get() {
            return Ok(value);
        }
        let value: serde_json::Value = serde_json::from_slice(&self.body)?;
        Ok(self.json.get_or_init(|| value))
    }

    /// Body decoded into a typed value
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl Message for Response {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn body(&self) -> &Bytes {
        &self.body
    }

    fn protocol_version(&self) -> Version {
        self.version
    }
}
