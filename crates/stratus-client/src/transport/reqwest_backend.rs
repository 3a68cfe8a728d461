//! reqwest-backed transport

use super::{Transport, TransportOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use stratus_core::{Error, Message, Request, Response, Result, Url};

/// Transport that talks to real servers through reqwest
pub struct ReqwestTransport {
    http: RwLock<reqwest::Client>,
}

impl ReqwestTransport {
    /// Create a transport with the given options
    pub fn new(options: &TransportOptions) -> Result<Self> {
        Ok(Self {
            http: RwLock::new(build_client(options)?),
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn send(&self, request: &Request) -> Result<Response> {
        // reqwest::Client is a cheap handle; never hold the lock across .await
        let http = self.http.read().clone();
        let url = request.url().to_string();

        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| Error::InvalidArgument(format!("invalid method: {e}")))?;

        let mut req = http
            .request(method, &url)
            .version(request.protocol_version())
            .headers(request.headers().clone());

        if !request.body().is_empty() {
            req = req.body(request.body().clone());
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_error(e, request.url()))?;

        let status = response.status().as_u16();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, request.url()))?;

        Ok(Response::new(status)
            .with_headers(headers)
            .with_body(body)
            .with_protocol_version(version))
    }

    fn reconfigure(&self, options: &TransportOptions) -> Result<()> {
        let http = build_client(options)?;
        *self.http.write() = http;
        Ok(())
    }
}

fn build_client(options: &TransportOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(!options.ssl_verify)
        .connection_verbose(options.debug);

    if !options.timeout.is_zero() {
        builder = builder.timeout(options.timeout);
    }

    if let Some(proxy) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| Error::Config(format!("invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| Error::transport("failed to build HTTP client", e))
}

fn transport_error(err: reqwest::Error, url: &Url) -> Error {
    let what = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_builder() {
        "invalid request"
    } else {
        "request failed"
    };
    // reqwest's own message repeats the URL, userinfo included
    Error::transport(
        format!("{what}: {}", url.without_credentials()),
        err.without_url(),
    )
}
