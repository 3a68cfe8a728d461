//! Transport client: request building, dispatch, and optional error mapping

use crate::transport::{OptionKey, Transport, TransportOption, TransportOptions};
use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::HeaderMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use stratus_core::{mapper, Message, Method, Request, Response, Result, Url};
use tracing::{debug, instrument};

/// Per-request settings
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Options with no extra headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header on the request, replacing any default for the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Headers to apply, in order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

struct ClientSettings {
    options: TransportOptions,
    default_headers: HeaderMap,
    raise_errors: bool,
}

/// Issues requests through a pluggable [`Transport`]
///
/// By default responses come back raw whatever their status. With
/// `raise_errors` enabled, the verb helpers and [`TransportClient::execute`]
/// turn failure statuses into typed errors; [`TransportClient::send`] never
/// does and [`TransportClient::send_checked`] always does.
pub struct TransportClient {
    transport: Arc<dyn Transport>,
    settings: RwLock<ClientSettings>,
}

impl TransportClient {
    /// Wrap a transport with default options
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(stratus_core::USER_AGENT));

        Self {
            transport,
            settings: RwLock::new(ClientSettings {
                options: TransportOptions::default(),
                default_headers,
                raise_errors: false,
            }),
        }
    }

    /// Wrap a transport and push `options` to it
    pub fn with_options(transport: Arc<dyn Transport>, options: TransportOptions) -> Result<Self> {
        transport.reconfigure(&options)?;
        let client = Self::new(transport);
        client.settings.write().options = options;
        Ok(client)
    }

    /// Name of the underlying backend
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Current transport options
    pub fn options(&self) -> TransportOptions {
        self.settings.read().options.clone()
    }

    /// Read one option
    pub fn option(&self, key: OptionKey) -> TransportOption {
        self.settings.read().options.get(key)
    }

    /// Change one option on the live client
    pub fn set_option(&self, option: TransportOption) -> Result<()> {
        let mut options = self.options();
        options.apply(option);
        self.transport.reconfigure(&options)?;
        self.settings.write().options = options;
        Ok(())
    }

    /// Set a header sent with every request
    pub fn set_default_header(&self, name: &str, value: &str) -> Result<()> {
        // Validate through a scratch request so bad input surfaces as InvalidArgument
        let mut scratch = Request::new(Method::Get, Url::parse("http://localhost")?);
        scratch.set_header(name, value)?;
        let mut settings = self.settings.write();
        for (name, value) in scratch.headers() {
            settings.default_headers.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Whether verb helpers raise typed errors on failure statuses
    pub fn raises_errors(&self) -> bool {
        self.settings.read().raise_errors
    }

    /// Toggle typed errors for verb helpers
    pub fn set_raise_errors(&self, raise: bool) {
        self.settings.write().raise_errors = raise;
    }

    /// Build a request with the default headers plus `options`
    pub fn create_request(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
        options: &RequestOptions,
    ) -> Result<Request> {
        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .extend(self.settings.read().default_headers.clone());
        for (name, value) in options.headers() {
            request.set_header(name, value)?;
        }
        if let Some(body) = body {
            request.set_body(body);
        }
        Ok(request)
    }

    /// Send a request and return the response whatever its status
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), url = %request.url().without_credentials())
    )]
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let debug_enabled = self.settings.read().options.debug;
        let started = Instant::now();

        let result = self.transport.send(request).await;

        if debug_enabled {
            let elapsed_ms = started.elapsed().as_millis();
            match &result {
                Ok(response) => debug!(
                    status = response.status_code(),
                    bytes = response.body().len(),
                    elapsed_ms,
                    "response received"
                ),
                Err(err) => debug!(error = %err, elapsed_ms, "transport failure"),
            }
        }

        result
    }

    /// Send a request and turn failure statuses into typed errors
    pub async fn send_checked(&self, request: &Request) -> Result<Response> {
        let response = self.send(request).await?;
        mapper::check(request, response)
    }

    /// Send a request, mapping errors only if `raise_errors` is on
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        if self.raises_errors() {
            self.send_checked(request).await
        } else {
            self.send(request).await
        }
    }

    /// GET `url`
    pub async fn get(&self, url: Url, options: &RequestOptions) -> Result<Response> {
        let request = self.create_request(Method::Get, url, None, options)?;
        self.execute(&request).await
    }

    /// HEAD `url`
    pub async fn head(&self, url: Url, options: &RequestOptions) -> Result<Response> {
        let request = self.create_request(Method::Head, url, None, options)?;
        self.execute(&request).await
    }

    /// POST `body` to `url`
    pub async fn post(
        &self,
        url: Url,
        body: impl Into<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let request = self.create_request(Method::Post, url, Some(body.into()), options)?;
        self.execute(&request).await
    }

    /// PUT `body` to `url`
    pub async fn put(
        &self,
        url: Url,
        body: impl Into<Bytes>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let request = self.create_request(Method::Put, url, Some(body.into()), options)?;
        self.execute(&request).await
    }

    /// DELETE `url`
    pub async fn delete(&self, url: Url, options: &RequestOptions) -> Result<Response> {
        let request = self.create_request(Method::Delete, url, None, options)?;
        self.execute(&request).await
    }

    /// COPY `url` (server-side copy; destination goes in a header)
    pub async fn copy(&self, url: Url, options: &RequestOptions) -> Result<Response> {
        let request = self.create_request(Method::Copy, url, None, options)?;
        self.execute(&request).await
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings.read();
        f.debug_struct("TransportClient")
            .field("transport", &self.transport.name())
            .field("options", &settings.options)
            .field("raise_errors", &settings.raise_errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::time::Duration;
    use stratus_core::{Error, ErrorKind};

    fn client() -> (Arc<MockTransport>, TransportClient) {
        let mock = Arc::new(MockTransport::new());
        let client = TransportClient::new(mock.clone());
        (mock, client)
    }

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_request_sets_headers() {
        let (_, client) = client();
        let options = RequestOptions::new()
            .header("User-Agent", "custom/1.0")
            .header("X-Auth-Token", "tok");
        let body = Some(Bytes::from("{}"));
        let request = client
            .create_request(Method::Post, url("http://h/v2.0/tokens"), body, &options)
            .unwrap();

        assert_eq!(request.header_values("user-agent"), vec!["custom/1.0"]);
        assert_eq!(request.header("x-auth-token"), Some("tok"));
        assert_eq!(request.body().as_ref(), b"{}");
    }

    #[test]
    fn test_default_user_agent() {
        let (_, client) = client();
        let request = client
            .create_request(Method::Get, url("http://h/"), None, &RequestOptions::new())
            .unwrap();
        assert_eq!(request.header("User-Agent"), Some(stratus_core::USER_AGENT));
    }

    #[tokio::test]
    async fn test_raw_by_default() {
        let (mock, client) = client();
        mock.push_response(Response::new(404));

        let response = client.get(url("http://h/missing"), &RequestOptions::new()).await.unwrap();
        assert_eq!(response.status_code(), 404);
    }

    #[tokio::test]
    async fn test_raise_errors_maps_status() {
        let (mock, client) = client();
        client.set_raise_errors(true);
        mock.push_response(Response::new(403).with_body("denied"));

        let err = client
            .delete(url("http://h/thing"), &RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Forbidden));

        let request_error = err.request_error().unwrap();
        assert_eq!(request_error.request().method(), Method::Delete);
        assert_eq!(request_error.response().text(), "denied");
    }

    #[tokio::test]
    async fn test_send_never_maps_and_send_checked_always_does() {
        let (mock, client) = client();
        client.set_raise_errors(true);
        mock.push_response(Response::new(500));
        mock.push_response(Response::new(500));

        let request = client
            .create_request(Method::Get, url("http://h/"), None, &RequestOptions::new())
            .unwrap();
        assert_eq!(client.send(&request).await.unwrap().status_code(), 500);

        client.set_raise_errors(false);
        let err = client.send_checked(&request).await.unwrap_err();
        assert!(matches!(err, Error::Request(ref e) if e.kind() == ErrorKind::Server));
    }

    #[tokio::test]
    async fn test_verbs_use_their_methods() {
        let (mock, client) = client();
        let options = RequestOptions::new();
        client.head(url("http://h/a"), &options).await.unwrap();
        client.put(url("http://h/a"), "x", &options).await.unwrap();
        client.post(url("http://h/a"), "y", &options).await.unwrap();
        client.copy(url("http://h/a"), &options).await.unwrap();

        let methods: Vec<Method> = mock.requests().iter().map(Request::method).collect();
        assert_eq!(methods, vec![Method::Head, Method::Put, Method::Post, Method::Copy]);
    }

    #[test]
    fn test_options_round_trip() {
        let (_, client) = client();
        client.set_option(TransportOption::Timeout(Duration::ZERO)).unwrap();
        client.set_option(TransportOption::Proxy(Some("http://proxy:3128".into()))).unwrap();

        assert_eq!(client.option(OptionKey::Timeout), TransportOption::Timeout(Duration::ZERO));
        assert_eq!(client.options().proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(client.transport_name(), "mock");
    }

    #[test]
    fn test_default_header_validation() {
        let (_, client) = client();
        assert!(client.set_default_header("Accept", "application/json").is_ok());
        assert!(matches!(
            client.set_default_header("bad header", "x"),
            Err(Error::InvalidArgument(_))
        ));

        let request = client
            .create_request(Method::Get, url("http://h/"), None, &RequestOptions::new())
            .unwrap();
        assert_eq!(request.header("accept"), Some("application/json"));
    }

    /// Collects formatted log output for assertions
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn logs_for_send(debug: bool) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (mock, client) = client();
        client.set_option(TransportOption::Debug(debug)).unwrap();
        mock.push_response(Response::new(404).with_body("gone"));
        client
            .get(url("http://alice:hunter2@h/v1/thing"), &RequestOptions::new())
            .await
            .unwrap();

        let bytes = logs.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_debug_option_logs_exchanges() {
        let logs = logs_for_send(true).await;
        assert!(logs.contains("response received"), "{logs}");
        assert!(logs.contains("status=404"), "{logs}");
        assert!(logs.contains("url=http://h/v1/thing"), "{logs}");
        assert!(!logs.contains("hunter2"), "{logs}");

        let quiet = logs_for_send(false).await;
        assert!(!quiet.contains("response received"), "{quiet}");
    }
}
