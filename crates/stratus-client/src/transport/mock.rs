//! In-memory transport for tests and offline use

use super::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use stratus_core::{Method, Request, Response, Result};

type Responder = Box<dyn Fn(&Request) -> Response + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    responder: Responder,
}

/// Transport that answers from scripted responses and records every request
///
/// Routes are checked first (in registration order); otherwise the next
/// queued response is returned. A request nothing answers gets a `599`
/// so a missing script shows up as a failure instead of a hang.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    queue: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Create a transport with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unrouted request
    pub fn push_response(&self, response: Response) {
        self.queue.lock().push_back(response);
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: &serde_json::Value) -> Result<()> {
        self.push_response(Response::new(status).with_json(body)?);
        Ok(())
    }

    /// Answer every `method` request whose URL path ends with `path`
    pub fn route<F>(&self, method: Method, path: impl Into<String>, responder: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.lock().push(Route {
            method,
            path: path.into(),
            responder: Box::new(responder),
        });
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of requests sent so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }

    /// Forget recorded requests and queued responses
    pub fn reset(&self) {
        self.requests.lock().clear();
        self.queue.lock().clear();
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("routes", &self.routes.lock().len())
            .field("queued", &self.queue.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, request: &Request) -> Result<Response> {
        self.requests.lock().push(request.clone());

        let path = request.url().path();
        let routed = self
            .routes
            .lock()
            .iter()
            .find(|r| r.method == request.method() && path.ends_with(&r.path))
            .map(|r| (r.responder)(request));
        if let Some(response) = routed {
            return Ok(response);
        }

        if let Some(response) = self.queue.lock().pop_front() {
            return Ok(response);
        }

        Ok(Response::new(599).with_body(format!(
            "no mock response for {} {}",
            request.method(),
            request.url()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, url: &str) -> Request {
        Request::new(method, url.parse().unwrap())
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let mock = MockTransport::new();
        mock.push_response(Response::new(201));
        mock.push_response(Response::new(204));

        let req = request(Method::Put, "http://h/a");
        assert_eq!(mock.send(&req).await.unwrap().status_code(), 201);
        assert_eq!(mock.send(&req).await.unwrap().status_code(), 204);
        assert_eq!(mock.send(&req).await.unwrap().status_code(), 599);
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_routes_take_precedence() {
        let mock = MockTransport::new();
        mock.push_response(Response::new(500));
        mock.route(Method::Get, "/tenants", |_| Response::new(200).with_body("[]"));

        let resp = mock.send(&request(Method::Get, "http://h/v2.0/tenants")).await.unwrap();
        assert_eq!(resp.status_code(), 200);

        let resp = mock.send(&request(Method::Post, "http://h/v2.0/tenants")).await.unwrap();
        assert_eq!(resp.status_code(), 500);

        let last = mock.last_request().unwrap();
        assert_eq!(last.method(), Method::Post);
    }

    #[tokio::test]
    async fn test_reset() {
        let mock = MockTransport::new();
        mock.push_response(Response::new(200));
        mock.send(&request(Method::Get, "http://h/")).await.unwrap();
        mock.push_response(Response::new(200));

        mock.reset();
        assert_eq!(mock.request_count(), 0);
        assert_eq!(mock.send(&request(Method::Get, "http://h/")).await.unwrap().status_code(), 599);
    }
}
