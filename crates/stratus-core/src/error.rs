//! Error types for the Stratus SDK

use crate::message::{Message, Request, Response};
use thiserror::Error;

/// Maximum number of response body bytes embedded in an error message
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 512;

/// Result type alias using the library `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced anywhere in the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (URL, query, header, method)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed JSON body
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network-level failure below HTTP (DNS, connect, TLS, timeout)
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP-level failure with the originating exchange attached
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The identity service could not produce a usable token
    #[error("authentication failed: {message}")]
    AuthenticationFailure {
        message: String,
        #[source]
        source: Option<Box<RequestError>>,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a transport error from any underlying cause
    pub fn transport(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Build an authentication failure without an HTTP cause
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationFailure {
            message: message.into(),
            source: None,
        }
    }

    /// The HTTP failure kind, if this is an HTTP-level error
    pub fn kind(&self) -> Option<ErrorKind> {
        self.request_error().map(RequestError::kind)
    }

    /// The HTTP failure, if this is an HTTP-level error
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Request(err) => Some(err),
            Self::AuthenticationFailure { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Request(err) if err.kind().is_not_found())
    }

    /// Check if the server rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthenticationFailure { .. })
            || matches!(self, Self::Request(err) if err.kind() == ErrorKind::Unauthorized)
    }
}

/// Typed classification of an HTTP failure status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    ResourceNotFound,
    /// 405
    MethodNotAllowed,
    /// 409
    Conflict,
    /// 411
    LengthRequired,
    /// 422
    UnprocessableEntity,
    /// 500
    Server,
    /// Any other failure status
    Other,
}

impl ErrorKind {
    /// Classify a status code; `None` for anything below 400
    pub fn from_status(status: u16) -> Option<Self> {
        if status < 400 {
            return None;
        }
        Some(match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::ResourceNotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            411 => Self::LengthRequired,
            422 => Self::UnprocessableEntity,
            500 => Self::Server,
            _ => Self::Other,
        })
    }

    /// Human-readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::ResourceNotFound => "Resource not found",
            Self::MethodNotAllowed => "Method not allowed",
            Self::Conflict => "Conflict",
            Self::LengthRequired => "Length required",
            Self::UnprocessableEntity => "Unprocessable entity",
            Self::Server => "Internal server error",
            Self::Other => "Request failed",
        }
    }

    /// Check if this is a "not found" kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound)
    }
}

/// An HTTP exchange that completed with a failure status
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RequestError {
    kind: ErrorKind,
    message: String,
    request: Box<Request>,
    response: Box<Response>,
}

impl RequestError {
    /// Create an error for the given exchange
    pub fn new(kind: ErrorKind, request: Request, response: Response) -> Self {
        let message = format!(
            "{} ({} {}) for {} {}: {}",
            kind.label(),
            response.status_code(),
            response.reason_phrase(),
            request.method(),
            request.url().without_credentials(),
            body_preview(response.body()),
        );

        Self {
            kind,
            message,
            request: Box::new(request),
            response: Box::new(response),
        }
    }

    /// The failure kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The full error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The request that triggered the failure
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The failing response
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Status code of the failing response
    pub fn status_code(&self) -> u16 {
        self.response.status_code()
    }
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= ERROR_BODY_PREVIEW_LIMIT {
        return text.into_owned();
    }

    let mut end = ERROR_BODY_PREVIEW_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
