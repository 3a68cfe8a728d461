//! Status-code classification of completed exchanges
//!
//! Transports hand back every response untouched. Callers that want
//! failures as errors run the exchange through [`check`]; callers that want
//! to branch on the status themselves (existence checks, mostly) use
//! [`classify`] or just inspect the response.

use crate::error::{ErrorKind, RequestError, Result};
use crate::message::{Request, Response};
use tracing::debug;

/// Classify an exchange; `None` when the status is below 400
pub fn classify(request: &Request, response: &Response) -> Option<RequestError> {
    let kind = ErrorKind::from_status(response.status_code())?;
    debug!(
        status = response.status_code(),
        kind = kind.label(),
        url = %request.url().without_credentials(),
        "request failed"
    );
    Some(RequestError::new(kind, request.clone(), response.clone()))
}

/// Pass successful responses through and turn failures into errors
pub fn check(request: &Request, response: Response) -> Result<Response> {
    match classify(request, &response) {
        Some(err) => Err(err.into()),
        None => Ok(response),
    }
}
