//! Request handler contract.
//!
//! A handler turns one parsed request into exactly one response. It must not
//! block indefinitely. Failures are expressed as error responses; a panic
//! escaping a handler is caught at the dispatch boundary and answered with
//! `500 Internal Server Error` so the worker loop never sees it.

use std::panic::{self, AssertUnwindSafe};

use crate::http::request::HttpRequest;
use crate::http::response::{HttpResponse, StatusCode};

/// Maps a request to a response.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

impl<F> RequestHandler for F
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self(request)
    }
}

/// Invoke `handler`, converting a panic into a 500 response.
pub fn dispatch(handler: &dyn RequestHandler, request: &HttpRequest) -> HttpResponse {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(
                method = %request.method,
                path = %request.path,
                "Request handler panicked"
            );
            HttpResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "<h1>500 Internal Server Error</h1>",
            )
        }
    }
}
