//! Thread-pooled HTTP/HTTPS connection server.
//!
//! A single acceptor hands accepted connections through a condition-signaled
//! FIFO queue to a fixed pool of worker threads. Each worker runs one
//! connection through an optional TLS handshake, a single bounded read, a
//! minimal HTTP parse, a request handler and a single write, then closes it.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod server;

pub use config::ServerConfig;
pub use http::{HttpRequest, HttpResponse, RequestHandler, SiteHandler, StatusCode};
pub use lifecycle::StopHandle;
pub use server::{Server, ServerError};
