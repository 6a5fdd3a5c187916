//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! bytes from one read
//!     → request.rs (request line, headers, body; never fails)
//!     → handler.rs (RequestHandler::handle, panics caught)
//!         └ site.rs (default handler: static pages by method and path)
//!     → response.rs (status line + headers + body as one buffer)
//!     → single write to the client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod site;

pub use handler::{dispatch, RequestHandler};
pub use request::HttpRequest;
pub use response::{HttpResponse, StatusCode};
pub use site::{DirectoryContent, MemoryContent, SiteHandler, StaticContent};
