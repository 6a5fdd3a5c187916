//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, backlog, accept one)
//!     → connection.rs (exclusively owned handle)
//!     → queue.rs (FIFO hand-off to one worker)
//!     → transport.rs + tls.rs (optional TLS handshake, per-connection session)
//!     → Hand off to the HTTP layer
//!
//! Connection States:
//!     Accepted → Handshaking → Readable → Parsed → Dispatched → Responded → Closed
//! ```
//!
//! # Design Decisions
//! - Handles move between owners; they are never shared or cloned
//! - The TLS context is loaded once and shared read-only
//! - TLS is optional and handled transparently

pub mod connection;
pub mod listener;
pub mod queue;
pub mod tls;
pub mod transport;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use listener::{AcceptError, Listener, ListenerError};
pub use queue::ConnectionQueue;
pub use tls::{TlsContext, TlsError};
pub use transport::{HandshakeError, Transport};
