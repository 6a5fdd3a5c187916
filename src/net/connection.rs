//! Accepted connection handle and its lifecycle states.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the accepted socket exclusively (moved, never shared)
//! - Name the stages a connection passes through on its way to Closed

use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub(crate) fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Stage of a connection inside the pipeline.
///
/// Transitions are strictly linear, with an edge from every stage straight
/// to `Closed` on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, not yet read.
    Accepted,
    /// TLS handshake in progress.
    Handshaking,
    /// Ready for the single read.
    Readable,
    /// Request bytes parsed.
    Parsed,
    /// Handler produced a response.
    Dispatched,
    /// Response written.
    Responded,
    /// Transport released.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Accepted => "accepted",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Readable => "readable",
            ConnectionState::Parsed => "parsed",
            ConnectionState::Dispatched => "dispatched",
            ConnectionState::Responded => "responded",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An accepted client connection.
///
/// Exactly one owner at a time: the acceptor, then the queue, then the
/// worker running the pipeline. The socket closes when the handle drops.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    /// Wrap a freshly accepted socket.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            stream,
        }
    }

    /// This connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Give up the handle, returning the raw socket.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    /// Shut down both directions and drop the socket.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
