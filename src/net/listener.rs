//! TCP listener with optional TLS material.
//!
//! # Responsibilities
//! - Create, bind and listen on the configured address with the configured backlog
//! - Load the TLS context when TLS is enabled
//! - Accept one connection at a time for the acceptor loop
//!
//! # Design Decisions
//! - Construction is all-or-nothing: the socket is an owned value, so any
//!   failure after bind (including TLS loading) releases it before returning
//! - The TLS context is shared read-only with every worker

use std::net::{SocketAddr, TcpListener};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

use crate::config::ListenerConfig;
use crate::net::connection::{Connection, ConnectionState};
use crate::net::tls::{TlsContext, TlsError};

/// Error type for listener construction.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Invalid bind address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("Failed to create socket: {0}")]
    Socket(#[source] std::io::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to listen: {0}")]
    Listen(#[source] std::io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Failure returned by [`Listener::accept_one`].
#[derive(Debug, Error)]
#[error("Failed to accept connection: {reason}")]
pub struct AcceptError {
    #[source]
    pub reason: std::io::Error,
}

/// A bound, listening socket plus the optional TLS context.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    tls: Option<TlsContext>,
}

impl Listener {
    /// Bind to the configured address and, if requested, load TLS material.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(ListenerError::Socket)?;
        socket.set_reuse_address(true).map_err(ListenerError::Socket)?;
        socket
            .bind(&addr.into())
            .map_err(|source| ListenerError::Bind { address: addr, source })?;
        socket.listen(config.backlog).map_err(ListenerError::Listen)?;

        let inner: TcpListener = socket.into();
        let local_addr = inner.local_addr().map_err(ListenerError::Listen)?;

        // `inner` drops (closing the socket) if this fails.
        let tls = if config.tls.enabled {
            Some(TlsContext::load(
                config.tls.cert_path.as_deref(),
                config.tls.key_path.as_deref(),
            )?)
        } else {
            None
        };

        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            tls = tls.is_some(),
            "Listener bound"
        );

        Ok(Self {
            inner,
            local_addr,
            tls,
        })
    }

    /// Block until the next connection arrives.
    pub fn accept_one(&self) -> Result<Connection, AcceptError> {
        let (stream, peer_addr) = self.inner.accept().map_err(|reason| AcceptError { reason })?;
        let connection = Connection::new(stream, peer_addr);

        tracing::debug!(
            connection_id = %connection.id(),
            peer_addr = %peer_addr,
            state = %ConnectionState::Accepted,
            "Connection accepted"
        );
        Ok(connection)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// The shared TLS context, absent when TLS is disabled.
    pub fn tls_context(&self) -> Option<&TlsContext> {
        self.tls.as_ref()
    }
}
