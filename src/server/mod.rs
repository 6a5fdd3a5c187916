//! Connection-handling core.
//!
//! # Data Flow
//! ```text
//! Listener ─accept─▶ Acceptor ─push─▶ ConnectionQueue ─pop─▶ Worker ─▶ Pipeline ─▶ handler
//!                        ▲                   ▲                  ▲
//!                        └──── wake ──── ShutdownCoordinator ───┘ (flag + broadcast, join)
//! ```
//!
//! # Design Decisions
//! - One acceptor (the thread calling [`Server::run`]) and a fixed pool of
//!   worker threads; every blocking call blocks only its own thread
//! - Connections are admitted FIFO; completion order is unspecified
//! - Cancellation is cooperative and checked between connections only

pub mod acceptor;
pub mod pipeline;
pub mod pool;

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::join_errors;
use crate::config::{validate_config, AcceptConfig, ServerConfig, ValidationError};
use crate::http::RequestHandler;
use crate::lifecycle::shutdown::{ShutdownCoordinator, StopHandle};
use crate::net::connection::Connection;
use crate::net::listener::{AcceptError, Listener, ListenerError};
use crate::net::queue::ConnectionQueue;
use crate::resilience::{AcceptRetry, IoTimeouts};

pub use acceptor::{Accept, Acceptor};
pub use pipeline::{ConnectionPipeline, PipelineOutcome};
pub use pool::WorkerPool;

/// Errors surfaced by the server facade.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Accept(#[from] AcceptError),
}

/// A bound server with its worker pool running.
pub struct Server {
    listener: Arc<Listener>,
    queue: Arc<ConnectionQueue<Connection>>,
    shutdown: Arc<ShutdownCoordinator>,
    accept: AcceptConfig,
    pool_size: usize,
}

impl Server {
    /// Bind the listener and start the workers.
    pub fn bind<H: RequestHandler>(config: &ServerConfig, handler: H) -> Result<Self, ServerError> {
        Self::bind_shared(config, Arc::new(handler))
    }

    /// Like [`bind`](Self::bind) for a handler that is already shared.
    ///
    /// The configuration is validated first; nothing is bound if it is rejected.
    pub fn bind_shared(config: &ServerConfig, handler: Arc<dyn RequestHandler>) -> Result<Self, ServerError> {
        validate_config(config).map_err(ServerError::Config)?;

        let listener = Arc::new(Listener::bind(&config.listener)?);
        let queue: Arc<ConnectionQueue<Connection>> = Arc::new(ConnectionQueue::new());

        let pipeline = ConnectionPipeline::new(
            listener.tls_context().cloned(),
            handler,
            config.limits.read_buffer_size,
            IoTimeouts::from_config(&config.timeouts),
        );
        let pool = WorkerPool::spawn(config.workers.pool_size, Arc::clone(&queue), move |connection: Connection| {
            pipeline.run(connection);
        })
        .map_err(ServerError::Spawn)?;

        let pool_size = pool.size();
        let shutdown = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&queue),
            pool,
            listener.local_addr(),
        ));

        tracing::info!(
            address = %listener.local_addr(),
            workers = pool_size,
            tls = listener.is_tls_enabled(),
            "Server ready"
        );

        Ok(Self {
            listener,
            queue,
            shutdown,
            accept: config.accept.clone(),
            pool_size,
        })
    }

    /// Run the accept loop on the calling thread until [`stop`](Self::stop)
    /// is called or accepting fails.
    pub fn run(&self) -> Result<(), ServerError> {
        tracing::info!(
            address = %self.listener.local_addr(),
            tls = self.listener.is_tls_enabled(),
            "Accepting connections"
        );
        Acceptor::new(
            Arc::clone(&self.listener),
            Arc::clone(&self.queue),
            AcceptRetry::from_config(&self.accept),
        )
        .run()?;
        Ok(())
    }

    /// Request shutdown and wait until every worker has drained and exited.
    pub fn stop(&self) {
        self.shutdown.stop();
    }

    /// A handle that can stop this server from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shutdown))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.listener.is_tls_enabled()
    }

    pub fn worker_count(&self) -> usize {
        self.pool_size
    }

    /// Connections waiting for a worker right now.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.stop();
    }
}
