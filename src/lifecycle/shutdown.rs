//! Shutdown coordination.
//!
//! # Responsibilities
//! - Latch the shutdown flag (shared with the queue's lock) and wake workers
//! - Wake the acceptor out of its blocking `accept`
//! - Join every worker, exactly once, no matter how many callers ask
//!
//! # Design Decisions
//! - `stop()` is request + drain and may be called from any thread
//! - Concurrent `await_drain` callers all return only after the join finished
//! - The acceptor is woken by connecting to the listener's own address; the
//!   listening socket itself is never closed out from under it

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::net::connection::Connection;
use crate::net::queue::ConnectionQueue;
use crate::server::pool::WorkerPool;

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Coordinator for graceful shutdown.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    queue: Arc<ConnectionQueue<Connection>>,
    workers: Mutex<Option<WorkerPool>>,
    listen_addr: SocketAddr,
}

impl ShutdownCoordinator {
    pub fn new(
        queue: Arc<ConnectionQueue<Connection>>,
        workers: WorkerPool,
        listen_addr: SocketAddr,
    ) -> Self {
        Self {
            queue,
            workers: Mutex::new(Some(workers)),
            listen_addr,
        }
    }

    /// Stop accepting and let idle workers exit once the queue drains. Idempotent.
    pub fn request_shutdown(&self) {
        if self.queue.request_shutdown() {
            tracing::info!(queued = self.queue.len(), "Shutdown requested");
            self.wake_acceptor();
        }
    }

    /// Block until every worker thread has exited.
    pub fn await_drain(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = workers.take() {
            let size = pool.size();
            pool.join();
            tracing::info!(workers = size, "All workers exited");
        }
    }

    /// `request_shutdown` followed by `await_drain`.
    pub fn stop(&self) {
        self.request_shutdown();
        self.await_drain();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.queue.is_shutdown()
    }

    fn wake_acceptor(&self) {
        let target = wake_address(self.listen_addr);
        if let Err(e) = TcpStream::connect_timeout(&target, WAKE_TIMEOUT) {
            tracing::debug!(address = %target, error = %e, "Acceptor wake-up connection failed");
        }
    }
}

/// Replace a wildcard bind address with the matching loopback address.
fn wake_address(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// Cloneable handle to a server's `stop` operation.
///
/// Hand this to whatever installs signal handlers; no global state is needed.
#[derive(Debug, Clone)]
pub struct StopHandle {
    coordinator: Arc<ShutdownCoordinator>,
}

impl StopHandle {
    pub(crate) fn new(coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Request shutdown and wait for the workers to drain the queue.
    pub fn stop(&self) {
        self.coordinator.stop();
    }

    /// Request shutdown without waiting.
    pub fn request_shutdown(&self) {
        self.coordinator.request_shutdown();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.coordinator.is_shutdown_requested()
    }
}
