//! Accept loop.
//!
//! # Responsibilities
//! - Block on the connection source and push each accepted connection onto the queue
//! - Stop once shutdown has been requested
//!
//! # Design Decisions
//! - Accept failures during normal operation end the loop (unless the retry
//!   policy is enabled); the caller decides whether to restart it
//! - Failures after shutdown was requested are expected and not reported
//! - A connection accepted after shutdown was requested is closed unserved;
//!   this is how the wake-up connection from the coordinator is discarded.
//!   The queue makes the final call under its own lock, so a connection can
//!   never be queued behind workers that have already exited

use std::sync::Arc;
use std::thread;

use crate::net::connection::Connection;
use crate::net::listener::{AcceptError, Listener};
use crate::net::queue::ConnectionQueue;
use crate::observability::metrics;
use crate::resilience::AcceptRetry;

/// Anything the accept loop can take connections from.
pub trait Accept: Send + Sync {
    /// Block until the next connection arrives.
    fn accept(&self) -> Result<Connection, AcceptError>;
}

impl Accept for Listener {
    fn accept(&self) -> Result<Connection, AcceptError> {
        self.accept_one()
    }
}

pub struct Acceptor<A = Listener> {
    source: Arc<A>,
    queue: Arc<ConnectionQueue<Connection>>,
    retry: AcceptRetry,
}

impl<A: Accept> Acceptor<A> {
    pub fn new(source: Arc<A>, queue: Arc<ConnectionQueue<Connection>>, retry: AcceptRetry) -> Self {
        Self {
            source,
            queue,
            retry,
        }
    }

    /// Run until shutdown (`Ok`) or an unrecoverable accept failure (`Err`).
    pub fn run(mut self) -> Result<(), AcceptError> {
        while !self.queue.is_shutdown() {
            let accepted = self.source.accept();

            if self.queue.is_shutdown() {
                if let Ok(connection) = accepted {
                    connection.close();
                }
                break;
            }

            match accepted {
                Ok(connection) => {
                    self.retry.on_success();
                    metrics::record_accepted();
                    if let Err(connection) = self.queue.push(connection) {
                        tracing::debug!(
                            connection_id = %connection.id(),
                            "Shutdown raced with accept; closing connection"
                        );
                        connection.close();
                        break;
                    }
                }
                Err(e) => match self.retry.on_failure() {
                    Some(delay) => {
                        tracing::warn!(error = %e, ?delay, "Accept failed, retrying");
                        thread::sleep(delay);
                    }
                    None => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        return Err(e);
                    }
                },
            }
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceptConfig;
    use std::collections::VecDeque;
    use std::io;
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Fail(io::ErrorKind),
        Connect,
    }

    /// Replays `steps`; once they run out, requests shutdown and fails.
    struct ScriptedSource {
        steps: Mutex<VecDeque<Step>>,
        queue: Arc<ConnectionQueue<Connection>>,
        listener: TcpListener,
        calls: AtomicUsize,
        // Client ends of accepted connections, kept open for the test's duration.
        clients: Mutex<Vec<TcpStream>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>, queue: Arc<ConnectionQueue<Connection>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                queue,
                listener: TcpListener::bind("127.0.0.1:0").unwrap(),
                calls: AtomicUsize::new(0),
                clients: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Accept for ScriptedSource {
        fn accept(&self) -> Result<Connection, AcceptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.steps.lock().unwrap().pop_front() {
                Some(Step::Fail(kind)) => Err(AcceptError {
                    reason: io::Error::from(kind),
                }),
                Some(Step::Connect) => {
                    let client = TcpStream::connect(self.listener.local_addr().unwrap()).unwrap();
                    self.clients.lock().unwrap().push(client);
                    let (stream, peer) = self.listener.accept().unwrap();
                    Ok(Connection::new(stream, peer))
                }
                None => {
                    self.queue.request_shutdown();
                    Err(AcceptError {
                        reason: io::Error::from(io::ErrorKind::Interrupted),
                    })
                }
            }
        }
    }

    fn retry(enabled: bool, max_retries: u32) -> AcceptRetry {
        AcceptRetry::from_config(&AcceptConfig {
            retry_enabled: enabled,
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 5,
        })
    }

    #[test]
    fn accept_failure_ends_loop_without_retry() {
        let queue = Arc::new(ConnectionQueue::new());
        let source = Arc::new(ScriptedSource::new(
            vec![Step::Fail(io::ErrorKind::PermissionDenied), Step::Connect],
            Arc::clone(&queue),
        ));

        let err = Acceptor::new(Arc::clone(&source), Arc::clone(&queue), retry(false, 5))
            .run()
            .unwrap_err();

        assert_eq!(err.reason.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(source.calls(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn retry_gives_up_after_max_retries() {
        let queue = Arc::new(ConnectionQueue::new());
        let steps = (0..5).map(|_| Step::Fail(io::ErrorKind::Other)).collect();
        let source = Arc::new(ScriptedSource::new(steps, Arc::clone(&queue)));

        let result = Acceptor::new(Arc::clone(&source), Arc::clone(&queue), retry(true, 2)).run();

        assert!(result.is_err());
        // Two retried failures, the third gives up.
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn retry_recovers_and_queues_later_connections() {
        let queue = Arc::new(ConnectionQueue::new());
        let source = Arc::new(ScriptedSource::new(
            vec![
                Step::Fail(io::ErrorKind::Other),
                Step::Connect,
                Step::Fail(io::ErrorKind::Other),
                Step::Connect,
            ],
            Arc::clone(&queue),
        ));

        let result = Acceptor::new(Arc::clone(&source), Arc::clone(&queue), retry(true, 1)).run();

        assert!(result.is_ok(), "ends cleanly once shutdown is requested");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn connections_are_queued_in_accept_order() {
        let queue = Arc::new(ConnectionQueue::new());
        let source = Arc::new(ScriptedSource::new(
            vec![Step::Connect, Step::Connect, Step::Connect],
            Arc::clone(&queue),
        ));

        Acceptor::new(Arc::clone(&source), Arc::clone(&queue), retry(false, 0))
            .run()
            .unwrap();

        let ids: Vec<u64> = std::iter::from_fn(|| queue.pop_blocking())
            .map(|connection| connection.id().as_u64())
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn loop_does_not_start_after_shutdown() {
        let queue = Arc::new(ConnectionQueue::new());
        queue.request_shutdown();
        let source = Arc::new(ScriptedSource::new(vec![Step::Connect], Arc::clone(&queue)));

        Acceptor::new(Arc::clone(&source), Arc::clone(&queue), retry(false, 0))
            .run()
            .unwrap();

        assert_eq!(source.calls(), 0);
    }
}
