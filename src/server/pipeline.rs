//! Per-connection protocol sequence.
//!
//! ```text
//! Accepted → (Handshaking) → Readable → Parsed → Dispatched → Responded → Closed
//!      └──────────┴──────────────┴─── any error ──────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Exactly one bounded read; a request larger than the buffer is truncated
//!   and one split across several packets is parsed from the first one only
//! - Exactly one write of the serialized response
//! - Every exit path closes the transport; no error reaches the worker loop
//! - The TLS session lives inside the transport and dies with it

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use crate::http::{dispatch, HttpRequest, RequestHandler};
use crate::net::connection::{Connection, ConnectionState};
use crate::net::tls::TlsContext;
use crate::net::transport::Transport;
use crate::observability::metrics;
use crate::resilience::IoTimeouts;

/// How a connection left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A response with this status code was written.
    Responded(u16),
    /// The peer closed before sending any bytes.
    PeerClosed,
    HandshakeFailed,
    ReadFailed,
    WriteFailed,
}

impl PipelineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Responded(_) => "responded",
            PipelineOutcome::PeerClosed => "peer_closed",
            PipelineOutcome::HandshakeFailed => "handshake_failed",
            PipelineOutcome::ReadFailed => "read_failed",
            PipelineOutcome::WriteFailed => "write_failed",
        }
    }
}

/// Everything a worker needs to serve one connection.
pub struct ConnectionPipeline {
    tls: Option<TlsContext>,
    handler: Arc<dyn RequestHandler>,
    read_buffer_size: usize,
    timeouts: IoTimeouts,
}

impl ConnectionPipeline {
    pub fn new(
        tls: Option<TlsContext>,
        handler: Arc<dyn RequestHandler>,
        read_buffer_size: usize,
        timeouts: IoTimeouts,
    ) -> Self {
        Self {
            tls,
            handler,
            read_buffer_size,
            timeouts,
        }
    }

    /// Serve `connection` to completion and close it.
    pub fn run(&self, connection: Connection) -> PipelineOutcome {
        let span = tracing::info_span!(
            "connection",
            connection_id = %connection.id(),
            peer_addr = %connection.peer_addr()
        );
        let _entered = span.enter();

        let outcome = self.serve(connection);

        metrics::record_closed(outcome.label());
        tracing::debug!(state = %ConnectionState::Closed, outcome = outcome.label(), "Connection finished");
        outcome
    }

    fn serve(&self, connection: Connection) -> PipelineOutcome {
        let stream = connection.into_stream();
        if let Err(e) = self.timeouts.apply(&stream) {
            tracing::warn!(error = %e, "Failed to set socket deadlines");
        }

        let mut transport = match &self.tls {
            Some(context) => {
                tracing::trace!(state = %ConnectionState::Handshaking);
                match Transport::handshake(stream, context) {
                    Ok(transport) => transport,
                    Err(e) => {
                        tracing::warn!(error = %e, "TLS handshake failed");
                        return PipelineOutcome::HandshakeFailed;
                    }
                }
            }
            None => Transport::plain(stream),
        };

        let outcome = self.exchange(&mut transport);
        transport.close();
        outcome
    }

    fn exchange(&self, transport: &mut Transport) -> PipelineOutcome {
        tracing::trace!(state = %ConnectionState::Readable, tls = transport.is_tls());

        let mut buf = vec![0u8; self.read_buffer_size];
        let read = match read_once(transport, &mut buf) {
            Ok(0) => {
                tracing::debug!("Client closed connection before sending data");
                return PipelineOutcome::PeerClosed;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "Error receiving data from client");
                return PipelineOutcome::ReadFailed;
            }
        };
        if read == buf.len() {
            tracing::debug!(bytes = read, "Request filled the read buffer; remainder ignored");
        }

        let start = Instant::now();
        let request = HttpRequest::parse(&buf[..read]);
        tracing::trace!(state = %ConnectionState::Parsed, method = %request.method, path = %request.path);

        let response = dispatch(self.handler.as_ref(), &request);
        tracing::trace!(state = %ConnectionState::Dispatched, status = %response.status);

        let bytes = response.to_bytes();
        if let Err(e) = transport.write_all(&bytes).and_then(|()| transport.flush()) {
            tracing::warn!(error = %e, "Error sending response");
            return PipelineOutcome::WriteFailed;
        }

        let status = response.status.as_u16();
        metrics::record_request(&request.method, status, start);
        tracing::debug!(
            state = %ConnectionState::Responded,
            status,
            bytes = bytes.len(),
            "Response written"
        );
        PipelineOutcome::Responded(status)
    }
}

/// One read, retried only if a signal interrupted it before any data arrived.
fn read_once(transport: &mut Transport, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match transport.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    fn echo_pipeline(tls: Option<TlsContext>, timeouts: IoTimeouts) -> ConnectionPipeline {
        let handler = |request: &HttpRequest| HttpResponse::ok(request.path.clone());
        ConnectionPipeline::new(tls, Arc::new(handler), 1024, timeouts)
    }

    /// Run `client` against one accepted connection served by `pipeline`.
    fn serve_one<R: Send + 'static>(
        pipeline: ConnectionPipeline,
        client: impl FnOnce(TcpStream) -> R + Send + 'static,
    ) -> (PipelineOutcome, R) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || client(TcpStream::connect(addr).unwrap()));

        let (stream, peer) = listener.accept().unwrap();
        let outcome = pipeline.run(Connection::new(stream, peer));
        (outcome, client.join().unwrap())
    }

    fn read_all(stream: &mut TcpStream) -> String {
        let mut out = String::new();
        let _ = stream.read_to_string(&mut out);
        out
    }

    #[test]
    fn plain_request_is_answered_and_closed() {
        let (outcome, response) = serve_one(echo_pipeline(None, IoTimeouts::default()), |mut stream| {
            stream.write_all(b"GET /hello HTTP/1.1\r\n\r\n").unwrap();
            read_all(&mut stream)
        });

        assert_eq!(outcome, PipelineOutcome::Responded(200));
        assert_eq!(response, "HTTP/1.1 200 OK\r\n\r\n/hello");
    }

    #[test]
    fn empty_connection_is_peer_closed() {
        let (outcome, response) = serve_one(echo_pipeline(None, IoTimeouts::default()), |mut stream| {
            stream.shutdown(Shutdown::Write).unwrap();
            read_all(&mut stream)
        });

        assert_eq!(outcome, PipelineOutcome::PeerClosed);
        assert!(response.is_empty());
    }

    #[test]
    fn silent_client_hits_read_deadline() {
        let timeouts = IoTimeouts {
            read: Some(Duration::from_millis(50)),
            write: None,
        };
        let (outcome, _) = serve_one(echo_pipeline(None, timeouts), |mut stream| {
            // Keep the connection open without sending until the server gives up.
            read_all(&mut stream)
        });

        assert_eq!(outcome, PipelineOutcome::ReadFailed);
    }

    #[test]
    fn plaintext_client_fails_tls_handshake() {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(generated.signing_key.serialize_der()));
        let context = TlsContext::from_der(vec![generated.cert.der().clone()], key).unwrap();

        let (outcome, _) = serve_one(echo_pipeline(Some(context), IoTimeouts::default()), |mut stream| {
            stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
            read_all(&mut stream)
        });

        assert_eq!(outcome, PipelineOutcome::HandshakeFailed);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(PipelineOutcome::Responded(404).label(), "responded");
        assert_eq!(PipelineOutcome::PeerClosed.label(), "peer_closed");
        assert_eq!(PipelineOutcome::HandshakeFailed.label(), "handshake_failed");
    }
}
