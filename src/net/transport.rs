//! Byte transport for one connection: raw TCP or TLS over TCP.
//!
//! The TLS session is created at handshake time, owned by the transport and
//! dropped with it. Nothing outside the pipeline that created it can reach it.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use rustls::{ServerConnection, StreamOwned};
use thiserror::Error;

use crate::net::tls::TlsContext;

/// Why a TLS handshake did not complete.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("failed to create TLS session: {0}")]
    Session(#[from] rustls::Error),

    #[error("TLS handshake failed: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the connection during the TLS handshake")]
    Eof,
}

/// A connected stream, optionally wrapped in TLS.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(stream) => f.debug_tuple("Plain").field(stream).finish(),
            Transport::Tls(tls) => f.debug_tuple("Tls").field(&tls.sock).finish(),
        }
    }
}

impl Transport {
    /// Use the socket as is.
    pub fn plain(stream: TcpStream) -> Self {
        Transport::Plain(stream)
    }

    /// Run a server-side handshake on `stream` using the shared context.
    ///
    /// On failure the socket is dropped (and therefore closed) before returning.
    pub fn handshake(mut stream: TcpStream, context: &TlsContext) -> Result<Self, HandshakeError> {
        let mut session = context.new_session()?;

        while session.is_handshaking() {
            let (read, written) = session.complete_io(&mut stream)?;
            if read == 0 && written == 0 {
                return Err(HandshakeError::Eof);
            }
        }

        Ok(Transport::Tls(Box::new(StreamOwned::new(session, stream))))
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Release the TLS session (sending close_notify) and the socket.
    pub fn close(self) {
        match self {
            Transport::Plain(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            Transport::Tls(mut tls) => {
                tls.conn.send_close_notify();
                let StreamOwned { conn, sock, .. } = &mut *tls;
                while conn.wants_write() {
                    if conn.write_tls(sock).is_err() {
                        break;
                    }
                }
                let _ = sock.shutdown(Shutdown::Both);
            }
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(tls) => tls.flush(),
        }
    }
}
