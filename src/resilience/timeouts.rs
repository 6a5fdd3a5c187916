//! Per-operation socket deadlines.
//!
//! # Design Decisions
//! - Applied as socket read/write timeouts, so they also bound the TLS
//!   handshake, which is made of socket reads and writes
//! - Absent deadlines block indefinitely
//! - A timed-out operation surfaces as an I/O error and closes the connection

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Read and write deadlines for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoTimeouts {
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

impl IoTimeouts {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            read: config.read(),
            write: config.write(),
        }
    }

    /// Install the deadlines on `stream`.
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(self.read)?;
        stream.set_write_timeout(self.write)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn read_deadline_interrupts_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();

        let timeouts = IoTimeouts {
            read: Some(Duration::from_millis(50)),
            write: None,
        };
        timeouts.apply(&server_side).unwrap();

        let mut buf = [0u8; 8];
        let err = server_side.read(&mut buf).unwrap_err();
        assert!(matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut));
    }

    #[test]
    fn defaults_block_indefinitely() {
        let timeouts = IoTimeouts::from_config(&TimeoutConfig::default());
        assert_eq!(timeouts, IoTimeouts::default());
    }
}
