//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pooled_httpd::config::ServerConfig;
use pooled_httpd::http::{HttpRequest, HttpResponse, MemoryContent, RequestHandler, SiteHandler};
use pooled_httpd::{Server, ServerError, StopHandle};
use tempfile::TempDir;

pub const HOME_PAGE: &str = "<h1>Welcome home</h1>";
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Config bound to an ephemeral loopback port.
pub fn test_config(workers: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.workers.pool_size = workers;
    config
}

/// The default site handler serving [`HOME_PAGE`] at `/`.
pub fn site_handler() -> SiteHandler<MemoryContent> {
    let mut pages = BTreeMap::new();
    pages.insert("/".to_string(), "myHomePage.html".to_string());
    SiteHandler::new(pages, MemoryContent::new().with_page("myHomePage.html", HOME_PAGE))
}

/// A server whose accept loop runs on a background thread.
pub struct TestServer {
    pub server: Arc<Server>,
    pub addr: SocketAddr,
    accept_thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    pub fn start<H: RequestHandler>(config: ServerConfig, handler: H) -> Self {
        let server = Arc::new(Server::bind(&config, handler).expect("server should bind"));
        let addr = server.local_addr();

        let runner = Arc::clone(&server);
        let accept_thread = thread::Builder::new()
            .name("acceptor".to_string())
            .spawn(move || runner.run())
            .expect("spawn acceptor");

        Self {
            server,
            addr,
            accept_thread: Some(accept_thread),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.server.stop_handle()
    }

    /// Stop the server and return what `run` returned.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        self.server.stop();
        self.accept_thread
            .take()
            .expect("accept thread present")
            .join()
            .expect("accept thread panicked")
    }

    /// Poll until `n` connections are waiting in the queue.
    pub fn wait_for_queued(&self, n: usize) {
        wait_until(|| self.server.queued() >= n, "connections to be queued");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(thread) = self.accept_thread.take() {
            self.server.stop();
            let _ = thread.join();
        }
    }
}

pub fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + IO_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Connect with generous timeouts.
pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    stream.set_write_timeout(Some(IO_TIMEOUT)).unwrap();
    stream
}

/// Read until the server closes the connection.
pub fn read_response(stream: &mut impl Read) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // A peer that closes without close_notify (or resets) still ends the response.
            Err(e) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset) => break,
            Err(e) => panic!("read failed: {e}"),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Send raw bytes and read the whole response.
pub fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = connect(addr);
    stream.write_all(request).expect("write request");
    read_response(&mut stream)
}

pub fn get(addr: SocketAddr, path: &str) -> String {
    send_raw(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes(),
    )
}

/// Connect and close the write half without sending anything.
pub fn connect_and_hang_up(addr: SocketAddr) -> String {
    let mut stream = connect(addr);
    stream.shutdown(Shutdown::Write).expect("half-close");
    read_response(&mut stream)
}

pub fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or("")
}

pub fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

/// Handler that counts invocations and echoes the path.
#[derive(Clone, Default)]
pub struct CountingHandler {
    pub calls: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RequestHandler for CountingHandler {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HttpResponse::ok(request.path.clone())
    }
}

/// Handler that blocks every request until the gate is opened.
#[derive(Clone, Default)]
pub struct GatedHandler {
    pub open: Arc<AtomicBool>,
    pub entered: Arc<AtomicUsize>,
}

impl GatedHandler {
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

impl RequestHandler for GatedHandler {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self.entered.fetch_add(1, Ordering::SeqCst);
        while !self.open.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(2));
        }
        HttpResponse::ok(request.path.clone())
    }
}

/// A self-signed certificate for `localhost` written to PEM files.
pub struct TestCertificate {
    pub der: rustls::pki_types::CertificateDer<'static>,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    _dir: TempDir,
}

pub fn write_self_signed() -> TestCertificate {
    let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, generated.cert.pem()).unwrap();
    std::fs::write(&key_path, generated.signing_key.serialize_pem()).unwrap();

    TestCertificate {
        der: generated.cert.der().clone(),
        cert_path,
        key_path,
        _dir: dir,
    }
}

/// Client config trusting exactly `cert`.
pub fn client_config(cert: &TestCertificate) -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert.der.clone()).unwrap();

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_root_certificates(roots)
    .with_no_client_auth();
    Arc::new(config)
}

/// Send `request` over TLS and read the whole response.
pub fn send_tls(addr: SocketAddr, cert: &TestCertificate, request: &[u8]) -> String {
    let name = rustls::pki_types::ServerName::try_from("localhost").unwrap();
    let session = rustls::ClientConnection::new(client_config(cert), name).unwrap();
    let mut stream = rustls::StreamOwned::new(session, connect(addr));
    stream.write_all(request).expect("TLS write");
    stream.flush().expect("TLS flush");
    read_response(&mut stream)
}
