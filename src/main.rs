//! pooled-httpd
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                       pooled-httpd                        │
//!   TCP connect      │  ┌──────────┐   ┌──────────┐   ┌───────────────────────┐ │
//!  ──────────────────┼─▶│ listener │──▶│ acceptor │──▶│ connection queue      │ │
//!                    │  └──────────┘   └──────────┘   │ (mutex + condvar)     │ │
//!                    │                                └──────────┬────────────┘ │
//!                    │                                           │ pop          │
//!                    │                     ┌─────────────────────┼────────────┐ │
//!                    │                     │ worker-0 … worker-N  ▼            │ │
//!   response, close  │                     │ TLS? → read → parse → handle →   │ │
//!  ◀─────────────────┼─────────────────────│ write → close                    │ │
//!                    │                     └──────────────────────────────────┘ │
//!                    │  signals ─▶ StopHandle::stop ─▶ drain queue, join workers │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use pooled_httpd::config::{read_config, validate_config, ConfigError, ServerConfig};
use pooled_httpd::http::SiteHandler;
use pooled_httpd::lifecycle::spawn_signal_listener;
use pooled_httpd::observability::{logging, metrics};
use pooled_httpd::Server;

#[derive(Parser)]
#[command(name = "pooled-httpd")]
#[command(about = "Thread-pooled HTTP/HTTPS server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Terminate TLS (requires --cert and --key unless set in the config file)
    #[arg(long)]
    tls: bool,

    /// Certificate chain (PEM)
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Private key (PEM)
    #[arg(long)]
    key: Option<PathBuf>,

    /// Directory the page files are read from
    #[arg(long)]
    site_root: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(workers) = self.workers {
            config.workers.pool_size = workers;
        }
        if self.tls {
            config.listener.tls.enabled = true;
        }
        if self.cert.is_some() {
            config.listener.tls.cert_path = self.cert;
        }
        if self.key.is_some() {
            config.listener.tls.key_path = self.key;
        }
        if let Some(root) = self.site_root {
            config.site.root = root;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("pooled-httpd v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        // Already checked by validate_config.
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let handler = SiteHandler::from_config(&config.site);
    let server = Server::bind(&config, handler)?;

    spawn_signal_listener(server.stop_handle())?;
    tracing::info!("Server started. Press Ctrl+C for graceful shutdown.");

    let result = server.run();
    server.stop();

    tracing::info!("Shutdown complete");
    result.map_err(Into::into)
}
