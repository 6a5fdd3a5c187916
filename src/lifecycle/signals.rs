//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or SIGTERM on a dedicated thread
//! - Call the injected `StopHandle` when one arrives
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe) on a small current-thread runtime
//! - The handle is passed in; there is no process-wide server pointer

use std::io;
use std::thread::{self, JoinHandle};

use crate::lifecycle::shutdown::StopHandle;

/// Spawn a thread that stops the server on the first termination signal.
pub fn spawn_signal_listener(handle: StopHandle) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            let signal = runtime.block_on(wait_for_signal());
            tracing::info!(signal, "Shutdown signal received, draining connections");
            handle.stop();
        })
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
