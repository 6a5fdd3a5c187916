//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() → latch flag + wake workers → wake acceptor → join workers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → StopHandle::stop()
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting, drain the queue, join workers
//! - In-flight connections finish; blocking calls are never interrupted

pub mod shutdown;
pub mod signals;

pub use shutdown::{ShutdownCoordinator, StopHandle};
pub use signals::spawn_signal_listener;
