//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! accept failure
//!     → backoff.rs (AcceptRetry: retry with exponential backoff, or give up)
//!
//! per connection
//!     → timeouts.rs (read/write deadlines installed before the handshake)
//! ```
//!
//! # Design Decisions
//! - Both are off by default; the accept loop ends on its first failure and
//!   connection I/O blocks until the peer acts

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, AcceptRetry};
pub use timeouts::IoTimeouts;
