//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size, buffer size, backlog, timeouts)
//! - Require TLS material when TLS is enabled
//! - Check that both listen addresses (server, metrics) parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the listener is bound

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.backlog must be positive (got {0})")]
    Backlog(i32),

    #[error("listener.tls.cert_path is required when TLS is enabled")]
    MissingCertificatePath,

    #[error("listener.tls.key_path is required when TLS is enabled")]
    MissingKeyPath,

    #[error("workers.pool_size must be at least 1")]
    PoolSize,

    #[error("limits.read_buffer_size must be at least 1")]
    ReadBufferSize,

    #[error("timeouts.{0} must be greater than zero when set")]
    ZeroTimeout(&'static str),

    #[error("accept.base_delay_ms must not exceed accept.max_delay_ms")]
    BackoffRange,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Render a list of problems as one line.
pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.backlog <= 0 {
        errors.push(ValidationError::Backlog(config.listener.backlog));
    }

    let tls = &config.listener.tls;
    if tls.enabled {
        if tls.cert_path.is_none() {
            errors.push(ValidationError::MissingCertificatePath);
        }
        if tls.key_path.is_none() {
            errors.push(ValidationError::MissingKeyPath);
        }
    }

    if config.workers.pool_size == 0 {
        errors.push(ValidationError::PoolSize);
    }
    if config.limits.read_buffer_size == 0 {
        errors.push(ValidationError::ReadBufferSize);
    }

    if config.timeouts.read_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("read_secs"));
    }
    if config.timeouts.write_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("write_secs"));
    }

    if config.accept.retry_enabled && config.accept.base_delay_ms > config.accept.max_delay_ms {
        errors.push(ValidationError::BackoffRange);
    }

    let metrics_address = &config.observability.metrics_address;
    if metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
