//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Load a PEM certificate chain and private key from disk
//! - Verify that the key belongs to the leaf certificate
//! - Build the shared, read-only server context used by every handshake
//! - Create a fresh server session per accepted connection

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::{InconsistentKeys, ServerConfig, ServerConnection};
use thiserror::Error;

/// Errors raised while building the TLS context.
///
/// Every variant is fatal to startup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("TLS enabled but no certificate file provided")]
    MissingCertificatePath,

    #[error("TLS enabled but no private key file provided")]
    MissingKeyPath,

    #[error("Failed to read certificate file {path:?}: {source}")]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("Failed to read private key file {path:?}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("Private key does not match certificate")]
    KeyMismatch,

    #[error("Failed to create TLS context: {0}")]
    Context(#[from] rustls::Error),
}

/// Shared server-side TLS context.
///
/// Cloning is cheap; all clones refer to the same loaded certificate and key.
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ServerConfig>,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext").finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Load the certificate chain and private key and build the context.
    pub fn load(cert_path: Option<&Path>, key_path: Option<&Path>) -> Result<Self, TlsError> {
        let cert_path = cert_path.ok_or(TlsError::MissingCertificatePath)?;
        let key_path = key_path.ok_or(TlsError::MissingKeyPath)?;

        let certs = load_certs(cert_path)?;
        let key = load_private_key(key_path)?;
        let context = Self::from_der(certs, key)?;

        tracing::debug!(cert = ?cert_path, key = ?key_path, "TLS context loaded");
        Ok(context)
    }

    /// Build the context from already-parsed certificate and key material.
    pub fn from_der(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        check_key_pair(&provider, &certs, &key)?;

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| match e {
                rustls::Error::InconsistentKeys(InconsistentKeys::KeyMismatch) => TlsError::KeyMismatch,
                other => TlsError::Context(other),
            })?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Create a server session for one connection.
    pub fn new_session(&self) -> Result<ServerConnection, rustls::Error> {
        ServerConnection::new(Arc::clone(&self.config))
    }
}

/// Reject a private key whose public half differs from the leaf certificate's.
fn check_key_pair(
    provider: &CryptoProvider,
    certs: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> Result<(), TlsError> {
    let signing_key = provider.key_provider.load_private_key(key.clone_key())?;
    let certified = CertifiedKey::new(certs.to_vec(), signing_key);

    match certified.keys_match() {
        Ok(()) => Ok(()),
        // The provider could not expose the public key; rustls re-checks during setup.
        Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => Ok(()),
        Err(rustls::Error::InconsistentKeys(InconsistentKeys::KeyMismatch)) => Err(TlsError::KeyMismatch),
        Err(other) => Err(TlsError::Context(other)),
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let read_err = |source| TlsError::CertificateRead {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let read_err = |source| TlsError::KeyRead {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(read_err)?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}
