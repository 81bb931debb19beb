//! TLS configuration and certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("TLS_CRT is not defined or empty")]
    MissingCertificate,

    #[error("TLS_KEY is not defined or empty")]
    MissingKey,

    #[error("failed to load TLS material: {0}")]
    Io(#[from] io::Error),
}

/// Load PEM certificate and key named by the TLS configuration.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    if config.cert_path.trim().is_empty() {
        return Err(TlsError::MissingCertificate);
    }
    if config.key_path.trim().is_empty() {
        return Err(TlsError::MissingKey);
    }

    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);
    if !cert_path.exists() {
        return Err(TlsError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        )));
    }
    if !key_path.exists() {
        return Err(TlsError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        )));
    }

    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}
