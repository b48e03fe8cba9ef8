//! TLS connector creation for host connections
//!
//! Each host hands out its own client certificate and key. The server side
//! is verified against a pinned CA bundle only; system roots are not trusted.

use log::debug;
use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use std::fs;
use std::path::Path;

use crate::common::{ProxyError, Result};

/// Create a TLS connector for a host's Docker daemon
///
/// # Parameters
///
/// * `ca_cert_path` - PEM bundle of trusted certificate authorities
/// * `client_cert_pem` - Client certificate issued for the host
/// * `client_key_pem` - Private key matching `client_cert_pem`
///
/// # Errors
///
/// Returns [`ProxyError::Certificate`] if the bundle cannot be read or holds
/// no certificates, or if the client certificate and key do not parse or do
/// not match.
pub fn create_tls_connector(
    ca_cert_path: &Path,
    client_cert_pem: &[u8],
    client_key_pem: &[u8],
) -> Result<SslConnector> {
    let ca_pem = fs::read(ca_cert_path).map_err(|e| {
        ProxyError::Certificate(format!("Failed to read CA bundle {}: {}", ca_cert_path.display(), e))
    })?;

    let mut connector = SslConnector::builder(SslMethod::tls_client())?;

    // Replace the default store so only the pinned authorities are trusted
    connector.set_cert_store(build_store(&ca_pem)?);

    let cert = X509::from_pem(client_cert_pem)
        .map_err(|e| ProxyError::Certificate(format!("Invalid client certificate: {}", e)))?;
    let key = PKey::private_key_from_pem(client_key_pem)
        .map_err(|e| ProxyError::Certificate(format!("Invalid client key: {}", e)))?;

    connector.set_certificate(&cert)?;
    connector.set_private_key(&key)?;
    connector
        .check_private_key()
        .map_err(|_| ProxyError::Certificate("Client key does not match client certificate".to_string()))?;

    connector.set_verify(SslVerifyMode::PEER);

    debug!("TLS connector ready (CA bundle {})", ca_cert_path.display());
    Ok(connector.build())
}

fn build_store(ca_pem: &[u8]) -> Result<openssl::x509::store::X509Store> {
    let certs = X509::stack_from_pem(ca_pem)
        .map_err(|e| ProxyError::Certificate(format!("Invalid CA bundle: {}", e)))?;
    if certs.is_empty() {
        return Err(ProxyError::Certificate("CA bundle contains no certificates".to_string()));
    }

    let mut store = X509StoreBuilder::new()?;
    for cert in certs {
        store.add_cert(cert)?;
    }
    debug!("Loaded CA bundle into verification store");
    Ok(store.build())
}
