//! Certificate helpers
//!
//! Used for logging which client certificate a host connection presents.

use openssl::hash::MessageDigest;
use openssl::x509::{X509NameRef, X509};

use crate::common::{ProxyError, Result};

fn format_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| "<binary>".to_string());
            format!("{}={}", key, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get the subject of a PEM certificate, e.g. `CN=client, O=orchard`
///
/// # Errors
///
/// Returns an error if the data is not a PEM certificate.
pub fn get_cert_subject(cert_pem: &[u8]) -> Result<String> {
    let cert = X509::from_pem(cert_pem)
        .map_err(|e| ProxyError::Certificate(format!("Failed to parse certificate: {}", e)))?;
    Ok(format_name(cert.subject_name()))
}

/// Get the SHA-256 fingerprint of a PEM certificate as colon-separated hex
///
/// # Errors
///
/// Returns an error if the data is not a PEM certificate.
pub fn get_cert_fingerprint(cert_pem: &[u8]) -> Result<String> {
    let cert = X509::from_pem(cert_pem)
        .map_err(|e| ProxyError::Certificate(format!("Failed to parse certificate: {}", e)))?;
    let digest = cert.digest(MessageDigest::sha256())?;

    Ok(digest
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
