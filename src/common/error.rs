//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use thiserror::Error;
use std::io;

/// Orchard error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// TLS handshake error
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Certificate error
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Malformed listen URL
    #[error("{0}")]
    InvalidUrl(String),

    /// HTTP transport error talking to the API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API
    #[error("erroneous API response ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Listener failed while the proxy was accepting connections
    #[error("Error accepting connection: {0}")]
    Accept(io::Error),

    /// `start` was called more than once on the same proxy
    #[error("Proxy has already been started")]
    AlreadyStarted,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    /// Whether this is an API error whose body mentions `needle`
    ///
    /// The host API reports conflicts and validation failures only in the
    /// response text, so callers match on it to print friendlier messages.
    pub fn api_body_contains(&self, needle: &str) -> bool {
        matches!(self, ProxyError::Api { body, .. } if body.contains(needle))
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let proxy_err: ProxyError = io_err.into();

        match proxy_err {
            ProxyError::Io(_) => {}
            _ => panic!("Should convert to IO error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ProxyError::Config("Invalid configuration".to_string());
        assert!(err.to_string().contains("Invalid configuration"));

        let err = ProxyError::InvalidUrl("Invalid URL: \"foo\"".to_string());
        assert_eq!(err.to_string(), "Invalid URL: \"foo\"");
    }

    #[test]
    fn test_api_body_contains() {
        let err = ProxyError::Api { status: 400, body: "Host already exists".to_string() };
        assert!(err.api_body_contains("already exists"));
        assert!(!err.api_body_contains("Not found"));
        assert!(!ProxyError::Other("already exists".to_string()).api_body_contains("already exists"));
    }
}
