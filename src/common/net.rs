//! Network utility functions
//!
//! Listen endpoints are given on the command line as URLs such as
//! `unix:///tmp/orchard.sock` or `tcp://localhost:1234`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::{ProxyError, Result};

/// Schemes accepted by [`ListenUrl::parse`]
pub const VALID_LISTEN_TYPES: &[&str] = &["tcp", "tcp4", "tcp6", "unix"];

/// A local endpoint the proxy can listen on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenUrl {
    /// TCP address (`host:port`), with the scheme it was given as
    Tcp {
        /// One of `tcp`, `tcp4`, `tcp6`
        scheme: String,
        /// Address to bind, resolved at bind time
        addr: String,
    },
    /// Unix-domain stream socket at a filesystem path
    Unix(PathBuf),
}

impl ListenUrl {
    /// Parse a `scheme://address` listen URL
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidUrl`] if the URL has no `://` separator,
    /// an unsupported scheme, or an empty address.
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, addr) = url
            .split_once("://")
            .ok_or_else(|| ProxyError::InvalidUrl(format!("Invalid URL: {:?}", url)))?;

        if !VALID_LISTEN_TYPES.contains(&scheme) {
            return Err(ProxyError::InvalidUrl(format!("Invalid URL type: {:?}", scheme)));
        }
        if addr.is_empty() {
            return Err(ProxyError::InvalidUrl(format!("Invalid URL: {:?}", url)));
        }

        Ok(match scheme {
            "unix" => ListenUrl::Unix(PathBuf::from(addr)),
            _ => ListenUrl::Tcp {
                scheme: scheme.to_string(),
                addr: addr.to_string(),
            },
        })
    }

    /// Build a URL for a Unix socket path
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        ListenUrl::Unix(path.into())
    }
}

impl FromStr for ListenUrl {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ListenUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenUrl::Tcp { scheme, addr } => write!(f, "{}://{}", scheme, addr),
            ListenUrl::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unix_url() {
        let url = ListenUrl::parse("unix:///tmp/orchard-1/orchard.sock").unwrap();
        assert_eq!(url, ListenUrl::Unix(PathBuf::from("/tmp/orchard-1/orchard.sock")));
        assert_eq!(url.to_string(), "unix:///tmp/orchard-1/orchard.sock");
    }

    #[test]
    fn test_parse_tcp_urls() {
        for scheme in ["tcp", "tcp4", "tcp6"] {
            let raw = format!("{}://localhost:1234", scheme);
            let url: ListenUrl = raw.parse().unwrap();
            assert_eq!(url.to_string(), raw);
            assert!(matches!(url, ListenUrl::Tcp { ref addr, .. } if addr == "localhost:1234"));
        }
    }

    #[test]
    fn test_parse_invalid_urls() {
        let err = ListenUrl::parse("localhost:1234").unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL: \"localhost:1234\"");

        let err = ListenUrl::parse("http://localhost:1234").unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL type: \"http\"");

        let err = ListenUrl::parse("unixpacket:///tmp/x.sock").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidUrl(_)));

        assert!(ListenUrl::parse("tcp://").is_err());
    }
}
