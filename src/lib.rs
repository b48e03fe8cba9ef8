//! Orchard: remote Docker hosts from the command line
//!
//! This library backs the `orchard` client. It manages Docker hosts through a
//! REST API and lets a local `docker` client talk to one of them through a
//! forwarding proxy.
//!
//! # Main Features
//!
//! - Connection-forwarding proxy from a local TCP or Unix socket to a TLS
//!   destination, with half-close propagation
//! - Mutually authenticated TLS against a pinned CA bundle
//! - Host management API client with cached sign-in tokens
//!
//! # Example
//!
//! ```no_run
//! use orchard::common::ListenUrl;
//! use orchard::proxy::DockerProvider;
//! use orchard::tls::create_tls_connector;
//! use orchard::{Proxy, Result};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cert = std::fs::read("client.crt")?;
//!     let key = std::fs::read("client.key")?;
//!     let connector = create_tls_connector(Path::new("orchard-certs.pem"), &cert, &key)?;
//!
//!     let provider = DockerProvider::new(
//!         ListenUrl::parse("tcp://127.0.0.1:2375")?,
//!         "203.0.113.10:4243",
//!         "203.0.113.10",
//!         connector,
//!         Duration::from_secs(30),
//!     );
//!
//!     let proxy = Arc::new(Proxy::new(provider));
//!     let task = tokio::spawn({
//!         let proxy = Arc::clone(&proxy);
//!         async move { proxy.start().await }
//!     });
//!     proxy.ready().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     proxy.stop();
//!     task.await.ok();
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod auth;
pub mod commands;
pub mod common;
pub mod config;
pub mod proxy;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{ProxyError, Result};
pub use proxy::{Provider, Proxy};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
