//! Proxy service module
//!
//! This module implements the connection-forwarding proxy: a [`Proxy`] owns a
//! listener obtained from a [`Provider`], accepts connections until stopped,
//! and relays each connection byte for byte to a destination connection from
//! the same provider. The relayed stream is never inspected.

pub mod server;
pub mod provider;
mod forwarder;

pub use server::Proxy;
pub use provider::{connect_tls, DockerProvider, Listener, LocalListener, LocalStream, Provider};
pub use forwarder::{forward_session, relay, RelayStats};
