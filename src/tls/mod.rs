//! TLS handling module
//!
//! This module builds the client-side TLS configuration used to reach a
//! host's Docker daemon, and inspects the certificates involved.

mod cert;
mod connector;

pub use cert::{get_cert_fingerprint, get_cert_subject};
pub use connector::create_tls_connector;
