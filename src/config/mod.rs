//! Configuration module
//!
//! This module handles application configuration, including loading from
//! different sources (files, environment variables, command line arguments)
//! and validating the configuration.

pub mod defaults;
mod loader;

pub use self::defaults::ENV_PREFIX;
pub use self::loader::ConfigLoader;

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::common::{ProxyError, Result};

/// Client configuration
///
/// Contains everything the command-line client needs to talk to the host
/// API and to reach a host's Docker daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the host management API
    pub api_url: String,

    /// Directory holding cached API tokens
    pub token_dir: PathBuf,

    /// Trusted CA bundle used to verify host certificates
    pub ca_cert: PathBuf,

    /// Port of the Docker daemon on each host
    pub docker_port: u16,

    /// Connection timeout in seconds, for both TCP connect and TLS handshake
    pub connection_timeout: u64,

    /// Buffer size for data transfer (in bytes)
    pub buffer_size: usize,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            token_dir: defaults::token_dir(),
            ca_cert: defaults::ca_cert_path(),
            docker_port: defaults::docker_port(),
            connection_timeout: defaults::connection_timeout(),
            buffer_size: defaults::buffer_size(),
            log_level: defaults::log_level(),
        }
    }
}

impl ClientConfig {
    /// Connection timeout as a `Duration`
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    /// Check that all values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] naming the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(ProxyError::Config("api_url must not be empty".to_string()));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ProxyError::Config(format!(
                "api_url must be an http(s) URL, got {}", self.api_url
            )));
        }
        if self.docker_port == 0 {
            return Err(ProxyError::Config("docker_port must not be 0".to_string()));
        }
        if self.connection_timeout == 0 {
            return Err(ProxyError::Config("connection_timeout must be at least 1 second".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(ProxyError::Config("buffer_size must not be 0".to_string()));
        }
        Ok(())
    }

    /// Log the effective configuration at debug level
    pub fn log(&self) {
        debug!("api_url: {}", self.api_url);
        debug!("token_dir: {}", self.token_dir.display());
        debug!("ca_cert: {}", self.ca_cert.display());
        debug!("docker_port: {}", self.docker_port);
        debug!("connection_timeout: {}s", self.connection_timeout);
        debug!("buffer_size: {}", self.buffer_size);
        debug!("log_level: {}", self.log_level);
    }
}
