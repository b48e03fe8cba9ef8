//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is the single source of truth for defaults.

use std::env;
use std::path::PathBuf;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "ORCHARD_";

/// Environment variable naming an alternative configuration file
pub const CONFIG_FILE_ENV: &str = "ORCHARD_CONFIG_FILE";

/// Default API base URL
pub const API_URL_STR: &str = "https://orchardup.com/api/v2";

/// Default trusted CA bundle for host certificates
pub const CA_CERT_PATH_STR: &str = "orchard-certs.pem";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Name of the per-user state directory under `$HOME`
pub const STATE_DIR: &str = ".orchard";

/// Host used when none is named on the command line
pub const DEFAULT_HOST_NAME: &str = "default";

/// Port the Docker daemon listens on for TLS connections
pub const DOCKER_PORT: u16 = 4243;

/// Valid sizes shown in help and error messages
pub const VALID_SIZES: &str = "512M, 1G, 2G, 4G and 8G";

/// Default size of a new host
pub const HOST_SIZE_STR: &str = "512M";

fn home_dir() -> PathBuf {
    env::var_os("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Per-user state directory (`$HOME/.orchard`)
pub fn state_dir() -> PathBuf {
    home_dir().join(STATE_DIR)
}

/// Default configuration file path
pub fn config_file() -> PathBuf {
    state_dir().join("config.json")
}

/// Default API base URL
pub fn api_url() -> String {
    API_URL_STR.to_string()
}

/// Default directory for cached API tokens
pub fn token_dir() -> PathBuf {
    state_dir().join("api_tokens")
}

/// Default CA bundle path
pub fn ca_cert_path() -> PathBuf {
    PathBuf::from(CA_CERT_PATH_STR)
}

/// Default Docker daemon port
pub fn docker_port() -> u16 {
    DOCKER_PORT
}

/// Default connection timeout in seconds
pub fn connection_timeout() -> u64 {
    30
}

/// Default buffer size (8KB)
pub fn buffer_size() -> usize {
    8192
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}
