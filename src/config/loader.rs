//! Configuration loading functionality
//!
//! Sources are applied lowest to highest priority: defaults, then the JSON
//! configuration file, then `ORCHARD_*` environment variables. Command-line
//! overrides are applied by the binary afterwards.

use log::{debug, info, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::{ProxyError, Result};
use crate::config::defaults::{self, ENV_PREFIX};
use crate::config::ClientConfig;

/// Trait for loading configuration from different sources
pub trait ConfigLoader {
    /// Load configuration from a JSON file; missing keys take default values
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> where Self: Sized;

    /// Override values from variables returned by `lookup`
    ///
    /// `lookup` receives the full variable name, prefix included.
    fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>;

    /// Override values from the process environment
    fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| env::var(name).ok())
    }

    /// Load from defaults, the configuration file and the environment
    ///
    /// `config_file` overrides the file location; otherwise
    /// `ORCHARD_CONFIG_FILE` or `~/.orchard/config.json` is used. A missing
    /// default file is not an error; a missing explicit file is.
    fn load(config_file: Option<&Path>) -> Result<Self> where Self: Sized;
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        ProxyError::Config(format!("Invalid value for {}: {} ({})", name, value, e))
    })
}

impl ConfigLoader for ClientConfig {
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_display = path.display();

        let content = fs::read_to_string(path)
            .map_err(|e| ProxyError::Config(format!("Failed to read config file {}: {}", path_display, e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ProxyError::Config(format!("Failed to parse JSON config file {}: {}", path_display, e)))
    }

    fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |name: &str| -> Option<(String, String)> {
            let full_name = format!("{}{}", ENV_PREFIX, name);
            lookup(&full_name).map(|value| (full_name, value))
        };

        if let Some((_, value)) = get_env("API_URL") {
            self.api_url = value;
        }
        if let Some((_, value)) = get_env("TOKEN_DIR") {
            self.token_dir = PathBuf::from(value);
        }
        if let Some((_, value)) = get_env("CA_CERT") {
            self.ca_cert = PathBuf::from(value);
        }
        if let Some((name, value)) = get_env("DOCKER_PORT") {
            self.docker_port = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get_env("CONNECTION_TIMEOUT") {
            self.connection_timeout = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get_env("BUFFER_SIZE") {
            self.buffer_size = parse_env(&name, &value)?;
        }
        if let Some((_, value)) = get_env("LOG_LEVEL") {
            self.log_level = value;
        }

        Ok(())
    }

    fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        debug!("Starting with default configuration");

        let (path, explicit) = match config_file {
            Some(path) => (path.to_path_buf(), true),
            None => match env::var_os(defaults::CONFIG_FILE_ENV) {
                Some(path) => (PathBuf::from(path), true),
                None => (defaults::config_file(), false),
            },
        };

        if path.exists() {
            info!("Loading configuration from {}", path.display());
            config = Self::from_file(&path)?;
        } else if explicit {
            return Err(ProxyError::Config(format!("Configuration file not found: {}", path.display())));
        } else {
            debug!("No configuration file at {}", path.display());
        }

        config.apply_env()?;
        if config.api_url.ends_with('/') {
            warn!("Trailing slash removed from api_url {}", config.api_url);
            config.api_url = config.api_url.trim_end_matches('/').to_string();
        }

        config.validate()?;
        Ok(config)
    }
}
