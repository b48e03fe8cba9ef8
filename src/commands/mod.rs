//! Command implementations
//!
//! Each subcommand of the binary maps to one `run_*` function here. They
//! print user-facing output themselves and return errors for `main` to
//! report.

mod hosts;
mod proxy;

pub use hosts::{render_hosts_table, run_create_host, run_hosts, run_ip, run_remove_host};
pub use proxy::{find_docker, run_docker, run_proxy, with_docker_proxy};

use crate::api::{ApiClient, Host};
use crate::auth;
use crate::common::{capitalize, ProxyError, Result};
use crate::config::defaults::DEFAULT_HOST_NAME;
use crate::config::ClientConfig;

/// State shared by all commands
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration
    pub config: ClientConfig,
}

impl Context {
    /// Create a context from a loaded configuration
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// An authenticated API client
    pub async fn api_client(&self) -> Result<ApiClient> {
        auth::authenticate(&self.config).await
    }

    /// Fetch a host, turning "not found" into a helpful message
    pub async fn get_host(&self, host_name: &str) -> Result<Host> {
        let client = self.api_client().await?;
        match client.get_host(host_name).await {
            Ok(host) => Ok(host),
            Err(e) if e.api_body_contains("Not found") => Err(ProxyError::Other(format!(
                "{} doesn't seem to be running.\nYou can create it with `orchard hosts create {}`.",
                capitalize(&human_host_name(host_name)),
                host_name
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Host name from an optional argument, falling back to `default`
pub fn host_name(arg: Option<&str>) -> String {
    match arg {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_HOST_NAME.to_string(),
    }
}

/// How a host is referred to in messages
pub fn human_host_name(host_name: &str) -> String {
    if host_name == DEFAULT_HOST_NAME {
        "default host".to_string()
    } else {
        format!("host '{}'", host_name)
    }
}
