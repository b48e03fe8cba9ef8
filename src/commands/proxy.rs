//! `proxy` and `docker` commands

use log::{debug, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};

use super::{host_name, Context};
use crate::api::Host;
use crate::common::{ListenUrl, ProxyError, Result};
use crate::proxy::{DockerProvider, Proxy};
use crate::tls::{create_tls_connector, get_cert_fingerprint, get_cert_subject};

const SOCKET_DIR_PREFIX: &str = "orchard-";
const SOCKET_NAME: &str = "orchard.sock";

/// Log which client certificate a host connection will present
fn log_client_cert(host_name: &str, cert_pem: &[u8]) {
    match (get_cert_subject(cert_pem), get_cert_fingerprint(cert_pem)) {
        (Ok(subject), Ok(fingerprint)) => {
            debug!("Client certificate for {}: {} (SHA-256 {})", host_name, subject, fingerprint)
        }
        (Err(e), _) | (_, Err(e)) => debug!("Unreadable client certificate for {}: {}", host_name, e),
    }
}

/// Build the provider that forwards `listen` to `host`'s Docker daemon
fn make_provider(ctx: &Context, host: &Host, listen: ListenUrl) -> Result<DockerProvider> {
    if !host.has_credentials() {
        return Err(ProxyError::Certificate(format!(
            "Host '{}' has no client certificate", host.name
        )));
    }
    if host.ip_address.is_empty() {
        return Err(ProxyError::Other(format!("Host '{}' has no IP address yet", host.name)));
    }

    let config = &ctx.config;
    let connector = create_tls_connector(
        &config.ca_cert,
        host.client_cert.as_bytes(),
        host.client_key.as_bytes(),
    )?;
    log_client_cert(&host.name, host.client_cert.as_bytes());

    let address = format!("{}:{}", host.ip_address, config.docker_port);
    Ok(DockerProvider::new(
        listen,
        address,
        host.ip_address.clone(),
        connector,
        config.connection_timeout(),
    ))
}

/// Run `callback` while a proxy to `host_name`'s Docker daemon is up
///
/// The proxy listens on `listen_url`, or on a Unix socket in a fresh
/// temporary directory when none is given. `callback` receives the URL to
/// use as `DOCKER_HOST`. The proxy is stopped once the callback returns,
/// whatever its outcome.
///
/// # Errors
///
/// Returns an error if the host cannot be fetched, the TLS configuration
/// cannot be built, the proxy fails to start, or the callback fails.
pub async fn with_docker_proxy<F, Fut>(
    ctx: &Context,
    listen_url: Option<&str>,
    host_name: &str,
    callback: F,
) -> Result<()>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let host = ctx.get_host(host_name).await?;

    // Kept alive until the proxy is stopped, then removed with the socket
    let mut socket_dir = None;
    let listen = match listen_url {
        Some(url) => ListenUrl::parse(url)?,
        None => {
            let dir = tempfile::Builder::new()
                .prefix(SOCKET_DIR_PREFIX)
                .tempdir_in("/tmp")?;
            let url = ListenUrl::unix(dir.path().join(SOCKET_NAME));
            socket_dir = Some(dir);
            url
        }
    };

    let provider = make_provider(ctx, &host, listen)?;
    debug!("Forwarding to {} at {}", host.name, provider.address());

    let proxy = Arc::new(Proxy::new(provider).with_buffer_size(ctx.config.buffer_size));
    let task = tokio::spawn({
        let proxy = Arc::clone(&proxy);
        async move { proxy.start().await }
    });

    if let Err(e) = proxy.ready().await {
        proxy.stop();
        let _ = task.await;
        return Err(ProxyError::Other(format!("Error starting proxy: {}", e)));
    }

    let url = proxy
        .local_url()
        .ok_or_else(|| ProxyError::Other("Proxy started without a listener".to_string()))?;
    let result = callback(url).await;

    proxy.stop();
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Proxy ended with error: {}", e),
        Err(e) => warn!("Proxy task failed: {}", e),
    }
    drop(socket_dir);

    result
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

/// `proxy [-H HOST] [LISTEN_URL]`
pub async fn run_proxy(ctx: &Context, host: Option<&str>, listen_url: Option<&str>) -> Result<()> {
    with_docker_proxy(ctx, listen_url, &host_name(host), |url| async move {
        println!("Started proxy. Use it by setting your Docker host:\nexport DOCKER_HOST={}", url);
        wait_for_shutdown().await?;
        println!("\nStopping proxy");
        Ok(())
    })
    .await
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Locate `docker` on `PATH`
pub fn find_docker() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join("docker"))
        .find(|candidate| is_executable(candidate))
}

/// `docker [-H HOST] [ARGS...]`
pub async fn run_docker(ctx: &Context, host: Option<&str>, args: &[String]) -> Result<()> {
    let docker = find_docker().ok_or_else(|| {
        ProxyError::Other("Could not find `docker` on your PATH. Please install it.".to_string())
    })?;

    with_docker_proxy(ctx, None, &host_name(host), |url| async move {
        debug!("Running {} {:?} with DOCKER_HOST={}", docker.display(), args, url);
        let status = Command::new(&docker)
            .args(args)
            .env("DOCKER_HOST", &url)
            .status()
            .await?;

        if !status.success() {
            return Err(ProxyError::Other("Docker exited with error".to_string()));
        }
        Ok(())
    })
    .await
}
