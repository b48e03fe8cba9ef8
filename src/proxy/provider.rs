//! Listen and dial providers
//!
//! The proxy never decides how sockets are created. It asks a [`Provider`]
//! for a listener once and for a destination connection once per accepted
//! client, which keeps transport and TLS details out of the relay logic.

use log::debug;
use openssl::ssl::SslConnector;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::time::timeout;
use tokio_openssl::SslStream;

use crate::common::{ListenUrl, ProxyError, Result};

/// A bound endpoint that yields inbound connections
pub trait Listener: Send + 'static {
    /// Connection type produced by [`Listener::accept`]
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next inbound connection
    ///
    /// Returns the connection and a printable description of the peer.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Conn, String)>> + Send;

    /// URL a client can use to reach this listener
    fn local_url(&self) -> String;
}

/// Factory for the two endpoints of a proxy
pub trait Provider: Send + Sync + 'static {
    /// Listener type returned by [`Provider::open_listener`]
    type Listener: Listener;
    /// Outbound connection type returned by [`Provider::open_destination`]
    type Destination: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Bind the local endpoint; called once per proxy start
    fn open_listener(&self) -> impl Future<Output = Result<Self::Listener>> + Send;

    /// Open a ready-to-use connection to the destination, past any handshake
    fn open_destination(&self) -> impl Future<Output = Result<Self::Destination>> + Send;
}

/// Local listener on a TCP address or a Unix-domain socket path
///
/// The socket file of a Unix listener is removed when the listener is dropped.
#[derive(Debug)]
pub enum LocalListener {
    /// TCP listener
    Tcp(TcpListener),
    /// Unix-domain stream listener and the path it is bound to
    Unix {
        /// Bound listener
        listener: UnixListener,
        /// Socket file
        path: PathBuf,
    },
}

impl LocalListener {
    /// Bind a listener for `url`
    ///
    /// For `tcp4` and `tcp6` only addresses of that family are considered.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be resolved or bound.
    pub async fn bind(url: &ListenUrl) -> Result<Self> {
        match url {
            ListenUrl::Tcp { scheme, addr } => {
                let mut last_err = None;
                for candidate in tokio::net::lookup_host(addr.as_str()).await? {
                    let family_ok = match scheme.as_str() {
                        "tcp4" => candidate.is_ipv4(),
                        "tcp6" => candidate.is_ipv6(),
                        _ => true,
                    };
                    if !family_ok {
                        continue;
                    }
                    match TcpListener::bind(candidate).await {
                        Ok(listener) => return Ok(LocalListener::Tcp(listener)),
                        Err(e) => {
                            debug!("Failed to bind {}: {}", candidate, e);
                            last_err = Some(e);
                        }
                    }
                }
                Err(match last_err {
                    Some(e) => ProxyError::Io(e),
                    None => ProxyError::Config(format!("No {} address found for {}", scheme, addr)),
                })
            }
            ListenUrl::Unix(path) => {
                let listener = UnixListener::bind(path)?;
                Ok(LocalListener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
        }
    }
}

impl Listener for LocalListener {
    type Conn = LocalStream;

    async fn accept(&mut self) -> io::Result<(LocalStream, String)> {
        match self {
            LocalListener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok((LocalStream::Tcp(stream), addr.to_string()))
            }
            LocalListener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                Ok((LocalStream::Unix(stream), format!("unix:{}", path.display())))
            }
        }
    }

    fn local_url(&self) -> String {
        match self {
            LocalListener::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => format!("tcp://{}", addr),
                Err(_) => "tcp://<unknown>".to_string(),
            },
            LocalListener::Unix { path, .. } => ListenUrl::unix(path.clone()).to_string(),
        }
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        if let LocalListener::Unix { path, .. } = self {
            if let Err(e) = std::fs::remove_file(&*path) {
                debug!("Could not remove socket file {}: {}", path.display(), e);
            }
        }
    }
}

/// Connection accepted by a [`LocalListener`]
#[derive(Debug)]
pub enum LocalStream {
    /// TCP connection
    Tcp(TcpStream),
    /// Unix-domain stream connection
    Unix(UnixStream),
}

impl AsyncRead for LocalStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            LocalStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for LocalStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            LocalStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            LocalStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    // Shuts down the write half only; the read half stays open.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            LocalStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Open a TCP connection to `address` and complete a TLS handshake on it
///
/// `domain` is used for SNI and certificate verification; an IP address is
/// matched against the certificate's IP SANs.
///
/// # Errors
///
/// Returns an error if the connection times out, fails, or the handshake
/// is rejected.
pub async fn connect_tls(
    address: &str,
    domain: &str,
    connector: &SslConnector,
    connect_timeout: Duration,
) -> Result<SslStream<TcpStream>> {
    let tcp = timeout(connect_timeout, TcpStream::connect(address))
        .await
        .map_err(|_| ProxyError::Io(io::Error::new(io::ErrorKind::TimedOut, "Connection timed out")))?
        .map_err(ProxyError::Io)?;
    tcp.set_nodelay(true)?;

    let ssl = connector.configure()?.into_ssl(domain)?;
    let mut stream = SslStream::new(ssl, tcp)?;

    timeout(connect_timeout, Pin::new(&mut stream).connect())
        .await
        .map_err(|_| ProxyError::TlsHandshake("Handshake timed out".to_string()))?
        .map_err(|e| ProxyError::TlsHandshake(e.to_string()))?;

    debug!("TLS handshake with {} successful", address);
    Ok(stream)
}

/// Provider used by the CLI: local socket in, TLS to a remote Docker daemon out
pub struct DockerProvider {
    listen: ListenUrl,
    address: String,
    domain: String,
    connector: SslConnector,
    connect_timeout: Duration,
}

impl DockerProvider {
    /// Create a provider listening on `listen` and dialing `address` over TLS
    pub fn new(
        listen: ListenUrl,
        address: impl Into<String>,
        domain: impl Into<String>,
        connector: SslConnector,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            listen,
            address: address.into(),
            domain: domain.into(),
            connector,
            connect_timeout,
        }
    }

    /// Remote `host:port` this provider dials
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Provider for DockerProvider {
    type Listener = LocalListener;
    type Destination = SslStream<TcpStream>;

    async fn open_listener(&self) -> Result<LocalListener> {
        LocalListener::bind(&self.listen).await
    }

    async fn open_destination(&self) -> Result<SslStream<TcpStream>> {
        connect_tls(&self.address, &self.domain, &self.connector, self.connect_timeout).await
    }
}
