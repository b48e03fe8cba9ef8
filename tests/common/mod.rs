//! Shared helpers for integration tests
//!
//! Loopback providers, echo servers and a throwaway PKI.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{Ssl, SslAcceptor, SslMethod, SslVerifyMode};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509NameBuilder, X509};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_openssl::SslStream;

use orchard::common::ListenUrl;
use orchard::proxy::{Listener, LocalListener, Provider, Proxy};
use orchard::{ProxyError, Result};

/// Provider relaying to a plain TCP destination
pub struct TcpProvider {
    pub listen: ListenUrl,
    pub destination: SocketAddr,
}

impl TcpProvider {
    pub fn new(listen: &str, destination: SocketAddr) -> Self {
        Self {
            listen: ListenUrl::parse(listen).unwrap(),
            destination,
        }
    }
}

impl Provider for TcpProvider {
    type Listener = LocalListener;
    type Destination = TcpStream;

    async fn open_listener(&self) -> Result<LocalListener> {
        LocalListener::bind(&self.listen).await
    }

    async fn open_destination(&self) -> Result<TcpStream> {
        Ok(TcpStream::connect(self.destination).await?)
    }
}

/// Provider whose first `failures` dials fail
pub struct FlakyProvider {
    pub inner: TcpProvider,
    pub failures: usize,
    pub dials: AtomicUsize,
}

impl Provider for FlakyProvider {
    type Listener = LocalListener;
    type Destination = TcpStream;

    async fn open_listener(&self) -> Result<LocalListener> {
        self.inner.open_listener().await
    }

    async fn open_destination(&self) -> Result<TcpStream> {
        let dial = self.dials.fetch_add(1, Ordering::SeqCst);
        if dial < self.failures {
            return Err(ProxyError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "destination unavailable",
            )));
        }
        self.inner.open_destination().await
    }
}

/// Provider that can never listen
pub struct NoListenProvider;

impl Provider for NoListenProvider {
    type Listener = LocalListener;
    type Destination = TcpStream;

    async fn open_listener(&self) -> Result<LocalListener> {
        Err(ProxyError::Config("listening is disabled".to_string()))
    }

    async fn open_destination(&self) -> Result<TcpStream> {
        Err(ProxyError::Config("dialing is disabled".to_string()))
    }
}

/// Listener whose every accept fails with an unexpected error
pub struct BrokenListener;

impl Listener for BrokenListener {
    type Conn = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, String)> {
        Err(io::Error::new(io::ErrorKind::Other, "accept failed"))
    }

    fn local_url(&self) -> String {
        "tcp://broken".to_string()
    }
}

/// Provider that opens a [`BrokenListener`]
pub struct BrokenAcceptProvider;

impl Provider for BrokenAcceptProvider {
    type Listener = BrokenListener;
    type Destination = TcpStream;

    async fn open_listener(&self) -> Result<BrokenListener> {
        Ok(BrokenListener)
    }

    async fn open_destination(&self) -> Result<TcpStream> {
        Err(ProxyError::Config("dialing is disabled".to_string()))
    }
}

/// Spawn `start` and return the proxy with its task
pub fn spawn_proxy<P: Provider>(proxy: Proxy<P>) -> (Arc<Proxy<P>>, JoinHandle<Result<()>>) {
    let proxy = Arc::new(proxy);
    let task = tokio::spawn({
        let proxy = Arc::clone(&proxy);
        async move { proxy.start().await }
    });
    (proxy, task)
}

/// Address part of a `tcp://` URL
pub fn tcp_addr(url: &str) -> String {
    url.strip_prefix("tcp://").unwrap().to_string()
}

/// Echo server: every connection gets back what it sends, then a half-close
/// once the peer half-closes
pub async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });

    addr
}

/// Server that reads until end-of-stream, then answers with the byte count
/// and closes
pub async fn spawn_counting_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut received = Vec::new();
                if stream.read_to_end(&mut received).await.is_ok() {
                    let reply = format!("received {}", received.len());
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });
        }
    });

    addr
}

/// Deterministic test payload
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// A CA plus a server and a client certificate issued by it, all PEM
pub struct TestPki {
    pub ca_cert: Vec<u8>,
    pub server_cert: Vec<u8>,
    pub server_key: Vec<u8>,
    pub client_cert: Vec<u8>,
    pub client_key: Vec<u8>,
}

fn new_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn build_cert(
    common_name: &str,
    key: &PKey<Private>,
    issuer: Option<(&X509, &PKey<Private>)>,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();

    match issuer {
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
            builder
                .append_extension(KeyUsage::new().critical().key_cert_sign().crl_sign().build().unwrap())
                .unwrap();
            builder.sign(key, MessageDigest::sha256()).unwrap();
        }
        Some((ca_cert, ca_key)) => {
            builder.set_issuer_name(ca_cert.subject_name()).unwrap();
            builder.append_extension(BasicConstraints::new().build().unwrap()).unwrap();
            let san = SubjectAlternativeName::new()
                .ip("127.0.0.1")
                .dns("localhost")
                .build(&builder.x509v3_context(Some(ca_cert), None))
                .unwrap();
            builder.append_extension(san).unwrap();
            builder.sign(ca_key, MessageDigest::sha256()).unwrap();
        }
    }

    builder.build()
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = new_key();
        let ca = build_cert("Orchard Test CA", &ca_key, None);

        let server_key = new_key();
        let server = build_cert("127.0.0.1", &server_key, Some((&ca, &ca_key)));

        let client_key = new_key();
        let client = build_cert("orchard-client", &client_key, Some((&ca, &ca_key)));

        Self {
            ca_cert: ca.to_pem().unwrap(),
            server_cert: server.to_pem().unwrap(),
            server_key: server_key.private_key_to_pem_pkcs8().unwrap(),
            client_cert: client.to_pem().unwrap(),
            client_key: client_key.private_key_to_pem_pkcs8().unwrap(),
        }
    }

    /// Fresh key that matches none of the certificates
    pub fn unrelated_key() -> Vec<u8> {
        new_key().private_key_to_pem_pkcs8().unwrap()
    }

    /// Acceptor presenting the server certificate and requiring a client
    /// certificate issued by the CA
    pub fn acceptor(&self) -> SslAcceptor {
        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        acceptor
            .set_certificate(&X509::from_pem(&self.server_cert).unwrap())
            .unwrap();
        acceptor
            .set_private_key(&PKey::private_key_from_pem(&self.server_key).unwrap())
            .unwrap();
        acceptor.check_private_key().unwrap();
        acceptor
            .cert_store_mut()
            .add_cert(X509::from_pem(&self.ca_cert).unwrap())
            .unwrap();
        acceptor.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
        acceptor.build()
    }
}

/// TLS echo server on loopback; each read is written straight back
pub async fn spawn_tls_echo_server(acceptor: SslAcceptor) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = Arc::new(acceptor);

    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };
            let acceptor = Arc::clone(&acceptor);
            tokio::spawn(async move {
                let ssl = Ssl::new(acceptor.context()).unwrap();
                let mut stream = SslStream::new(ssl, tcp).unwrap();
                if Pin::new(&mut stream).accept().await.is_err() {
                    return;
                }

                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}
