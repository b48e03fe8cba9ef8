//! TLS connector and Docker provider tests against a loopback TLS server

mod common;

use std::fs;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use common::{spawn_proxy, spawn_tls_echo_server, tcp_addr, TestPki};
use orchard::common::ListenUrl;
use orchard::proxy::{connect_tls, DockerProvider, Proxy};
use orchard::tls::{create_tls_connector, get_cert_fingerprint, get_cert_subject};
use orchard::ProxyError;

const WAIT: Duration = Duration::from_secs(5);

fn write_ca(dir: &tempfile::TempDir, pki: &TestPki) -> std::path::PathBuf {
    let path = dir.path().join("ca.pem");
    fs::write(&path, &pki.ca_cert).unwrap();
    path
}

#[test]
fn test_connector_accepts_matching_credentials() {
    let pki = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    let ca = write_ca(&dir, &pki);

    assert!(create_tls_connector(&ca, &pki.client_cert, &pki.client_key).is_ok());
}

#[test]
fn test_connector_rejects_mismatched_key() {
    let pki = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    let ca = write_ca(&dir, &pki);

    let err = create_tls_connector(&ca, &pki.client_cert, &TestPki::unrelated_key()).unwrap_err();
    assert!(matches!(err, ProxyError::Certificate(_)));
}

#[test]
fn test_client_cert_identity() {
    let pki = TestPki::generate();

    let subject = get_cert_subject(&pki.client_cert).unwrap();
    assert_eq!(subject, "CN=orchard-client");

    let fingerprint = get_cert_fingerprint(&pki.client_cert).unwrap();
    assert_eq!(fingerprint.split(':').count(), 32);
    assert_ne!(fingerprint, get_cert_fingerprint(&pki.server_cert).unwrap());
}

#[tokio::test]
async fn test_connect_tls_handshake() {
    let pki = TestPki::generate();
    let server = spawn_tls_echo_server(pki.acceptor()).await;
    let dir = tempfile::tempdir().unwrap();
    let connector = create_tls_connector(&write_ca(&dir, &pki), &pki.client_cert, &pki.client_key).unwrap();

    let mut stream = connect_tls(&server.to_string(), "127.0.0.1", &connector, WAIT)
        .await
        .unwrap();
    stream.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    timeout(WAIT, stream.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf, b"hello");
}

#[tokio::test]
async fn test_connect_tls_rejects_untrusted_server() {
    let trusted = TestPki::generate();
    let other = TestPki::generate();
    let server = spawn_tls_echo_server(other.acceptor()).await;

    // Pinned to a CA that did not issue the server certificate
    let dir = tempfile::tempdir().unwrap();
    let connector =
        create_tls_connector(&write_ca(&dir, &trusted), &trusted.client_cert, &trusted.client_key).unwrap();

    let err = connect_tls(&server.to_string(), "127.0.0.1", &connector, WAIT)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::TlsHandshake(_)));
}

#[tokio::test]
async fn test_connect_tls_checks_server_address() {
    let pki = TestPki::generate();
    let server = spawn_tls_echo_server(pki.acceptor()).await;
    let dir = tempfile::tempdir().unwrap();
    let connector = create_tls_connector(&write_ca(&dir, &pki), &pki.client_cert, &pki.client_key).unwrap();

    // The server certificate is issued for 127.0.0.1, not this address
    let err = connect_tls(&server.to_string(), "10.1.2.3", &connector, WAIT)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::TlsHandshake(_)));
}

#[tokio::test]
async fn test_docker_provider_end_to_end() {
    let pki = TestPki::generate();
    let server = spawn_tls_echo_server(pki.acceptor()).await;
    let dir = tempfile::tempdir().unwrap();
    let connector = create_tls_connector(&write_ca(&dir, &pki), &pki.client_cert, &pki.client_key).unwrap();

    let provider = DockerProvider::new(
        ListenUrl::parse("tcp://127.0.0.1:0").unwrap(),
        server.to_string(),
        "127.0.0.1",
        connector,
        WAIT,
    );
    let (proxy, task) = spawn_proxy(Proxy::new(provider));
    timeout(WAIT, proxy.ready()).await.unwrap().unwrap();

    let mut client = TcpStream::connect(tcp_addr(&proxy.local_url().unwrap())).await.unwrap();
    for message in [&b"ping"[..], b"GET /_ping HTTP/1.1\r\n\r\n"] {
        client.write_all(message).await.unwrap();
        let mut buf = vec![0u8; message.len()];
        timeout(WAIT, client.read_exact(&mut buf)).await.unwrap().unwrap();
        assert_eq!(buf, message);
    }

    proxy.stop();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}
