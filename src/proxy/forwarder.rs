//! Data forwarding module
//!
//! A forwarding session pairs one accepted connection with one freshly dialed
//! destination connection and copies bytes both ways until each direction
//! reaches end-of-stream.

use log::{debug, warn};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::provider::Provider;

/// Bytes relayed by a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client to the destination
    pub client_to_destination: u64,
    /// Bytes copied from the destination to the client
    pub destination_to_client: u64,
}

/// Run one forwarding session for an accepted connection
///
/// Dial failures are logged and end only this session; the inbound
/// connection is dropped.
pub async fn forward_session<P, C>(
    inbound: C,
    peer: String,
    provider: Arc<P>,
    buffer_size: usize,
) -> Option<RelayStats>
where
    P: Provider,
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let start_time = Instant::now();

    let outbound = match provider.open_destination().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to connect to destination for {}: {}", peer, e);
            return None;
        }
    };
    debug!("Destination connected for {}", peer);

    let stats = relay(inbound, outbound, buffer_size).await;

    debug!(
        "Session {} finished after {} ms ({} bytes sent, {} bytes received)",
        peer,
        start_time.elapsed().as_millis(),
        stats.client_to_destination,
        stats.destination_to_client,
    );
    Some(stats)
}

/// Copy bytes between `inbound` and `outbound` in both directions
///
/// Each direction half-closes its destination once its source reaches
/// end-of-stream or fails. Both directions are joined before returning, and
/// both connections are released when this function returns.
pub async fn relay<A, B>(inbound: A, outbound: B, buffer_size: usize) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (inbound_reader, inbound_writer) = tokio::io::split(inbound);
    let (outbound_reader, outbound_writer) = tokio::io::split(outbound);

    let client_to_destination = tokio::spawn(copy_half(
        "client -> destination",
        inbound_reader,
        outbound_writer,
        buffer_size,
    ));
    let destination_to_client = tokio::spawn(copy_half(
        "destination -> client",
        outbound_reader,
        inbound_writer,
        buffer_size,
    ));

    let (up, down) = tokio::join!(client_to_destination, destination_to_client);

    RelayStats {
        client_to_destination: up.unwrap_or_else(|e| {
            warn!("Copy task client -> destination failed: {}", e);
            0
        }),
        destination_to_client: down.unwrap_or_else(|e| {
            warn!("Copy task destination -> client failed: {}", e);
            0
        }),
    }
}

/// Copy from `reader` to `writer` until end-of-stream, then half-close `writer`
async fn copy_half<R, W>(direction: &'static str, mut reader: R, mut writer: W, buffer_size: usize) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total_bytes: u64 = 0;

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = writer.write_all(&buffer[..n]).await {
                    debug!("{}: write failed: {}", direction, e);
                    break;
                }
                total_bytes += n as u64;
            }
            Err(e) => {
                debug!("{}: read failed: {}", direction, e);
                break;
            }
        }
    }

    half_close(direction, &mut writer).await;
    debug!("{} transferred {} bytes total", direction, total_bytes);
    total_bytes
}

/// Shut down the write side of `writer`, leaving its read side open
///
/// Transports without half-close support are logged and skipped so the
/// other direction keeps flowing.
async fn half_close<W: AsyncWrite + Unpin>(direction: &'static str, writer: &mut W) {
    match writer.shutdown().await {
        Ok(()) => debug!("{}: half-closed", direction),
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {
            warn!("{}: transport does not support half-close, skipping: {}", direction, e);
        }
        Err(e) if e.kind() == io::ErrorKind::NotConnected => {
            debug!("{}: peer already disconnected", direction);
        }
        Err(e) => debug!("{}: half-close failed: {}", direction, e),
    }
}
