//! Proxy server module
//!
//! This module implements the proxy lifecycle: open the listener, report the
//! outcome once on the startup signal, accept connections until stopped, and
//! hand every accepted connection to its own forwarding session.

use log::{debug, error};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;

use super::forwarder::forward_session;
use super::provider::{Listener, Provider};
use crate::common::{ProxyError, Result};
use crate::config::defaults;

/// Handle to an open listener, shared between the accept loop and `stop`
struct ListenerHandle {
    /// URL the listener is reachable at
    url: String,
    /// Set to `true` to close the listener
    close: watch::Sender<bool>,
}

/// Outcome of waiting for the next connection
enum AcceptOutcome<C> {
    Accepted(C, String),
    /// The listener was closed by `stop`
    Closed,
    Failed(io::Error),
}

/// Forwarding proxy
///
/// Accepts connections from the provider's listener and relays each one to a
/// new destination connection. A `Proxy` serves one start/stop cycle.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use orchard::proxy::{Proxy, Provider};
/// # async fn run<P: Provider>(provider: P) -> orchard::Result<()> {
/// let proxy = Arc::new(Proxy::new(provider));
/// let task = tokio::spawn({
///     let proxy = Arc::clone(&proxy);
///     async move { proxy.start().await }
/// });
///
/// proxy.ready().await?;
/// // ... use the proxy ...
/// proxy.stop();
/// task.await.ok();
/// # Ok(())
/// # }
/// ```
pub struct Proxy<P: Provider> {
    provider: Arc<P>,
    buffer_size: usize,
    startup_tx: Mutex<Option<oneshot::Sender<Result<()>>>>,
    startup_rx: Mutex<Option<oneshot::Receiver<Result<()>>>>,
    listener: Mutex<Option<ListenerHandle>>,
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which only happens with the proxy itself
    let _ = closed.wait_for(|closed| *closed).await;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: Provider> Proxy<P> {
    /// Create a new proxy around `provider`; no I/O happens here
    pub fn new(provider: P) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            provider: Arc::new(provider),
            buffer_size: defaults::buffer_size(),
            startup_tx: Mutex::new(Some(tx)),
            startup_rx: Mutex::new(Some(rx)),
            listener: Mutex::new(None),
        }
    }

    /// Set the copy buffer size used by each relay direction
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// URL of the open listener, once `start` has opened it
    pub fn local_url(&self) -> Option<String> {
        lock(&self.listener).as_ref().map(|handle| handle.url.clone())
    }

    /// Run the proxy
    ///
    /// Opens the listener and reports the result on the startup signal
    /// (see [`Proxy::ready`]). On success it keeps accepting connections
    /// until [`Proxy::stop`] is called. Intended to be spawned as a task.
    ///
    /// # Returns
    ///
    /// `Ok(())` after a stop, or after a listen failure that was reported on
    /// the startup signal.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::AlreadyStarted`] on a second call, and
    /// [`ProxyError::Accept`] if the listener fails unexpectedly.
    pub async fn start(&self) -> Result<()> {
        let startup = lock(&self.startup_tx).take().ok_or(ProxyError::AlreadyStarted)?;

        let mut listener = match self.provider.open_listener().await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to open listener: {}", e);
                let _ = startup.send(Err(e));
                return Ok(());
            }
        };

        let url = listener.local_url();
        let (close, mut closed) = watch::channel(false);
        *lock(&self.listener) = Some(ListenerHandle { url: url.clone(), close });

        debug!("Proxy listening on {}", url);
        let _ = startup.send(Ok(()));

        let mut tasks = JoinSet::new();
        let result = loop {
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!("Session task error: {}", e);
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = wait_closed(&mut closed) => AcceptOutcome::Closed,
                accepted = listener.accept() => match accepted {
                    Ok((conn, peer)) => AcceptOutcome::Accepted(conn, peer),
                    Err(e) => AcceptOutcome::Failed(e),
                },
            };

            match outcome {
                AcceptOutcome::Accepted(conn, peer) => {
                    if *closed.borrow() {
                        debug!("Dropping connection from {} accepted during shutdown", peer);
                        break Ok(());
                    }
                    debug!("Accepted connection from {}", peer);
                    let provider = Arc::clone(&self.provider);
                    tasks.spawn(forward_session(conn, peer, provider, self.buffer_size));
                }
                AcceptOutcome::Closed => {
                    debug!("Proxy on {} stopped", url);
                    break Ok(());
                }
                AcceptOutcome::Failed(e) => {
                    error!("Error accepting connection on {}: {}", url, e);
                    break Err(ProxyError::Accept(e));
                }
            }
        };

        // Listener is closed here; in-flight sessions keep running until
        // their connections finish.
        drop(listener);
        if !tasks.is_empty() {
            debug!("{} sessions still draining", tasks.len());
        }
        tasks.detach_all();

        result
    }

    /// Wait for the startup signal
    ///
    /// Resolves once `start` has tried to open the listener.
    ///
    /// # Errors
    ///
    /// Returns the listen error, or an error if the signal was already
    /// consumed or `start` was abandoned before reporting.
    pub async fn ready(&self) -> Result<()> {
        let rx = lock(&self.startup_rx)
            .take()
            .ok_or_else(|| ProxyError::Other("startup signal already consumed".to_string()))?;

        rx.await
            .map_err(|_| ProxyError::Other("proxy stopped before reporting startup".to_string()))?
    }

    /// Stop accepting connections
    ///
    /// Closes the listener if one is open. Safe to call more than once and
    /// before `start`; does not interrupt sessions already in progress.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.listener).as_ref() {
            if !handle.close.send_replace(true) {
                debug!("Stopping proxy on {}", handle.url);
            }
        }
    }
}
