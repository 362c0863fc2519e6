//! UDP Client
//!
//! Sends requests to a cache server and matches replies to callers by their
//! `prefix||suffix` correlation key. Every call is bounded by a timeout; the
//! transport is lossy, so a timeout is the only failure signal for a lost
//! request or reply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::protocol::{correlation_id, Reply, FIELD_SEPARATOR, LIST_COMMAND};

/// Largest reply the client will read
const REPLY_BUFFER_SIZE: usize = 64 * 1024;

/// `max_count` value that asks the server to delete an entry
pub const DELETE_ACTION: i64 = -1;

#[derive(Debug, Default)]
struct Pending {
    outcomes: HashMap<String, oneshot::Sender<bool>>,
    listing: Option<oneshot::Sender<Vec<u8>>>,
}

type SharedPending = Arc<parking_lot::Mutex<Pending>>;

// == Cache Client ==
/// Client for one cache server.
///
/// Concurrent requests for the same `(prefix, suffix)` share a correlation key;
/// only the most recent one receives the reply.
#[derive(Debug)]
pub struct CacheClient {
    socket: Arc<UdpSocket>,
    pending: SharedPending,
    listener: JoinHandle<()>,
}

impl CacheClient {
    // == Connect ==
    /// Binds a local socket, connects it to `server` and starts the reply
    /// listener.
    pub async fn connect(server: &str) -> Result<Self, ClientError> {
        let server_addr = lookup_host(server)
            .await?
            .next()
            .ok_or_else(|| ClientError::Resolve(server.to_string()))?;

        let local = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(server_addr).await?;
        let socket = Arc::new(socket);

        let pending = SharedPending::default();
        let listener = tokio::spawn(listen_for_replies(
            Arc::clone(&socket),
            Arc::clone(&pending),
        ));

        Ok(Self {
            socket,
            pending,
            listener,
        })
    }

    // == Invoke ==
    /// Sends `prefix||suffix||action` and waits for the outcome.
    ///
    /// A positive `action` inserts or refreshes with the server's default TTL
    /// and uses `action` as the admission cap; [`DELETE_ACTION`] deletes.
    pub async fn invoke(
        &self,
        prefix: &str,
        suffix: &str,
        action: i64,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        let request = format!("{prefix}{FIELD_SEPARATOR}{suffix}{FIELD_SEPARATOR}{action}");
        self.request_outcome(prefix, suffix, request, timeout).await
    }

    /// Inserts or refreshes `(prefix, suffix)` with the server's default TTL.
    pub async fn insert(
        &self,
        prefix: &str,
        suffix: &str,
        max_count: u32,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        self.invoke(prefix, suffix, i64::from(max_count), timeout)
            .await
    }

    /// Inserts or refreshes `(prefix, suffix)` asking for `ttl_secs`. The
    /// server replaces TTLs outside [300, 900] seconds with 300.
    pub async fn insert_with_ttl(
        &self,
        prefix: &str,
        suffix: &str,
        ttl_secs: u64,
        max_count: u32,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        let request = [
            prefix.to_string(),
            suffix.to_string(),
            ttl_secs.to_string(),
            max_count.to_string(),
        ]
        .join(FIELD_SEPARATOR);
        self.request_outcome(prefix, suffix, request, timeout).await
    }

    /// Deletes `(prefix, suffix)`.
    pub async fn delete(
        &self,
        prefix: &str,
        suffix: &str,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        self.invoke(prefix, suffix, DELETE_ACTION, timeout).await
    }

    // == List ==
    /// Fetches the server's dump of live keys.
    pub async fn list(&self, timeout: Duration) -> Result<Vec<u8>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().listing = Some(tx);

        let result = self.send_and_wait(LIST_COMMAND, rx, timeout).await;
        self.pending.lock().listing = None;
        result
    }

    async fn request_outcome(
        &self,
        prefix: &str,
        suffix: &str,
        request: String,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        let id = correlation_id(prefix, suffix);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().outcomes.insert(id.clone(), tx);

        let result = self.send_and_wait(&request, rx, timeout).await;
        self.pending.lock().outcomes.remove(&id);
        result
    }

    async fn send_and_wait<T>(
        &self,
        request: &str,
        rx: oneshot::Receiver<T>,
        timeout: Duration,
    ) -> Result<T, ClientError> {
        self.socket.send(request.as_bytes()).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout(timeout)),
        }
    }
}

impl Drop for CacheClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Routes every incoming datagram to the waiting caller, if there is one.
/// Outcome replies go by correlation key; anything else is a list dump.
async fn listen_for_replies(socket: Arc<UdpSocket>, pending: SharedPending) {
    let mut buf = vec![0u8; REPLY_BUFFER_SIZE];

    loop {
        let n = match socket.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "error reading reply");
                continue;
            }
        };
        let datagram = &buf[..n];

        match Reply::decode(datagram) {
            Some(reply) => {
                let waiter = pending.lock().outcomes.remove(&reply.correlation_id());
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply.success);
                    }
                    None => debug!(id = %reply.correlation_id(), "uncorrelated reply dropped"),
                }
            }
            None => {
                if let Some(tx) = pending.lock().listing.take() {
                    let _ = tx.send(datagram.to_vec());
                }
            }
        }
    }
}
