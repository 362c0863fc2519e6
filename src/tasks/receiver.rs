//! Receiver Task
//!
//! Reads datagrams into pooled buffers and pushes them onto the bounded
//! packet queue. A full queue blocks the receiver, which in turn stops
//! reading from the socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::server::{BufferPool, PooledBuffer};

/// Pause after a failed receive before trying again
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

// == Packet ==
/// One received datagram waiting for a worker.
#[derive(Debug)]
pub struct Packet {
    /// Where the datagram came from, and where the reply goes
    pub source: SocketAddr,
    /// Buffer holding the datagram
    pub buffer: PooledBuffer,
    /// Number of valid bytes in `buffer`
    pub len: usize,
}

impl Packet {
    /// The received bytes.
    pub fn payload(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

// == Receiver Context ==
/// Everything one receiver run needs. Cloned for every relaunch.
#[derive(Debug, Clone)]
pub struct ReceiverContext {
    pub socket: Arc<UdpSocket>,
    pub pool: Arc<BufferPool>,
    pub queue: mpsc::Sender<Packet>,
    pub shutdown: CancellationToken,
}

/// Runs the receive loop until shutdown is requested or every worker is gone.
///
/// Receive errors are logged and the loop carries on after a short pause.
pub async fn run_receiver(ctx: ReceiverContext) {
    loop {
        let mut buffer = ctx.pool.acquire();

        let received = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            received = ctx.socket.recv_from(&mut buffer) => received,
        };

        match received {
            Ok((len, source)) => {
                let packet = Packet {
                    source,
                    buffer,
                    len,
                };
                if ctx.queue.send(packet).await.is_err() {
                    debug!("packet queue closed, receiver stopping");
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "UDP receive failed");
                drop(buffer);
                if !backoff(&ctx.shutdown).await {
                    break;
                }
            }
        }
    }
}

/// Pauses after a receive error so a persistent failure cannot spin the loop.
/// Returns `false` if shutdown was requested meanwhile.
async fn backoff(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(RECV_ERROR_BACKOFF) => true,
    }
}
