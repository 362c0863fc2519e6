//! Worker Task
//!
//! Drains the packet queue: decode, apply to the cache engine, reply to the
//! sender. The packet's buffer goes back to the pool once the packet drops,
//! whatever the outcome.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::cache::CacheEngine;
use crate::protocol::{decode, encode_outcome, Request};
use crate::tasks::Packet;

/// Receiving end of the packet queue, shared by every worker.
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<Packet>>>;

// == Handle PDU ==
/// Applies one request to `engine` and returns the reply datagram, if any.
///
/// Malformed PDUs are logged and get no reply.
pub async fn handle_pdu(
    engine: &dyn CacheEngine,
    pdu: &[u8],
    source: SocketAddr,
) -> Option<Vec<u8>> {
    if pdu.is_empty() {
        return None;
    }

    let request = match decode(pdu) {
        Ok(request) => request,
        Err(e) => {
            warn!(
                %source,
                error = %e,
                pdu = %String::from_utf8_lossy(pdu),
                "invalid PDU"
            );
            return None;
        }
    };

    let success = match request {
        Request::List => return Some(engine.list_live().await),
        Request::Upsert {
            prefix,
            suffix,
            ttl,
            max_count,
        } => {
            engine
                .insert_or_refresh(prefix, suffix, ttl, max_count)
                .await
        }
        Request::Delete { prefix, suffix } => engine.delete(prefix, suffix).await,
        Request::InvalidCount { max_count, .. } => {
            warn!(%source, max_count, "invalid max count");
            false
        }
    };

    let (prefix, suffix) = request.correlation()?;
    debug!(%source, prefix, suffix, success, "request handled");
    Some(encode_outcome(prefix, suffix, success))
}

/// Runs one worker until the queue is closed and drained.
pub async fn run_worker(
    id: usize,
    queue: SharedQueue,
    socket: Arc<UdpSocket>,
    engine: Arc<dyn CacheEngine>,
) {
    loop {
        let packet = {
            let mut queue = queue.lock().await;
            queue.recv().await
        };
        let Some(packet) = packet else {
            break;
        };

        if let Some(reply) = handle_pdu(engine.as_ref(), packet.payload(), packet.source).await {
            // Replies are fire-and-forget
            if let Err(e) = socket.send_to(&reply, packet.source).await {
                debug!(worker = id, source = %packet.source, error = %e, "reply send failed");
            }
        }
    }
    debug!(worker = id, "worker stopped");
}
