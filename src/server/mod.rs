//! Server Module
//!
//! Binds the UDP socket and wires the ingestion pipeline together:
//!
//! ```text
//! datagram -> receiver -> bounded queue -> worker x N -> engine -> reply
//! ```
//!
//! The receiver runs under a supervisor; every long-running task is tracked
//! so shutdown can wait for all of them.

mod pool;

pub use pool::{BufferPool, PooledBuffer};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::cache::CacheEngine;
use crate::error::{Result, ServerError};
use crate::tasks::{run_receiver, run_worker, supervise, ReceiverContext, SharedQueue};

// == Pipeline Settings ==
/// Sizing of the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Number of worker tasks
    pub workers: usize,
    /// Capacity of the bounded packet queue
    pub queue_capacity: usize,
    /// Size of each receive buffer in bytes
    pub buffer_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: crate::config::DEFAULT_QUEUE_CAPACITY,
            buffer_size: crate::config::DEFAULT_BUFFER_SIZE,
        }
    }
}

// == UDP Server ==
/// A bound, not yet running server.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    engine: Arc<dyn CacheEngine>,
    settings: PipelineSettings,
}

impl UdpServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    /// * `addr` - Address to listen on, e.g. `0.0.0.0:7070`
    /// * `engine` - Cache engine every worker applies requests to
    /// * `settings` - Pipeline sizing
    pub async fn bind(
        addr: &str,
        engine: Arc<dyn CacheEngine>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            socket: Arc::new(socket),
            engine,
            settings,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    // == Start ==
    /// Spawns the supervised receiver and the worker pool.
    pub fn start(self) -> Result<ServerHandle> {
        let local_addr = self.local_addr()?;
        let settings = self.settings;
        let tracker = TaskTracker::new();
        let shutdown = CancellationToken::new();

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));

        for id in 0..settings.workers {
            tracker.spawn(run_worker(
                id,
                Arc::clone(&queue),
                Arc::clone(&self.socket),
                Arc::clone(&self.engine),
            ));
        }

        let pool = Arc::new(BufferPool::new(
            settings.buffer_size,
            settings.queue_capacity + settings.workers + 1,
        ));
        let ctx = ReceiverContext {
            socket: Arc::clone(&self.socket),
            pool,
            queue: tx,
            shutdown: shutdown.clone(),
        };

        // The sender lives in `ctx`; once supervision ends the queue closes
        // and the workers drain it and stop.
        tracker.spawn(async move {
            let shutdown = ctx.shutdown.clone();
            supervise("receiver", shutdown, move || run_receiver(ctx.clone())).await;
        });
        tracker.close();

        info!(
            %local_addr,
            workers = settings.workers,
            queue_capacity = settings.queue_capacity,
            buffer_size = settings.buffer_size,
            "UDP pipeline started"
        );

        Ok(ServerHandle {
            local_addr,
            tracker,
            shutdown,
        })
    }
}

// == Server Handle ==
/// Handle on a running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Address the server listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the receiver, lets the workers drain the queue, and waits for
    /// all of them.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.tracker.wait().await;
        info!("UDP pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EngineKind;
    use std::time::Duration;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            workers: 2,
            queue_capacity: 8,
            buffer_size: 256,
        }
    }

    #[tokio::test]
    async fn test_bind_reports_address() {
        let engine = EngineKind::Map.build(Duration::from_secs(300));
        let server = UdpServer::bind("127.0.0.1:0", engine, settings()).await.unwrap();

        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let engine = EngineKind::Map.build(Duration::from_secs(300));
        let result = UdpServer::bind("not-an-address", engine, settings()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let engine = EngineKind::Trie.build(Duration::from_secs(300));
        let server = UdpServer::bind("127.0.0.1:0", engine, settings()).await.unwrap();
        let handle = server.start().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(b"abc||def||5", handle.local_addr())
            .await
            .unwrap();

        let mut reply = [0u8; 64];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut reply))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&reply[..n], b"abc||def||true");

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .unwrap();
    }
}
