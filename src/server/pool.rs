//! Buffer Pool Module
//!
//! Reusable fixed-size receive buffers. A buffer borrowed from the pool goes
//! back to it when its [`PooledBuffer`] handle is dropped.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

// == Buffer Pool ==
/// A pool of equally sized byte buffers.
///
/// Recycled buffers keep whatever bytes they last held; callers must only read
/// the prefix they wrote.
#[derive(Debug)]
pub struct BufferPool {
    /// Idle buffers
    buffers: parking_lot::Mutex<Vec<Vec<u8>>>,
    /// Length of each buffer
    buffer_size: usize,
    /// Maximum number of idle buffers kept
    max_idle: usize,
}

impl BufferPool {
    /// Creates an empty pool.
    ///
    /// # Arguments
    /// * `buffer_size` - Length of every buffer handed out
    /// * `max_idle` - Number of released buffers kept for reuse; extras are freed
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            buffers: parking_lot::Mutex::new(Vec::new()),
            buffer_size,
            max_idle,
        }
    }

    /// Takes a buffer from the pool, allocating one if none is idle.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let recycled = self.buffers.lock().pop();
        let buf = recycled.unwrap_or_else(|| vec![0; self.buffer_size]);

        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    fn put(&self, buf: Vec<u8>) {
        // Only accept buffers of the pool's size
        if buf.len() != self.buffer_size {
            return;
        }

        let mut buffers = self.buffers.lock();
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }

    /// Number of idle buffers currently held.
    pub fn available(&self) -> usize {
        self.buffers.lock().len()
    }
}

// == Pooled Buffer ==
/// Exclusive handle on a pooled buffer. Returns the buffer on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let pool = Arc::new(BufferPool::new(64, 4));
        let buf = pool.acquire();

        assert_eq!(buf.len(), 64);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_recycles_buffer() {
        let pool = Arc::new(BufferPool::new(8, 4));

        let mut buf = pool.acquire();
        buf[..3].copy_from_slice(b"abc");
        drop(buf);
        assert_eq!(pool.available(), 1);

        // Recycled contents are not cleared
        let buf = pool.acquire();
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_drop_returns_buffer() {
        let pool = Arc::new(BufferPool::new(8, 4));
        {
            let _a = pool.acquire();
            let _b = pool.acquire();
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_idle_capacity_is_bounded() {
        let pool = Arc::new(BufferPool::new(8, 2));
        let held: Vec<PooledBuffer> = (0..5).map(|_| pool.acquire()).collect();
        drop(held);

        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_wrong_size_is_discarded() {
        let pool = BufferPool::new(8, 2);
        pool.put(vec![0; 4]);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_pool_shared_across_threads() {
        let pool = Arc::new(BufferPool::new(16, 64));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        buf[0] = 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.available() <= 8);
        assert!(pool.available() >= 1);
    }
}
