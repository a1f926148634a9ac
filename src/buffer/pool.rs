//! Process-wide buffer pool for efficient memory reuse.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::trace;

use crate::config::MAX_BUFFER_LEN;
use crate::error::TransferError;

/// Smallest pooled size class (16 bytes).
const MIN_CLASS_SHIFT: u32 = 4;

/// Largest pooled size class (1 MiB). Larger requests are allocated and dropped.
const MAX_CLASS_SHIFT: u32 = 20;

/// Maximum number of idle buffers kept per size class.
pub const MAX_BUFFERS_PER_CLASS: usize = 8;

/// A source of reusable byte buffers.
///
/// `rent` hands out a buffer whose length is at least `min_capacity`. Its
/// contents are unspecified. `return_buffer` gives a previously rented buffer
/// back for reuse. Implementations must be safe to call from independent
/// operations on different threads.
pub trait BufferPool: Send + Sync + fmt::Debug {
    /// Rents a buffer of at least `min_capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::CapacityExceeded`] if `min_capacity` exceeds
    /// [`MAX_BUFFER_LEN`].
    fn rent(&self, min_capacity: usize) -> Result<Vec<u8>, TransferError>;

    /// Returns a rented buffer to the pool.
    fn return_buffer(&self, buffer: Vec<u8>);
}

/// A thread-safe pool of byte buffers bucketed by power-of-two size class.
#[derive(Debug)]
pub struct SharedPool {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
}

impl SharedPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        let classes = (MIN_CLASS_SHIFT..=MAX_CLASS_SHIFT)
            .map(|_| Mutex::new(Vec::new()))
            .collect();
        Self { classes }
    }

    /// Returns the process-wide pool.
    pub fn global() -> Arc<SharedPool> {
        static GLOBAL: OnceLock<Arc<SharedPool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SharedPool::new())))
    }

    /// Number of idle buffers currently held across all size classes.
    pub fn idle_buffers(&self) -> usize {
        self.classes.iter().map(|class| class.lock().len()).sum()
    }

    /// Maps a requested capacity to its size class index, if it is pooled.
    fn class_for(min_capacity: usize) -> Option<usize> {
        let size = min_capacity.max(1 << MIN_CLASS_SHIFT).checked_next_power_of_two()?;
        let shift = size.trailing_zeros();
        (shift <= MAX_CLASS_SHIFT).then(|| (shift - MIN_CLASS_SHIFT) as usize)
    }
}

impl Default for SharedPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool for SharedPool {
    fn rent(&self, min_capacity: usize) -> Result<Vec<u8>, TransferError> {
        if min_capacity > MAX_BUFFER_LEN {
            return Err(TransferError::CapacityExceeded {
                requested: min_capacity,
                max: MAX_BUFFER_LEN,
            });
        }

        let Some(index) = Self::class_for(min_capacity) else {
            trace!(min_capacity, "unpooled buffer allocation");
            return Ok(vec![0; min_capacity]);
        };

        if let Some(buffer) = self.classes[index].lock().pop() {
            return Ok(buffer);
        }

        let size = 1usize << (index as u32 + MIN_CLASS_SHIFT);
        trace!(size, "buffer pool miss");
        Ok(vec![0; size])
    }

    fn return_buffer(&self, buffer: Vec<u8>) {
        let len = buffer.len();
        // Only buffers that exactly match a class are kept
        if !len.is_power_of_two() || len < 1 << MIN_CLASS_SHIFT {
            return;
        }
        if let Some(index) = Self::class_for(len) {
            let mut class = self.classes[index].lock();
            if class.len() < MAX_BUFFERS_PER_CLASS {
                class.push(buffer);
            }
        }
    }
}

/// A pool wrapper that counts rents and returns.
///
/// Useful to check that every rented buffer came back.
#[derive(Debug, Default)]
pub struct TrackingPool {
    inner: SharedPool,
    rented: AtomicUsize,
    returned: AtomicUsize,
    largest: AtomicUsize,
}

impl TrackingPool {
    /// Creates a tracking pool over a fresh [`SharedPool`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successful rents.
    pub fn rented(&self) -> usize {
        self.rented.load(Ordering::SeqCst)
    }

    /// Total returns.
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::SeqCst)
    }

    /// Buffers rented and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.rented().saturating_sub(self.returned())
    }

    /// Largest `min_capacity` ever requested.
    pub fn largest_request(&self) -> usize {
        self.largest.load(Ordering::SeqCst)
    }
}

impl BufferPool for TrackingPool {
    fn rent(&self, min_capacity: usize) -> Result<Vec<u8>, TransferError> {
        self.largest.fetch_max(min_capacity, Ordering::SeqCst);
        let buffer = self.inner.rent(min_capacity)?;
        self.rented.fetch_add(1, Ordering::SeqCst);
        Ok(buffer)
    }

    fn return_buffer(&self, buffer: Vec<u8>) {
        self.returned.fetch_add(1, Ordering::SeqCst);
        self.inner.return_buffer(buffer);
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// The buffer goes back to its pool when dropped, on every exit path.
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Arc<dyn BufferPool>,
}

impl PooledBuffer {
    /// Rents a buffer of at least `min_capacity` bytes from `pool`.
    pub fn rent(pool: &Arc<dyn BufferPool>, min_capacity: usize) -> Result<Self, TransferError> {
        let data = pool.rent(min_capacity)?;
        Ok(Self {
            data,
            pool: Arc::clone(pool),
        })
    }

    /// Copies the first `len` bytes into an exact-length owned vector and
    /// returns the buffer to its pool.
    pub fn into_vec(self, len: usize) -> Vec<u8> {
        self.data[..len].to_vec()
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.return_buffer(std::mem::take(&mut self.data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_rounds_up_to_class() {
        let pool = SharedPool::new();
        let buf = pool.rent(513).unwrap();
        assert_eq!(buf.len(), 1024);

        let buf = pool.rent(0).unwrap();
        assert_eq!(buf.len(), 1 << MIN_CLASS_SHIFT);
    }

    #[test]
    fn test_rent_large_is_exact() {
        let pool = SharedPool::new();
        let size = (1 << MAX_CLASS_SHIFT) + 1;
        let buf = pool.rent(size).unwrap();
        assert_eq!(buf.len(), size);

        pool.return_buffer(buf);
        assert_eq!(pool.idle_buffers(), 0);
    }

    #[test]
    fn test_rent_over_ceiling_fails() {
        let pool = SharedPool::new();
        let result = pool.rent(MAX_BUFFER_LEN + 1);
        assert!(matches!(
            result,
            Err(TransferError::CapacityExceeded { requested, .. }) if requested == MAX_BUFFER_LEN + 1
        ));
    }

    #[test]
    fn test_buffer_reuse() {
        let pool = SharedPool::new();
        let mut buf = pool.rent(512).unwrap();
        buf[0] = 0xAB;
        pool.return_buffer(buf);
        assert_eq!(pool.idle_buffers(), 1);

        let buf = pool.rent(300).unwrap();
        assert_eq!(buf.len(), 512);
        assert_eq!(buf[0], 0xAB);
        assert_eq!(pool.idle_buffers(), 0);
    }

    #[test]
    fn test_class_is_bounded() {
        let pool = SharedPool::new();
        for _ in 0..MAX_BUFFERS_PER_CLASS + 3 {
            pool.return_buffer(vec![0; 64]);
        }
        assert_eq!(pool.idle_buffers(), MAX_BUFFERS_PER_CLASS);
    }

    #[test]
    fn test_foreign_sizes_are_dropped() {
        let pool = SharedPool::new();
        pool.return_buffer(vec![0; 100]);
        pool.return_buffer(vec![0; 8]);
        assert_eq!(pool.idle_buffers(), 0);
    }

    #[test]
    fn test_pooled_buffer_returns_on_drop() {
        let tracking = Arc::new(TrackingPool::new());
        let pool: Arc<dyn BufferPool> = tracking.clone();
        {
            let mut buf = PooledBuffer::rent(&pool, 100).unwrap();
            buf[..5].copy_from_slice(b"hello");
            assert_eq!(tracking.outstanding(), 1);
        }
        assert_eq!(tracking.outstanding(), 0);
        assert_eq!(tracking.rented(), 1);
    }

    #[test]
    fn test_into_vec_is_exact_and_returns() {
        let tracking = Arc::new(TrackingPool::new());
        let pool: Arc<dyn BufferPool> = tracking.clone();
        let mut buf = PooledBuffer::rent(&pool, 16).unwrap();
        buf[..3].copy_from_slice(b"abc");

        let out = buf.into_vec(3);
        assert_eq!(out, b"abc");
        assert_eq!(tracking.outstanding(), 0);
    }

    #[test]
    fn test_concurrent_rent_and_return() {
        let pool = Arc::new(SharedPool::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let buf = pool.rent(16 << (i % 6)).unwrap();
                        pool.return_buffer(buf);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle_buffers() <= 6 * MAX_BUFFERS_PER_CLASS);
    }
}
