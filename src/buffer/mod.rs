//! Buffer management for the read loop.
//!
//! This module provides the [`BufferPool`] seam, the process-wide
//! [`SharedPool`], and the [`PooledBuffer`] loan that returns itself to its
//! pool when dropped.

mod pool;

pub use pool::{BufferPool, PooledBuffer, SharedPool, TrackingPool};
