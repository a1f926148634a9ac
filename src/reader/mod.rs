//! Whole-stream reading with an untrusted length.
//!
//! - [`GrowableReader`] - Reads a handle to its end into one exact-length buffer
//!
//! The growth logic lives in a sans-IO state machine shared by the blocking
//! and non-blocking drivers.

mod growable;

pub use growable::GrowableReader;
