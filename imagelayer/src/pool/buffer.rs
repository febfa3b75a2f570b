//! Byte buffers reused across streaming DDS deserialization.

use std::io::Cursor;
use std::time::Duration;

use tracing::warn;

use super::RasterPool;
use crate::config::TranscodeConfig;

/// Pool of byte buffers keyed by exact length.
///
/// Callers pass the pool explicitly to the operations that reuse buffers;
/// there is no ambient per-thread pool.
#[derive(Clone, Debug)]
pub struct ByteBufferPool {
    pool: RasterPool<usize, Cursor<Vec<u8>>>,
}

impl ByteBufferPool {
    /// Create a pool lending at most `capacity` buffers.
    pub fn new(capacity: usize, quiet_period: Duration, hard_cap: Duration) -> Self {
        Self {
            pool: RasterPool::new(capacity, Duration::from_millis(100), quiet_period, hard_cap),
        }
    }

    /// Create a pool from the `[pool]` settings of a config.
    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self {
            pool: RasterPool::from_config(config),
        }
    }

    /// Take a zero-positioned buffer of exactly `len` bytes.
    ///
    /// Blocks while the pool is exhausted. A reused buffer whose cursor was
    /// left away from the start is rewound with a warning.
    pub fn take(&self, len: usize) -> Cursor<Vec<u8>> {
        let taken = self
            .pool
            .take(&len, || Cursor::new(vec![0u8; len]), || false);
        let mut buffer = match taken {
            Ok(buffer) => buffer,
            // Unreachable with a never-cancelled wait.
            Err(_) => Cursor::new(vec![0u8; len]),
        };
        if buffer.position() != 0 {
            warn!(
                len,
                position = buffer.position(),
                "Reused pooled buffer was not rewound"
            );
            buffer.set_position(0);
        }
        buffer
    }

    /// Return a buffer taken from this pool.
    pub fn surrender(&self, buffer: Cursor<Vec<u8>>) {
        let len = buffer.get_ref().len();
        self.pool.surrender(len, buffer);
    }

    /// Free buffers of the given length.
    pub fn free_count(&self, len: usize) -> usize {
        self.pool.free_count(&len)
    }

    /// Buffers currently lent out.
    pub fn outstanding(&self) -> usize {
        self.pool.outstanding()
    }
}
