//! Bounded pools of reusable raster and byte buffers.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ RasterPool<K, V>                              │
//! │                                               │
//! │  take(key) ──► free list hit ──► reuse         │
//! │           └──► under capacity ──► allocate     │
//! │           └──► full ──► wait (cancellable)     │
//! │                                               │
//! │  surrender(key, v) ──► free list ──► janitor   │
//! │                        (evicts after quiet     │
//! │                         period / hard cap)     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! [`RasterPool`] backs decoded rasters keyed by [`BufferedRasterSpecs`];
//! [`ByteBufferPool`] reuses buffers by byte length for streaming DDS reads.

mod buffer;
mod janitor;
mod raster_pool;
mod specs;

pub use buffer::ByteBufferPool;
pub use raster_pool::{PoolError, RasterPool};
pub use specs::BufferedRasterSpecs;

/// Pool of decoded rasters keyed by shape.
pub type BufferedRasterPool = RasterPool<BufferedRasterSpecs, crate::raster::Raster>;
