//! Pluggable codecs: raster readers, DDS encoders and DDS decoders.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                CodecRegistry                 │
//! │  readers   → Vec<Arc<dyn RasterReader>>      │
//! │  encoders  → Vec<Arc<dyn DdsEncodeProvider>> │
//! │  decoders  → Vec<Arc<dyn DdsDecodeProvider>> │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Candidates are tried in registration order. A failing codec is logged and
//! the next one tried; only exhaustion is reported to the caller.
//!
//! [`CodecRegistry::global()`] is populated with the built-in codecs on first
//! use. Tests and embedders can build their own registry and hand it to an
//! [`ImageFactory`](crate::factory::ImageFactory).

mod block;
mod conversion;
mod image_reader;
mod ispc;
mod registry;
mod stream;
mod uncompressed;

pub use block::BlockDecodeProvider;
pub use image_reader::ImageCrateReader;
pub use ispc::IspcEncodeProvider;
pub use registry::CodecRegistry;
pub use stream::{ChannelReader, ChunkSender};
pub use uncompressed::UncompressedEncodeProvider;

use std::io::Read;
use std::sync::Arc;

use crate::executor::Executor;
use crate::image::{CompressionType, EncodingError, ImageError};
use crate::raster::{PixelLayout, Raster};

/// Called once a streaming encode has finished producing output.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Dimensions and native layout of an encoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    /// The layout the source stores its pixels in.
    pub native: PixelLayout,
}

/// Decodes one or more container formats into a [`Raster`].
pub trait RasterReader: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether the leading bytes look like a format this reader handles.
    fn can_read(&self, header: &[u8]) -> bool;

    /// Read dimensions and native layout without decoding pixels.
    fn read_info(&self, data: &[u8]) -> Result<RasterInfo, ImageError>;

    /// Layouts this reader can decode into, most natural first.
    fn layouts(&self, info: &RasterInfo) -> Vec<PixelLayout>;

    /// Decode `data` into `raster`, whose specs come from `read_info` and
    /// one of `layouts`. Every pixel must be written.
    fn decode_into(&self, data: &[u8], raster: &mut Raster) -> Result<(), ImageError>;
}

/// Encodes a raster into a complete DDS file.
pub trait DdsEncodeProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Encode synchronously, returning header and payload.
    fn encode(&self, raster: &Raster, compression: CompressionType)
        -> Result<Vec<u8>, EncodingError>;

    /// Whether [`encode_streaming`](Self::encode_streaming) is implemented.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Start encoding on `executor`, returning a stream of the DDS bytes.
    ///
    /// An `Err` means the provider declined and `on_complete` was dropped
    /// without being called. Once a stream is returned, `on_complete` runs
    /// exactly once after the last chunk is produced (or encoding failed),
    /// and only after the provider has released `raster`.
    fn encode_streaming(
        &self,
        _raster: Arc<Raster>,
        _compression: CompressionType,
        _executor: &dyn Executor,
        _on_complete: CompletionCallback,
    ) -> Result<Box<dyn Read + Send>, EncodingError> {
        Err(EncodingError::new(format!(
            "{} does not support streaming",
            self.name()
        )))
    }
}

/// Decodes DDS surface data back to RGBA8.
pub trait DdsDecodeProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Decode the top-level surface of `data` (payload only, header
    /// stripped) into tightly packed RGBA8.
    ///
    /// `Ok(None)` means the provider does not handle `compression`.
    fn decode(
        &self,
        data: &[u8],
        compression: CompressionType,
        width: u32,
        height: u32,
    ) -> Result<Option<Vec<u8>>, ImageError>;
}
