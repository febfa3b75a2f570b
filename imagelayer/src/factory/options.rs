//! Per-call decode options.

use crate::image::{CompressionType, ImageError};

/// How [`ImageFactory::read_image`](super::ImageFactory::read_image) should
/// decode a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Re-encode convertible sources as DDS.
    pub prefer_dds: bool,
    /// Back the returned raster with a pooled buffer.
    pub use_pooled_buffers: bool,
    /// Compression hint applied before any encode.
    pub compression: Option<CompressionType>,
    /// Dimension hint `(width, height)`.
    pub dimensions: Option<(u32, u32)>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefer_dds(mut self, prefer_dds: bool) -> Self {
        self.prefer_dds = prefer_dds;
        self
    }

    pub fn with_pooled_buffers(mut self, pooled: bool) -> Self {
        self.use_pooled_buffers = pooled;
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Reject contradictory combinations.
    ///
    /// A DDS result owns its own encoded buffer, so asking for it to also be
    /// pool-backed cannot be honoured.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.prefer_dds && self.use_pooled_buffers {
            return Err(ImageError::InvalidConfig(
                "prefer_dds and use_pooled_buffers cannot both be set".to_string(),
            ));
        }
        Ok(())
    }
}
