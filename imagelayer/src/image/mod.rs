//! The image contract shared by every concrete raster.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  trait Image     │
//!                 └────────┬─────────┘
//!        ┌─────────────┬───┴─────────┬──────────────┐
//!        ▼             ▼             ▼              ▼
//! ┌────────────┐ ┌──────────┐ ┌─────────────┐ ┌───────────────┐
//! │GenericImage│ │ DdsImage │ │TerrainImage │ │LazyStreamImage│
//! └────────────┘ └──────────┘ └─────────────┘ └───────────────┘
//! ```
//!
//! Every accessor fails with [`ImageError::Disposed`] once `dispose()` has
//! run. Disposal is idempotent and safe to call from several threads; each
//! implementation also disposes on `Drop` as a last-resort leak guard.

mod compression;
mod error;
mod source;

pub use compression::CompressionType;
pub use error::{EncodingError, ImageError};
pub use source::{read_fully, CancellableSource, ImageSource};

use bytes::Bytes;

use crate::factory::ImageFormat;

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full extent of a `width × height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the rectangle lies inside a `width × height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Capabilities every concrete raster type implements.
pub trait Image: Send + Sync {
    /// Image width in pixels.
    fn width(&self) -> Result<u32, ImageError>;

    /// Image height in pixels.
    fn height(&self) -> Result<u32, ImageError>;

    /// Size in bytes of the backing buffer, header included.
    fn size_in_bytes(&self) -> Result<usize, ImageError>;

    /// Whether the image carries no visible content.
    fn is_blank(&self) -> Result<bool, ImageError>;

    /// The whole image, including any format header.
    fn raw_buffer(&self) -> Result<Bytes, ImageError>;

    /// A header-free copy of a sub-rectangle.
    fn region_buffer(&self, rect: &Rect) -> Result<Vec<u8>, ImageError>;

    /// The pixel encoding of the image.
    fn compression_type(&self) -> Result<CompressionType, ImageError>;

    /// Replace the backing bytes.
    fn set_raw_buffer(&self, _data: Bytes) -> Result<(), ImageError> {
        if self.is_disposed() {
            return Err(ImageError::Disposed);
        }
        Err(ImageError::Unsupported("set_raw_buffer"))
    }

    /// Declare the expected dimensions.
    ///
    /// Implementations that read dimensions from their data only warn when the
    /// hint disagrees.
    fn set_dimension_hint(&self, width: u32, height: u32);

    /// Declare the expected compression type.
    fn set_compression_hint(&self, compression: CompressionType);

    /// Release the backing buffer. Calling it again is a no-op.
    fn dispose(&self);

    /// Whether `dispose()` has run.
    fn is_disposed(&self) -> bool;

    /// Which entry of the format table produced this image.
    fn format(&self) -> ImageFormat;
}
