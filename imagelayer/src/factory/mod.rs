//! Entry points: content type in, image (or DDS stream) out.
//!
//! ```text
//! source ──► ImageFormat::resolve ──┬─► DdsImage        (image/dds, ...)
//!                                   ├─► TerrainImage    (application/bil, ...)
//!                                   └─► GenericImage ──► encode ──► DdsImage
//!                                                       (prefer_dds)
//! ```
//!
//! The free functions use [`ImageFactory::global()`]. Construct an
//! [`ImageFactory`] directly for a custom configuration or codec registry.

mod format;
mod image_factory;
mod options;

pub use format::ImageFormat;
pub use image_factory::ImageFactory;
pub use options::DecodeOptions;

use std::io::Read;

use crate::executor::{self, Executor};
use crate::image::{Image, ImageError, ImageSource};
use crate::metrics::ImageMetrics;

/// Read an image through the global factory.
///
/// See [`ImageFactory::read_image`].
pub fn read_image<S: ImageSource + ?Sized>(
    source: &mut S,
    content_length: Option<u64>,
    content_type: Option<&str>,
    options: &DecodeOptions,
    metrics: Option<&mut ImageMetrics>,
) -> Result<Option<Box<dyn Image>>, ImageError> {
    ImageFactory::global().read_image(source, content_length, content_type, options, metrics)
}

/// Stream a source as DDS through the global factory.
///
/// Encoding runs on `executor`, or on the shared transcode pool when `None`.
pub fn read_image_as_dds_stream<S: ImageSource + ?Sized>(
    source: &mut S,
    content_type: Option<&str>,
    content_length: Option<u64>,
    metrics: Option<&mut ImageMetrics>,
    executor: Option<&dyn Executor>,
) -> Result<Box<dyn Read + Send>, ImageError> {
    let executor: &dyn Executor = match executor {
        Some(executor) => executor,
        None => executor::shared(),
    };
    ImageFactory::global().read_image_as_dds_stream(
        source,
        content_type,
        content_length,
        metrics,
        executor,
    )
}
