//! DirectDraw Surface (DDS) support.
//!
//! [`DdsImage`] wraps a buffer that already holds a complete DDS file.
//! [`DdsHeader`] builds the 128-byte header written ahead of freshly encoded
//! surfaces.

mod header;
mod image;

pub use header::{
    DdsHeader, DdsHeaderInfo, FOURCC_OFFSET, HEADER_SIZE, HEIGHT_OFFSET, MAGIC, WIDTH_OFFSET,
};
pub use self::image::DdsImage;
