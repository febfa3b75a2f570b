//! Decoded rasters and the generic multi-codec image.

mod blank;
mod buffer;
mod generic;
mod layout;

pub use blank::is_fully_transparent;
pub use buffer::Raster;
pub use generic::{infer_compression, DecodeContext, GenericImage};
pub use layout::PixelLayout;
