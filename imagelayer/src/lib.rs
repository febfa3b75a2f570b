//! ImageLayer - image ingestion and DDS transcoding
//!
//! This library reads imagery from byte streams (PNG, JPEG and friends, DDS
//! surfaces, raw terrain samples), exposes it through a common [`Image`]
//! contract and converts rasters to DirectDraw Surface textures, either
//! eagerly or as a stream produced on a background executor.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use imagelayer::{read_image, DecodeOptions};
//!
//! let mut png = Vec::new();
//! image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 0, 0, 255]))
//!     .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
//!     .unwrap();
//!
//! let options = DecodeOptions::new().with_prefer_dds(true);
//! let dds = read_image(&mut Cursor::new(png), None, Some("image/png"), &options, None)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(dds.width().unwrap(), 8);
//! ```

pub mod codec;
pub mod config;
pub mod dds;
pub mod executor;
pub mod factory;
pub mod image;
pub mod lazy;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod raster;
pub mod terrain;

pub use crate::image::{CancellableSource, CompressionType, Image, ImageError, ImageSource, Rect};
pub use config::TranscodeConfig;
pub use dds::DdsImage;
pub use executor::{Executor, InlineExecutor};
pub use factory::{read_image, read_image_as_dds_stream, DecodeOptions, ImageFactory, ImageFormat};
pub use lazy::{LazyStreamImage, StreamProvider};
pub use metrics::ImageMetrics;
pub use raster::GenericImage;
pub use terrain::TerrainImage;
