//! Raw band-interleaved terrain rasters (BIL elevation data).
//!
//! There is no header: dimensions come from [`Image::set_dimension_hint`] or,
//! failing that, the buffer is assumed to be square.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::warn;

use crate::factory::ImageFormat;
use crate::image::{read_fully, CompressionType, Image, ImageError, ImageSource, Rect};

/// Elevation samples held as raw bytes.
pub struct TerrainImage {
    data: Mutex<Option<Bytes>>,
    dimensions: Mutex<Option<(u32, u32)>>,
    bytes_per_sample: usize,
    disposed: AtomicBool,
}

impl TerrainImage {
    /// Wrap raw samples of `bytes_per_sample` bytes each.
    pub fn new(data: impl Into<Bytes>, bytes_per_sample: usize) -> Self {
        Self {
            data: Mutex::new(Some(data.into())),
            dimensions: Mutex::new(None),
            bytes_per_sample: bytes_per_sample.max(1),
            disposed: AtomicBool::new(false),
        }
    }

    /// Read the whole source as raw samples.
    pub fn read_from<S: ImageSource + ?Sized>(
        source: &mut S,
        content_length: Option<u64>,
        bytes_per_sample: usize,
    ) -> Result<Self, ImageError> {
        Ok(Self::new(read_fully(source, content_length)?, bytes_per_sample))
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    fn data(&self) -> Result<Bytes, ImageError> {
        self.data.lock().clone().ok_or(ImageError::Disposed)
    }

    fn dimensions(&self) -> Result<(u32, u32), ImageError> {
        let len = self.data()?.len();
        if let Some(dims) = *self.dimensions.lock() {
            return Ok(dims);
        }
        square_side(len / self.bytes_per_sample)
            .map(|side| (side, side))
            .ok_or_else(|| {
                ImageError::InvalidHeader(format!(
                    "{} bytes of {}-byte samples is not a square raster and no dimensions were hinted",
                    len, self.bytes_per_sample
                ))
            })
    }
}

fn square_side(samples: usize) -> Option<u32> {
    let approx = (samples as f64).sqrt() as usize;
    (approx.saturating_sub(1)..=approx + 1)
        .find(|side| side * side == samples)
        .and_then(|side| u32::try_from(side).ok())
}

impl Image for TerrainImage {
    fn width(&self) -> Result<u32, ImageError> {
        Ok(self.dimensions()?.0)
    }

    fn height(&self) -> Result<u32, ImageError> {
        Ok(self.dimensions()?.1)
    }

    fn size_in_bytes(&self) -> Result<usize, ImageError> {
        Ok(self.data()?.len())
    }

    fn is_blank(&self) -> Result<bool, ImageError> {
        Ok(self.data()?.is_empty())
    }

    fn raw_buffer(&self) -> Result<Bytes, ImageError> {
        self.data()
    }

    /// Copy a sub-rectangle row by row; each row of the image is
    /// `width × bytes_per_sample` bytes.
    fn region_buffer(&self, rect: &Rect) -> Result<Vec<u8>, ImageError> {
        let data = self.data()?;
        let (width, height) = self.dimensions()?;
        if !rect.fits_within(width, height) {
            return Err(ImageError::InvalidConfig(format!(
                "region {:?} outside {}x{} terrain raster",
                rect, width, height
            )));
        }
        let bps = self.bytes_per_sample;
        let stride = width as usize * bps;
        let row_len = rect.width as usize * bps;
        let mut out = Vec::with_capacity(row_len * rect.height as usize);
        for row in 0..rect.height as usize {
            let start = (rect.y as usize + row) * stride + rect.x as usize * bps;
            let row_bytes = data.get(start..start + row_len).ok_or_else(|| {
                ImageError::InvalidConfig(format!(
                    "terrain buffer of {} bytes too short for row {}",
                    data.len(),
                    rect.y as usize + row
                ))
            })?;
            out.extend_from_slice(row_bytes);
        }
        Ok(out)
    }

    fn compression_type(&self) -> Result<CompressionType, ImageError> {
        self.data()?;
        Ok(CompressionType::Undefined)
    }

    fn set_raw_buffer(&self, data: Bytes) -> Result<(), ImageError> {
        let mut slot = self.data.lock();
        if slot.is_none() {
            return Err(ImageError::Disposed);
        }
        *slot = Some(data);
        Ok(())
    }

    fn set_dimension_hint(&self, width: u32, height: u32) {
        if let Ok(data) = self.data() {
            let expected = width as usize * height as usize * self.bytes_per_sample;
            if expected != data.len() {
                warn!(
                    width,
                    height,
                    bytes_per_sample = self.bytes_per_sample,
                    expected,
                    actual = data.len(),
                    "Terrain dimension hint does not match buffer size"
                );
            }
        }
        *self.dimensions.lock() = Some((width, height));
    }

    fn set_compression_hint(&self, compression: CompressionType) {
        if compression != CompressionType::Undefined {
            warn!(hint = %compression, "Terrain rasters are never compressed, ignoring hint");
        }
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.data.lock().take();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn format(&self) -> ImageFormat {
        ImageFormat::Terrain
    }
}

impl Drop for TerrainImage {
    fn drop(&mut self) {
        self.dispose();
    }
}
