//! BC1/BC3 encoding with the ISPC texture compressor.

use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use intel_tex_2::{bc1, bc3, RgbaSurface};
use tracing::trace;

use super::stream::{spawn_encode, ChunkSender};
use super::{CompletionCallback, DdsEncodeProvider};
use crate::dds::DdsHeader;
use crate::executor::Executor;
use crate::image::{CompressionType, EncodingError};
use crate::raster::Raster;

/// DXT1 and DXT5 encoder backed by `intel_tex_2`.
///
/// Surfaces whose sides are not multiples of 4 are padded by repeating the
/// last row and column; the header keeps the true dimensions.
///
/// # Example
///
/// ```
/// use imagelayer::codec::{DdsEncodeProvider, IspcEncodeProvider};
///
/// let encoder = IspcEncodeProvider::new().with_mipmap_count(3);
/// assert_eq!(encoder.name(), "ispc");
/// assert_eq!(encoder.mipmap_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct IspcEncodeProvider {
    mipmap_count: usize,
}

impl Default for IspcEncodeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IspcEncodeProvider {
    /// An encoder producing only the base level.
    pub fn new() -> Self {
        Self { mipmap_count: 1 }
    }

    /// Generate up to `count` levels, base level included.
    pub fn with_mipmap_count(mut self, count: usize) -> Self {
        self.mipmap_count = count.max(1);
        self
    }

    pub fn mipmap_count(&self) -> usize {
        self.mipmap_count
    }

    fn check(compression: CompressionType) -> Result<(), EncodingError> {
        match compression {
            CompressionType::Dxt1 | CompressionType::Dxt5 => Ok(()),
            other => Err(EncodingError::new(format!(
                "ispc encoder does not produce {}",
                other
            ))),
        }
    }

    /// Levels that fit: halving stops once either side reaches 1.
    fn level_count(&self, width: u32, height: u32) -> usize {
        let max_levels = (32 - width.min(height).leading_zeros()) as usize;
        self.mipmap_count.min(max_levels.max(1))
    }

    /// Encode header then each level, handing every piece to `emit`.
    fn encode_levels(
        &self,
        raster: &Raster,
        compression: CompressionType,
        mut emit: impl FnMut(Vec<u8>) -> bool,
    ) -> Result<(), EncodingError> {
        Self::check(compression)?;
        let (width, height) = (raster.width(), raster.height());
        if width == 0 || height == 0 {
            return Err(EncodingError::new("cannot encode an empty raster"));
        }

        let base = RgbaImage::from_raw(width, height, raster.to_rgba())
            .ok_or_else(|| EncodingError::new("raster size does not match its dimensions"))?;

        let levels = self.level_count(width, height);
        let header = DdsHeader::new(width, height, levels as u32, compression).to_bytes();
        if !emit(header) {
            return Ok(());
        }

        let mut level = base;
        for index in 0..levels {
            if index > 0 {
                let w = (level.width() / 2).max(1);
                let h = (level.height() / 2).max(1);
                level = imageops::resize(&level, w, h, FilterType::Triangle);
            }
            trace!(
                level = index,
                width = level.width(),
                height = level.height(),
                "Compressing mipmap level"
            );
            if !emit(compress_surface(&level, compression)) {
                return Ok(());
            }
        }
        Ok(())
    }
}

fn pad_to_blocks(image: &RgbaImage) -> Cow<'_, RgbaImage> {
    let (w, h) = image.dimensions();
    if w % 4 == 0 && h % 4 == 0 {
        return Cow::Borrowed(image);
    }
    let padded = RgbaImage::from_fn(w.div_ceil(4) * 4, h.div_ceil(4) * 4, |x, y| {
        *image.get_pixel(x.min(w - 1), y.min(h - 1))
    });
    Cow::Owned(padded)
}

fn compress_surface(image: &RgbaImage, compression: CompressionType) -> Vec<u8> {
    let padded = pad_to_blocks(image);
    let surface = RgbaSurface {
        data: padded.as_raw(),
        width: padded.width(),
        height: padded.height(),
        stride: padded.width() * 4,
    };
    match compression {
        CompressionType::Dxt1 => bc1::compress_blocks(&surface),
        _ => bc3::compress_blocks(&surface),
    }
}

impl DdsEncodeProvider for IspcEncodeProvider {
    fn name(&self) -> &str {
        "ispc"
    }

    fn encode(
        &self,
        raster: &Raster,
        compression: CompressionType,
    ) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        self.encode_levels(raster, compression, |piece| {
            out.extend_from_slice(&piece);
            true
        })?;
        Ok(out)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn encode_streaming(
        &self,
        raster: Arc<Raster>,
        compression: CompressionType,
        executor: &dyn Executor,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn Read + Send>, EncodingError> {
        Self::check(compression)?;
        let encoder = self.clone();
        Ok(spawn_encode(
            executor,
            raster,
            move |raster: &Raster, tx: &ChunkSender| {
                encoder.encode_levels(raster, compression, |piece| tx.send(piece))
            },
            on_complete,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dds::{DdsHeaderInfo, HEADER_SIZE};
    use crate::executor::InlineExecutor;
    use crate::pool::BufferedRasterSpecs;
    use crate::raster::PixelLayout;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn raster(width: u32, height: u32) -> Raster {
        let mut raster = Raster::new(BufferedRasterSpecs::new(width, height, PixelLayout::Abgr8));
        for (i, px) in raster.data_mut().chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&[255, (i % 256) as u8, 64, 200]);
        }
        raster
    }

    #[test]
    fn test_encode_dxt1_size() {
        let bytes = IspcEncodeProvider::new()
            .encode(&raster(8, 8), CompressionType::Dxt1)
            .unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 * 8);
        let info = DdsHeaderInfo::parse(&bytes).unwrap();
        assert_eq!(info.compression, CompressionType::Dxt1);
        assert_eq!((info.width, info.height), (8, 8));
    }

    #[test]
    fn test_encode_dxt5_size() {
        let bytes = IspcEncodeProvider::new()
            .encode(&raster(8, 8), CompressionType::Dxt5)
            .unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 * 16);
    }

    #[test]
    fn test_encode_with_mipmaps() {
        let bytes = IspcEncodeProvider::new()
            .with_mipmap_count(3)
            .encode(&raster(16, 16), CompressionType::Dxt1)
            .unwrap();
        // 16×16 (16 blocks) + 8×8 (4) + 4×4 (1)
        assert_eq!(bytes.len(), HEADER_SIZE + 21 * 8);
        assert_eq!(DdsHeaderInfo::parse(&bytes).unwrap().mipmap_count, 3);
    }

    #[test]
    fn test_mipmaps_capped_by_size() {
        let encoder = IspcEncodeProvider::new().with_mipmap_count(10);
        assert_eq!(encoder.level_count(4, 4), 3);
        assert_eq!(encoder.level_count(1, 64), 1);
    }

    #[test]
    fn test_pads_odd_dimensions() {
        let bytes = IspcEncodeProvider::new()
            .encode(&raster(6, 5), CompressionType::Dxt1)
            .unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 * 8);
        let info = DdsHeaderInfo::parse(&bytes).unwrap();
        assert_eq!((info.width, info.height), (6, 5));
    }

    #[test]
    fn test_rejects_other_formats() {
        let encoder = IspcEncodeProvider::new();
        for compression in [
            CompressionType::Dxt3,
            CompressionType::A8R8G8B8,
            CompressionType::Undefined,
        ] {
            assert!(encoder.encode(&raster(4, 4), compression).is_err());
        }
    }

    #[test]
    fn test_streaming_matches_sync() {
        let encoder = IspcEncodeProvider::new();
        let source = Arc::new(raster(8, 8));
        let expected = encoder.encode(&source, CompressionType::Dxt5).unwrap();

        let completed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed);
        let mut stream = encoder
            .encode_streaming(
                Arc::clone(&source),
                CompressionType::Dxt5,
                &InlineExecutor,
                Box::new(move || flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, expected);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_streaming_declines_unsupported() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let result = IspcEncodeProvider::new().encode_streaming(
            Arc::new(raster(4, 4)),
            CompressionType::R8G8B8,
            &InlineExecutor,
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        assert!(result.is_err());
        assert!(!called.load(Ordering::SeqCst));
    }
}
