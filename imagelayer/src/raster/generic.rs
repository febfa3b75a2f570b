//! The generic raster image: multi-codec decode and DDS encode.
//!
//! Decoding asks every registered [`RasterReader`](crate::codec::RasterReader)
//! in order and keeps the first success. Encoding does the same with the DDS
//! encode providers. A fully transparent raster headed for DXT5 is not
//! encoded at all; it becomes the blank DDS sentinel.

use std::io::{self, Cursor, Read};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{PixelLayout, Raster};
use crate::codec::{CodecRegistry, CompletionCallback};
use crate::config::TranscodeConfig;
use crate::dds::DdsImage;
use crate::executor::Executor;
use crate::factory::ImageFormat;
use crate::image::{read_fully, CompressionType, Image, ImageError, ImageSource, Rect};
use crate::pool::{BufferedRasterPool, BufferedRasterSpecs};

/// What a decode needs besides the bytes.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub registry: &'a Arc<CodecRegistry>,
    /// Pool to take the raster from; `None` allocates a fresh one.
    pub pool: Option<&'a BufferedRasterPool>,
    pub config: &'a TranscodeConfig,
}

/// Leading bytes offered to [`RasterReader::can_read`](crate::codec::RasterReader::can_read).
const SNIFF_BYTES: usize = 64;

/// Compression used when none was hinted.
///
/// Alpha rasters get DXT5 when both sides are multiples of 4, else
/// uncompressed ARGB. Opaque rasters get DXT1 on the same condition, else
/// uncompressed RGB.
pub fn infer_compression(has_alpha: bool, width: u32, height: u32) -> CompressionType {
    let block_eligible = width % 4 == 0 && height % 4 == 0;
    match (has_alpha, block_eligible) {
        (true, true) => CompressionType::Dxt5,
        (true, false) => CompressionType::A8R8G8B8,
        (false, true) => CompressionType::Dxt1,
        (false, false) => CompressionType::R8G8B8,
    }
}

fn choose_layout(offered: &[PixelLayout], native: PixelLayout) -> PixelLayout {
    offered
        .iter()
        .copied()
        .find(|layout| layout.is_byte_reversed())
        .or_else(|| offered.first().copied())
        .unwrap_or(native)
}

struct RasterSlot {
    raster: Arc<Raster>,
    pool: Option<BufferedRasterPool>,
}

/// State shared with completion callbacks of streaming encodes.
struct Shared {
    slot: Mutex<Option<RasterSlot>>,
    compression_hint: Mutex<Option<CompressionType>>,
}

impl Shared {
    fn raster(&self) -> Result<Arc<Raster>, ImageError> {
        self.slot
            .lock()
            .as_ref()
            .map(|slot| Arc::clone(&slot.raster))
            .ok_or(ImageError::Disposed)
    }

    fn dispose(&self) {
        let taken = self.slot.lock().take();
        let Some(RasterSlot { raster, pool }) = taken else {
            return;
        };
        let Some(pool) = pool else {
            return;
        };
        let specs = raster.specs();
        match Arc::try_unwrap(raster) {
            Ok(raster) => pool.surrender(specs, raster),
            Err(_) => {
                trace!(layout = %specs.layout, "Raster still shared, forfeiting its pool slot");
                pool.forfeit();
            }
        }
    }
}

/// A decoded raster that can be re-encoded as DDS.
pub struct GenericImage {
    shared: Arc<Shared>,
    registry: Arc<CodecRegistry>,
    check_blank: bool,
}

impl GenericImage {
    /// Wrap an already decoded raster.
    pub fn from_raster(raster: Raster, registry: Arc<CodecRegistry>, check_blank: bool) -> Self {
        Self::from_slot(
            RasterSlot {
                raster: Arc::new(raster),
                pool: None,
            },
            registry,
            check_blank,
        )
    }

    fn from_slot(slot: RasterSlot, registry: Arc<CodecRegistry>, check_blank: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Some(slot)),
                compression_hint: Mutex::new(None),
            }),
            registry,
            check_blank,
        }
    }

    /// Read `source` fully and decode it.
    pub fn decode<S: ImageSource + ?Sized>(
        source: &mut S,
        content_length: Option<u64>,
        ctx: &DecodeContext<'_>,
    ) -> Result<Self, ImageError> {
        let data = read_fully(source, content_length)?;
        Self::decode_bytes(&data, &|| source.is_cancelled(), ctx)
    }

    /// Decode an in-memory source.
    ///
    /// `is_cancelled` is consulted while waiting for a pooled raster; a
    /// cancelled wait fails with [`io::ErrorKind::Interrupted`]. When no
    /// reader succeeds, the leading bytes are logged as text (sources often
    /// return an error document instead of an image) and a 1×1 transparent
    /// placeholder is returned.
    pub fn decode_bytes(
        data: &[u8],
        is_cancelled: &dyn Fn() -> bool,
        ctx: &DecodeContext<'_>,
    ) -> Result<Self, ImageError> {
        let sniff = &data[..data.len().min(SNIFF_BYTES)];

        for reader in ctx.registry.readers() {
            if !reader.can_read(sniff) {
                continue;
            }
            let info = match reader.read_info(data) {
                Ok(info) => info,
                Err(e) => {
                    debug!(reader = reader.name(), error = %e, "Reader could not read image info");
                    continue;
                }
            };
            let layout = choose_layout(&reader.layouts(&info), info.native);
            let specs = BufferedRasterSpecs::new(info.width, info.height, layout);

            let (mut raster, pool) = match ctx.pool {
                Some(pool) => {
                    let raster = pool
                        .take(&specs, || Raster::new(specs), || is_cancelled())
                        .map_err(|e| io::Error::new(io::ErrorKind::Interrupted, e))?;
                    (raster, Some(pool.clone()))
                }
                None => (Raster::new(specs), None),
            };

            match reader.decode_into(data, &mut raster) {
                Ok(()) => {
                    trace!(
                        reader = reader.name(),
                        width = info.width,
                        height = info.height,
                        %layout,
                        pooled = pool.is_some(),
                        "Decoded raster"
                    );
                    return Ok(Self::from_slot(
                        RasterSlot {
                            raster: Arc::new(raster),
                            pool,
                        },
                        Arc::clone(ctx.registry),
                        ctx.config.check_blank,
                    ));
                }
                Err(e) => {
                    if let Some(pool) = pool {
                        pool.surrender(specs, raster);
                    }
                    debug!(reader = reader.name(), error = %e, "Reader failed to decode");
                }
            }
        }

        let peek = &data[..data.len().min(ctx.config.error_peek_bytes)];
        let text = String::from_utf8_lossy(peek);
        warn!(
            bytes = data.len(),
            leading = %text.trim(),
            "No raster reader could decode the source, using blank placeholder"
        );
        Ok(Self::from_raster(
            Raster::blank(),
            Arc::clone(ctx.registry),
            ctx.config.check_blank,
        ))
    }

    /// The decoded raster.
    pub fn raster(&self) -> Result<Arc<Raster>, ImageError> {
        self.shared.raster()
    }

    fn blank_short_circuit(&self, raster: &Raster, compression: CompressionType) -> bool {
        self.check_blank && compression == CompressionType::Dxt5 && raster.is_blank()
    }

    /// Encode to DDS with the first provider that succeeds.
    pub fn encode(&self) -> Result<DdsImage, ImageError> {
        let raster = self.raster()?;
        let compression = self.compression_type()?;

        if self.blank_short_circuit(&raster, compression) {
            debug!(
                width = raster.width(),
                height = raster.height(),
                "Raster is fully transparent, skipping encode"
            );
            return Ok(DdsImage::blank(raster.height(), raster.width()));
        }

        let mut last_error = None;
        for provider in self.registry.encoders() {
            match provider.encode(&raster, compression) {
                Ok(bytes) => return Ok(DdsImage::from_bytes(bytes)),
                Err(e) => {
                    debug!(provider = provider.name(), %compression, error = %e, "DDS encode failed");
                    last_error = Some(e.message().to_string());
                }
            }
        }
        Err(ImageError::encoding(last_error.unwrap_or_else(|| {
            format!("no DDS encode provider for {}", compression)
        })))
    }

    /// Start encoding on `executor` with the first provider that accepts.
    ///
    /// With `dispose_on_complete` the image disposes itself once encoding
    /// finishes, or immediately when no provider accepted.
    pub fn encode_streaming(
        &self,
        executor: &dyn Executor,
        dispose_on_complete: bool,
    ) -> Result<Box<dyn Read + Send>, ImageError> {
        let raster = self.raster()?;
        let compression = self.compression_type()?;

        if self.blank_short_circuit(&raster, compression) {
            let bytes = DdsImage::blank_stream_bytes(raster.width(), raster.height(), compression);
            drop(raster);
            if dispose_on_complete {
                self.dispose();
            }
            return Ok(Box::new(Cursor::new(bytes)));
        }

        let mut last_error = None;
        for provider in self.registry.encoders() {
            if !provider.supports_streaming() {
                continue;
            }
            let on_complete: CompletionCallback = if dispose_on_complete {
                let shared = Arc::clone(&self.shared);
                Box::new(move || shared.dispose())
            } else {
                Box::new(|| {})
            };
            match provider.encode_streaming(Arc::clone(&raster), compression, executor, on_complete)
            {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(provider = provider.name(), %compression, error = %e, "Streaming encoder declined");
                    last_error = Some(e.message().to_string());
                }
            }
        }

        drop(raster);
        if dispose_on_complete {
            self.dispose();
        }
        Err(ImageError::encoding(last_error.unwrap_or_else(|| {
            format!("no streaming DDS encode provider for {}", compression)
        })))
    }
}

impl Image for GenericImage {
    fn width(&self) -> Result<u32, ImageError> {
        Ok(self.raster()?.width())
    }

    fn height(&self) -> Result<u32, ImageError> {
        Ok(self.raster()?.height())
    }

    fn size_in_bytes(&self) -> Result<usize, ImageError> {
        Ok(self.raster()?.data().len())
    }

    fn is_blank(&self) -> Result<bool, ImageError> {
        Ok(self.raster()?.is_blank())
    }

    fn raw_buffer(&self) -> Result<Bytes, ImageError> {
        Ok(Bytes::copy_from_slice(self.raster()?.data()))
    }

    fn region_buffer(&self, rect: &Rect) -> Result<Vec<u8>, ImageError> {
        let raster = self.raster()?;
        if !rect.fits_within(raster.width(), raster.height()) {
            return Err(ImageError::InvalidConfig(format!(
                "region {:?} outside {}x{} raster",
                rect,
                raster.width(),
                raster.height()
            )));
        }
        let bpp = raster.layout().bytes_per_pixel();
        let stride = raster.width() as usize * bpp;
        let row_len = rect.width as usize * bpp;
        let mut out = Vec::with_capacity(row_len * rect.height as usize);
        for y in rect.y as usize..(rect.y + rect.height) as usize {
            let start = y * stride + rect.x as usize * bpp;
            out.extend_from_slice(&raster.data()[start..start + row_len]);
        }
        Ok(out)
    }

    fn compression_type(&self) -> Result<CompressionType, ImageError> {
        let raster = self.raster()?;
        let mut hint = self.shared.compression_hint.lock();
        Ok(*hint.get_or_insert_with(|| {
            infer_compression(raster.layout().has_alpha(), raster.width(), raster.height())
        }))
    }

    fn set_dimension_hint(&self, width: u32, height: u32) {
        if let Ok(raster) = self.raster() {
            if (raster.width(), raster.height()) != (width, height) {
                warn!(
                    hint_width = width,
                    hint_height = height,
                    width = raster.width(),
                    height = raster.height(),
                    "Dimension hint disagrees with decoded raster"
                );
            }
        }
    }

    fn set_compression_hint(&self, compression: CompressionType) {
        *self.shared.compression_hint.lock() = Some(compression);
    }

    fn dispose(&self) {
        self.shared.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.shared.slot.lock().is_none()
    }

    fn format(&self) -> ImageFormat {
        ImageFormat::Generic
    }
}

impl Drop for GenericImage {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}
