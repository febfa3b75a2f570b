//! Decode orchestration: format lookup, optional DDS conversion, logging.

use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::{DecodeOptions, ImageFormat};
use crate::codec::CodecRegistry;
use crate::config::TranscodeConfig;
use crate::dds::DdsImage;
use crate::executor::Executor;
use crate::image::{read_fully, Image, ImageError, ImageSource};
use crate::metrics::ImageMetrics;
use crate::pool::BufferedRasterPool;
use crate::raster::{DecodeContext, GenericImage};
use crate::terrain::TerrainImage;

static GLOBAL: OnceLock<ImageFactory> = OnceLock::new();

/// Log a failed read: cancelled I/O is expected and only worth `debug!`.
fn log_failure(stage: &str, err: &ImageError, cancelled: bool) {
    if cancelled && err.is_io() {
        debug!(stage, error = %err, "Image source cancelled");
    } else {
        error!(stage, error = %err, "Failed to read image");
    }
}

/// Turns byte streams into images.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use imagelayer::config::TranscodeConfig;
/// use imagelayer::factory::{DecodeOptions, ImageFactory};
///
/// let factory = ImageFactory::new(TranscodeConfig::default());
/// let mut source = Cursor::new(b"not an image".to_vec());
/// let image = factory
///     .read_image(&mut source, None, Some("image/png"), &DecodeOptions::new(), None)
///     .unwrap();
///
/// // Undecodable input becomes a 1×1 placeholder.
/// assert_eq!(image.unwrap().width().unwrap(), 1);
/// ```
pub struct ImageFactory {
    registry: Arc<CodecRegistry>,
    pool: BufferedRasterPool,
    config: TranscodeConfig,
}

impl ImageFactory {
    /// A factory using the global codec registry.
    pub fn new(config: TranscodeConfig) -> Self {
        Self::with_registry(config, CodecRegistry::global())
    }

    /// A factory using `registry`.
    pub fn with_registry(config: TranscodeConfig, registry: Arc<CodecRegistry>) -> Self {
        let pool = BufferedRasterPool::from_config(&config);
        info!(
            pool_capacity = config.pool_capacity,
            check_blank = config.check_blank,
            "Image factory initialized"
        );
        Self {
            registry,
            pool,
            config,
        }
    }

    /// The process-wide factory with default configuration.
    pub fn global() -> &'static ImageFactory {
        GLOBAL.get_or_init(|| ImageFactory::new(TranscodeConfig::default()))
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &BufferedRasterPool {
        &self.pool
    }

    fn context(&self, pooled: bool) -> DecodeContext<'_> {
        DecodeContext {
            registry: &self.registry,
            pool: pooled.then_some(&self.pool),
            config: &self.config,
        }
    }

    /// Read a source into the image type its content type calls for.
    ///
    /// Option conflicts and textual content types fail before any byte is
    /// read. After that, read and decode failures are logged and reported as
    /// `Ok(None)`.
    pub fn read_image<S: ImageSource + ?Sized>(
        &self,
        source: &mut S,
        content_length: Option<u64>,
        content_type: Option<&str>,
        options: &DecodeOptions,
        mut metrics: Option<&mut ImageMetrics>,
    ) -> Result<Option<Box<dyn Image>>, ImageError> {
        options.validate()?;
        let format = ImageFormat::resolve(content_type)?;

        let data = match read_fully(source, content_length) {
            Ok(data) => data,
            Err(e) => {
                log_failure("read", &e.into(), source.is_cancelled());
                return Ok(None);
            }
        };

        let started = Instant::now();
        let result = self.build(format, &data, &|| source.is_cancelled(), options, &mut metrics);
        match result {
            Ok(image) => {
                if let Some(metrics) = metrics.as_deref_mut() {
                    if metrics.decode_time().is_none() {
                        metrics.record_decode(started.elapsed());
                    }
                }
                Ok(Some(image))
            }
            Err(e) => {
                log_failure("decode", &e, source.is_cancelled());
                Ok(None)
            }
        }
    }

    fn build(
        &self,
        format: ImageFormat,
        data: &Bytes,
        is_cancelled: &dyn Fn() -> bool,
        options: &DecodeOptions,
        metrics: &mut Option<&mut ImageMetrics>,
    ) -> Result<Box<dyn Image>, ImageError> {
        let image: Box<dyn Image> = match format {
            ImageFormat::Dds => Box::new(DdsImage::from_buffer(data.clone())?),
            ImageFormat::Terrain => Box::new(TerrainImage::new(
                data.clone(),
                self.config.terrain_bytes_per_sample,
            )),
            ImageFormat::LazyStream => {
                return Err(ImageError::Unsupported(
                    "lazy stream images are constructed from a stream provider",
                ))
            }
            ImageFormat::Generic if options.prefer_dds && format.can_convert_to_dds() => {
                match self.convert_to_dds(data, is_cancelled, options, metrics) {
                    Ok(dds) => Box::new(dds),
                    Err(e) if e.is_io() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "DDS conversion failed, returning decoded raster");
                        Box::new(GenericImage::decode_bytes(
                            data,
                            is_cancelled,
                            &self.context(false),
                        )?)
                    }
                }
            }
            ImageFormat::Generic => Box::new(GenericImage::decode_bytes(
                data,
                is_cancelled,
                &self.context(options.use_pooled_buffers),
            )?),
        };

        if let Some((width, height)) = options.dimensions {
            image.set_dimension_hint(width, height);
        }
        if let Some(compression) = options.compression {
            if image.format() != ImageFormat::Dds {
                image.set_compression_hint(compression);
            }
        }
        Ok(image)
    }

    /// Decode into a pooled intermediate, encode, release the intermediate.
    fn convert_to_dds(
        &self,
        data: &Bytes,
        is_cancelled: &dyn Fn() -> bool,
        options: &DecodeOptions,
        metrics: &mut Option<&mut ImageMetrics>,
    ) -> Result<DdsImage, ImageError> {
        let started = Instant::now();
        let intermediate = GenericImage::decode_bytes(data, is_cancelled, &self.context(true))?;
        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.record_decode(started.elapsed());
        }
        if let Some(compression) = options.compression {
            intermediate.set_compression_hint(compression);
        }

        let started = Instant::now();
        let result = intermediate.encode();
        intermediate.dispose();
        let dds = result?;
        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.record_encode(started.elapsed());
        }
        Ok(dds)
    }

    /// Decode a source and stream it back as DDS, encoding on `executor`.
    ///
    /// DDS input is passed through untouched. The decoded intermediate is
    /// disposed once encoding finishes.
    pub fn read_image_as_dds_stream<S: ImageSource + ?Sized>(
        &self,
        source: &mut S,
        content_type: Option<&str>,
        content_length: Option<u64>,
        metrics: Option<&mut ImageMetrics>,
        executor: &dyn Executor,
    ) -> Result<Box<dyn Read + Send>, ImageError> {
        let format = ImageFormat::resolve(content_type)?;
        let data = read_fully(source, content_length).map_err(|e| {
            let e = ImageError::from(e);
            log_failure("read", &e, source.is_cancelled());
            e
        })?;

        match format {
            ImageFormat::Dds => {
                DdsImage::from_buffer(data.clone())?;
                Ok(Box::new(Cursor::new(data)))
            }
            ImageFormat::Generic => {
                let started = Instant::now();
                let image = GenericImage::decode_bytes(
                    &data,
                    &|| source.is_cancelled(),
                    &self.context(true),
                )
                .inspect_err(|e| log_failure("decode", e, source.is_cancelled()))?;
                if let Some(metrics) = metrics {
                    metrics.record_decode(started.elapsed());
                }
                image.encode_streaming(executor, true)
            }
            ImageFormat::Terrain | ImageFormat::LazyStream => Err(ImageError::Unsupported(
                "only generic rasters can be encoded as DDS",
            )),
        }
    }
}
