//! Integration tests for the decode and DDS transcode paths.
//!
//! These tests drive the public API end to end:
//! - content type resolution and option validation
//! - eager and streamed DDS conversion
//! - pooled raster lifetime across dispose and drop
//!
//! Run with: `cargo test --test transcode_integration`

use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio_util::sync::CancellationToken;

use imagelayer::codec::CodecRegistry;
use imagelayer::dds::{DdsHeaderInfo, FOURCC_OFFSET, HEADER_SIZE};
use imagelayer::pool::BufferedRasterSpecs;
use imagelayer::raster::{PixelLayout, Raster};
use imagelayer::{
    CancellableSource, CompressionType, DdsImage, DecodeOptions, GenericImage, Image, ImageError,
    ImageFactory, ImageFormat, ImageMetrics, ImageSource, InlineExecutor, Rect, TranscodeConfig,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode an RGBA image as PNG.
fn png_from(img: &RgbaImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
    cursor.into_inner()
}

/// A solid PNG.
fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    png_from(&RgbaImage::from_pixel(width, height, Rgba(pixel)))
}

/// A factory with a small, fast-ticking pool.
fn small_factory() -> ImageFactory {
    ImageFactory::new(
        TranscodeConfig::default()
            .with_pool_capacity(2)
            .with_pool_wait_tick(Duration::from_millis(5)),
    )
}

/// Counts reads so tests can assert nothing was consumed.
struct CountingSource {
    inner: Cursor<Vec<u8>>,
    reads: Arc<AtomicUsize>,
}

impl Read for CountingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(buf)
    }
}

impl ImageSource for CountingSource {}

// ============================================================================
// Integration Tests
// ============================================================================

/// A fully transparent 64×64 PNG converts to the header-less blank DDS.
#[test]
fn test_transparent_png_becomes_blank_dds() {
    let factory = small_factory();
    let mut source = Cursor::new(solid_png(64, 64, [255, 255, 255, 0]));

    let image = factory
        .read_image(
            &mut source,
            None,
            Some("image/png"),
            &DecodeOptions::new().with_prefer_dds(true),
            None,
        )
        .unwrap()
        .unwrap();

    assert_eq!(image.format(), ImageFormat::Dds);
    assert!(image.is_blank().unwrap());
    assert_eq!(image.width().unwrap(), 64);
    assert_eq!(image.height().unwrap(), 64);
    assert_eq!(image.size_in_bytes().unwrap(), 0);
    assert_eq!(factory.pool().outstanding(), 0);
}

/// Blank detection can be switched off.
#[test]
fn test_blank_check_disabled_encodes_fully() {
    let factory = ImageFactory::new(TranscodeConfig::default().with_check_blank(false));
    let image = factory
        .read_image(
            &mut Cursor::new(solid_png(16, 16, [0, 0, 0, 0])),
            None,
            None,
            &DecodeOptions::new().with_prefer_dds(true),
            None,
        )
        .unwrap()
        .unwrap();

    // 16 DXT5 blocks of 16 bytes after the header.
    assert_eq!(image.size_in_bytes().unwrap(), HEADER_SIZE + 16 * 16);
    assert!(!image.is_blank().unwrap());
}

/// The fourCC at offset 84 decides the compression of a DDS passthrough.
#[test]
fn test_argb_fourcc_is_uncompressed() {
    let mut header = vec![0xAAu8; HEADER_SIZE];
    header[FOURCC_OFFSET..FOURCC_OFFSET + 4].copy_from_slice(b"ARGB");

    let image = small_factory()
        .read_image(
            &mut Cursor::new(header),
            None,
            Some("image/dds"),
            &DecodeOptions::new(),
            None,
        )
        .unwrap()
        .unwrap();

    let compression = image.compression_type().unwrap();
    assert_eq!(compression, CompressionType::A8R8G8B8);
    assert!(!compression.is_compressed());
}

/// Contradictory options fail before the source is touched.
#[test]
fn test_conflicting_options_read_nothing() {
    let reads = Arc::new(AtomicUsize::new(0));
    let mut source = CountingSource {
        inner: Cursor::new(solid_png(4, 4, [1, 2, 3, 4])),
        reads: Arc::clone(&reads),
    };
    let options = DecodeOptions::new()
        .with_prefer_dds(true)
        .with_pooled_buffers(true);

    let result = small_factory().read_image(&mut source, None, None, &options, None);

    assert!(matches!(result, Err(ImageError::InvalidConfig(_))));
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

/// Error documents are rejected by content type alone.
#[test]
fn test_html_content_type_is_unknown() {
    let reads = Arc::new(AtomicUsize::new(0));
    let mut source = CountingSource {
        inner: Cursor::new(b"<html>503</html>".to_vec()),
        reads: Arc::clone(&reads),
    };

    let result = small_factory().read_image(
        &mut source,
        None,
        Some("text/html; charset=utf-8"),
        &DecodeOptions::new(),
        None,
    );

    assert!(matches!(result, Err(ImageError::FormatUnknown(_))));
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

/// Undecodable bytes under an image type yield the 1×1 placeholder.
#[test]
fn test_garbage_becomes_placeholder() {
    let image = small_factory()
        .read_image(
            &mut Cursor::new(b"Service temporarily unavailable".to_vec()),
            None,
            Some("image/jpeg"),
            &DecodeOptions::new(),
            None,
        )
        .unwrap()
        .unwrap();

    assert_eq!(image.format(), ImageFormat::Generic);
    assert_eq!((image.width().unwrap(), image.height().unwrap()), (1, 1));
    assert!(image.is_blank().unwrap());
}

/// Region copies match a pixel-by-pixel extraction of the same raster.
#[test]
fn test_region_matches_reference() {
    let (width, height) = (7u32, 5u32);
    let data: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
    let specs = BufferedRasterSpecs::new(width, height, PixelLayout::Rgba8);
    let raster = Raster::from_data(specs, data.clone()).unwrap();
    let image = GenericImage::from_raster(raster, CodecRegistry::global(), true);

    let rect = Rect::new(2, 1, 4, 3);
    let region = image.region_buffer(&rect).unwrap();

    let mut expected = Vec::new();
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let offset = ((y * width + x) * 4) as usize;
            expected.extend_from_slice(&data[offset..offset + 4]);
        }
    }
    assert_eq!(region, expected);
    assert!(image.region_buffer(&Rect::new(4, 0, 4, 1)).is_err());
}

/// Disposing twice, then dropping, returns the raster to the pool once.
#[test]
fn test_double_dispose_keeps_pool_consistent() {
    let factory = small_factory();
    let options = DecodeOptions::new().with_pooled_buffers(true);

    let image = factory
        .read_image(&mut Cursor::new(solid_png(8, 8, [9, 9, 9, 255])), None, None, &options, None)
        .unwrap()
        .unwrap();
    assert_eq!(factory.pool().outstanding(), 1);

    image.dispose();
    image.dispose();
    assert!(image.is_disposed());
    assert!(matches!(image.raw_buffer(), Err(ImageError::Disposed)));
    drop(image);

    assert_eq!(factory.pool().outstanding(), 0);
    assert_eq!(factory.pool().free_total(), 1);

    // The returned raster is reused for the same shape.
    let again = factory
        .read_image(&mut Cursor::new(solid_png(8, 8, [1, 1, 1, 255])), None, None, &options, None)
        .unwrap()
        .unwrap();
    assert_eq!(factory.pool().free_total(), 0);
    assert_eq!(again.width().unwrap(), 8);
}

/// Pooled decodes beyond capacity wait until a raster is surrendered.
#[test]
fn test_pool_capacity_blocks_until_surrender() {
    let factory = Arc::new(small_factory());
    let options = DecodeOptions::new().with_pooled_buffers(true);
    let png = solid_png(4, 4, [5, 5, 5, 255]);

    let first = factory
        .read_image(&mut Cursor::new(png.clone()), None, None, &options, None)
        .unwrap()
        .unwrap();
    let second = factory
        .read_image(&mut Cursor::new(png.clone()), None, None, &options, None)
        .unwrap()
        .unwrap();
    assert_eq!(factory.pool().outstanding(), 2);

    let waiter = {
        let factory = Arc::clone(&factory);
        std::thread::spawn(move || {
            factory
                .read_image(&mut Cursor::new(png), None, None, &options, None)
                .unwrap()
                .map(|image| image.width().unwrap())
        })
    };

    std::thread::sleep(Duration::from_millis(50));
    drop(first);
    assert_eq!(waiter.join().unwrap(), Some(4));
    drop(second);
    assert_eq!(factory.pool().outstanding(), 0);
}

/// A cancelled source reports no image rather than an error.
#[test]
fn test_cancelled_source_yields_none() {
    let token = CancellationToken::new();
    token.cancel();
    let mut source = CancellableSource::new(Cursor::new(solid_png(4, 4, [0; 4])), token);

    let image = small_factory()
        .read_image(&mut source, None, Some("image/png"), &DecodeOptions::new(), None)
        .unwrap();
    assert!(image.is_none());
}

/// Metrics record both phases of an eager conversion.
#[test]
fn test_metrics_recorded() {
    let mut metrics = ImageMetrics::new();
    small_factory()
        .read_image(
            &mut Cursor::new(solid_png(32, 32, [200, 10, 10, 255])),
            None,
            None,
            &DecodeOptions::new().with_prefer_dds(true),
            Some(&mut metrics),
        )
        .unwrap()
        .unwrap();

    assert!(metrics.decode_time().is_some());
    assert!(metrics.encode_time().is_some());
}

/// Streamed output on a tokio runtime equals the eager encode.
#[test]
fn test_stream_on_tokio_matches_eager() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap();
    let factory = small_factory();
    let png = solid_png(16, 8, [30, 60, 90, 255]);

    let mut stream = factory
        .read_image_as_dds_stream(
            &mut Cursor::new(png.clone()),
            Some("image/png"),
            None,
            None,
            runtime.handle(),
        )
        .unwrap();
    let mut streamed = Vec::new();
    stream.read_to_end(&mut streamed).unwrap();

    let eager = factory
        .read_image(
            &mut Cursor::new(png),
            None,
            None,
            &DecodeOptions::new().with_prefer_dds(true),
            None,
        )
        .unwrap()
        .unwrap();

    assert_eq!(streamed.as_slice(), eager.raw_buffer().unwrap().as_ref());
    let info = DdsHeaderInfo::parse(&streamed).unwrap();
    assert_eq!((info.width, info.height), (16, 8));
    assert_eq!(factory.pool().outstanding(), 0);
}

/// The free function streams through the shared executor.
#[test]
fn test_static_stream_api() {
    let mut stream = imagelayer::read_image_as_dds_stream(
        &mut Cursor::new(solid_png(4, 4, [1, 2, 3, 255])),
        None,
        None,
        None,
        None,
    )
    .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();

    let dds = DdsImage::from_bytes(out);
    assert_eq!(dds.compression_type().unwrap(), CompressionType::Dxt5);
    assert_eq!(dds.width().unwrap(), 4);
}

/// The static stream API also accepts a caller-supplied executor.
#[test]
fn test_static_stream_api_with_executor() {
    let mut stream = imagelayer::read_image_as_dds_stream(
        &mut Cursor::new(solid_png(4, 4, [1, 2, 3, 255])),
        None,
        None,
        None,
        Some(&InlineExecutor),
    )
    .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(DdsImage::from_bytes(out).height().unwrap(), 4);
}

/// A transparent raster streams as a header-only DDS.
#[test]
fn test_transparent_stream_is_header_only() {
    let mut stream = small_factory()
        .read_image_as_dds_stream(
            &mut Cursor::new(solid_png(8, 8, [0, 0, 0, 0])),
            None,
            None,
            None,
            &InlineExecutor,
        )
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();

    assert_eq!(out.len(), HEADER_SIZE);
    assert!(DdsImage::from_bytes(out).is_blank().unwrap());
}

/// Configuration loads from an INI file and reaches the pool.
#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imagelayer.ini");
    std::fs::write(
        &path,
        "[pool]\ncapacity = 3\nwait_tick_ms = 20\n\n[decode]\ncheck_blank = false\n",
    )
    .unwrap();

    let config = TranscodeConfig::load_from(&path).unwrap();
    assert_eq!(config.pool_capacity, 3);
    assert_eq!(config.pool_wait_tick, Duration::from_millis(20));
    assert!(!config.check_blank);

    let factory = ImageFactory::new(config);
    assert_eq!(factory.pool().capacity(), 3);
}

/// Terrain samples pass through untouched with hinted dimensions.
#[test]
fn test_terrain_roundtrip_region() {
    let samples: Vec<u8> = (0u16..6 * 4).flat_map(|v| v.to_le_bytes()).collect();
    let image = small_factory()
        .read_image(
            &mut Cursor::new(samples),
            None,
            Some("application/bil16"),
            &DecodeOptions::new().with_dimensions(6, 4),
            None,
        )
        .unwrap()
        .unwrap();

    assert_eq!(image.format(), ImageFormat::Terrain);
    // Row 2, columns 1..3 are samples 13 and 14.
    assert_eq!(
        image.region_buffer(&Rect::new(1, 2, 2, 1)).unwrap(),
        vec![13, 0, 14, 0]
    );
}
