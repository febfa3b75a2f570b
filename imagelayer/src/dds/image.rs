//! DDS-native images: a buffer that already holds header and surfaces.

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use lightweight_mmap::handles::ReadOnlyFileHandle;
use lightweight_mmap::mmap::ReadOnlyMmap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::header::{
    read_dimension, read_fourcc, DdsHeader, DdsHeaderInfo, FOURCC_OFFSET, HEADER_SIZE,
    HEIGHT_OFFSET, WIDTH_OFFSET,
};
use crate::factory::ImageFormat;
use crate::image::{CompressionType, Image, ImageError, Rect};
use crate::pool::ByteBufferPool;

/// File size from which [`DdsImage::from_file`] maps instead of reading.
pub const MMAP_THRESHOLD: u64 = 1 << 20;

fn mmap_error(e: impl std::fmt::Display) -> ImageError {
    ImageError::Io(io::Error::other(e.to_string()))
}

fn map_file(name: &str) -> Result<Bytes, ImageError> {
    let handle = ReadOnlyFileHandle::open(name).map_err(mmap_error)?;
    let size = handle.size().map_err(mmap_error)? as usize;
    let mapping = ReadOnlyMmap::new(&handle, 0, size).map_err(mmap_error)?;
    let data = mapping.as_slice();
    if data.len() < HEADER_SIZE {
        return Err(ImageError::InvalidHeader(format!(
            "DDS file is {} bytes, header needs {}",
            data.len(),
            HEADER_SIZE
        )));
    }
    Ok(Bytes::copy_from_slice(data))
}

/// Backing bytes, either shared or borrowed from a buffer pool.
enum Payload {
    Shared(Bytes),
    Pooled {
        buffer: Cursor<Vec<u8>>,
        pool: ByteBufferPool,
    },
}

impl Payload {
    fn as_slice(&self) -> &[u8] {
        match self {
            Payload::Shared(bytes) => bytes,
            Payload::Pooled { buffer, .. } => buffer.get_ref(),
        }
    }

    fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Shared(bytes) => bytes.clone(),
            Payload::Pooled { buffer, .. } => Bytes::copy_from_slice(buffer.get_ref()),
        }
    }

    fn release(self) {
        if let Payload::Pooled { mut buffer, pool } = self {
            buffer.set_position(0);
            pool.surrender(buffer);
        }
    }
}

/// A DDS file held in memory.
///
/// Dimensions and compression are read from the header on every access, so
/// they always reflect the current backing buffer. A header-only buffer (no
/// surface data) counts as blank.
///
/// [`DdsImage::blank`] builds the sentinel returned for fully transparent
/// sources: it knows its size and nothing else.
pub struct DdsImage {
    blank: Option<(u32, u32)>,
    payload: Mutex<Option<Payload>>,
    disposed: AtomicBool,
}

impl DdsImage {
    /// Wrap an in-memory DDS buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::with_payload(Payload::Shared(data.into()))
    }

    /// Wrap a buffer, checking that it holds at least a full header.
    pub fn from_buffer(data: impl Into<Bytes>) -> Result<Self, ImageError> {
        let data = data.into();
        if data.len() < HEADER_SIZE {
            return Err(ImageError::InvalidHeader(format!(
                "DDS buffer is {} bytes, header needs {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        Ok(Self::from_bytes(data))
    }

    /// Load a DDS file from disk.
    ///
    /// Files of at least [`MMAP_THRESHOLD`] bytes are memory-mapped and
    /// copied once into an exact-size buffer; smaller ones are read directly.
    pub fn from_file(path: &Path) -> Result<Self, ImageError> {
        let len = fs::metadata(path)?.len();
        let data = match path.to_str() {
            Some(name) if len >= MMAP_THRESHOLD => map_file(name)?,
            _ => Bytes::from(fs::read(path)?),
        };
        debug!(path = %path.display(), bytes = data.len(), "Loaded DDS file");
        Self::from_buffer(data)
    }

    /// The blank sentinel for a `width × height` source.
    ///
    /// Only the dimensions, `is_blank` and `size_in_bytes` are defined; every
    /// other accessor fails with [`ImageError::Unsupported`].
    pub fn blank(height: u32, width: u32) -> Self {
        Self {
            blank: Some((height, width)),
            payload: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// A header-only DDS describing a blank `width × height` surface.
    pub fn blank_stream_bytes(width: u32, height: u32, compression: CompressionType) -> Bytes {
        Bytes::from(DdsHeader::new(width, height, 1, compression).to_bytes())
    }

    fn with_payload(payload: Payload) -> Self {
        Self {
            blank: None,
            payload: Mutex::new(Some(payload)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Run `f` over the current bytes.
    fn with_data<T>(&self, f: impl FnOnce(&[u8]) -> Result<T, ImageError>) -> Result<T, ImageError> {
        if self.blank.is_some() {
            if self.is_disposed() {
                return Err(ImageError::Disposed);
            }
            return Err(ImageError::Unsupported("blank DDS has no data"));
        }
        let payload = self.payload.lock();
        match payload.as_ref() {
            Some(payload) => f(payload.as_slice()),
            None => Err(ImageError::Disposed),
        }
    }

    fn replace_payload(&self, payload: Payload) -> Result<(), ImageError> {
        if self.blank.is_some() {
            payload.release();
            return Err(ImageError::Unsupported("blank DDS has no data"));
        }
        let mut slot = self.payload.lock();
        if slot.is_none() {
            drop(slot);
            payload.release();
            return Err(ImageError::Disposed);
        }
        if let Some(previous) = slot.replace(payload) {
            previous.release();
        }
        Ok(())
    }

    /// Parse the full header.
    pub fn header(&self) -> Result<DdsHeaderInfo, ImageError> {
        self.with_data(DdsHeaderInfo::parse)
    }

    /// Write the backing bytes verbatim.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), ImageError> {
        self.with_data(|data| writer.write_all(data).map_err(ImageError::from))
    }

    /// Replace the backing bytes with everything `reader` yields.
    pub fn read_from<R: Read + ?Sized>(&self, reader: &mut R) -> Result<(), ImageError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if data.len() < HEADER_SIZE {
            return Err(ImageError::InvalidHeader(format!(
                "serialized DDS is {} bytes, header needs {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        self.replace_payload(Payload::Shared(Bytes::from(data)))
    }

    /// Replace the backing bytes with exactly `len` bytes read into a pooled
    /// buffer.
    ///
    /// The buffer goes back to `pool` when it is itself replaced or the image
    /// is disposed.
    pub fn read_from_pooled<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        len: usize,
        pool: &ByteBufferPool,
    ) -> Result<(), ImageError> {
        if len < HEADER_SIZE {
            return Err(ImageError::InvalidHeader(format!(
                "serialized DDS is {} bytes, header needs {}",
                len, HEADER_SIZE
            )));
        }
        let mut buffer = pool.take(len);
        if let Err(e) = reader.read_exact(buffer.get_mut()) {
            pool.surrender(buffer);
            return Err(e.into());
        }
        self.replace_payload(Payload::Pooled {
            buffer,
            pool: pool.clone(),
        })
    }
}

impl Image for DdsImage {
    fn width(&self) -> Result<u32, ImageError> {
        if let Some((_, width)) = self.blank {
            return self.blank_field(width);
        }
        self.with_data(|data| read_dimension(data, WIDTH_OFFSET))
    }

    fn height(&self) -> Result<u32, ImageError> {
        if let Some((height, _)) = self.blank {
            return self.blank_field(height);
        }
        self.with_data(|data| read_dimension(data, HEIGHT_OFFSET))
    }

    fn size_in_bytes(&self) -> Result<usize, ImageError> {
        if self.blank.is_some() {
            return self.blank_field(0);
        }
        self.with_data(|data| Ok(data.len()))
    }

    fn is_blank(&self) -> Result<bool, ImageError> {
        if self.blank.is_some() {
            return self.blank_field(true);
        }
        self.with_data(|data| Ok(data.len() <= HEADER_SIZE))
    }

    fn raw_buffer(&self) -> Result<Bytes, ImageError> {
        if self.blank.is_some() {
            return self.with_data(|_| Ok(Bytes::new()));
        }
        let payload = self.payload.lock();
        payload
            .as_ref()
            .map(Payload::to_bytes)
            .ok_or(ImageError::Disposed)
    }

    /// Copy a sub-rectangle of the payload.
    ///
    /// Offsets treat the payload as one byte per pixel, independent of the
    /// compression type. A full-width region is copied in one piece;
    /// otherwise row by row.
    fn region_buffer(&self, rect: &Rect) -> Result<Vec<u8>, ImageError> {
        self.with_data(|data| {
            let width = read_dimension(data, WIDTH_OFFSET)? as usize;
            let (x, y) = (rect.x as usize, rect.y as usize);
            let (rw, rh) = (rect.width as usize, rect.height as usize);

            let start = HEADER_SIZE + y * width + x;
            let end = if rh == 0 {
                start
            } else {
                HEADER_SIZE + (y + rh - 1) * width + x + rw
            };
            if end > data.len() {
                return Err(ImageError::InvalidConfig(format!(
                    "region {}x{} at ({}, {}) exceeds DDS payload of {} bytes",
                    rw,
                    rh,
                    x,
                    y,
                    data.len().saturating_sub(HEADER_SIZE)
                )));
            }

            if rw == width {
                return Ok(data[start..start + rw * rh].to_vec());
            }

            let mut out = Vec::with_capacity(rw * rh);
            for row in 0..rh {
                let offset = HEADER_SIZE + (y + row) * width + x;
                out.extend_from_slice(&data[offset..offset + rw]);
            }
            Ok(out)
        })
    }

    fn compression_type(&self) -> Result<CompressionType, ImageError> {
        self.with_data(|data| {
            let tag = read_fourcc(data, FOURCC_OFFSET)?;
            Ok(CompressionType::from_fourcc(&tag))
        })
    }

    fn set_raw_buffer(&self, data: Bytes) -> Result<(), ImageError> {
        self.replace_payload(Payload::Shared(data))
    }

    fn set_dimension_hint(&self, width: u32, height: u32) {
        if let (Ok(actual_w), Ok(actual_h)) = (self.width(), self.height()) {
            if (actual_w, actual_h) != (width, height) {
                warn!(
                    hint_width = width,
                    hint_height = height,
                    width = actual_w,
                    height = actual_h,
                    "Dimension hint disagrees with DDS header, keeping header"
                );
            }
        }
    }

    fn set_compression_hint(&self, compression: CompressionType) {
        if let Ok(actual) = self.compression_type() {
            if actual != compression {
                warn!(
                    hint = %compression,
                    actual = %actual,
                    "Compression hint disagrees with DDS header, keeping header"
                );
            }
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let taken = self.payload.lock().take();
        if let Some(payload) = taken {
            payload.release();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn format(&self) -> ImageFormat {
        ImageFormat::Dds
    }
}

impl DdsImage {
    fn blank_field<T>(&self, value: T) -> Result<T, ImageError> {
        if self.is_disposed() {
            Err(ImageError::Disposed)
        } else {
            Ok(value)
        }
    }
}

impl Drop for DdsImage {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dds(width: u32, height: u32, compression: CompressionType, payload: usize) -> Vec<u8> {
        let mut data = DdsHeader::new(width, height, 1, compression).to_bytes();
        data.extend((0..payload).map(|i| (i % 251) as u8));
        data
    }

    #[test]
    fn test_dimensions_from_header() {
        let image = DdsImage::from_bytes(dds(64, 32, CompressionType::Dxt1, 1024));
        assert_eq!(image.width().unwrap(), 64);
        assert_eq!(image.height().unwrap(), 32);
        assert_eq!(image.size_in_bytes().unwrap(), HEADER_SIZE + 1024);
        assert!(!image.is_blank().unwrap());
    }

    #[test]
    fn test_compression_from_fourcc() {
        let image = DdsImage::from_bytes(dds(4, 4, CompressionType::A8R8G8B8, 64));
        assert_eq!(image.compression_type().unwrap(), CompressionType::A8R8G8B8);

        let mut data = dds(4, 4, CompressionType::Dxt1, 8);
        data[FOURCC_OFFSET..FOURCC_OFFSET + 4].copy_from_slice(b"ZZZZ");
        let image = DdsImage::from_bytes(data);
        assert_eq!(image.compression_type().unwrap(), CompressionType::Undefined);
    }

    #[test]
    fn test_blank_sentinel() {
        let blank = DdsImage::blank(64, 128);
        assert_eq!(blank.height().unwrap(), 64);
        assert_eq!(blank.width().unwrap(), 128);
        assert!(blank.is_blank().unwrap());
        assert_eq!(blank.size_in_bytes().unwrap(), 0);
        assert!(matches!(blank.raw_buffer(), Err(ImageError::Unsupported(_))));
        assert!(matches!(
            blank.compression_type(),
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(
            blank.region_buffer(&Rect::full(1, 1)),
            Err(ImageError::Unsupported(_))
        ));
    }

    #[test]
    fn test_header_only_is_blank() {
        let image = DdsImage::from_bytes(DdsImage::blank_stream_bytes(8, 8, CompressionType::Dxt5));
        assert!(image.is_blank().unwrap());
        assert_eq!(image.width().unwrap(), 8);
    }

    #[test]
    fn test_region_full_width_matches_reference() {
        let data = dds(8, 8, CompressionType::Dxt5, 64);
        let image = DdsImage::from_bytes(data.clone());
        let region = image.region_buffer(&Rect::new(0, 2, 8, 3)).unwrap();
        let start = HEADER_SIZE + 2 * 8;
        assert_eq!(region, data[start..start + 24].to_vec());
    }

    #[test]
    fn test_region_rows_match_reference() {
        let data = dds(8, 8, CompressionType::Dxt5, 64);
        let image = DdsImage::from_bytes(data.clone());
        let region = image.region_buffer(&Rect::new(2, 1, 3, 2)).unwrap();

        let mut expected = Vec::new();
        for row in 1..3 {
            let offset = HEADER_SIZE + row * 8 + 2;
            expected.extend_from_slice(&data[offset..offset + 3]);
        }
        assert_eq!(region, expected);
    }

    #[test]
    fn test_region_out_of_range() {
        let image = DdsImage::from_bytes(dds(8, 8, CompressionType::Dxt5, 64));
        assert!(image.region_buffer(&Rect::new(0, 7, 8, 2)).is_err());
    }

    #[test]
    fn test_dispose_idempotent() {
        let image = DdsImage::from_bytes(dds(4, 4, CompressionType::Dxt1, 8));
        image.dispose();
        image.dispose();
        assert!(image.is_disposed());
        assert!(matches!(image.width(), Err(ImageError::Disposed)));
        assert!(matches!(image.raw_buffer(), Err(ImageError::Disposed)));
        assert!(matches!(
            image.set_raw_buffer(Bytes::new()),
            Err(ImageError::Disposed)
        ));

        let blank = DdsImage::blank(4, 4);
        blank.dispose();
        assert!(matches!(blank.width(), Err(ImageError::Disposed)));
    }

    #[test]
    fn test_write_then_read_preserves_bytes() {
        let data = dds(16, 16, CompressionType::Dxt1, 128);
        let image = DdsImage::from_bytes(data.clone());
        let mut out = Vec::new();
        image.write_to(&mut out).unwrap();
        assert_eq!(out, data);

        let target = DdsImage::from_bytes(dds(4, 4, CompressionType::Dxt1, 8));
        target.read_from(&mut out.as_slice()).unwrap();
        assert_eq!(target.width().unwrap(), 16);
        assert_eq!(target.raw_buffer().unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_pooled_buffers_are_reused() {
        let pool = ByteBufferPool::new(2, Duration::from_secs(60), Duration::from_secs(60));
        let data = dds(16, 16, CompressionType::Dxt1, 128);
        let image = DdsImage::from_bytes(dds(4, 4, CompressionType::Dxt1, 8));

        image
            .read_from_pooled(&mut data.as_slice(), data.len(), &pool)
            .unwrap();
        assert_eq!(pool.outstanding(), 1);

        // Replacing returns the previous pooled buffer.
        image
            .read_from_pooled(&mut data.as_slice(), data.len(), &pool)
            .unwrap();
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.free_count(data.len()), 1);

        image.dispose();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.free_count(data.len()), 2);
    }

    #[test]
    fn test_pooled_short_read_returns_buffer() {
        let pool = ByteBufferPool::new(2, Duration::from_secs(60), Duration::from_secs(60));
        let image = DdsImage::from_bytes(dds(4, 4, CompressionType::Dxt1, 8));
        let short = vec![0u8; 64];
        assert!(image
            .read_from_pooled(&mut short.as_slice(), 256, &pool)
            .unwrap_err()
            .is_io());
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.dds");
        std::fs::write(&path, dds(8, 4, CompressionType::Dxt1, 16)).unwrap();

        let image = DdsImage::from_file(&path).unwrap();
        assert_eq!((image.width().unwrap(), image.height().unwrap()), (8, 4));
    }

    #[test]
    fn test_from_file_maps_large_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.dds");
        let payload = 1024 * 1024;
        let data = dds(1024, 2048, CompressionType::Dxt5, payload);
        std::fs::write(&path, &data).unwrap();
        assert!(data.len() as u64 >= MMAP_THRESHOLD);

        let image = DdsImage::from_file(&path).unwrap();
        assert_eq!((image.width().unwrap(), image.height().unwrap()), (1024, 2048));
        assert_eq!(image.compression_type().unwrap(), CompressionType::Dxt5);
        assert_eq!(image.size_in_bytes().unwrap(), data.len());
        assert_eq!(image.raw_buffer().unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_from_file_too_short() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dds");
        std::fs::write(&path, b"DDS ").unwrap();
        assert!(matches!(
            DdsImage::from_file(&path),
            Err(ImageError::InvalidHeader(_))
        ));
    }
}
