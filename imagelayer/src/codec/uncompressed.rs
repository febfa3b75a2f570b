//! Uncompressed DDS output: 32-bit ARGB/XRGB and 24-bit RGB.
//!
//! Pixels are little-endian words, so each is stored blue first.

use std::io::Read;
use std::sync::Arc;

use super::stream::{spawn_encode, ChunkSender};
use super::{CompletionCallback, DdsEncodeProvider};
use crate::dds::DdsHeader;
use crate::executor::Executor;
use crate::image::{CompressionType, EncodingError};
use crate::raster::Raster;

/// Rows per chunk when streaming.
const ROWS_PER_CHUNK: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct UncompressedEncodeProvider;

impl UncompressedEncodeProvider {
    fn bytes_per_pixel(compression: CompressionType) -> Result<usize, EncodingError> {
        match compression {
            CompressionType::A8R8G8B8 | CompressionType::X8R8G8B8 | CompressionType::R8G8B8 => {
                Ok(compression.bytes_per_pixel().unwrap_or(4))
            }
            other => Err(EncodingError::new(format!(
                "uncompressed encoder does not produce {}",
                other
            ))),
        }
    }

    fn pack_rows(
        raster: &Raster,
        compression: CompressionType,
        rows: std::ops::Range<usize>,
    ) -> Vec<u8> {
        let width = raster.width() as usize;
        let layout = raster.layout();
        let src_bpp = layout.bytes_per_pixel();
        let dst_bpp = compression.bytes_per_pixel().unwrap_or(4);
        let mut out = Vec::with_capacity(rows.len() * width * dst_bpp);

        for y in rows {
            let row = &raster.data()[y * width * src_bpp..(y + 1) * width * src_bpp];
            for px in row.chunks_exact(src_bpp) {
                let [r, g, b, a] = layout.read_rgba(px);
                match compression {
                    CompressionType::A8R8G8B8 => out.extend_from_slice(&[b, g, r, a]),
                    CompressionType::X8R8G8B8 => out.extend_from_slice(&[b, g, r, 0xFF]),
                    _ => out.extend_from_slice(&[b, g, r]),
                }
            }
        }
        out
    }

    fn encode_chunks(
        raster: &Raster,
        compression: CompressionType,
        mut emit: impl FnMut(Vec<u8>) -> bool,
    ) -> Result<(), EncodingError> {
        Self::bytes_per_pixel(compression)?;
        let height = raster.height() as usize;
        if !emit(DdsHeader::new(raster.width(), raster.height(), 1, compression).to_bytes()) {
            return Ok(());
        }
        let mut start = 0;
        while start < height {
            let end = (start + ROWS_PER_CHUNK).min(height);
            if !emit(Self::pack_rows(raster, compression, start..end)) {
                break;
            }
            start = end;
        }
        Ok(())
    }
}

impl DdsEncodeProvider for UncompressedEncodeProvider {
    fn name(&self) -> &str {
        "uncompressed"
    }

    fn encode(
        &self,
        raster: &Raster,
        compression: CompressionType,
    ) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        Self::encode_chunks(raster, compression, |chunk| {
            out.extend_from_slice(&chunk);
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
        Self::bytes_per_pixel(compression)?;
        Ok(spawn_encode(
            executor,
            raster,
            move |raster: &Raster, tx: &ChunkSender| {
                Self::encode_chunks(raster, compression, |chunk| tx.send(chunk))
            },
            on_complete,
        ))
    }
}
