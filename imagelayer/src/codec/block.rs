//! Software decoder for DXT block surfaces and uncompressed DDS pixels.
//!
//! BC1 blocks are 8 bytes: two RGB565 endpoints then 16 two-bit indices.
//! BC2 prefixes a block of 16 explicit 4-bit alphas; BC3 prefixes two alpha
//! endpoints and 16 three-bit indices.

use super::conversion::{alpha_palette, color_palette};
use super::DdsDecodeProvider;
use crate::image::{CompressionType, ImageError};

/// Decodes DXT1-5 and the uncompressed ARGB/XRGB/RGB encodings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockDecodeProvider;

impl DdsDecodeProvider for BlockDecodeProvider {
    fn name(&self) -> &str {
        "block"
    }

    fn decode(
        &self,
        data: &[u8],
        compression: CompressionType,
        width: u32,
        height: u32,
    ) -> Result<Option<Vec<u8>>, ImageError> {
        let needed = match compression.surface_size(width, height) {
            Some(needed) => needed,
            None => return Ok(None),
        };
        if data.len() < needed {
            return Err(ImageError::Decode(format!(
                "{} surface {}x{} needs {} bytes, got {}",
                compression,
                width,
                height,
                needed,
                data.len()
            )));
        }

        let (w, h) = (width as usize, height as usize);
        let rgba = match compression {
            CompressionType::Dxt1 => decode_blocks(data, w, h, 8, |b| decode_bc1(b, true)),
            CompressionType::Dxt2 | CompressionType::Dxt3 => {
                decode_blocks(data, w, h, 16, decode_bc2)
            }
            CompressionType::Dxt4 | CompressionType::Dxt5 => {
                decode_blocks(data, w, h, 16, decode_bc3)
            }
            CompressionType::A8R8G8B8 => unpack(data, w * h, 4, |p| [p[2], p[1], p[0], p[3]]),
            CompressionType::X8R8G8B8 => unpack(data, w * h, 4, |p| [p[2], p[1], p[0], 255]),
            CompressionType::R8G8B8 => unpack(data, w * h, 3, |p| [p[2], p[1], p[0], 255]),
            CompressionType::Undefined => return Ok(None),
        };
        Ok(Some(rgba))
    }
}

fn unpack(data: &[u8], pixels: usize, bpp: usize, f: impl Fn(&[u8]) -> [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels * 4);
    for px in data.chunks_exact(bpp).take(pixels) {
        out.extend_from_slice(&f(px));
    }
    out
}

fn decode_blocks(
    data: &[u8],
    width: usize,
    height: usize,
    block_size: usize,
    decode: impl Fn(&[u8]) -> [[u8; 4]; 16],
) -> Vec<u8> {
    let blocks_wide = width.div_ceil(4);
    let mut out = vec![0u8; width * height * 4];

    for (index, block) in data.chunks_exact(block_size).enumerate() {
        let bx = (index % blocks_wide) * 4;
        let by = (index / blocks_wide) * 4;
        if by >= height {
            break;
        }
        let pixels = decode(block);
        for (i, px) in pixels.iter().enumerate() {
            let (x, y) = (bx + i % 4, by + i / 4);
            if x < width && y < height {
                let offset = (y * width + x) * 4;
                out[offset..offset + 4].copy_from_slice(px);
            }
        }
    }
    out
}

fn color_block(block: &[u8], punch_through: bool) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    let palette = color_palette(c0, c1, punch_through);

    let mut pixels = [[0u8; 4]; 16];
    for (i, px) in pixels.iter_mut().enumerate() {
        *px = palette[((indices >> (i * 2)) & 0b11) as usize];
    }
    pixels
}

fn decode_bc1(block: &[u8], punch_through: bool) -> [[u8; 4]; 16] {
    color_block(block, punch_through)
}

fn decode_bc2(block: &[u8]) -> [[u8; 4]; 16] {
    let mut pixels = color_block(&block[8..16], false);
    let alphas = u64::from_le_bytes([
        block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
    ]);
    for (i, px) in pixels.iter_mut().enumerate() {
        let a4 = ((alphas >> (i * 4)) & 0xF) as u8;
        px[3] = a4 << 4 | a4;
    }
    pixels
}

fn decode_bc3(block: &[u8]) -> [[u8; 4]; 16] {
    let mut pixels = color_block(&block[8..16], false);
    let palette = alpha_palette(block[0], block[1]);
    let mut bits = [0u8; 8];
    bits[..6].copy_from_slice(&block[2..8]);
    let indices = u64::from_le_bytes(bits);
    for (i, px) in pixels.iter_mut().enumerate() {
        px[3] = palette[((indices >> (i * 3)) & 0b111) as usize];
    }
    pixels
}
