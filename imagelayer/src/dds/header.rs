//! DDS header layout: byte offsets, parsing and construction.
//!
//! Based on the Microsoft DDS specification:
//! https://docs.microsoft.com/en-us/windows/win32/direct3ddds/dds-header
//!
//! All multi-byte fields are little-endian.

use crate::image::{CompressionType, ImageError};

/// Size of the magic plus the fixed header.
pub const HEADER_SIZE: usize = 128;

/// Magic number at offset 0.
pub const MAGIC: [u8; 4] = *b"DDS ";

/// Offset of the surface height (i32).
pub const HEIGHT_OFFSET: usize = 12;

/// Offset of the surface width (i32).
pub const WIDTH_OFFSET: usize = 16;

/// Offset of the pitch or linear size (u32).
pub const PITCH_OFFSET: usize = 20;

/// Offset of the mipmap count (u32).
pub const MIPMAP_COUNT_OFFSET: usize = 28;

/// Offset of the pixel format fourCC tag.
pub const FOURCC_OFFSET: usize = 84;

// DDS header flags (DDSD_*)
pub const DDSD_CAPS: u32 = 0x1;
pub const DDSD_HEIGHT: u32 = 0x2;
pub const DDSD_WIDTH: u32 = 0x4;
pub const DDSD_PITCH: u32 = 0x8;
pub const DDSD_PIXELFORMAT: u32 = 0x1000;
pub const DDSD_MIPMAPCOUNT: u32 = 0x20000;
pub const DDSD_LINEARSIZE: u32 = 0x80000;

// DDS pixel format flags (DDPF_*)
pub const DDPF_ALPHAPIXELS: u32 = 0x1;
pub const DDPF_FOURCC: u32 = 0x4;
pub const DDPF_RGB: u32 = 0x40;

// DDS caps flags (DDSCAPS_*)
pub const DDSCAPS_COMPLEX: u32 = 0x8;
pub const DDSCAPS_TEXTURE: u32 = 0x1000;
pub const DDSCAPS_MIPMAP: u32 = 0x400000;

/// Read a little-endian i32 at `offset`.
pub(crate) fn read_i32_le(data: &[u8], offset: usize) -> Result<i32, ImageError> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| truncated(data.len()))?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian u32 at `offset`.
pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, ImageError> {
    read_i32_le(data, offset).map(|v| v as u32)
}

/// Read the 4-byte tag at `offset`.
pub(crate) fn read_fourcc(data: &[u8], offset: usize) -> Result<[u8; 4], ImageError> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| truncated(data.len()))?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a non-negative dimension stored as i32.
pub(crate) fn read_dimension(data: &[u8], offset: usize) -> Result<u32, ImageError> {
    let value = read_i32_le(data, offset)?;
    u32::try_from(value)
        .map_err(|_| ImageError::InvalidHeader(format!("negative dimension {} at offset {}", value, offset)))
}

fn truncated(len: usize) -> ImageError {
    ImageError::InvalidHeader(format!(
        "DDS data is {} bytes, header needs {}",
        len, HEADER_SIZE
    ))
}

/// Header fields of an existing DDS buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsHeaderInfo {
    /// Whether the buffer starts with `"DDS "`.
    pub has_magic: bool,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub mipmap_count: u32,
    pub fourcc: [u8; 4],
    pub compression: CompressionType,
    /// Bytes following the header.
    pub payload_len: usize,
}

impl DdsHeaderInfo {
    /// Parse the header of a DDS buffer.
    pub fn parse(data: &[u8]) -> Result<Self, ImageError> {
        if data.len() < HEADER_SIZE {
            return Err(truncated(data.len()));
        }
        let fourcc = read_fourcc(data, FOURCC_OFFSET)?;
        Ok(Self {
            has_magic: data[..4] == MAGIC,
            height: read_dimension(data, HEIGHT_OFFSET)?,
            width: read_dimension(data, WIDTH_OFFSET)?,
            pitch_or_linear_size: read_u32_le(data, PITCH_OFFSET)?,
            mipmap_count: read_u32_le(data, MIPMAP_COUNT_OFFSET)?,
            fourcc,
            compression: CompressionType::from_fourcc(&fourcc),
            payload_len: data.len() - HEADER_SIZE,
        })
    }

    /// The fourCC tag as text, non-printable bytes replaced.
    pub fn fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }
}

/// DDS header to be written ahead of encoded surfaces.
#[derive(Debug, Clone)]
pub struct DdsHeader {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub mipmap_count: u32,
    pub pixel_flags: u32,
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub bit_masks: [u32; 4],
    pub caps: u32,
}

impl DdsHeader {
    /// Create a header for a surface of the given dimensions and encoding.
    ///
    /// # Arguments
    ///
    /// * `width` - Texture width in pixels
    /// * `height` - Texture height in pixels
    /// * `mipmap_count` - Number of mipmap levels (1 = no mipmaps)
    /// * `compression` - Encoding of the payload
    pub fn new(width: u32, height: u32, mipmap_count: u32, compression: CompressionType) -> Self {
        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
        let mut pixel_flags = DDPF_FOURCC;
        let mut rgb_bit_count = 0;
        let mut bit_masks = [0u32; 4];

        let pitch_or_linear_size = if compression.is_compressed() {
            flags |= DDSD_LINEARSIZE;
            compression.surface_size(width, height).unwrap_or(0) as u32
        } else {
            flags |= DDSD_PITCH;
            let bpp = compression.bytes_per_pixel().unwrap_or(0) as u32;
            if bpp > 0 {
                pixel_flags |= DDPF_RGB;
                rgb_bit_count = bpp * 8;
                bit_masks = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0];
            }
            if compression == CompressionType::A8R8G8B8 {
                pixel_flags |= DDPF_ALPHAPIXELS;
                bit_masks[3] = 0xFF00_0000;
            }
            width * bpp
        };

        let mut caps = DDSCAPS_TEXTURE;
        if mipmap_count > 1 {
            flags |= DDSD_MIPMAPCOUNT;
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }

        Self {
            flags,
            height,
            width,
            pitch_or_linear_size,
            mipmap_count,
            pixel_flags,
            fourcc: compression.fourcc(),
            rgb_bit_count,
            bit_masks,
            caps,
        }
    }

    /// Serialize to the 128-byte on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);

        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&124u32.to_le_bytes());
        bytes.extend_from_slice(&self.flags.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.pitch_or_linear_size.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // depth
        bytes.extend_from_slice(&self.mipmap_count.to_le_bytes());

        // Reserved1 (11 × u32)
        bytes.extend_from_slice(&[0u8; 44]);

        // Pixel format (32 bytes)
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend_from_slice(&self.pixel_flags.to_le_bytes());
        bytes.extend_from_slice(&self.fourcc);
        bytes.extend_from_slice(&self.rgb_bit_count.to_le_bytes());
        for mask in self.bit_masks {
            bytes.extend_from_slice(&mask.to_le_bytes());
        }

        // Caps, caps2..4, reserved2
        bytes.extend_from_slice(&self.caps.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);

        bytes
    }
}
