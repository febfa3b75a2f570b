//! In-memory pixel layouts of decoded rasters.

use std::fmt;

/// Byte order of one pixel in a decoded raster buffer.
///
/// Byte-reversed layouts (`Abgr8`, `Bgr8`) are what the DDS encoders consume
/// most directly, so decoders prefer them when offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// A, B, G, R — leading alpha, byte-reversed colour.
    Abgr8,
    /// A, R, G, B — leading alpha.
    Argb8,
    /// R, G, B, A.
    Rgba8,
    /// B, G, R — byte-reversed colour.
    Bgr8,
    /// R, G, B.
    Rgb8,
    /// Single grey channel.
    Luma8,
    /// Grey then alpha.
    LumaA8,
}

impl PixelLayout {
    /// Size of one pixel in bytes.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelLayout::Abgr8 | PixelLayout::Argb8 | PixelLayout::Rgba8 => 4,
            PixelLayout::Bgr8 | PixelLayout::Rgb8 => 3,
            PixelLayout::LumaA8 => 2,
            PixelLayout::Luma8 => 1,
        }
    }

    /// Whether pixels carry an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.alpha_offset().is_some()
    }

    /// Byte offset of the alpha channel within a pixel.
    pub fn alpha_offset(&self) -> Option<usize> {
        match self {
            PixelLayout::Abgr8 | PixelLayout::Argb8 => Some(0),
            PixelLayout::Rgba8 => Some(3),
            PixelLayout::LumaA8 => Some(1),
            PixelLayout::Bgr8 | PixelLayout::Rgb8 | PixelLayout::Luma8 => None,
        }
    }

    /// Whether colour channels are stored blue first.
    pub fn is_byte_reversed(&self) -> bool {
        matches!(self, PixelLayout::Abgr8 | PixelLayout::Bgr8)
    }

    /// Four bytes per pixel with alpha in the first byte.
    pub fn has_leading_alpha(&self) -> bool {
        self.bytes_per_pixel() == 4 && self.alpha_offset() == Some(0)
    }

    /// Write one pixel given as straight RGBA into `out` in this layout.
    pub fn write_rgba(&self, rgba: [u8; 4], out: &mut [u8]) {
        let [r, g, b, a] = rgba;
        match self {
            PixelLayout::Abgr8 => out[..4].copy_from_slice(&[a, b, g, r]),
            PixelLayout::Argb8 => out[..4].copy_from_slice(&[a, r, g, b]),
            PixelLayout::Rgba8 => out[..4].copy_from_slice(&[r, g, b, a]),
            PixelLayout::Bgr8 => out[..3].copy_from_slice(&[b, g, r]),
            PixelLayout::Rgb8 => out[..3].copy_from_slice(&[r, g, b]),
            PixelLayout::Luma8 => out[0] = luma(r, g, b),
            PixelLayout::LumaA8 => out[..2].copy_from_slice(&[luma(r, g, b), a]),
        }
    }

    /// Read one pixel in this layout back as straight RGBA.
    pub fn read_rgba(&self, px: &[u8]) -> [u8; 4] {
        match self {
            PixelLayout::Abgr8 => [px[3], px[2], px[1], px[0]],
            PixelLayout::Argb8 => [px[1], px[2], px[3], px[0]],
            PixelLayout::Rgba8 => [px[0], px[1], px[2], px[3]],
            PixelLayout::Bgr8 => [px[2], px[1], px[0], 255],
            PixelLayout::Rgb8 => [px[0], px[1], px[2], 255],
            PixelLayout::Luma8 => [px[0], px[0], px[0], 255],
            PixelLayout::LumaA8 => [px[0], px[0], px[0], px[1]],
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelLayout::Abgr8 => "ABGR8",
            PixelLayout::Argb8 => "ARGB8",
            PixelLayout::Rgba8 => "RGBA8",
            PixelLayout::Bgr8 => "BGR8",
            PixelLayout::Rgb8 => "RGB8",
            PixelLayout::Luma8 => "L8",
            PixelLayout::LumaA8 => "LA8",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PixelLayout; 7] = [
        PixelLayout::Abgr8,
        PixelLayout::Argb8,
        PixelLayout::Rgba8,
        PixelLayout::Bgr8,
        PixelLayout::Rgb8,
        PixelLayout::Luma8,
        PixelLayout::LumaA8,
    ];

    #[test]
    fn test_leading_alpha() {
        assert!(PixelLayout::Abgr8.has_leading_alpha());
        assert!(PixelLayout::Argb8.has_leading_alpha());
        assert!(!PixelLayout::Rgba8.has_leading_alpha());
        assert!(!PixelLayout::LumaA8.has_leading_alpha());
    }

    #[test]
    fn test_abgr_byte_order() {
        let mut out = [0u8; 4];
        PixelLayout::Abgr8.write_rgba([1, 2, 3, 4], &mut out);
        assert_eq!(out, [4, 3, 2, 1]);
    }

    #[test]
    fn test_colour_layouts_preserve_rgba() {
        for layout in ALL {
            if matches!(layout, PixelLayout::Luma8 | PixelLayout::LumaA8) {
                continue;
            }
            let mut out = [0u8; 4];
            layout.write_rgba([10, 20, 30, 40], &mut out);
            let back = layout.read_rgba(&out);
            assert_eq!(&back[..3], &[10, 20, 30]);
            if layout.has_alpha() {
                assert_eq!(back[3], 40);
            }
        }
    }
}
