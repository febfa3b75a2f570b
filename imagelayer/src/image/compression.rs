//! The closed table of pixel/compression encodings.

use std::fmt;

/// Pixel encoding of a raster, used for format negotiation.
///
/// Three uncompressed Direct3D layouts, the five DXT block formats, and an
/// `Undefined` sentinel. Values carry no ordering semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// 32-bit ARGB (`D3DFMT_A8R8G8B8`).
    A8R8G8B8,
    /// 24-bit RGB (`D3DFMT_R8G8B8`).
    R8G8B8,
    /// 32-bit RGB with an unused byte (`D3DFMT_X8R8G8B8`).
    X8R8G8B8,
    /// DXT1 / BC1, 8 bytes per 4×4 block.
    Dxt1,
    /// DXT2 / BC2 with premultiplied alpha.
    Dxt2,
    /// DXT3 / BC2, explicit 4-bit alpha.
    Dxt3,
    /// DXT4 / BC3 with premultiplied alpha.
    Dxt4,
    /// DXT5 / BC3, interpolated alpha.
    Dxt5,
    /// Not recognised.
    Undefined,
}

impl CompressionType {
    /// Every value of the table, `Undefined` last.
    pub const ALL: [CompressionType; 9] = [
        CompressionType::A8R8G8B8,
        CompressionType::R8G8B8,
        CompressionType::X8R8G8B8,
        CompressionType::Dxt1,
        CompressionType::Dxt2,
        CompressionType::Dxt3,
        CompressionType::Dxt4,
        CompressionType::Dxt5,
        CompressionType::Undefined,
    ];

    /// Map a DDS fourCC tag to a compression type.
    ///
    /// - `"ARGB"` → [`A8R8G8B8`](Self::A8R8G8B8)
    /// - `"RGB?"` (3-character prefix) → [`R8G8B8`](Self::R8G8B8)
    /// - `"XRGB"` → [`X8R8G8B8`](Self::X8R8G8B8)
    /// - `"DXT?"` → DXT1..DXT5 by the 4th character, any other 4th character
    ///   collapses to [`Dxt5`](Self::Dxt5)
    /// - anything else → [`Undefined`](Self::Undefined)
    pub fn from_fourcc(tag: &[u8; 4]) -> Self {
        match tag {
            b"ARGB" => CompressionType::A8R8G8B8,
            b"XRGB" => CompressionType::X8R8G8B8,
            [b'R', b'G', b'B', _] => CompressionType::R8G8B8,
            [b'D', b'X', b'T', variant] => match variant {
                b'1' => CompressionType::Dxt1,
                b'2' => CompressionType::Dxt2,
                b'3' => CompressionType::Dxt3,
                b'4' => CompressionType::Dxt4,
                _ => CompressionType::Dxt5,
            },
            _ => CompressionType::Undefined,
        }
    }

    /// The fourCC tag written into DDS headers for this type.
    ///
    /// `R8G8B8` uses a trailing space so the tag stays 4 bytes wide.
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            CompressionType::A8R8G8B8 => *b"ARGB",
            CompressionType::R8G8B8 => *b"RGB ",
            CompressionType::X8R8G8B8 => *b"XRGB",
            CompressionType::Dxt1 => *b"DXT1",
            CompressionType::Dxt2 => *b"DXT2",
            CompressionType::Dxt3 => *b"DXT3",
            CompressionType::Dxt4 => *b"DXT4",
            CompressionType::Dxt5 => *b"DXT5",
            CompressionType::Undefined => [0; 4],
        }
    }

    /// Whether this is one of the DXT block formats.
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            CompressionType::Dxt1
                | CompressionType::Dxt2
                | CompressionType::Dxt3
                | CompressionType::Dxt4
                | CompressionType::Dxt5
        )
    }

    /// Whether the encoding stores an alpha channel.
    ///
    /// DXT1 is treated as opaque (its 1-bit punch-through mode is not used).
    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            CompressionType::A8R8G8B8
                | CompressionType::Dxt2
                | CompressionType::Dxt3
                | CompressionType::Dxt4
                | CompressionType::Dxt5
        )
    }

    /// Bytes per 4×4 block for DXT formats, `None` otherwise.
    pub fn block_size(&self) -> Option<usize> {
        match self {
            CompressionType::Dxt1 => Some(8),
            CompressionType::Dxt2
            | CompressionType::Dxt3
            | CompressionType::Dxt4
            | CompressionType::Dxt5 => Some(16),
            _ => None,
        }
    }

    /// Bytes per pixel for uncompressed formats, `None` otherwise.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            CompressionType::A8R8G8B8 | CompressionType::X8R8G8B8 => Some(4),
            CompressionType::R8G8B8 => Some(3),
            _ => None,
        }
    }

    /// Payload size in bytes of a single surface of the given dimensions.
    pub fn surface_size(&self, width: u32, height: u32) -> Option<usize> {
        if let Some(block) = self.block_size() {
            let blocks = width.div_ceil(4) as usize * height.div_ceil(4) as usize;
            return Some(blocks * block);
        }
        self.bytes_per_pixel()
            .map(|bpp| width as usize * height as usize * bpp)
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionType::A8R8G8B8 => "D3DFMT_A8R8G8B8",
            CompressionType::R8G8B8 => "D3DFMT_R8G8B8",
            CompressionType::X8R8G8B8 => "D3DFMT_X8R8G8B8",
            CompressionType::Dxt1 => "D3DFMT_DXT1",
            CompressionType::Dxt2 => "D3DFMT_DXT2",
            CompressionType::Dxt3 => "D3DFMT_DXT3",
            CompressionType::Dxt4 => "D3DFMT_DXT4",
            CompressionType::Dxt5 => "D3DFMT_DXT5",
            CompressionType::Undefined => "UNDEFINED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_table() {
        assert_eq!(CompressionType::from_fourcc(b"ARGB"), CompressionType::A8R8G8B8);
        assert_eq!(CompressionType::from_fourcc(b"RGB "), CompressionType::R8G8B8);
        assert_eq!(CompressionType::from_fourcc(b"RGBX"), CompressionType::R8G8B8);
        assert_eq!(CompressionType::from_fourcc(b"XRGB"), CompressionType::X8R8G8B8);
        assert_eq!(CompressionType::from_fourcc(b"DXT1"), CompressionType::Dxt1);
        assert_eq!(CompressionType::from_fourcc(b"DXT2"), CompressionType::Dxt2);
        assert_eq!(CompressionType::from_fourcc(b"DXT3"), CompressionType::Dxt3);
        assert_eq!(CompressionType::from_fourcc(b"DXT4"), CompressionType::Dxt4);
        assert_eq!(CompressionType::from_fourcc(b"DXT5"), CompressionType::Dxt5);
    }

    #[test]
    fn test_unknown_dxt_variant_collapses_to_dxt5() {
        assert_eq!(CompressionType::from_fourcc(b"DXT9"), CompressionType::Dxt5);
        assert_eq!(CompressionType::from_fourcc(b"DXTA"), CompressionType::Dxt5);
    }

    #[test]
    fn test_unrecognised_tags() {
        assert_eq!(CompressionType::from_fourcc(b"DX10"), CompressionType::Undefined);
        assert_eq!(CompressionType::from_fourcc(b"argb"), CompressionType::Undefined);
        assert_eq!(CompressionType::from_fourcc(&[0; 4]), CompressionType::Undefined);
    }

    #[test]
    fn test_fourcc_maps_back() {
        for compression in CompressionType::ALL {
            if compression == CompressionType::Undefined {
                continue;
            }
            assert_eq!(CompressionType::from_fourcc(&compression.fourcc()), compression);
        }
    }

    #[test]
    fn test_argb_is_not_compressed() {
        assert!(!CompressionType::A8R8G8B8.is_compressed());
        assert!(CompressionType::Dxt1.is_compressed());
        assert!(CompressionType::Dxt5.is_compressed());
        assert!(!CompressionType::Undefined.is_compressed());
    }

    #[test]
    fn test_surface_size() {
        assert_eq!(CompressionType::Dxt1.surface_size(256, 256), Some(32768));
        assert_eq!(CompressionType::Dxt5.surface_size(256, 256), Some(65536));
        assert_eq!(CompressionType::A8R8G8B8.surface_size(4, 4), Some(64));
        assert_eq!(CompressionType::R8G8B8.surface_size(4, 4), Some(48));
        assert_eq!(CompressionType::Undefined.surface_size(4, 4), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CompressionType::A8R8G8B8.to_string(), "D3DFMT_A8R8G8B8");
        assert_eq!(CompressionType::Dxt5.to_string(), "D3DFMT_DXT5");
    }

    proptest! {
        #[test]
        fn prop_lookup_is_total_and_deterministic(tag in any::<[u8; 4]>()) {
            let first = CompressionType::from_fourcc(&tag);
            let second = CompressionType::from_fourcc(&tag);
            prop_assert_eq!(first, second);

            let expected = match &tag {
                b"ARGB" => CompressionType::A8R8G8B8,
                b"XRGB" => CompressionType::X8R8G8B8,
                t if &t[..3] == b"RGB" => CompressionType::R8G8B8,
                t if &t[..3] == b"DXT" => match t[3] {
                    b'1' => CompressionType::Dxt1,
                    b'2' => CompressionType::Dxt2,
                    b'3' => CompressionType::Dxt3,
                    b'4' => CompressionType::Dxt4,
                    _ => CompressionType::Dxt5,
                },
                _ => CompressionType::Undefined,
            };
            prop_assert_eq!(first, expected);
        }
    }
}
