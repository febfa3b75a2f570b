//! Pool key describing the shape of a raster buffer.

use crate::raster::PixelLayout;

/// Width, height and pixel layout of a pooled raster.
///
/// Two specs are equal when all three fields are equal; the pool hands out a
/// free raster only for an exactly matching spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferedRasterSpecs {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl BufferedRasterSpecs {
    /// Create a spec.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            layout,
        }
    }

    /// Bytes needed to hold one raster of this shape.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.bytes_per_pixel()
    }

    /// Bytes per row.
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_equality() {
        let a = BufferedRasterSpecs::new(256, 256, PixelLayout::Abgr8);
        let b = BufferedRasterSpecs::new(256, 256, PixelLayout::Abgr8);
        let c = BufferedRasterSpecs::new(256, 256, PixelLayout::Bgr8);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(BufferedRasterSpecs::new(4, 2, PixelLayout::Abgr8).byte_len(), 32);
        assert_eq!(BufferedRasterSpecs::new(4, 2, PixelLayout::Bgr8).row_stride(), 12);
    }
}
