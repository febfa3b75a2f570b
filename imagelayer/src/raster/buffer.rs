//! Decoded pixel buffers.

use crate::image::ImageError;
use crate::pool::BufferedRasterSpecs;

use super::blank::is_fully_transparent;
use super::PixelLayout;

/// A decoded image: `width × height` pixels in one [`PixelLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    specs: BufferedRasterSpecs,
    data: Vec<u8>,
}

impl Raster {
    /// A zero-filled raster of the given shape.
    pub fn new(specs: BufferedRasterSpecs) -> Self {
        Self {
            data: vec![0u8; specs.byte_len()],
            specs,
        }
    }

    /// Wrap existing pixel data, checking its length against `specs`.
    pub fn from_data(specs: BufferedRasterSpecs, data: Vec<u8>) -> Result<Self, ImageError> {
        if data.len() != specs.byte_len() {
            return Err(ImageError::Decode(format!(
                "{}x{} {} raster needs {} bytes, got {}",
                specs.width,
                specs.height,
                specs.layout,
                specs.byte_len(),
                data.len()
            )));
        }
        Ok(Self { specs, data })
    }

    /// The placeholder returned when no reader could decode a source: a
    /// single fully transparent pixel.
    pub fn blank() -> Self {
        Self::new(BufferedRasterSpecs::new(1, 1, PixelLayout::Abgr8))
    }

    pub fn specs(&self) -> BufferedRasterSpecs {
        self.specs
    }

    pub fn width(&self) -> u32 {
        self.specs.width
    }

    pub fn height(&self) -> u32 {
        self.specs.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.specs.layout
    }

    /// Raw pixel bytes, rows top to bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether every alpha byte is zero.
    ///
    /// Always `false` for layouts without a leading alpha byte.
    pub fn is_blank(&self) -> bool {
        is_fully_transparent(
            &self.data,
            self.specs.width as usize,
            self.specs.height as usize,
            self.specs.layout,
        )
    }

    /// Convert to tightly packed straight RGBA.
    pub fn to_rgba(&self) -> Vec<u8> {
        let bpp = self.specs.layout.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.data.len() / bpp * 4);
        for px in self.data.chunks_exact(bpp) {
            out.extend_from_slice(&self.specs.layout.read_rgba(px));
        }
        out
    }

    /// Fill from tightly packed RGBA, converting to this raster's layout.
    pub fn fill_from_rgba(&mut self, rgba: &[u8]) -> Result<(), ImageError> {
        let pixels = self.specs.width as usize * self.specs.height as usize;
        if rgba.len() != pixels * 4 {
            return Err(ImageError::Decode(format!(
                "expected {} RGBA bytes, got {}",
                pixels * 4,
                rgba.len()
            )));
        }
        let layout = self.specs.layout;
        let bpp = layout.bytes_per_pixel();
        for (src, dst) in rgba.chunks_exact(4).zip(self.data.chunks_exact_mut(bpp)) {
            layout.write_rgba([src[0], src[1], src[2], src[3]], dst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let raster = Raster::new(BufferedRasterSpecs::new(4, 4, PixelLayout::Abgr8));
        assert_eq!(raster.data().len(), 64);
        assert!(raster.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_data_checks_length() {
        let specs = BufferedRasterSpecs::new(2, 2, PixelLayout::Rgb8);
        assert!(Raster::from_data(specs, vec![0; 12]).is_ok());
        assert!(Raster::from_data(specs, vec![0; 11]).is_err());
    }

    #[test]
    fn test_blank_placeholder() {
        let blank = Raster::blank();
        assert_eq!((blank.width(), blank.height()), (1, 1));
        assert!(blank.is_blank());
    }

    #[test]
    fn test_rgba_conversion() {
        let mut raster = Raster::new(BufferedRasterSpecs::new(2, 1, PixelLayout::Abgr8));
        let rgba = [1, 2, 3, 4, 5, 6, 7, 8];
        raster.fill_from_rgba(&rgba).unwrap();
        assert_eq!(raster.data(), &[4, 3, 2, 1, 8, 7, 6, 5]);
        assert_eq!(raster.to_rgba(), rgba.to_vec());
    }
}
