//! Raster reader backed by the `image` crate (PNG, JPEG, GIF, BMP, TIFF, WebP).

use std::io::Cursor;

use image::{ColorType, ImageDecoder, ImageReader};

use super::{RasterInfo, RasterReader};
use crate::image::ImageError;
use crate::raster::{PixelLayout, Raster};

fn decode_error(e: image::ImageError) -> ImageError {
    ImageError::Decode(e.to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateReader;

impl RasterReader for ImageCrateReader {
    fn name(&self) -> &str {
        "image"
    }

    fn can_read(&self, header: &[u8]) -> bool {
        image::guess_format(header).is_ok()
    }

    fn read_info(&self, data: &[u8]) -> Result<RasterInfo, ImageError> {
        let decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_decoder()
            .map_err(decode_error)?;
        let (width, height) = decoder.dimensions();
        let native = match decoder.color_type() {
            ColorType::L8 | ColorType::L16 => PixelLayout::Luma8,
            ColorType::La8 | ColorType::La16 => PixelLayout::LumaA8,
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => PixelLayout::Rgb8,
            _ => PixelLayout::Rgba8,
        };
        Ok(RasterInfo {
            width,
            height,
            native,
        })
    }

    fn layouts(&self, info: &RasterInfo) -> Vec<PixelLayout> {
        if info.native.has_alpha() {
            vec![info.native, PixelLayout::Argb8, PixelLayout::Abgr8]
        } else {
            vec![info.native, PixelLayout::Bgr8, PixelLayout::Rgba8]
        }
    }

    fn decode_into(&self, data: &[u8], raster: &mut Raster) -> Result<(), ImageError> {
        let image = image::load_from_memory(data).map_err(decode_error)?;
        if (image.width(), image.height()) != (raster.width(), raster.height()) {
            return Err(ImageError::Decode(format!(
                "decoded {}x{} but raster is {}x{}",
                image.width(),
                image.height(),
                raster.width(),
                raster.height()
            )));
        }
        raster.fill_from_rgba(image.to_rgba8().as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BufferedRasterSpecs;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_rgba(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_can_read() {
        let reader = ImageCrateReader;
        assert!(reader.can_read(&png_rgba(2, 2, [0, 0, 0, 0])));
        assert!(!reader.can_read(b"<ServiceException>oops</ServiceException>"));
    }

    #[test]
    fn test_info_and_layouts() {
        let reader = ImageCrateReader;
        let info = reader.read_info(&png_rgba(5, 3, [1, 2, 3, 4])).unwrap();
        assert_eq!((info.width, info.height), (5, 3));
        assert_eq!(info.native, PixelLayout::Rgba8);
        assert!(reader.layouts(&info).contains(&PixelLayout::Abgr8));

        let rgb = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        let mut cursor = Cursor::new(Vec::new());
        rgb.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        let info = reader.read_info(cursor.get_ref()).unwrap();
        assert_eq!(info.native, PixelLayout::Rgb8);
        assert!(reader.layouts(&info).contains(&PixelLayout::Bgr8));
    }

    #[test]
    fn test_decode_into_abgr() {
        let data = png_rgba(2, 2, [10, 20, 30, 40]);
        let mut raster = Raster::new(BufferedRasterSpecs::new(2, 2, PixelLayout::Abgr8));
        ImageCrateReader.decode_into(&data, &mut raster).unwrap();
        assert_eq!(&raster.data()[..4], &[40, 30, 20, 10]);
    }

    #[test]
    fn test_decode_dimension_mismatch() {
        let data = png_rgba(2, 2, [0; 4]);
        let mut raster = Raster::new(BufferedRasterSpecs::new(3, 3, PixelLayout::Abgr8));
        assert!(ImageCrateReader.decode_into(&data, &mut raster).is_err());
    }
}
