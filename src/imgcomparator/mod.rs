mod color;
mod engine;
mod error;
mod grid;
mod message;
mod overlay;
mod regions;

pub use color::{delta_e76, pixel_distance, pixel_to_lab, Lab};
pub use engine::{compare, compare_encoded, compare_with, DiffResult};
pub use error::DiffError;
pub use grid::{IncrementalScan, SampleGrid};
pub use message::{handle_request, DiffRequest, DiffResponse, ErrorTag, PixelBuffer};
pub use overlay::{render_overlay, severity_color};
pub use regions::{extract_regions, merge_regions, ChangedRegion, Severity};

use std::path::Path;

/// Decoded screenshot. Pixels are packed as `0xAARRGGBB`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u32>,
}

#[inline]
fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[inline]
fn unpack_rgba(pixel: u32) -> [u8; 4] {
    [
        ((pixel >> 16) & 0xFF) as u8,
        ((pixel >> 8) & 0xFF) as u8,
        (pixel & 0xFF) as u8,
        ((pixel >> 24) & 0xFF) as u8,
    ]
}

impl Image {
    pub fn new(width: u32, height: u32, data: Vec<u32>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// An image filled with a single packed colour.
    pub fn filled(width: u32, height: u32, pixel: u32) -> Self {
        Self::new(width, height, vec![pixel; width as usize * height as usize])
    }

    /// Builds an image from a tightly packed RGBA8 buffer.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Image, DiffError> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(DiffError::buffer_length(width, height, bytes.len()));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|p| pack_rgba(p[0], p[1], p[2], p[3]))
            .collect();
        Ok(Image::new(width, height, data))
    }

    pub fn from_rgba_image(img: &image::RgbaImage) -> Image {
        let data = img
            .pixels()
            .map(|p| pack_rgba(p[0], p[1], p[2], p[3]))
            .collect();
        Image::new(img.width(), img.height(), data)
    }

    /// Decodes any raster format the `image` crate understands (PNG for screenshots).
    pub fn decode(bytes: &[u8]) -> Result<Image, DiffError> {
        Image::decode_as(bytes, "input")
    }

    fn decode_as(bytes: &[u8], which: &str) -> Result<Image, DiffError> {
        let img = image::load_from_memory(bytes).map_err(|e| DiffError::decode(which, e))?;
        Ok(Image::from_rgba_image(&img.to_rgba8()))
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut imgbuf = image::RgbaImage::new(self.width, self.height);
        for (dst, src) in imgbuf.pixels_mut().zip(&self.data) {
            *dst = image::Rgba(unpack_rgba(*src));
        }
        imgbuf
    }

    /// Pixel at `(x, y)`; the caller keeps coordinates in bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: u32) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = pixel;
    }

    fn check_buffer(&self, which: &str) -> Result<(), DiffError> {
        let expected = self.width as usize * self.height as usize;
        if self.data.len() != expected {
            return Err(DiffError::invalid(format!(
                "{which} image holds {} pixels, expected {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

pub fn file_to_image(path: impl AsRef<Path>) -> Result<Image, DiffError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| DiffError::decode(&path.display().to_string(), e))?;
    Ok(Image::from_rgba_image(&img.to_rgba8()))
}

pub fn save_image(img: &Image, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
    img.to_rgba_image().save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba8_packs_channels() {
        let bytes = [0x12, 0x34, 0x56, 0x78, 0xFF, 0x00, 0x00, 0xFF];
        let img = Image::from_rgba8(2, 1, &bytes).unwrap();
        assert_eq!(img.data, vec![0x78123456, 0xFFFF0000]);
        assert_eq!(img.pixel(1, 0), 0xFFFF0000);
    }

    #[test]
    fn test_from_rgba8_length_mismatch() {
        let result = Image::from_rgba8(2, 2, &[0u8; 15]);
        assert!(matches!(result, Err(DiffError::InvalidInput { .. })));
    }

    #[test]
    fn test_rgba_image_round_trip_keeps_alpha() {
        let img = Image::new(2, 1, vec![0x80FF0000, 0xFF00FF00]);
        let back = Image::from_rgba_image(&img.to_rgba_image());
        assert_eq!(back, img);
    }

    #[test]
    fn test_decode_png() {
        let buf = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 0, 255, 255]));
        let mut bytes = Vec::new();
        buf.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let img = Image::decode(&bytes).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert!(img.data.iter().all(|&p| p == 0xFF0000FF));
    }

    #[test]
    fn test_decode_garbage_is_invalid_input() {
        let result = Image::decode(b"definitely not a png");
        assert!(matches!(result, Err(DiffError::InvalidInput { .. })));
    }

    #[test]
    fn test_check_buffer() {
        let img = Image::new(2, 2, vec![0; 3]);
        assert!(img.check_buffer("before").is_err());
        assert!(Image::filled(2, 2, 0).check_buffer("before").is_ok());
    }
}
