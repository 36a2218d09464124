use image::{DynamicImage, RgbImage, RgbaImage};

use crate::errors::{Result, SceneGraphError};

/// Channel layout of decoded 8-bit pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Bgr8,
    Bgra8,
}

impl PixelFormat {
    #[inline]
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8 | Self::Bgra8)
    }

    /// `true` for the blue-first layouts stored by TGA and BMP files.
    #[inline]
    #[must_use]
    pub fn is_bgr(self) -> bool {
        matches!(self, Self::Bgr8 | Self::Bgra8)
    }
}

/// A decoded two-dimensional image.
///
/// Rows are tightly packed and stored in the order the source file uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl ImageData {
    /// Wraps a pixel buffer.
    ///
    /// Returns `None` if `pixels` does not hold exactly
    /// `width * height * bytes_per_pixel` bytes, or if that size overflows.
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Option<Self> {
        let expected = byte_size(width as usize, height as usize, format)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Converts to tightly packed RGBA8, adding opaque alpha where missing.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.pixels.len() / bpp * 4);
        for px in self.pixels.chunks_exact(bpp) {
            let (r, b) = if self.format.is_bgr() { (px[2], px[0]) } else { (px[0], px[2]) };
            let a = if self.format.has_alpha() { px[3] } else { u8::MAX };
            out.extend_from_slice(&[r, px[1], b, a]);
        }
        out
    }

    /// Converts into an `image` crate buffer (RGB8 or RGBA8).
    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let mut pixels = self.pixels.clone();
        if self.format.is_bgr() {
            for px in pixels.chunks_exact_mut(self.format.bytes_per_pixel()) {
                px.swap(0, 2);
            }
        }

        let image = if self.format.has_alpha() {
            RgbaImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageRgb8)
        };
        image.ok_or_else(|| {
            SceneGraphError::ImageConversion(format!(
                "buffer does not match {}x{} {:?}",
                self.width, self.height, self.format
            ))
        })
    }
}

/// Size in bytes of a tightly packed `width` x `height` image, or `None` on
/// overflow.
#[must_use]
pub fn byte_size(width: usize, height: usize, format: PixelFormat) -> Option<usize> {
    width.checked_mul(height)?.checked_mul(format.bytes_per_pixel())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(ImageData::new(2, 1, PixelFormat::Rgb8, vec![0; 6]).is_some());
        assert!(ImageData::new(2, 1, PixelFormat::Rgb8, vec![0; 5]).is_none());
        assert!(ImageData::new(0, 0, PixelFormat::Rgba8, Vec::new()).is_some());
    }

    #[test]
    fn test_new_rejects_overflowing_size() {
        assert!(ImageData::new(u32::MAX, u32::MAX, PixelFormat::Rgba8, Vec::new()).is_none());
        assert_eq!(byte_size(usize::MAX, 2, PixelFormat::Rgb8), None);
        assert_eq!(byte_size(4, 2, PixelFormat::Bgra8), Some(32));
    }

    #[test]
    fn test_bgr_to_rgba8() {
        let image = ImageData::new(1, 1, PixelFormat::Bgr8, vec![10, 20, 30]).unwrap();
        assert_eq!(image.to_rgba8(), vec![30, 20, 10, 255]);

        let image = ImageData::new(1, 1, PixelFormat::Bgra8, vec![10, 20, 30, 40]).unwrap();
        assert_eq!(image.to_rgba8(), vec![30, 20, 10, 40]);
    }

    #[test]
    fn test_to_dynamic_image_swizzles() {
        let image = ImageData::new(2, 1, PixelFormat::Bgr8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let dynamic = image.to_dynamic_image().unwrap();
        let rgb = dynamic.as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(rgb.get_pixel(1, 0).0, [6, 5, 4]);
    }
}
