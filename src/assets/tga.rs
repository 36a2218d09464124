//! Truevision TGA importer
//!
//! Only uncompressed truecolor images (image type 2) with 24 or 32 bits per
//! pixel are accepted. Palette-indexed, grayscale and run-length encoded
//! files are rejected explicitly. Pixels are returned in the file's native
//! blue-first order ([`PixelFormat::Bgr8`] / [`PixelFormat::Bgra8`]).

use bytemuck::{Pod, Zeroable};

use crate::assets::image_data::{self, ImageData, PixelFormat};
use crate::assets::importer::ImageImporter;
use crate::errors::{Result, SceneGraphError};

const IMPORTER: &str = "TgaImporter";
const HEADER_SIZE: usize = 18;
const UNCOMPRESSED_TRUECOLOR: u8 = 2;

/// On-disk header layout; multi-byte fields are little-endian.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TgaHeader {
    id_length: u8,
    color_map_type: u8,
    image_type: u8,
    #[allow(dead_code)]
    color_map_spec: [u8; 5],
    x_origin: u16,
    y_origin: u16,
    width: u16,
    height: u16,
    bits_per_pixel: u8,
    descriptor: u8,
}

const _: () = assert!(size_of::<TgaHeader>() == HEADER_SIZE);

/// Importer for uncompressed truecolor TGA files.
#[derive(Debug, Default)]
pub struct TgaImporter {
    image: Option<ImageData>,
}

impl TgaImporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of the opened image, leaving the importer closed.
    pub fn take_image2d(&mut self) -> Option<ImageData> {
        self.image.take()
    }
}

impl ImageImporter for TgaImporter {
    fn name(&self) -> &'static str {
        IMPORTER
    }

    fn open_data(&mut self, data: &[u8]) -> Result<()> {
        self.close();
        let image = decode(data)?;
        log::debug!(
            "{IMPORTER}: opened {}x{} {:?} image",
            image.width(),
            image.height(),
            image.format()
        );
        self.image = Some(image);
        Ok(())
    }

    fn close(&mut self) {
        self.image = None;
    }

    fn is_opened(&self) -> bool {
        self.image.is_some()
    }

    fn image2d_count(&self) -> usize {
        usize::from(self.image.is_some())
    }

    fn image2d(&self, index: usize) -> Result<&ImageData> {
        let image = self.image.as_ref().ok_or(SceneGraphError::NoImageOpened)?;
        if index != 0 {
            return Err(SceneGraphError::ImageIndexOutOfBounds { index, count: 1 });
        }
        Ok(image)
    }
}

fn decode(data: &[u8]) -> Result<ImageData> {
    let Some(header_bytes) = data.get(..HEADER_SIZE) else {
        return Err(SceneGraphError::FileTooShort {
            importer: IMPORTER,
            size: data.len(),
        });
    };
    let header: TgaHeader = bytemuck::pod_read_unaligned(header_bytes);

    if header.color_map_type != 0 {
        return Err(SceneGraphError::PalettedUnsupported(IMPORTER));
    }
    if header.image_type != UNCOMPRESSED_TRUECOLOR {
        return Err(SceneGraphError::UnsupportedImageType {
            importer: IMPORTER,
            image_type: header.image_type,
        });
    }
    let format = match header.bits_per_pixel {
        24 => PixelFormat::Bgr8,
        32 => PixelFormat::Bgra8,
        bits_per_pixel => {
            return Err(SceneGraphError::UnsupportedBitsPerPixel {
                importer: IMPORTER,
                bits_per_pixel,
            });
        }
    };

    let width = u16::from_le(header.width);
    let height = u16::from_le(header.height);
    // Rows are kept in file order; origin and descriptor are informational.
    log::trace!(
        "{IMPORTER}: origin ({}, {}), descriptor {:#04x}",
        u16::from_le(header.x_origin),
        u16::from_le(header.y_origin),
        header.descriptor
    );
    let expected = image_data::byte_size(usize::from(width), usize::from(height), format)
        .ok_or_else(|| {
            SceneGraphError::ImageConversion(format!("{IMPORTER}: {width}x{height} image is too large"))
        })?;

    // The optional image ID field sits between the header and the pixels.
    let payload = data
        .get(HEADER_SIZE + usize::from(header.id_length)..)
        .unwrap_or_default();
    let Some(pixels) = payload.get(..expected) else {
        return Err(SceneGraphError::Truncated {
            importer: IMPORTER,
            expected,
            actual: payload.len(),
        });
    };

    ImageData::new(u32::from(width), u32::from(height), format, pixels.to_vec()).ok_or_else(|| {
        SceneGraphError::ImageConversion(format!("{IMPORTER}: pixel buffer size mismatch"))
    })
}
