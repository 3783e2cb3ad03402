//! # Image Preparation
//!
//! Turns an uploaded photo into the bitmap placed on a slide:
//! decode, crop to the user's selection, resize to the slot's physical size
//! at [`PRINT_DPI`], and encode as PNG.
//!
//! ```
//! use proposal_deck::photo::PhysicalSize;
//!
//! assert_eq!(PhysicalSize::new(19.05, 10.79).pixels(), (2250, 1274));
//! ```

mod asset;
mod crop;

pub use asset::{TempAsset, sweep_stale};
pub use crop::CropArea;

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use serde::Serialize;

use crate::error::{DeckError, Result};

/// Resolution images are rendered at for their slot.
pub const PRINT_DPI: f64 = 300.0;

const CM_PER_INCH: f64 = 2.54;

/// Footprint of an image slot on the slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalSize {
    pub width_cm: f64,
    pub height_cm: f64,
}

impl PhysicalSize {
    pub const fn new(width_cm: f64, height_cm: f64) -> Self {
        Self { width_cm, height_cm }
    }

    /// Pixel size at [`PRINT_DPI`], truncated.
    pub fn pixels(&self) -> (u32, u32) {
        (cm_to_px(self.width_cm), cm_to_px(self.height_cm))
    }
}

fn cm_to_px(cm: f64) -> u32 {
    (cm * PRINT_DPI / CM_PER_INCH) as u32
}

/// A PNG ready to be placed.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode the payload of a `data:image/...;base64,` URL. Bare base64 is
/// accepted too.
pub fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    let payload = data.split_once(',').map_or(data, |(_, payload)| payload);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| DeckError::Image(format!("invalid base64 image data: {e}")))
}

/// Cut `area` out of `image`.
pub fn crop(image: &DynamicImage, area: &CropArea) -> Result<DynamicImage> {
    let (left, top, right, bottom) = area.bounds(image.width(), image.height())?;
    log::debug!(
        "Cropping {}x{} image to ({left}, {top}, {right}, {bottom})",
        image.width(),
        image.height()
    );
    Ok(image.crop_imm(left, top, right - left, bottom - top))
}

/// Run the full pipeline on encoded image bytes. Without a crop area the
/// whole image is resized.
pub fn prepare(source: &[u8], crop_area: Option<&CropArea>, size: PhysicalSize) -> Result<PreparedImage> {
    let image = image::load_from_memory(source)?;
    let image = match image.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => image,
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    let image = match crop_area {
        Some(area) => crop(&image, area)?,
        None => image,
    };

    let (width, height) = size.pixels();
    let resized = image.resize_exact(width, height, FilterType::Lanczos3);

    let mut png = Vec::new();
    resized.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    log::info!("Prepared {width}x{height} image ({} bytes)", png.len());

    Ok(PreparedImage { png, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, Rgb([x as u8, y as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_slot_pixel_sizes() {
        assert_eq!(PhysicalSize::new(19.05, 10.79).pixels(), (2250, 1274));
        assert_eq!(PhysicalSize::new(17.69, 11.38).pixels(), (2089, 1344));
        assert_eq!(PhysicalSize::new(9.05, 9.25).pixels(), (1068, 1092));
    }

    #[test]
    fn test_crop_size_before_resize() {
        let img = create_test_image(200, 200);
        let area = CropArea { x: 10.0, y: 10.0, width: 100.0, height: 50.0 };
        let cropped = crop(&img, &area).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (100, 50));
        // Top-left pixel comes from (10, 10) in the source.
        assert_eq!(cropped.to_rgb8().get_pixel(0, 0), &Rgb([10, 10, 128]));
    }

    #[test]
    fn test_prepare_resizes_to_slot() {
        let source = encode(&create_test_image(120, 80), ImageFormat::Png);
        let area = CropArea { x: 0.0, y: 0.0, width: 60.0, height: 40.0 };
        let prepared = prepare(&source, Some(&area), PhysicalSize::new(2.54, 1.27)).unwrap();
        assert_eq!((prepared.width, prepared.height), (300, 150));

        let decoded = image::load_from_memory(&prepared.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 150));
    }

    #[test]
    fn test_prepare_converts_grayscale() {
        let gray = DynamicImage::ImageLuma8(create_test_image(10, 10).to_luma8());
        let source = encode(&gray, ImageFormat::Png);
        let prepared = prepare(&source, None, PhysicalSize::new(0.254, 0.254)).unwrap();
        let decoded = image::load_from_memory(&prepared.png).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (30, 30));
    }

    #[test]
    fn test_prepare_rejects_degenerate_crop() {
        let source = encode(&create_test_image(100, 100), ImageFormat::Png);
        let area = CropArea { x: 50.0, y: 0.0, width: 0.0, height: 10.0 };
        let err = prepare(&source, Some(&area), PhysicalSize::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, DeckError::InvalidCropArea));
        assert_eq!(err.to_string(), "Invalid crop area - please adjust your selection");
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(b"definitely not an image", None, PhysicalSize::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, DeckError::Image(_)));
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_data_url("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_data_url("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(decode_data_url("data:image/png;base64,%%%"), Err(DeckError::Image(_))));
    }
}
