//! Crop rectangles as sent by the browser cropper.

use serde::Deserialize;

use crate::error::{DeckError, Result};

/// A crop rectangle in source-image pixels. Values may be fractional or
/// extend past the image; [`CropArea::bounds`] truncates and clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CropArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropArea {
    /// Parse `{"x":..,"y":..,"width":..,"height":..}`.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DeckError::MalformedCropData(e.to_string()))
    }

    /// Pixel bounds `(left, top, right, bottom)` inside a `width` x `height`
    /// image. An empty rectangle after clamping is [`DeckError::InvalidCropArea`].
    pub fn bounds(&self, width: u32, height: u32) -> Result<(u32, u32, u32, u32)> {
        let left = clamp(self.x, width);
        let top = clamp(self.y, height);
        let right = clamp(self.x + self.width, width);
        let bottom = clamp(self.y + self.height, height);

        if right <= left || bottom <= top {
            return Err(DeckError::InvalidCropArea);
        }
        Ok((left, top, right, bottom))
    }
}

/// Truncate toward zero and clamp into `0..=limit`. NaN becomes 0.
fn clamp(value: f64, limit: u32) -> u32 {
    // `as` saturates: negatives and NaN become 0.
    (value.trunc() as u32).min(limit)
}
