//! Image slots of the proposal template.

use serde::Serialize;

use crate::compose::{Layering, Sentinel};
use crate::photo::PhysicalSize;

/// A named place in the template that takes one photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSlot {
    pub id: &'static str,
    /// Shape names that mark the placeholder
    pub names: &'static [&'static str],
    /// Whole-text sentinel, also stripped from any run that merely contains it
    pub text: Option<&'static str>,
    pub size: PhysicalSize,
    pub layering: Layering,
    /// Multipart field carrying the image as a data URL
    pub image_field: &'static str,
    /// Multipart field carrying the crop rectangle as JSON
    pub crop_field: &'static str,
}

pub const SLOTS: &[ImageSlot] = &[
    ImageSlot {
        id: "1",
        names: &["IMG_PLACEHOLDER"],
        text: None,
        size: PhysicalSize::new(19.05, 10.79),
        layering: Layering::Back,
        image_field: "cropped_image_data",
        crop_field: "crop_coordinates",
    },
    ImageSlot {
        id: "2",
        names: &["IMG_PLACEHOLDER2"],
        text: None,
        size: PhysicalSize::new(17.69, 11.38),
        layering: Layering::Back,
        image_field: "cropped_image_data_2",
        crop_field: "crop_coordinates_2",
    },
    ImageSlot {
        id: "tp_msb",
        names: &["{{TP_MSB}}", "TP_MSB"],
        text: Some("{{TP_MSB}}"),
        size: PhysicalSize::new(9.05, 9.25),
        layering: Layering::Front,
        image_field: "cropped_image_data_tp_msb",
        crop_field: "crop_coordinates_tp_msb",
    },
];

impl ImageSlot {
    pub fn by_id(id: &str) -> Option<&'static ImageSlot> {
        SLOTS.iter().find(|slot| slot.id == id)
    }

    pub fn by_image_field(field: &str) -> Option<&'static ImageSlot> {
        SLOTS.iter().find(|slot| slot.image_field == field)
    }

    pub fn by_crop_field(field: &str) -> Option<&'static ImageSlot> {
        SLOTS.iter().find(|slot| slot.crop_field == field)
    }

    pub fn sentinel(&self) -> Sentinel {
        let (first, rest) = self
            .names
            .split_first()
            .map_or(("", &[][..]), |(first, rest)| (*first, rest));
        let sentinel = rest
            .iter()
            .fold(Sentinel::named(first), |s, name| s.or_named(name));
        match self.text {
            Some(text) => sentinel.or_text(text),
            None => sentinel,
        }
    }

    pub fn info(&self) -> SlotInfo {
        let (width_px, height_px) = self.size.pixels();
        SlotInfo {
            id: self.id,
            sentinel: self.names.first().copied().or(self.text).unwrap_or_default(),
            width_cm: self.size.width_cm,
            height_cm: self.size.height_cm,
            width_px,
            height_px,
            layering: self.layering,
            image_field: self.image_field,
            crop_field: self.crop_field,
        }
    }
}

/// Slot description served to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct SlotInfo {
    pub id: &'static str,
    pub sentinel: &'static str,
    pub width_cm: f64,
    pub height_cm: f64,
    pub width_px: u32,
    pub height_px: u32,
    pub layering: Layering,
    pub image_field: &'static str,
    pub crop_field: &'static str,
}

/// All slots, for the web client.
pub fn slot_table() -> Vec<SlotInfo> {
    SLOTS.iter().map(ImageSlot::info).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup() {
        assert_eq!(ImageSlot::by_id("2").unwrap().names, &["IMG_PLACEHOLDER2"]);
        assert_eq!(ImageSlot::by_image_field("cropped_image_data").unwrap().id, "1");
        assert_eq!(ImageSlot::by_crop_field("crop_coordinates_2").unwrap().id, "2");
        assert!(ImageSlot::by_id("3").is_none());
    }

    #[test]
    fn test_tp_msb_sentinel() {
        let sentinel = ImageSlot::by_id("tp_msb").unwrap().sentinel();
        assert_eq!(
            sentinel,
            Sentinel::named("{{TP_MSB}}")
                .or_named("TP_MSB")
                .or_text("{{TP_MSB}}")
        );
        assert_eq!(sentinel.label(), "{{TP_MSB}}");
    }

    #[test]
    fn test_slot_table() {
        let table = slot_table();
        let sizes: Vec<(&str, u32, u32)> = table
            .iter()
            .map(|s| (s.id, s.width_px, s.height_px))
            .collect();
        assert_eq!(
            sizes,
            vec![("1", 2250, 1274), ("2", 2089, 1344), ("tp_msb", 1068, 1092)]
        );
        let json = serde_json::to_value(&table[2]).unwrap();
        assert_eq!(json["layering"], "front");
        assert_eq!(json["sentinel"], "{{TP_MSB}}");
    }
}
