//! # Placeholder Resolver & Compositor
//!
//! Fills a loaded [`Deck`] in place:
//!
//! 1. [`resolve`] finds image placeholders on each slide ([`discover`]),
//!    then removes them and puts a picture at each one's exact position.
//! 2. [`TokenMap::apply`] substitutes `{{TOKEN}}` literals in every text
//!    run, leaving run formatting untouched.
//!
//! Image placeholders are resolved first so that a shape whose whole text
//! is a sentinel token is still recognizable when discovery runs.

mod discover;
mod tokens;

pub use discover::{MatchKind, PlaceholderMatch, Sentinel, discover};
pub use tokens::{TOKEN_CLOSE, TOKEN_OPEN, TokenMap, token};

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use image::ImageReader;
use serde::Serialize;

use crate::deck::{Deck, Geometry, picture_element};
use crate::error::DeckError;
use crate::xml::Element;

/// Where an inserted picture goes in the slide's z-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layering {
    /// Directly above the slide background, behind all other shapes
    #[default]
    Back,
    /// In front of all other shapes
    Front,
}

impl Layering {
    /// Shape index to insert at on a slide with `shape_count` shapes.
    pub fn insertion_index(self, shape_count: usize) -> usize {
        match self {
            Layering::Back => 0,
            Layering::Front => shape_count,
        }
    }
}

/// Encoded image data for a placement.
#[derive(Debug, Clone)]
pub enum ImageSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// An image to put over every placeholder matching `sentinel`.
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    pub sentinel: Sentinel,
    pub source: ImageSource,
    pub layering: Layering,
}

/// One picture that was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// 0-based slide index
    pub slide: usize,
    pub sentinel: String,
    pub geometry: Geometry,
    pub media_part: String,
}

/// Outcome of [`resolve`]: what was placed and what was skipped.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub insertions: Vec<Insertion>,
    /// [`DeckError::ImageInsertion`] for each skipped placeholder
    pub failures: Vec<DeckError>,
}

/// Replace every placeholder matching one of `placements` with its image.
///
/// Per slide, discovery completes before anything is mutated. Matches whose
/// picture cannot be built (unreadable or corrupt image, no geometry) are
/// logged, reported, and left in place; the rest are removed in reverse
/// order and their pictures inserted at the placement's layer.
pub fn resolve(deck: &mut Deck, placements: &[ImagePlacement]) -> ResolveReport {
    let mut report = ResolveReport::default();
    if placements.is_empty() {
        return report;
    }
    let mut compositor = Compositor::new(placements);

    for slide_index in 0..deck.slides().len() {
        let matches = discover(slide_index, &deck.slides()[slide_index], &compositor.sentinels);
        if matches.is_empty() {
            continue;
        }

        let mut next_id = deck.slides()[slide_index].next_shape_id();
        let mut ready = Vec::with_capacity(matches.len());
        for m in matches {
            match compositor.picture_for(deck, &m, next_id) {
                Ok((element, geometry, media_part)) => {
                    next_id += 1;
                    ready.push((m, element, geometry, media_part));
                },
                Err(reason) => {
                    let err = DeckError::ImageInsertion {
                        slide: slide_index + 1,
                        sentinel: placements[m.sentinel].sentinel.label().to_string(),
                        reason,
                    };
                    log::error!("{err}");
                    report.failures.push(err);
                },
            }
        }

        let slide = &mut deck.slides_mut()[slide_index];
        for (m, ..) in ready.iter().rev() {
            slide.remove_shape(m.shape);
        }
        for (m, element, geometry, media_part) in ready {
            let placement = &placements[m.sentinel];
            let index = placement.layering.insertion_index(slide.shape_count());
            slide.insert_shape(index, element);

            let sentinel = placement.sentinel.label().to_string();
            log::info!("Inserted {sentinel} on slide {}", slide_index + 1);
            report.insertions.push(Insertion {
                slide: slide_index,
                sentinel,
                geometry,
                media_part,
            });
        }
    }

    report
}

struct LoadedImage {
    data: Vec<u8>,
    extension: &'static str,
    mime: &'static str,
}

/// Per-call state: images are read once, on first use, and stored in the
/// package once however many placeholders they fill.
struct Compositor<'a> {
    placements: &'a [ImagePlacement],
    sentinels: Vec<Sentinel>,
    loaded: Vec<Option<Result<LoadedImage, String>>>,
    media: Vec<Option<String>>,
}

impl<'a> Compositor<'a> {
    fn new(placements: &'a [ImagePlacement]) -> Self {
        Self {
            placements,
            sentinels: placements.iter().map(|p| p.sentinel.clone()).collect(),
            loaded: placements.iter().map(|_| None).collect(),
            media: vec![None; placements.len()],
        }
    }

    fn picture_for(
        &mut self,
        deck: &mut Deck,
        m: &PlaceholderMatch,
        id: u32,
    ) -> Result<(Element, Geometry, String), String> {
        let geometry = m
            .geometry
            .ok_or("placeholder has no position of its own (inherited from the layout)")?;

        let source = &self.placements[m.sentinel].source;
        let image = self.loaded[m.sentinel]
            .get_or_insert_with(|| load_image(source))
            .as_ref()
            .map_err(Clone::clone)?;

        let media_part = match &self.media[m.sentinel] {
            Some(part) => part.clone(),
            None => {
                let part = deck
                    .add_media(image.data.clone(), image.extension, image.mime)
                    .map_err(|e| e.to_string())?;
                self.media[m.sentinel] = Some(part.clone());
                part
            },
        };

        let rel_id = deck.slides_mut()[m.slide].add_image_relationship(&media_part);
        let element = picture_element(
            id,
            &format!("Picture {id}"),
            self.placements[m.sentinel].sentinel.label(),
            &rel_id,
            geometry,
        );
        Ok((element, geometry, media_part))
    }
}

/// Read and fully decode an image so a corrupt file fails here rather than
/// in the finished document.
fn load_image(source: &ImageSource) -> Result<LoadedImage, String> {
    let data = match source {
        ImageSource::File(path) => {
            fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?
        },
        ImageSource::Bytes(bytes) => bytes.clone(),
    };
    let reader = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    let format = reader.format().ok_or("unrecognized image format")?;
    reader.decode().map_err(|e| e.to_string())?;

    Ok(LoadedImage {
        extension: format.extensions_str().first().copied().unwrap_or("png"),
        mime: format.to_mime_type(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{ShapeKind, slide_for_tests};
    use pretty_assertions::assert_eq;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn deck_with(shapes: &[(&str, &str)]) -> Deck {
        Deck::single_slide_for_tests(slide_for_tests(shapes))
    }

    #[test]
    fn test_layering_index() {
        assert_eq!(Layering::Back.insertion_index(5), 0);
        assert_eq!(Layering::Front.insertion_index(5), 5);
    }

    #[test]
    fn test_back_layering_puts_picture_first() {
        let mut deck = deck_with(&[("Title", "x"), ("IMG_PLACEHOLDER", ""), ("Footer", "y")]);
        let before = deck.slides()[0].shapes()[1].geometry().unwrap();
        let placements = [ImagePlacement {
            sentinel: Sentinel::named("IMG_PLACEHOLDER"),
            source: ImageSource::Bytes(png(4, 2)),
            layering: Layering::Back,
        }];
        let report = resolve(&mut deck, &placements);

        assert!(report.failures.is_empty());
        assert_eq!(report.insertions.len(), 1);
        assert_eq!(report.insertions[0].geometry, before);

        let shapes = deck.slides()[0].shapes();
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[0].kind(), ShapeKind::Picture);
        assert_eq!(shapes[0].geometry(), Some(before));
        assert_eq!(shapes[1].name().as_deref(), Some("Title"));
        assert_eq!(shapes[2].name().as_deref(), Some("Footer"));
    }

    #[test]
    fn test_front_layering_and_text_sentinel() {
        let mut deck = deck_with(&[("TextBox 3", "{{TP_MSB}}"), ("Title", "x")]);
        let placements = [ImagePlacement {
            sentinel: Sentinel::named("TP_MSB").or_text("{{TP_MSB}}"),
            source: ImageSource::Bytes(png(2, 2)),
            layering: Layering::Front,
        }];
        let report = resolve(&mut deck, &placements);
        assert_eq!(report.insertions.len(), 1);

        let shapes = deck.slides()[0].shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].name().as_deref(), Some("Title"));
        assert_eq!(shapes[1].kind(), ShapeKind::Picture);
    }

    #[test]
    fn test_same_image_fills_every_match_once_in_media() {
        let mut deck = deck_with(&[("IMG_PLACEHOLDER", ""), ("IMG_PLACEHOLDER", "")]);
        let placements = [ImagePlacement {
            sentinel: Sentinel::named("IMG_PLACEHOLDER"),
            source: ImageSource::Bytes(png(2, 2)),
            layering: Layering::Back,
        }];
        let report = resolve(&mut deck, &placements);
        assert_eq!(report.insertions.len(), 2);
        assert_eq!(report.insertions[0].media_part, report.insertions[1].media_part);
        assert_eq!(deck.slides()[0].shape_count(), 2);
        assert!(
            deck.slides()[0]
                .shapes()
                .iter()
                .all(|s| s.kind() == ShapeKind::Picture)
        );
    }

    #[test]
    fn test_corrupt_image_is_skipped_and_placeholder_kept() {
        let mut deck = deck_with(&[("IMG_PLACEHOLDER", ""), ("IMG_PLACEHOLDER2", "")]);
        let mut truncated = png(8, 8);
        truncated.truncate(30);
        let placements = [
            ImagePlacement {
                sentinel: Sentinel::named("IMG_PLACEHOLDER"),
                source: ImageSource::Bytes(truncated),
                layering: Layering::Back,
            },
            ImagePlacement {
                sentinel: Sentinel::named("IMG_PLACEHOLDER2"),
                source: ImageSource::Bytes(png(2, 2)),
                layering: Layering::Back,
            },
        ];
        let report = resolve(&mut deck, &placements);

        assert_eq!(report.insertions.len(), 1);
        assert_eq!(report.insertions[0].sentinel, "IMG_PLACEHOLDER2");
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            DeckError::ImageInsertion { slide: 1, sentinel, .. } if sentinel == "IMG_PLACEHOLDER"
        ));

        let shapes = deck.slides()[0].shapes();
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().any(|s| s.name().as_deref() == Some("IMG_PLACEHOLDER")));
    }

    #[test]
    fn test_missing_file_is_insertion_failure() {
        let mut deck = deck_with(&[("IMG_PLACEHOLDER", "")]);
        let placements = [ImagePlacement {
            sentinel: Sentinel::named("IMG_PLACEHOLDER"),
            source: ImageSource::File(PathBuf::from("/nonexistent/processed.png")),
            layering: Layering::Back,
        }];
        let report = resolve(&mut deck, &placements);
        assert!(report.insertions.is_empty());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_no_placements_is_noop() {
        let mut deck = deck_with(&[("IMG_PLACEHOLDER", "")]);
        let report = resolve(&mut deck, &[]);
        assert!(report.insertions.is_empty());
        assert_eq!(deck.slides()[0].shape_count(), 1);
    }
}
