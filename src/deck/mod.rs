//! # Slide Deck Engine
//!
//! A small document engine over PowerPoint (`.pptx`) packages, exposing just
//! what template filling needs:
//!
//! - [`Deck::open`] / [`Deck::save`]: load and write a package
//! - [`Deck::slides`]: slides in presentation order
//! - [`Slide::shapes`], [`Slide::remove_shape`], [`Slide::insert_shape`]:
//!   the ordered shape list of a slide
//! - [`ShapeRef`]: name, text runs, table cells and geometry of a shape
//! - [`Deck::add_media`] + [`Slide::add_image_relationship`] +
//!   [`picture_element`]: everything needed to put a picture on a slide
//!
//! Everything that is not touched (layouts, masters, themes, other media)
//! is carried through unchanged.
//!
//! ## Example
//!
//! ```no_run
//! use proposal_deck::deck::Deck;
//!
//! let deck = Deck::open("FTP_Template.pptx".as_ref())?;
//! for (i, slide) in deck.slides().iter().enumerate() {
//!     for shape in slide.shapes() {
//!         println!("slide {} shape {:?}: {:?}", i + 1, shape.name(), shape.geometry());
//!     }
//! }
//! # Ok::<(), proposal_deck::DeckError>(())
//! ```

mod package;
mod picture;
mod rels;
mod shape;
mod slide;

pub use package::{Package, write_atomically};
pub use picture::picture_element;
pub use rels::{Relationship, Relationships};
pub use shape::{EMU_PER_CM, Geometry, ShapeKind, ShapeRef};
pub use slide::Slide;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{DeckError, Result};

use rels::{SLIDE_REL_TYPE, rels_part_for, resolve_target};

const OFFICE_DOCUMENT_REL_SUFFIX: &str = "/officeDocument";
const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";
const MEDIA_DIR: &str = "ppt/media/";

/// A loaded presentation.
#[derive(Debug, Clone)]
pub struct Deck {
    package: Package,
    slides: Vec<Slide>,
}

impl Deck {
    /// Load a presentation from disk.
    ///
    /// Fails with [`DeckError::TemplateNotFound`] if `path` does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    fn from_package(package: Package) -> Result<Self> {
        let slides = slide_parts(&package)?
            .iter()
            .map(|part| {
                let xml = package
                    .get(part)
                    .ok_or_else(|| DeckError::Package(format!("missing slide part {part}")))?;
                Slide::parse(part, xml, package.get(&rels_part_for(part)))
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Loaded presentation with {} slides", slides.len());
        Ok(Self { package, slides })
    }

    /// Slides in presentation order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Store an image in `ppt/media/` and return its part name.
    pub fn add_media(&mut self, data: Vec<u8>, extension: &str, content_type: &str) -> Result<String> {
        let next = self
            .package
            .part_names()
            .filter_map(|name| name.strip_prefix(MEDIA_DIR))
            .filter_map(|file| file.strip_prefix("image"))
            .filter_map(|rest| rest.split('.').next()?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let part = format!("{MEDIA_DIR}image{next}.{extension}");
        self.package.ensure_default_content_type(extension, content_type)?;
        self.package.set(&part, data);
        Ok(part)
    }

    /// Serialize the whole package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut overrides = BTreeMap::new();
        for slide in &self.slides {
            let (xml, rels) = slide.serialize();
            overrides.insert(slide.part_name().to_string(), xml);
            if let Some(rels) = rels {
                overrides.insert(rels_part_for(slide.part_name()), rels);
            }
        }
        self.package.to_bytes_with(&overrides)
    }

    /// Write the presentation to `path`. Nothing is left at `path` if this
    /// fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self
            .to_bytes()
            .map_err(|e| DeckError::Serialization(e.to_string()))?;
        write_atomically(path, &bytes)
    }
}

/// Slide part names in presentation order.
///
/// Follows `_rels/.rels` to the presentation part and reads its
/// `p:sldIdLst`. Packages without one fall back to numeric part-name order.
fn slide_parts(package: &Package) -> Result<Vec<String>> {
    let presentation = match package.get(&rels_part_for("")) {
        Some(bytes) => Relationships::parse("_rels/.rels", bytes)?
            .iter()
            .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL_SUFFIX))
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_PRESENTATION_PART.to_string()),
        None => DEFAULT_PRESENTATION_PART.to_string(),
    };

    if let (Some(doc), Some(rels)) = (
        package.xml(&presentation)?,
        package.get(&rels_part_for(&presentation)),
    ) {
        let rels = Relationships::parse(&rels_part_for(&presentation), rels)?;
        if let Some(list) = doc.root.child("sldIdLst") {
            let mut parts = Vec::new();
            for sld_id in list.elements().filter(|e| e.is("sldId")) {
                let Some(rel) = sld_id.attr("r:id").and_then(|id| rels.get(&id)) else {
                    log::warn!("Skipping slide entry without a valid relationship in {presentation}");
                    continue;
                };
                if rel.rel_type == SLIDE_REL_TYPE {
                    parts.push(resolve_target(&presentation, &rel.target));
                }
            }
            return Ok(parts);
        }
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

/// A single parsed slide holding one text shape per `(name, text)` pair.
#[cfg(test)]
pub(crate) fn slide_for_tests(shapes: &[(&str, &str)]) -> Slide {
    let body: String = shapes
        .iter()
        .enumerate()
        .map(|(i, (name, text))| slide::tests::text_shape(i as u32 + 2, name, text))
        .collect();
    let xml = slide::tests::slide_xml(&body);
    Slide::parse("ppt/slides/slide1.xml", xml.as_bytes(), None).unwrap()
}

#[cfg(test)]
impl Deck {
    /// A deck around one already parsed slide, with a bare content types part.
    pub(crate) fn single_slide_for_tests(slide: Slide) -> Self {
        let mut package = Package::default();
        package.set(
            package::CONTENT_TYPES_PART,
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_vec(),
        );
        let (xml, _) = slide.serialize();
        package.set(slide.part_name(), xml);
        Self {
            package,
            slides: vec![slide],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::slide::tests::{slide_xml, text_shape};

    fn build(parts: &[(&str, String)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn content_types() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string()
    }

    #[test]
    fn test_slide_order_follows_presentation() {
        let bytes = build(&[
            ("[Content_Types].xml", content_types()),
            (
                "_rels/.rels",
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#.to_string(),
            ),
            (
                "ppt/presentation.xml",
                r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#.to_string(),
            ),
            (
                "ppt/_rels/presentation.xml.rels",
                format!(
                    r#"<Relationships xmlns="x"><Relationship Id="rId2" Type="{SLIDE_REL_TYPE}" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{SLIDE_REL_TYPE}" Target="slides/slide2.xml"/></Relationships>"#
                ),
            ),
            ("ppt/slides/slide1.xml", slide_xml(&text_shape(2, "first-part", "a"))),
            ("ppt/slides/slide2.xml", slide_xml(&text_shape(2, "second-part", "b"))),
        ]);
        let deck = Deck::from_bytes(&bytes).unwrap();
        let parts: Vec<&str> = deck.slides().iter().map(|s| s.part_name()).collect();
        assert_eq!(parts, vec!["ppt/slides/slide2.xml", "ppt/slides/slide1.xml"]);
    }

    #[test]
    fn test_numeric_fallback_order() {
        let bytes = build(&[
            ("[Content_Types].xml", content_types()),
            ("ppt/slides/slide10.xml", slide_xml("")),
            ("ppt/slides/slide2.xml", slide_xml("")),
        ]);
        let deck = Deck::from_bytes(&bytes).unwrap();
        let parts: Vec<&str> = deck.slides().iter().map(|s| s.part_name()).collect();
        assert_eq!(parts, vec!["ppt/slides/slide2.xml", "ppt/slides/slide10.xml"]);
    }

    #[test]
    fn test_add_media_and_save_round_trip() {
        let bytes = build(&[
            ("[Content_Types].xml", content_types()),
            ("ppt/media/image4.jpeg", "jpeg".to_string()),
            ("ppt/slides/slide1.xml", slide_xml(&text_shape(2, "A", "a"))),
        ]);
        let mut deck = Deck::from_bytes(&bytes).unwrap();
        let part = deck.add_media(vec![1, 2, 3], "png", "image/png").unwrap();
        assert_eq!(part, "ppt/media/image5.png");
        let rel = deck.slides_mut()[0].add_image_relationship(&part);

        let reread = Deck::from_bytes(&deck.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.package().get(&part), Some(&[1u8, 2, 3][..]));
        let target = reread.slides()[0].relationships().get(&rel).unwrap().target;
        assert_eq!(target, "../media/image5.png");
    }
}
