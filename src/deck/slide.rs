//! A slide part and its ordered, mutable shape list.

use crate::error::{DeckError, Result};
use crate::xml::{Element, Node, XmlDocument};

use super::rels::{IMAGE_REL_TYPE, Relationships, relative_target, rels_part_for};
use super::shape::{ShapeKind, ShapeRef};

/// One slide: the parsed `ppt/slides/slideN.xml` and its relationships.
#[derive(Debug, Clone)]
pub struct Slide {
    part: String,
    doc: XmlDocument,
    rels: Relationships,
    rels_dirty: bool,
}

impl Slide {
    pub(crate) fn parse(part: &str, xml: &[u8], rels: Option<&[u8]>) -> Result<Self> {
        let doc = XmlDocument::parse(part, xml)?;
        if doc.root.path(&["cSld", "spTree"]).is_none() {
            return Err(DeckError::xml(part, "slide has no p:cSld/p:spTree"));
        }
        let rels = match rels {
            Some(bytes) => Relationships::parse(&rels_part_for(part), bytes)?,
            None => Relationships::default(),
        };
        Ok(Self {
            part: part.to_string(),
            doc,
            rels,
            rels_dirty: false,
        })
    }

    /// Part name, e.g. `ppt/slides/slide1.xml`.
    #[inline]
    pub fn part_name(&self) -> &str {
        &self.part
    }

    pub fn relationships(&self) -> &Relationships {
        &self.rels
    }

    fn sp_tree(&self) -> &Element {
        self.doc
            .root
            .path(&["cSld", "spTree"])
            .expect("checked when the slide was parsed")
    }

    fn sp_tree_mut(&mut self) -> &mut Element {
        self.doc
            .root
            .path_mut(&["cSld", "spTree"])
            .expect("checked when the slide was parsed")
    }

    /// Shapes in tree order (back to front).
    pub fn shapes(&self) -> Vec<ShapeRef<'_>> {
        self.sp_tree()
            .elements()
            .filter_map(|e| ShapeKind::of(e).map(|kind| (kind, e)))
            .enumerate()
            .map(|(index, (kind, e))| ShapeRef::new(index, kind, e))
            .collect()
    }

    pub fn shape_count(&self) -> usize {
        self.sp_tree()
            .elements()
            .filter(|e| ShapeKind::of(e).is_some())
            .count()
    }

    /// Position in `spTree.children` of each shape.
    fn shape_positions(&self) -> Vec<usize> {
        self.sp_tree()
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| node.as_element().and_then(ShapeKind::of).is_some())
            .map(|(position, _)| position)
            .collect()
    }

    /// Remove the shape at `index` and return its element.
    pub fn remove_shape(&mut self, index: usize) -> Option<Element> {
        let position = *self.shape_positions().get(index)?;
        match self.sp_tree_mut().children.remove(position) {
            Node::Element(element) => Some(element),
            _ => unreachable!("shape positions only point at elements"),
        }
    }

    /// Insert `element` so that it becomes the shape at `index`.
    ///
    /// Index 0 places it directly after the leading group properties (behind
    /// every other shape); `shape_count()` places it after the last shape but
    /// before a trailing `p:extLst` (in front of everything).
    pub fn insert_shape(&mut self, index: usize, element: Element) {
        let positions = self.shape_positions();
        let position = match positions.get(index) {
            Some(&position) => position,
            None => self.end_position(positions.last().copied()),
        };
        self.sp_tree_mut().children.insert(position, Node::Element(element));
    }

    /// Where a shape goes when appended: after the last shape (or after the
    /// leading non-shape nodes when there are none), before `p:extLst`.
    fn end_position(&self, last_shape: Option<usize>) -> usize {
        let children = &self.sp_tree().children;
        let after = match last_shape {
            Some(position) => position + 1,
            None => children
                .iter()
                .rposition(|n| {
                    n.as_element()
                        .is_some_and(|e| e.is("nvGrpSpPr") || e.is("grpSpPr"))
                })
                .map_or(0, |p| p + 1),
        };
        children[after..]
            .iter()
            .position(|n| n.as_element().is_some_and(|e| e.is("extLst")))
            .map_or(children.len(), |offset| after + offset)
    }

    /// The next free `cNvPr` id on this slide.
    pub fn next_shape_id(&self) -> u32 {
        self.sp_tree()
            .descendants("cNvPr")
            .iter()
            .filter_map(|e| e.attr("id")?.parse::<u32>().ok())
            .max()
            .unwrap_or(1)
            + 1
    }

    /// Add an image relationship to `media_part` and return its id.
    pub fn add_image_relationship(&mut self, media_part: &str) -> String {
        self.rels_dirty = true;
        self.rels
            .add(IMAGE_REL_TYPE, &relative_target(&self.part, media_part))
    }

    /// Call `edit` on the text of every run on the slide (text bodies, table
    /// cells and grouped shapes alike). When it returns a new string the
    /// run's text is replaced; its run properties stay as they were.
    ///
    /// Returns the number of runs changed.
    pub fn edit_runs(&mut self, mut edit: impl FnMut(&str) -> Option<String>) -> usize {
        let mut changed = 0;
        self.sp_tree_mut().visit_mut(&mut |element: &mut Element| {
            if !element.is("r") {
                return;
            }
            if let Some(t) = element.child_mut("t")
                && let Some(new_text) = edit(&t.text())
            {
                t.set_text(&new_text);
                changed += 1;
            }
        });
        changed
    }

    /// Serialized slide part and, if relationships were added, its rels part.
    pub(crate) fn serialize(&self) -> (Vec<u8>, Option<Vec<u8>>) {
        let rels = self.rels_dirty.then(|| self.rels.to_bytes());
        (self.doc.to_bytes(), rels)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    pub(crate) fn text_shape(id: u32, name: &str, text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{id}00" y="{id}0"/><a:ext cx="5000" cy="3000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" sz="1800"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        )
    }

    fn names(slide: &Slide) -> Vec<String> {
        slide
            .shapes()
            .iter()
            .map(|s| s.name().unwrap_or_default())
            .collect()
    }

    fn sample() -> Slide {
        let xml = slide_xml(&format!(
            "{}{}",
            text_shape(2, "A", "one"),
            text_shape(3, "B", "two")
        ));
        Slide::parse("ppt/slides/slide1.xml", xml.as_bytes(), None).unwrap()
    }

    #[test]
    fn test_shapes_skip_group_properties() {
        let slide = sample();
        assert_eq!(slide.shape_count(), 2);
        assert_eq!(names(&slide), vec!["A", "B"]);
        assert_eq!(slide.next_shape_id(), 4);
    }

    #[test]
    fn test_remove_and_insert() {
        let mut slide = sample();
        let removed = slide.remove_shape(0).unwrap();
        assert_eq!(names(&slide), vec!["B"]);

        slide.insert_shape(1, removed.clone());
        assert_eq!(names(&slide), vec!["B", "A"]);

        slide.insert_shape(0, Element::new("p:cxnSp"));
        assert_eq!(slide.shape_count(), 3);
        assert_eq!(slide.shapes()[0].kind(), ShapeKind::Connector);
        assert!(slide.remove_shape(9).is_none());
    }

    #[test]
    fn test_insert_into_empty_tree_keeps_ext_lst_last() {
        let xml = slide_xml("<p:extLst/>");
        let mut slide = Slide::parse("ppt/slides/slide1.xml", xml.as_bytes(), None).unwrap();
        slide.insert_shape(0, Element::new("p:pic"));
        let tree = slide.sp_tree();
        let locals: Vec<&str> = tree.elements().map(|e| e.local_name()).collect();
        assert_eq!(locals, vec!["nvGrpSpPr", "grpSpPr", "pic", "extLst"]);
    }

    #[test]
    fn test_edit_runs_preserves_run_properties() {
        let mut slide = sample();
        let changed = slide.edit_runs(|text| (text == "two").then(|| "2".to_string()));
        assert_eq!(changed, 1);
        let (xml, rels) = slide.serialize();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains(r#"<a:rPr lang="en-US" sz="1800"/><a:t>2</a:t>"#));
        assert!(rels.is_none());
    }

    #[test]
    fn test_image_relationship_marks_rels_dirty() {
        let mut slide = sample();
        let id = slide.add_image_relationship("ppt/media/image1.png");
        assert_eq!(id, "rId1");
        let (_, rels) = slide.serialize();
        let rels = String::from_utf8(rels.unwrap()).unwrap();
        assert!(rels.contains(r#"Target="../media/image1.png""#));
    }

    #[test]
    fn test_slide_without_tree() {
        let err = Slide::parse("ppt/slides/slide9.xml", b"<p:sld/>", None).unwrap_err();
        assert!(matches!(err, DeckError::Xml { .. }));
    }
}
