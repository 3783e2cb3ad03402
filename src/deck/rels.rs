//! Package relationships (`_rels/*.rels` parts).

use crate::error::Result;
use crate::xml::{Element, XmlDocument};

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    doc: XmlDocument,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            doc: XmlDocument::new(Element::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS)),
        }
    }
}

impl Relationships {
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            doc: XmlDocument::parse(part, bytes)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.doc
            .root
            .elements()
            .filter(|e| e.is("Relationship"))
            .filter_map(|e| {
                Some(Relationship {
                    id: e.attr("Id")?,
                    rel_type: e.attr("Type").unwrap_or_default(),
                    target: e.attr("Target")?,
                    external: e.attr("TargetMode").as_deref() == Some("External"),
                })
            })
    }

    pub fn get(&self, id: &str) -> Option<Relationship> {
        self.iter().find(|r| r.id == id)
    }

    /// Add a relationship and return its new `rIdN` id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let next = self
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        self.doc.root.children.push(
            Element::new("Relationship")
                .with_attr("Id", &id)
                .with_attr("Type", rel_type)
                .with_attr("Target", target)
                .into(),
        );
        id
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.doc.to_bytes()
    }
}

/// The rels part that belongs to `part`, e.g. `ppt/slides/slide1.xml` ->
/// `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            "." | "" => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// The relative target from `source_part` to `target_part`, the inverse of
/// [`resolve_target`].
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = target_part.split('/').collect();
    let common = source_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; source_dir.len() - common];
    parts.extend(&target[common..]);
    parts.join("/")
}
