//! Placeholder discovery: the read-only pass over a slide.

use crate::deck::{Geometry, Slide};

/// What identifies an image placeholder: an exact shape name, or an exact
/// (trimmed) text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    names: Vec<String>,
    text: Option<String>,
}

impl Sentinel {
    /// Match shapes named exactly `name`.
    pub fn named(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
            text: None,
        }
    }

    /// Also match shapes with this alternative name.
    pub fn or_named(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self
    }

    /// Also match shapes whose whole trimmed text is `text`.
    pub fn or_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// The text sentinel, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// A human-readable label, the first name (or the text).
    pub fn label(&self) -> &str {
        self.names
            .first()
            .map(String::as_str)
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    fn classify(&self, name: Option<&str>, text: Option<&str>) -> Option<MatchKind> {
        if name.is_some_and(|name| self.names.iter().any(|n| n == name)) {
            return Some(MatchKind::Name);
        }
        match (&self.text, text) {
            (Some(sentinel), Some(text)) if text.trim() == sentinel => Some(MatchKind::Text),
            _ => None,
        }
    }
}

/// How a shape was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Name,
    Text,
}

/// One placeholder found on a slide, captured before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// 0-based slide index
    pub slide: usize,
    /// Shape index on that slide at discovery time
    pub shape: usize,
    /// Index into the sentinel list that matched
    pub sentinel: usize,
    pub kind: MatchKind,
    /// `None` when the shape inherits its position from the layout
    pub geometry: Option<Geometry>,
}

/// Scan the shapes of one slide once and record every shape that matches one
/// of `sentinels`. A shape matches at most one sentinel, the first in list
/// order; within a sentinel a name match wins over a text match.
pub fn discover(slide_index: usize, slide: &Slide, sentinels: &[Sentinel]) -> Vec<PlaceholderMatch> {
    let mut matches = Vec::new();
    for shape in slide.shapes() {
        let name = shape.name();
        let text = shape.text();
        let found = sentinels
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.classify(name.as_deref(), text.as_deref()).map(|kind| (i, kind)));

        if let Some((sentinel, kind)) = found {
            log::debug!(
                "Found {} placeholder ({kind:?}) on slide {} at shape {}",
                sentinels[sentinel].label(),
                slide_index + 1,
                shape.index()
            );
            matches.push(PlaceholderMatch {
                slide: slide_index,
                shape: shape.index(),
                sentinel,
                kind,
                geometry: shape.geometry(),
            });
        }
    }
    matches
}
