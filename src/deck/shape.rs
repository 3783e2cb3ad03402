//! Read-only views over the shapes of a slide.

use serde::Serialize;

use crate::xml::Element;

/// EMUs per centimeter.
pub const EMU_PER_CM: i64 = 360_000;

/// What kind of node a shape is, from its element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// `p:sp`, an auto shape or text box
    Shape,
    /// `p:pic`
    Picture,
    /// `p:graphicFrame`, holding a table or chart
    GraphicFrame,
    /// `p:grpSp`
    Group,
    /// `p:cxnSp`
    Connector,
    /// `p:contentPart` or `mc:AlternateContent`
    Other,
}

impl ShapeKind {
    /// The kind for an `spTree` child, or `None` for non-shape nodes such as
    /// `p:nvGrpSpPr`, `p:grpSpPr` and `p:extLst`.
    pub fn of(element: &Element) -> Option<Self> {
        match element.local_name() {
            "sp" => Some(ShapeKind::Shape),
            "pic" => Some(ShapeKind::Picture),
            "graphicFrame" => Some(ShapeKind::GraphicFrame),
            "grpSp" => Some(ShapeKind::Group),
            "cxnSp" => Some(ShapeKind::Connector),
            "contentPart" | "AlternateContent" => Some(ShapeKind::Other),
            _ => None,
        }
    }
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Geometry {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Read an `a:xfrm` / `p:xfrm` element.
    pub fn from_xfrm(xfrm: &Element) -> Option<Self> {
        let off = xfrm.child("off")?;
        let ext = xfrm.child("ext")?;
        Some(Self {
            left: off.attr("x")?.parse().ok()?,
            top: off.attr("y")?.parse().ok()?,
            width: ext.attr("cx")?.parse().ok()?,
            height: ext.attr("cy")?.parse().ok()?,
        })
    }

    /// Width and height in centimeters.
    pub fn size_cm(&self) -> (f64, f64) {
        (
            self.width as f64 / EMU_PER_CM as f64,
            self.height as f64 / EMU_PER_CM as f64,
        )
    }
}

/// A shape on a slide: its position among the slide's shapes and its element.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRef<'a> {
    index: usize,
    kind: ShapeKind,
    element: &'a Element,
}

impl<'a> ShapeRef<'a> {
    pub(crate) fn new(index: usize, kind: ShapeKind, element: &'a Element) -> Self {
        Self {
            index,
            kind,
            element,
        }
    }

    /// Index among the slide's shapes (non-shape nodes are not counted).
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[inline]
    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// The non-visual properties element (`p:cNvPr`).
    fn c_nv_pr(&self) -> Option<&'a Element> {
        self.element
            .elements()
            .find(|e| e.local_name().starts_with("nv"))
            .and_then(|nv| nv.child("cNvPr"))
    }

    /// The shape name from `p:cNvPr/@name`.
    pub fn name(&self) -> Option<String> {
        self.c_nv_pr()?.attr("name")
    }

    /// The shape id from `p:cNvPr/@id`.
    pub fn id(&self) -> Option<u32> {
        self.c_nv_pr()?.attr("id")?.parse().ok()
    }

    /// Position and size, if the shape carries its own transform. Shapes that
    /// inherit their geometry from the layout return `None`.
    pub fn geometry(&self) -> Option<Geometry> {
        let xfrm = self
            .element
            .child("spPr")
            .or_else(|| self.element.child("grpSpPr"))
            .and_then(|props| props.child("xfrm"))
            .or_else(|| self.element.child("xfrm"))?;
        Geometry::from_xfrm(xfrm)
    }

    /// Text of each run in the shape's own text body, in order.
    pub fn runs(&self) -> Vec<String> {
        self.element
            .child("txBody")
            .map(run_texts)
            .unwrap_or_default()
    }

    /// The shape's text body with paragraphs joined by newlines, or `None`
    /// for shapes without one.
    pub fn text(&self) -> Option<String> {
        let body = self.element.child("txBody")?;
        let paragraphs: Vec<String> = body
            .elements()
            .filter(|e| e.is("p"))
            .map(|p| run_texts(p).concat())
            .collect();
        Some(paragraphs.join("\n"))
    }

    /// Cell texts of a table graphic frame, row by row.
    pub fn table(&self) -> Option<Vec<Vec<String>>> {
        let table = self.element.descendants("tbl").into_iter().next()?;
        let rows: Vec<Vec<String>> = table
            .elements()
            .filter(|e| e.is("tr"))
            .map(|row| {
                row.elements()
                    .filter(|e| e.is("tc"))
                    .map(|cell| run_texts(cell).concat())
                    .collect()
            })
            .collect();
        Some(rows)
    }
}

/// Texts of all `a:r` runs below `element`.
pub(crate) fn run_texts(element: &Element) -> Vec<String> {
    element
        .descendants("r")
        .into_iter()
        .filter_map(|run| run.child("t"))
        .map(Element::text)
        .collect()
}
