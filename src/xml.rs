//! # Owned XML Tree
//!
//! OOXML parts are parsed with `quick-xml` into a small owned tree that keeps
//! every node in document order. Character data and attribute values are
//! stored exactly as they appear in the source (still escaped), so the parts
//! of a slide that are never touched are written back unchanged.
//!
//! Accessors that hand out text ([`Element::text`], [`Element::attr`])
//! unescape on the way out; setters escape on the way in.

use std::fmt::Write as FmtWrite;

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{DeckError, Result};

/// A node in an XML tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
    /// Declaration or processing instruction body, without `<?` and `?>`.
    Instruction(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An element with its qualified name, raw attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written, e.g. `p:sp`.
    pub name: String,
    /// Attributes in source order, values still escaped.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute (the value is escaped).
    pub fn with_attr(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    #[inline]
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Unescaped value of the attribute with this exact qualified name.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| unescape_lossy(v))
    }

    pub fn set_attr(&mut self, key: &str, value: impl AsRef<str>) {
        let escaped = escape(value.as_ref()).into_owned();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = escaped,
            None => self.attrs.push((key.to_string(), escaped)),
        }
    }

    /// Iterate over element children.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First child element with this local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// Follow a chain of child local names.
    pub fn path(&self, locals: &[&str]) -> Option<&Element> {
        locals
            .iter()
            .try_fold(self, |element, local| element.child(local))
    }

    pub fn path_mut(&mut self, locals: &[&str]) -> Option<&mut Element> {
        let mut current = self;
        for local in locals {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// All descendant elements (not including `self`) with this local name,
    /// in document order.
    pub fn descendants(&self, local: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(local, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, local: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.is(local) {
                found.push(child);
            }
            child.collect_descendants(local, found);
        }
    }

    /// Visit every descendant element mutably, parents before children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        for child in self.elements_mut() {
            f(child);
            child.visit_mut(f);
        }
    }

    /// Unescaped text of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(raw) => text.push_str(&unescape_lossy(raw)),
                Node::CData(raw) => text.push_str(raw),
                _ => {},
            }
        }
        text
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(partial_escape(text).into_owned())];
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            let quote = if value.contains('"') { '\'' } else { '"' };
            let _ = write!(out, " {key}={quote}{value}{quote}");
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// A parsed XML part: the nodes around the root plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    prolog: Vec<Node>,
    pub root: Element,
    epilog: Vec<Node>,
}

impl XmlDocument {
    /// A document with the standard OOXML declaration.
    pub fn new(root: Element) -> Self {
        Self {
            prolog: vec![
                Node::Instruction(r#"xml version="1.0" encoding="UTF-8" standalone="yes""#.into()),
                Node::Text("\r\n".into()),
            ],
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a part. `part` names it in error messages.
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| DeckError::xml(part, e))?;
            let node = match event {
                Event::Start(e) => {
                    stack.push(start_element(part, &e)?);
                    None
                },
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DeckError::xml(part, "unbalanced end tag"))?;
                    Some(Node::Element(element))
                },
                Event::Empty(e) => Some(Node::Element(start_element(part, &e)?)),
                Event::Text(e) => Some(Node::Text(raw_string(part, &e)?)),
                Event::CData(e) => Some(Node::CData(raw_string(part, &e)?)),
                Event::Comment(e) => Some(Node::Comment(raw_string(part, &e)?)),
                Event::Decl(e) => Some(Node::Instruction(raw_string(part, &e)?)),
                Event::PI(e) => Some(Node::Instruction(raw_string(part, &e)?)),
                Event::DocType(e) => Some(Node::DocType(raw_string(part, &e)?)),
                Event::Eof => break,
            };
            buf.clear();

            let Some(node) = node else { continue };
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => match node {
                    Node::Element(element) if root.is_none() => root = Some(element),
                    other if root.is_none() => prolog.push(other),
                    other => epilog.push(other),
                },
            }
        }

        if !stack.is_empty() {
            return Err(DeckError::xml(part, "unexpected end of document"));
        }
        let root = root.ok_or_else(|| DeckError::xml(part, "no root element"))?;
        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            write_node(node, &mut out);
        }
        out.into_bytes()
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => element.write_to(out),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(raw) => {
            let _ = write!(out, "<![CDATA[{raw}]]>");
        },
        Node::Comment(raw) => {
            let _ = write!(out, "<!--{raw}-->");
        },
        Node::Instruction(raw) => {
            let _ = write!(out, "<?{raw}?>");
        },
        Node::DocType(raw) => {
            let _ = write!(out, "<!DOCTYPE {raw}>");
        },
    }
}

fn start_element(part: &str, e: &BytesStart<'_>) -> Result<Element> {
    let name = raw_string(part, e.name().as_ref())?;
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| DeckError::xml(part, e))?;
        attrs.push((
            raw_string(part, attr.key.as_ref())?,
            raw_string(part, &attr.value)?,
        ));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn raw_string(part: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| DeckError::xml(part, e))
}

fn unescape_lossy(raw: &str) -> String {
    unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Local part of a qualified name.
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
