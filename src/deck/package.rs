//! OOXML package access: the zip container and its parts.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DeckError, Result};
use crate::xml::{Element, XmlDocument};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const MAX_PREALLOC_BYTES: u64 = 64 << 20;

/// One part of the package, addressed by its zip entry name (no leading `/`).
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

/// All parts of an OOXML package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Read a package from disk.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DeckError::TemplateNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            // The declared size comes from the archive and may be bogus
            let mut data = Vec::with_capacity(entry.size().min(MAX_PREALLOC_BYTES) as usize);
            entry.read_to_end(&mut data)?;
            parts.push(Part {
                name: entry.name().to_string(),
                data,
            });
        }
        if !parts.iter().any(|p| p.name == CONTENT_TYPES_PART) {
            return Err(DeckError::Package(format!(
                "missing {CONTENT_TYPES_PART}, not an OOXML package"
            )));
        }
        Ok(Self { parts })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace a part's data, or add the part if it does not exist.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Parse a part as XML.
    pub fn xml(&self, name: &str) -> Result<Option<XmlDocument>> {
        self.get(name)
            .map(|bytes| XmlDocument::parse(name, bytes))
            .transpose()
    }

    /// Make sure `[Content_Types].xml` has a `Default` entry for `extension`.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<()> {
        let mut types = self
            .xml(CONTENT_TYPES_PART)?
            .ok_or_else(|| DeckError::Package(format!("missing {CONTENT_TYPES_PART}")))?;

        let present = types.root.elements().any(|e| {
            e.is("Default")
                && e.attr("Extension")
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        });
        if present {
            return Ok(());
        }

        // Defaults conventionally precede Overrides.
        let at = types
            .root
            .children
            .iter()
            .position(|n| n.as_element().is_some_and(|e| e.is("Override")))
            .unwrap_or(types.root.children.len());
        types.root.children.insert(
            at,
            Element::new("Default")
                .with_attr("Extension", extension)
                .with_attr("ContentType", content_type)
                .into(),
        );
        self.set(CONTENT_TYPES_PART, types.to_bytes());
        Ok(())
    }

    /// Serialize the package. Parts in `overrides` replace (or extend) the
    /// stored parts; `[Content_Types].xml` is always written first.
    pub fn to_bytes_with(&self, overrides: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut ordered: Vec<&Part> = self.parts.iter().collect();
        ordered.sort_by_key(|p| p.name != CONTENT_TYPES_PART);

        for part in ordered {
            let data = overrides.get(&part.name).unwrap_or(&part.data);
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(data)?;
        }
        for (name, data) in overrides {
            if !self.contains(name) {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Write `bytes` to `path` through a uniquely named temp file in the same
/// directory, so a failed write never leaves a partial document at `path`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let failed = |e: std::io::Error| DeckError::Serialization(format!("{}: {}", path.display(), e));
    if path.file_name().is_none() {
        return Err(DeckError::Serialization(format!("not a file path: {}", path.display())));
    }
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tiny_package() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("docProps/app.xml", options).unwrap();
        writer.write_all(b"<Properties/>").unwrap();
        writer.start_file(CONTENT_TYPES_PART, options).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0"?><Types xmlns="urn:ct"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/docProps/app.xml" ContentType="x"/></Types>"#,
            )
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_missing_template() {
        let err = Package::open(Path::new("/nonexistent/FTP_Template.pptx")).unwrap_err();
        assert!(matches!(err, DeckError::TemplateNotFound(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = Package::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, DeckError::Package(_)));
    }

    #[test]
    fn test_content_types_written_first() {
        let package = Package::from_bytes(&tiny_package()).unwrap();
        let bytes = package.to_bytes_with(&BTreeMap::new()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names[0], CONTENT_TYPES_PART);
    }

    #[test]
    fn test_ensure_default_content_type() {
        let mut package = Package::from_bytes(&tiny_package()).unwrap();
        package.ensure_default_content_type("png", "image/png").unwrap();
        package.ensure_default_content_type("PNG", "image/png").unwrap();

        let types = package.xml(CONTENT_TYPES_PART).unwrap().unwrap();
        let defaults: Vec<String> = types
            .root
            .elements()
            .filter(|e| e.is("Default"))
            .filter_map(|e| e.attr("Extension"))
            .collect();
        assert_eq!(defaults, vec!["xml".to_string(), "png".to_string()]);
        // Inserted before the first Override.
        let first_override = types.root.elements().position(|e| e.is("Override")).unwrap();
        assert_eq!(first_override, 2);
    }

    #[test]
    fn test_overrides_add_new_parts() {
        let package = Package::from_bytes(&tiny_package()).unwrap();
        let mut overrides = BTreeMap::new();
        overrides.insert("ppt/media/image1.png".to_string(), vec![1, 2, 3]);
        let reread = Package::from_bytes(&package.to_bytes_with(&overrides).unwrap()).unwrap();
        assert_eq!(reread.get("ppt/media/image1.png"), Some(&[1u8, 2, 3][..]));
        assert!(reread.contains("docProps/app.xml"));
    }

    #[test]
    fn test_write_atomically_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pptx");
        write_atomically(&path, b"deck").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"deck");
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);

        let missing_dir = dir.path().join("missing").join("out.pptx");
        let err = write_atomically(&missing_dir, b"deck").unwrap_err();
        assert!(matches!(err, DeckError::Serialization(_)));
    }

    #[test]
    fn test_write_atomically_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pptx");
        fs::write(&path, b"").unwrap();
        write_atomically(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_oversized_entry_header() {
        // Claims far more than it holds; reading must not trust the claim.
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(CONTENT_TYPES_PART, options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();

        // Patch the uncompressed size (offset 24) of the central directory entry.
        let central = bytes
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&u32::MAX.to_le_bytes());

        match Package::from_bytes(&bytes) {
            Ok(package) => assert_eq!(package.get(CONTENT_TYPES_PART), Some(&b"<Types/>"[..])),
            Err(err) => assert!(matches!(err, DeckError::Package(_) | DeckError::Io(_))),
        }
    }
}
