//! Archive handling for DOCX/DOTX packages
//!
//! DOCX and DOTX files are ZIP archives containing XML parts and binary
//! resources. The archive is unpacked fully into memory, edited part by
//! part, and written back in sorted path order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{OoxmlError, Result};

/// Path of the main document part
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Path of the styles part
pub const STYLES_PART: &str = "word/styles.xml";
/// Path of the numbering part
pub const NUMBERING_PART: &str = "word/numbering.xml";
/// Path of the settings part
pub const SETTINGS_PART: &str = "word/settings.xml";
/// Path of the main document relationships
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
/// Path of the package content types
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Path of the core properties part
pub const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Represents an unpacked OOXML document
#[derive(Debug, Clone, Default)]
pub struct OoxmlArchive {
    /// All files in the archive, keyed by path
    files: HashMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack a DOCX/DOTX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Create from in-memory package bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(std::io::Cursor::new(bytes))
    }

    /// Get a file's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a file's contents as a string
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Get the main document content (word/document.xml)
    pub fn document_xml(&self) -> Result<&[u8]> {
        self.get(DOCUMENT_PART)
            .ok_or_else(|| OoxmlError::MissingFile(DOCUMENT_PART.to_string()))
    }

    /// Get the styles definition (word/styles.xml), if present
    pub fn styles_xml(&self) -> Option<&[u8]> {
        self.get(STYLES_PART)
    }

    /// Get the document relationships (word/_rels/document.xml.rels)
    pub fn document_rels_xml(&self) -> Option<&[u8]> {
        self.get(DOCUMENT_RELS_PART)
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all files in the archive
    pub fn file_list(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Set or update a file's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Set a file's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    /// Remove a file from the archive
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Write the archive to an in-memory buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        // [Content_Types].xml goes first, the rest sorted for deterministic output
        let mut paths: Vec<_> = self.files.keys().collect();
        paths.sort_by(|a, b| {
            let key_a = (a.as_str() != CONTENT_TYPES_PART, a.as_str());
            let key_b = (b.as_str() != CONTENT_TYPES_PART, b.as_str());
            key_a.cmp(&key_b)
        });

        for path in paths {
            let contents = &self.files[path];
            zip.start_file(path.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_operations() {
        let mut archive = OoxmlArchive::new();

        archive.set_string("test.xml", "<root/>");
        assert!(archive.contains("test.xml"));
        assert_eq!(archive.get_string("test.xml"), Some("<root/>".to_string()));

        archive.remove("test.xml");
        assert!(!archive.contains("test.xml"));
    }

    #[test]
    fn test_missing_document_part() {
        let archive = OoxmlArchive::new();
        let err = archive.document_xml().unwrap_err();
        assert!(matches!(err, OoxmlError::MissingFile(ref p) if p == DOCUMENT_PART));
    }

    #[test]
    fn test_roundtrip_through_bytes() {
        let mut archive = OoxmlArchive::new();
        archive.set_string(CONTENT_TYPES_PART, "<Types/>");
        archive.set_string(DOCUMENT_PART, "<w:document/>");
        archive.set("word/media/a.png", vec![0x89, b'P', b'N', b'G']);

        let bytes = archive.to_bytes().unwrap();
        let restored = OoxmlArchive::from_bytes(&bytes).unwrap();

        assert_eq!(restored.get("word/media/a.png"), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert_eq!(restored.get_string(DOCUMENT_PART).as_deref(), Some("<w:document/>"));
    }

    #[test]
    fn test_content_types_written_first() {
        let mut archive = OoxmlArchive::new();
        archive.set_string("a/first.xml", "<a/>");
        archive.set_string(CONTENT_TYPES_PART, "<Types/>");

        let bytes = archive.to_bytes().unwrap();
        let mut zip = ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), CONTENT_TYPES_PART);
    }
}
