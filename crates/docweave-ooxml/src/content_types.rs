//! `[Content_Types].xml` parsing and modification
//!
//! Maps part extensions (`Default`) and individual part names (`Override`)
//! to MIME types. Embedding media of a new format means registering its
//! extension here, otherwise Word refuses to open the package.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// OOXML namespace for content types
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type of `word/settings.xml`
pub const SETTINGS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";

/// Content type of `word/numbering.xml`
pub const NUMBERING_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";

/// Content type of `word/styles.xml`
pub const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

/// Content type of a `.docx` main document part
pub const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

/// Content type of relationship parts
pub const RELATIONSHIPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Parsed `[Content_Types].xml`, insertion order preserved
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// (extension, content type), extensions stored lower-case without dot
    defaults: Vec<(String, String)>,
    /// (part name, content type), part names start with `/`
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The minimal table a fresh document package needs
    pub fn for_new_document() -> Self {
        let mut types = Self::new();
        types.ensure_default("rels", RELATIONSHIPS_CONTENT_TYPE);
        types.ensure_default("xml", "application/xml");
        types.ensure_override("/word/document.xml", DOCUMENT_CONTENT_TYPE);
        types.ensure_override("/word/styles.xml", STYLES_CONTENT_TYPE);
        types.ensure_override("/word/settings.xml", SETTINGS_CONTENT_TYPE);
        types
    }

    /// Parse content types from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut types = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let mut key = None;
                    let mut content_type = None;
                    let element = e.local_name();
                    let key_attr: &[u8] = match element.as_ref() {
                        b"Default" => b"Extension",
                        b"Override" => b"PartName",
                        _ => {
                            buf.clear();
                            continue;
                        }
                    };

                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        let value = attr.unescape_value().ok().map(|s| s.to_string());
                        if attr.key.as_ref() == key_attr {
                            key = value;
                        } else if attr.key.as_ref() == b"ContentType" {
                            content_type = value;
                        }
                    }

                    if let (Some(key), Some(content_type)) = (key, content_type) {
                        if element.as_ref() == b"Default" {
                            types.ensure_default(&key, &content_type);
                        } else {
                            types.ensure_override(&key, &content_type);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Register an extension unless one is already present
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        if !self.defaults.iter().any(|(ext, _)| *ext == extension) {
            self.defaults.push((extension, content_type.to_string()));
        }
    }

    /// Register a part override unless one is already present
    pub fn ensure_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = normalize_part_name(part_name);
        if !self.overrides.iter().any(|(name, _)| *name == part_name) {
            self.overrides.push((part_name, content_type.to_string()));
        }
    }

    /// Content type registered for an extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.defaults
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| ct.as_str())
    }

    /// Content type of a package part: its override first, then its extension
    pub fn content_type_of(&self, part_path: &str) -> Option<&str> {
        let part_name = normalize_part_name(part_path);
        if let Some((_, ct)) = self.overrides.iter().find(|(name, _)| *name == part_name) {
            return Some(ct.as_str());
        }
        let extension = part_name.rsplit_once('.').map(|(_, ext)| ext)?;
        self.default_for(extension)
    }

    /// Whether a part has an override entry
    pub fn has_override(&self, part_path: &str) -> bool {
        let part_name = normalize_part_name(part_path);
        self.overrides.iter().any(|(name, _)| *name == part_name)
    }

    /// Serialize to OOXML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS));
        xml.push('\n');
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (name, ct) in &self.overrides {
            xml.push_str(&format!(
                "  <Override PartName=\"{}\" ContentType=\"{}\"/>\n",
                escape_xml(name),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

fn normalize_part_name(part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else {
        format!("/{}", part)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
