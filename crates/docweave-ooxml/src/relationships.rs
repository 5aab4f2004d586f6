//! Relationships parsing and modification for OOXML packages
//!
//! Relationship files (`_rels/*.rels`) map ids such as `rId7` to package
//! parts. The merge engine reads them to locate source images and extends
//! the template's table when it embeds new media.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Common relationship type URIs
impl Relationships {
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    /// Styles relationship type
    pub const TYPE_STYLES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    /// Numbering relationship type
    pub const TYPE_NUMBERING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    /// Settings relationship type
    pub const TYPE_SETTINGS: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
    /// Main document relationship type (package level)
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Core properties relationship type (package level)
    pub const TYPE_CORE_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
}

/// Parsed relationships from a .rels file
///
/// Maintains insertion order for deterministic XML serialization.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Relationship ids in insertion order
    order: Vec<String>,
    /// Relationship id to target
    map: HashMap<String, RelationshipTarget>,
    /// Counter for generating unique ids (starts at 1)
    next_id_counter: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1,
        }
    }
}

/// A relationship target with its type and mode
#[derive(Debug, Clone)]
pub struct RelationshipTarget {
    /// The target path, relative to the source part's directory
    pub target: String,
    /// The relationship type URI
    pub rel_type: String,
    /// "External" for targets outside the package
    pub target_mode: Option<String>,
}

impl RelationshipTarget {
    /// Whether the target lives outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("external"))
            .unwrap_or(false)
    }
}

impl Relationships {
    /// Create an empty relationships map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = attr.unescape_value().ok().map(|s| s.to_string());
                            match attr.key.as_ref() {
                                b"Id" => id = value,
                                b"Target" => target = value,
                                b"Type" => rel_type = value,
                                b"TargetMode" => target_mode = value,
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            if let Some(num) = extract_id_number(&id) {
                                max_id = max_id.max(num);
                            }
                            rels.insert(
                                id,
                                RelationshipTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        rels.next_id_counter = max_id + 1;
        Ok(rels)
    }

    fn insert(&mut self, id: String, rel: RelationshipTarget) {
        if !self.map.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.map.insert(id, rel);
    }

    /// Add a new internal relationship and return the generated id
    pub fn add(&mut self, target: impl Into<String>, rel_type: impl Into<String>) -> String {
        // Skip ids that already exist under a non-numeric scheme clash
        let mut id = format!("rId{}", self.next_id_counter);
        while self.map.contains_key(&id) {
            self.next_id_counter += 1;
            id = format!("rId{}", self.next_id_counter);
        }
        self.next_id_counter += 1;

        self.insert(
            id.clone(),
            RelationshipTarget {
                target: target.into(),
                rel_type: rel_type.into(),
                target_mode: None,
            },
        );
        id
    }

    /// Serialize relationships to OOXML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));
        xml.push('\n');

        for (id, rel) in self.iter() {
            xml.push_str("  <Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_xml(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_xml(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_xml(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            xml.push_str("/>\n");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Get the target for a relationship id
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship target for an id
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// Check if a relationship is an image
    pub fn is_image(&self, id: &str) -> bool {
        self.map
            .get(id)
            .map(|r| r.rel_type == Self::TYPE_IMAGE)
            .unwrap_or(false)
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<(&str, &RelationshipTarget)> {
        self.iter().find(|(_, rel)| rel.rel_type == rel_type)
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// `resolve_part_path("word", "media/image1.png")` is `word/media/image1.png`;
/// `..` segments climb out of the source directory and a leading `/` makes
/// the target package-absolute.
pub fn resolve_part_path(source_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        source_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Extract the numeric portion from a relationship id (e.g., "rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse().ok())
}

/// Escape special XML characters in attribute values
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
