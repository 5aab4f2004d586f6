//! Style definitions parsing (word/styles.xml)
//!
//! [`StyleSheet`] is the parsed form of a package's style part. The merge
//! engine only ever needs the set-valued view of it, [`StyleCatalog`], which
//! answers "does the template have this style" and "which id does it use".

use std::collections::{BTreeMap, HashMap};

use docweave_ast::StyleNames;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// Collection of styles from a document
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// All styles, keyed by style ID
    styles: HashMap<String, Style>,
    /// Default paragraph style ID
    pub default_paragraph: Option<String>,
}

/// A Word style definition
#[derive(Debug, Clone)]
pub struct Style {
    /// Style ID (used in document references)
    pub id: String,
    /// Display name
    pub name: String,
    /// Style type
    pub style_type: StyleType,
    /// Base style ID
    pub based_on: Option<String>,
    /// Outline level (0-8, where 0 = Heading 1)
    pub outline_level: Option<u8>,
}

/// Type of style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleType {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleSheet {
    /// Parse styles from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut stylesheet = StyleSheet::default();
        let mut buf = Vec::new();
        let mut current: Option<StyleBuilder> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let name = e.local_name();
                    match (name.as_ref(), current.as_mut()) {
                        (b"style", _) => {
                            current = Some(StyleBuilder {
                                id: get_attr(e, b"w:styleId"),
                                style_type: get_attr(e, b"w:type").map(|t| StyleType::from_ooxml(&t)),
                                is_default: get_attr(e, b"w:default").as_deref() == Some("1"),
                                ..StyleBuilder::default()
                            });
                        }
                        (b"name", Some(builder)) => builder.name = get_attr(e, b"w:val"),
                        (b"basedOn", Some(builder)) => builder.based_on = get_attr(e, b"w:val"),
                        (b"outlineLvl", Some(builder)) => {
                            builder.outline_level =
                                get_attr(e, b"w:val").and_then(|v| v.parse().ok());
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => {
                    if let Some(builder) = current.take() {
                        let is_default = builder.is_default;
                        if let Some(style) = builder.build() {
                            if is_default && style.style_type == StyleType::Paragraph {
                                stylesheet.default_paragraph = Some(style.id.clone());
                            }
                            stylesheet.styles.insert(style.id.clone(), style);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(stylesheet)
    }

    /// Get a style by ID
    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    /// Get all styles
    pub fn all(&self) -> impl Iterator<Item = &Style> {
        self.styles.values()
    }

    /// Number of parsed styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Display name for a style id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or(id)
    }

    /// Resolve the inheritance chain for a style
    pub fn resolve_chain(&self, style_id: &str) -> Vec<&Style> {
        let mut chain = Vec::new();
        let mut current = style_id;
        let mut seen = std::collections::HashSet::new();

        while let Some(style) = self.get(current) {
            if !seen.insert(&style.id) {
                break;
            }
            chain.push(style);
            match style.based_on {
                Some(ref base) => current = base,
                None => break,
            }
        }

        chain
    }
}

impl StyleType {
    fn from_ooxml(value: &str) -> Self {
        match value {
            "character" => StyleType::Character,
            "table" => StyleType::Table,
            "numbering" => StyleType::Numbering,
            _ => StyleType::Paragraph,
        }
    }
}

#[derive(Default)]
struct StyleBuilder {
    id: Option<String>,
    name: Option<String>,
    style_type: Option<StyleType>,
    based_on: Option<String>,
    outline_level: Option<u8>,
    is_default: bool,
}

impl StyleBuilder {
    fn build(self) -> Option<Style> {
        let id = self.id?;
        Some(Style {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            style_type: self.style_type.unwrap_or(StyleType::Paragraph),
            based_on: self.based_on,
            outline_level: self.outline_level,
        })
    }
}

pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

// ============================================================================
// Style catalog
// ============================================================================

/// Set-valued view of a template's styles.
///
/// Lookups match display names and style ids case-insensitively, so
/// "Heading 1", "heading 1" and "Heading1" all find Word's built-in heading.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    /// Lower-cased display name or id -> style id
    ids: BTreeMap<String, String>,
    /// Display names
    names: StyleNames,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a parsed stylesheet
    pub fn from_stylesheet(sheet: &StyleSheet) -> Self {
        let mut catalog = Self::new();
        // Ids win over names that happen to collide with another style's id
        for style in sheet.all() {
            catalog.ids.insert(style.name.to_lowercase(), style.id.clone());
            catalog.names.insert(style.name.clone());
        }
        for style in sheet.all() {
            catalog.ids.insert(style.id.to_lowercase(), style.id.clone());
        }
        catalog
    }

    /// Parse `word/styles.xml` directly into a catalog
    pub fn parse(xml: &[u8]) -> Result<Self> {
        StyleSheet::parse(xml).map(|sheet| Self::from_stylesheet(&sheet))
    }

    /// Catalog where each style's id equals its name
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for name in names {
            let name = name.into();
            catalog.ids.insert(name.to_lowercase(), name.clone());
            catalog.names.insert(name);
        }
        catalog
    }

    /// Whether the catalog has a style with this name or id
    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(&name.to_lowercase())
    }

    /// Style id to write into `w:pStyle` for a name or id
    pub fn style_id_for(&self, name: &str) -> Option<&str> {
        self.ids.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Display names known to the catalog
    pub fn names(&self) -> &StyleNames {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
