//! Template loader and output package assembly
//!
//! A [`Template`] is the destination of a merge: its style catalog is
//! authoritative, its body keeps the boilerplate it already has, and new
//! content is appended in front of the final section properties so page
//! setup stays last.
//!
//! # Example
//!
//! ```ignore
//! use docweave_ooxml::Template;
//!
//! let mut template = Template::load("corporate.dotx")?;
//! println!("{} styles", template.catalog().len());
//! template.body_mut().text_paragraph("Appended", None, None);
//! template.save("out.docx")?;
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::archive::{
    OoxmlArchive, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, SETTINGS_PART,
};
use crate::content_types::{ContentTypes, SETTINGS_CONTENT_TYPE};
use crate::embed::MediaSink;
use crate::error::{OoxmlError, Result};
use crate::relationships::{resolve_part_path, Relationships};
use crate::styles::{StyleCatalog, StyleSheet};
use crate::writer::{settings_xml, BodyXml};

static UPDATE_FIELDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:updateFields\b[^>]*?(?:/>|>.*?</w:updateFields>)")
        .expect("valid updateFields pattern")
});
static EMPTY_SETTINGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:settings\b([^>]*)/>").expect("valid settings pattern"));

/// A Word template (.dotx/.docx) opened for content injection
#[derive(Debug)]
pub struct Template {
    /// The underlying OOXML archive
    archive: OoxmlArchive,
    stylesheet: StyleSheet,
    catalog: StyleCatalog,
    document_xml: String,
    /// Byte offset in `document_xml` where appended content goes
    insert_at: usize,
    media: MediaSink,
    appended: BodyXml,
}

impl Template {
    /// Load a template from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OoxmlError::TemplateNotFound(path.to_path_buf()));
        }
        Self::from_archive(OoxmlArchive::open(path)?)
    }

    /// Load a template from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_archive(OoxmlArchive::from_bytes(bytes)?)
    }

    pub fn from_archive(archive: OoxmlArchive) -> Result<Self> {
        let stylesheet = match archive.styles_xml() {
            Some(xml) => StyleSheet::parse(xml)?,
            None => StyleSheet::default(),
        };
        let catalog = StyleCatalog::from_stylesheet(&stylesheet);

        let document_xml = String::from_utf8_lossy(archive.document_xml()?).into_owned();
        let insert_at = insertion_point(&document_xml)?;

        let relationships = match archive.document_rels_xml() {
            Some(xml) => Relationships::parse(xml)?,
            None => Relationships::new(),
        };
        let content_types = match archive.get(CONTENT_TYPES_PART) {
            Some(xml) => ContentTypes::parse(xml)?,
            None => ContentTypes::for_new_document(),
        };
        let max_doc_pr_id = archive
            .file_list()
            .filter(|path| is_story_part(path))
            .filter_map(|path| archive.get(path))
            .map(max_doc_pr_id)
            .max()
            .unwrap_or(0);
        let media = MediaSink::new(relationships, content_types, archive.file_list(), max_doc_pr_id);

        log::debug!(
            "template has {} styles, content goes at byte {}",
            catalog.len(),
            insert_at
        );

        Ok(Self {
            archive,
            stylesheet,
            catalog,
            document_xml,
            insert_at,
            media,
            appended: BodyXml::new(),
        })
    }

    /// Style catalog of the template
    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn stylesheet(&self) -> &StyleSheet {
        &self.stylesheet
    }

    /// Style id for a style name, if the template has it
    pub fn style_id(&self, name: &str) -> Option<&str> {
        self.catalog.style_id_for(name)
    }

    /// Markup appended to the template body
    pub fn body_mut(&mut self) -> &mut BodyXml {
        &mut self.appended
    }

    /// Style catalog, appended markup and media state, borrowed together
    pub fn parts_mut(&mut self) -> (&StyleCatalog, &mut BodyXml, &mut MediaSink) {
        (&self.catalog, &mut self.appended, &mut self.media)
    }

    pub fn media(&self) -> &MediaSink {
        &self.media
    }

    /// Get a reference to the underlying archive
    pub fn archive(&self) -> &OoxmlArchive {
        &self.archive
    }

    /// Ask viewers to recompute fields (TOC, cross-references) on open.
    ///
    /// Creates `word/settings.xml` with its relationship and content type
    /// when the template has none.
    pub fn set_update_fields(&mut self) {
        let settings_path = self
            .media
            .relationships()
            .find_by_type(Relationships::TYPE_SETTINGS)
            .map(|(_, rel)| resolve_part_path("word", &rel.target));

        let existing = settings_path
            .as_deref()
            .and_then(|path| self.archive.get_string(path).map(|xml| (path.to_string(), xml)));

        match existing {
            Some((path, xml)) => {
                self.archive.set_string(path, with_update_fields(&xml));
            }
            None => {
                log::debug!("template has no settings part, creating {}", SETTINGS_PART);
                self.archive.set_string(SETTINGS_PART, settings_xml());
                if settings_path.is_none() {
                    self.media
                        .relationships_mut()
                        .add("settings.xml", Relationships::TYPE_SETTINGS);
                }
                self.media
                    .content_types_mut()
                    .ensure_override(SETTINGS_PART, SETTINGS_CONTENT_TYPE);
            }
        }
    }

    /// Assemble the output package
    pub fn into_archive(self) -> OoxmlArchive {
        let Template {
            mut archive,
            document_xml,
            insert_at,
            media,
            appended,
            ..
        } = self;

        let mut merged = String::with_capacity(document_xml.len() + appended.as_str().len());
        merged.push_str(&document_xml[..insert_at]);
        merged.push_str(appended.as_str());
        merged.push_str(&document_xml[insert_at..]);
        archive.set_string(DOCUMENT_PART, merged);

        let (relationships, content_types, files) = media.into_parts();
        archive.set_string(DOCUMENT_RELS_PART, relationships.to_xml());
        archive.set_string(CONTENT_TYPES_PART, content_types.to_xml());
        for (path, bytes) in files {
            archive.set(path, bytes);
        }

        archive
    }

    /// Serialize the output package
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        self.into_archive().to_bytes()
    }

    /// Write the output package to `path`
    pub fn save(self, path: impl AsRef<Path>) -> Result<()> {
        self.into_archive().write_to_file(path)
    }
}

/// Offset of the body-level `w:sectPr`, or of `</w:body>` when there is none
pub fn insertion_point(document_xml: &str) -> Result<usize> {
    let mut reader = Reader::from_str(document_xml);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    let mut body_depth = None;
    let mut section_at = None;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"body" => body_depth = Some(depth),
                    b"sectPr" if body_depth.map(|d| d + 1) == Some(depth) => {
                        section_at = Some(before)
                    }
                    _ if body_depth.map(|d| d + 1) == Some(depth) => section_at = None,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if body_depth.map(|d| d + 1) == Some(depth + 1) {
                    section_at = (e.local_name().as_ref() == b"sectPr").then_some(before);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"body" && body_depth == Some(depth) {
                    return Ok(section_at.unwrap_or(before));
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OoxmlError::Xml(e)),
            _ => {}
        }
    }

    Err(OoxmlError::InvalidStructure(
        "word/document.xml has no w:body".to_string(),
    ))
}

/// Highest `wp:docPr` id in a story part
fn max_doc_pr_id(xml: &[u8]) -> u32 {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut max = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"docPr" =>
            {
                let id = e
                    .attributes()
                    .filter_map(|a| a.ok())
                    .find(|a| a.key.as_ref() == b"id")
                    .and_then(|a| std::str::from_utf8(&a.value).ok()?.parse::<u32>().ok());
                if let Some(id) = id {
                    max = max.max(id);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    max
}

/// Parts whose drawings share the document's `docPr` id space
fn is_story_part(path: &str) -> bool {
    path == DOCUMENT_PART
        || ((path.starts_with("word/header") || path.starts_with("word/footer"))
            && path.ends_with(".xml"))
}

fn with_update_fields(settings: &str) -> String {
    const ELEMENT: &str = r#"<w:updateFields w:val="true"/>"#;

    if UPDATE_FIELDS.is_match(settings) {
        return UPDATE_FIELDS.replace(settings, ELEMENT).into_owned();
    }
    if let Some(pos) = settings.rfind("</w:settings>") {
        let mut out = settings.to_string();
        out.insert_str(pos, ELEMENT);
        return out;
    }
    EMPTY_SETTINGS
        .replace(settings, format!("<w:settings$1>{}</w:settings>", ELEMENT))
        .into_owned()
}
