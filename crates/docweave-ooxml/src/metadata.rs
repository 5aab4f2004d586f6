//! Display metadata scraped from a template
//!
//! Templates usually carry a revision table on their cover page. The first
//! table whose header names a version and an author, issue date or
//! description wins; otherwise two-column `key: value` rows are collected;
//! whatever is still missing comes from `docProps/core.xml`.

use std::collections::HashMap;
use std::path::Path;

use docweave_ast::{Block, Table};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::archive::{OoxmlArchive, CORE_PROPERTIES_PART};
use crate::document::read_document;
use crate::error::{OoxmlError, Result};

/// Keys that end the key/value scan once a table has produced one of them
const KNOWN_KEYS: &[&str] = &[
    "version",
    "issued date",
    "issued",
    "author",
    "template",
    "total pages",
    "description",
];

/// Template metadata for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateMetadata {
    pub version: String,
    pub author: String,
    pub issued_date: String,
    pub description: String,
    pub total_pages: String,
    pub template_name: String,
}

impl TemplateMetadata {
    /// Read metadata from a template file, named after its file name
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OoxmlError::TemplateNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_archive(&OoxmlArchive::open(path)?, &name)
    }

    pub fn from_archive(archive: &OoxmlArchive, template_name: &str) -> Result<Self> {
        let document = read_document(archive)?;
        let tables: Vec<&Table> = document
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                _ => None,
            })
            .collect();

        let mut meta = TemplateMetadata {
            template_name: template_name.to_string(),
            ..Default::default()
        };

        if !meta.apply_revision_table(&tables) {
            meta.apply_key_values(&tables);
        }

        if let Some(xml) = archive.get(CORE_PROPERTIES_PART) {
            let core = CoreProperties::parse(xml);
            fill(&mut meta.author, core.creator);
            fill(&mut meta.issued_date, core.created.as_deref().map(format_created));
            fill(&mut meta.version, core.revision);
        }

        log::debug!("template metadata: {:?}", meta);
        Ok(meta)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Header row plus first data row; true when such a table was found
    fn apply_revision_table(&mut self, tables: &[&Table]) -> bool {
        for table in tables {
            if table.row_count() < 2 {
                continue;
            }
            let header: Vec<String> = table.rows[0]
                .cells
                .iter()
                .map(|c| c.text().trim().to_lowercase())
                .collect();
            let has = |word: &str| header.iter().any(|h| h.contains(word));
            if !(has("version") && (has("author") || has("issued") || has("description"))) {
                continue;
            }

            let values: Vec<(String, String)> = header
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let value = table
                        .cell(1, i)
                        .map(|c| c.text().trim().to_string())
                        .unwrap_or_default();
                    (h.clone(), value)
                })
                .collect();
            let by_variants = |variants: &[&str]| {
                variants.iter().find_map(|v| {
                    values
                        .iter()
                        .find(|(k, _)| k.contains(v))
                        .map(|(_, val)| val.clone())
                        .filter(|val| !val.is_empty())
                })
            };

            fill(&mut self.description, by_variants(&["description", "desc"]));
            fill(&mut self.version, by_variants(&["version", "rev"]));
            fill(
                &mut self.issued_date,
                by_variants(&["issued date", "issued", "issue date", "date"]),
            );
            fill(&mut self.author, by_variants(&["author", "creator"]));
            fill(&mut self.total_pages, by_variants(&["total pages", "pages"]));
            return true;
        }
        false
    }

    /// `key: value` rows of two-column tables
    fn apply_key_values(&mut self, tables: &[&Table]) {
        let mut found: HashMap<String, String> = HashMap::new();
        for table in tables {
            for row in &table.rows {
                if row.cells.len() < 2 {
                    continue;
                }
                let left = row.cells[0].text();
                let key = left.trim().to_lowercase();
                let key = key.trim_end_matches(':').trim();
                if !key.is_empty() {
                    found.insert(key.to_string(), row.cells[1].text().trim().to_string());
                }
            }
            if KNOWN_KEYS.iter().any(|k| found.contains_key(*k)) {
                break;
            }
        }

        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| found.get(*k).filter(|v| !v.is_empty()).cloned())
        };
        fill(&mut self.description, get(&["description", "desc"]));
        fill(&mut self.version, get(&["version", "rev"]));
        fill(&mut self.issued_date, get(&["issued date", "issued", "issued_date"]));
        fill(&mut self.author, get(&["author", "creator"]));
        if let Some(name) = get(&["template"]) {
            self.template_name = name;
        }
        fill(&mut self.total_pages, get(&["total pages", "pages"]));
    }
}

fn fill(slot: &mut String, value: Option<String>) {
    if slot.is_empty() {
        if let Some(value) = value {
            *slot = value;
        }
    }
}

/// `2023-11-20T08:00:00Z` as `2023-11-20 08:00:00`
fn format_created(created: &str) -> String {
    let created = created.trim();
    match (created.get(..10), created.get(11..19)) {
        (Some(date), Some(time)) if created.as_bytes().get(10) == Some(&b'T') => {
            format!("{} {}", date, time)
        }
        _ => created.to_string(),
    }
}

#[derive(Debug, Default)]
struct CoreProperties {
    creator: Option<String>,
    created: Option<String>,
    revision: Option<String>,
}

impl CoreProperties {
    fn parse(xml: &[u8]) -> Self {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut props = CoreProperties::default();
        let mut current: Option<Vec<u8>> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map(|t| t.into_owned()).unwrap_or_default();
                    let slot = match current.as_deref() {
                        Some(b"creator") => Some(&mut props.creator),
                        Some(b"created") => Some(&mut props.created),
                        Some(b"revision") => Some(&mut props.revision),
                        _ => None,
                    };
                    if let Some(slot) = slot.filter(|_| !text.is_empty()) {
                        *slot = Some(text);
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("unreadable core properties: {}", e);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{core_properties, corporate_template, TemplateDocx};

    fn metadata(docx: Vec<u8>) -> TemplateMetadata {
        let archive = OoxmlArchive::from_bytes(&docx).unwrap();
        TemplateMetadata::from_archive(&archive, "corporate.dotx").unwrap()
    }

    #[test]
    fn test_revision_table() {
        let meta = metadata(corporate_template());
        assert_eq!(meta.version, "2.3");
        assert_eq!(meta.author, "Jane Roe");
        assert_eq!(meta.issued_date, "2024-03-01");
        assert_eq!(meta.description, "Operations manual");
        assert_eq!(meta.template_name, "corporate.dotx");
        assert_eq!(meta.total_pages, "");

        let json = meta.to_json().unwrap();
        assert!(json.contains(r#""author": "Jane Roe""#));
    }

    #[test]
    fn test_key_value_rows() {
        let body = concat!(
            "<w:tbl>",
            "<w:tr><w:tc><w:p><w:r><w:t>Version:</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>4</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>Template</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Ops</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>Total Pages</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>12</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>"
        );
        let meta = metadata(TemplateDocx::new().body(body).build());
        assert_eq!(meta.version, "4");
        assert_eq!(meta.template_name, "Ops");
        assert_eq!(meta.total_pages, "12");
        // Filled from core properties
        assert_eq!(meta.author, "Corporate Author");
        assert_eq!(meta.issued_date, "2023-11-20 08:00:00");
    }

    #[test]
    fn test_core_properties_only() {
        let docx = TemplateDocx::new()
            .body("<w:p/>")
            .core(Some(core_properties("Ops Team", "2022-01-02", "9")))
            .build();
        let meta = metadata(docx);
        assert_eq!(meta.author, "Ops Team");
        assert_eq!(meta.issued_date, "2022-01-02");
        assert_eq!(meta.version, "9");
    }

    #[test]
    fn test_missing_template() {
        assert!(matches!(
            TemplateMetadata::from_file("/no/such.dotx"),
            Err(OoxmlError::TemplateNotFound(_))
        ));
    }
}
