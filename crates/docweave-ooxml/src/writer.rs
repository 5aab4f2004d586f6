//! DOCX Writer
//!
//! [`BodyXml`] emits WordprocessingML body markup (paragraphs, runs,
//! tables, page breaks). The merge engine uses it to build content for a
//! template; [`DocxWriter`] uses it to turn a `docweave_ast::Document` into
//! a complete, self-contained package.
//!
//! # Example
//!
//! ```ignore
//! use docweave_ast::{Document, Paragraph};
//! use docweave_ooxml::DocxWriter;
//!
//! let mut doc = Document::new();
//! doc.push_paragraph(Paragraph::plain("Hello"));
//! let bytes = DocxWriter::generate(&doc)?;
//! std::fs::write("hello.docx", bytes)?;
//! ```

use std::collections::HashMap;
use std::path::Path;

use docweave_ast::{Alignment, Block, Document, Paragraph, Run, StyleNames, Table};

use crate::archive::{
    OoxmlArchive, CONTENT_TYPES_PART, CORE_PROPERTIES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART,
    NUMBERING_PART, SETTINGS_PART, STYLES_PART,
};
use crate::content_types::{ContentTypes, NUMBERING_CONTENT_TYPE};
use crate::error::Result;
use crate::image::{self, content_type_for_extension, extension_for_mime, Drawing, ImageInfo};
use crate::relationships::Relationships;

/// Namespaces declared on a generated `w:document` root
const DOCUMENT_NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#
);

/// `w:numId` of the bullet list defined in a generated `numbering.xml`
pub const BULLET_NUM_ID: u32 = 1;

/// Body markup buffer
#[derive(Debug, Default)]
pub struct BodyXml {
    output: String,
}

impl BodyXml {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a `w:p` with its paragraph properties
    pub fn open_paragraph(
        &mut self,
        style_id: Option<&str>,
        alignment: Option<Alignment>,
        list_level: Option<u32>,
    ) {
        self.output.push_str("<w:p>");
        if style_id.is_none() && alignment.is_none() && list_level.is_none() {
            return;
        }

        self.output.push_str("<w:pPr>");
        if let Some(style) = style_id {
            self.output
                .push_str(&format!("<w:pStyle w:val=\"{}\"/>", escape_xml(style)));
        }
        if let Some(level) = list_level {
            self.output.push_str(&format!(
                "<w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr>",
                level, BULLET_NUM_ID
            ));
        }
        if let Some(align) = alignment {
            self.output
                .push_str(&format!("<w:jc w:val=\"{}\"/>", align.as_ooxml()));
        }
        self.output.push_str("</w:pPr>");
    }

    pub fn close_paragraph(&mut self) {
        self.output.push_str("</w:p>\n");
    }

    /// A text run carrying bold, italic and underline flags
    pub fn text_run(&mut self, run: &Run) {
        self.output.push_str("<w:r>");
        if run.bold || run.italic || run.underline {
            self.output.push_str("<w:rPr>");
            if run.bold {
                self.output.push_str("<w:b/>");
            }
            if run.italic {
                self.output.push_str("<w:i/>");
            }
            if run.underline {
                self.output.push_str("<w:u w:val=\"single\"/>");
            }
            self.output.push_str("</w:rPr>");
        }
        self.output.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            escape_xml(&run.text)
        ));
        self.output.push_str("</w:r>");
    }

    /// A run holding one inline picture
    pub fn drawing_run(&mut self, drawing: &Drawing<'_>) {
        self.output.push_str("<w:r>");
        self.output.push_str(&image::drawing_xml(drawing));
        self.output.push_str("</w:r>");
    }

    /// A complete paragraph with a single plain run
    pub fn text_paragraph(&mut self, text: &str, style_id: Option<&str>, alignment: Option<Alignment>) {
        self.open_paragraph(style_id, alignment, None);
        self.text_run(&Run::text(text));
        self.close_paragraph();
    }

    /// Paragraph holding a page break
    pub fn page_break(&mut self) {
        self.output
            .push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\n");
    }

    /// Start a `w:tbl` with a full-width layout and `columns` grid columns
    pub fn open_table(&mut self, style_id: Option<&str>, columns: usize) {
        self.output.push_str("<w:tbl><w:tblPr>");
        if let Some(style) = style_id {
            self.output
                .push_str(&format!("<w:tblStyle w:val=\"{}\"/>", escape_xml(style)));
        }
        self.output.push_str("<w:tblW w:w=\"5000\" w:type=\"pct\"/>");
        self.output.push_str("</w:tblPr><w:tblGrid>");
        let width = if columns > 0 { 9000 / columns } else { 9000 };
        for _ in 0..columns {
            self.output
                .push_str(&format!("<w:gridCol w:w=\"{}\"/>", width));
        }
        self.output.push_str("</w:tblGrid>\n");
    }

    pub fn open_row(&mut self) {
        self.output.push_str("<w:tr>");
    }

    pub fn close_row(&mut self) {
        self.output.push_str("</w:tr>\n");
    }

    pub fn open_cell(&mut self) {
        self.output.push_str("<w:tc><w:tcPr><w:tcW w:w=\"0\" w:type=\"auto\"/></w:tcPr>");
    }

    pub fn close_cell(&mut self) {
        self.output.push_str("</w:tc>");
    }

    pub fn close_table(&mut self) {
        self.output.push_str("</w:tbl>\n");
    }

    /// Append already serialized markup
    pub fn push_raw(&mut self, xml: &str) {
        self.output.push_str(xml);
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    pub fn into_string(self) -> String {
        self.output
    }
}

/// DOCX Writer for generating self-contained packages from a document model
pub struct DocxWriter {
    /// Body markup
    body: BodyXml,
    /// Document relationships (word/_rels/document.xml.rels)
    relationships: Relationships,
    /// Package content types
    content_types: ContentTypes,
    /// Media files to embed (path, bytes)
    media_files: Vec<(String, Vec<u8>)>,
    /// Model image id -> package relationship id
    image_rel_ids: HashMap<String, String>,
    /// Next drawing ID for docPr
    next_drawing_id: u32,
}

impl Default for DocxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxWriter {
    pub fn new() -> Self {
        let mut relationships = Relationships::new();
        relationships.add("styles.xml", Relationships::TYPE_STYLES);
        relationships.add("settings.xml", Relationships::TYPE_SETTINGS);
        relationships.add("numbering.xml", Relationships::TYPE_NUMBERING);

        Self {
            body: BodyXml::new(),
            relationships,
            content_types: ContentTypes::for_new_document(),
            media_files: Vec::new(),
            image_rel_ids: HashMap::new(),
            next_drawing_id: 1,
        }
    }

    /// Generate DOCX bytes for a document
    pub fn generate(doc: &Document) -> Result<Vec<u8>> {
        Self::new().build_archive(doc).to_bytes()
    }

    /// Generate a document and write it to `path`
    pub fn write_to_file(doc: &Document, path: impl AsRef<Path>) -> Result<()> {
        Self::new().build_archive(doc).write_to_file(path)
    }

    fn build_archive(mut self, doc: &Document) -> OoxmlArchive {
        for block in &doc.blocks {
            self.generate_block(doc, block);
        }

        let mut document_xml = String::new();
        document_xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        document_xml.push('\n');
        document_xml.push_str(&format!("<w:document {}>\n<w:body>\n", DOCUMENT_NAMESPACES));
        document_xml.push_str(self.body.as_str());
        document_xml.push_str(SECTION_PROPERTIES);
        document_xml.push_str("\n</w:body>\n</w:document>");

        let mut archive = OoxmlArchive::new();
        archive.set_string(DOCUMENT_PART, document_xml);
        archive.set_string(STYLES_PART, styles_xml(&doc.styles));
        archive.set_string(NUMBERING_PART, numbering_xml());
        archive.set_string(SETTINGS_PART, settings_xml());
        archive.set_string(DOCUMENT_RELS_PART, self.relationships.to_xml());
        archive.set_string(CORE_PROPERTIES_PART, core_properties_xml());
        archive.set_string("_rels/.rels", package_relationships().to_xml());

        self.content_types
            .ensure_override(&format!("/{}", NUMBERING_PART), NUMBERING_CONTENT_TYPE);
        self.content_types.ensure_override(
            &format!("/{}", CORE_PROPERTIES_PART),
            "application/vnd.openxmlformats-package.core-properties+xml",
        );
        archive.set_string(CONTENT_TYPES_PART, self.content_types.to_xml());

        for (path, data) in self.media_files {
            archive.set(path, data);
        }

        archive
    }

    fn generate_block(&mut self, doc: &Document, block: &Block) {
        match block {
            Block::Paragraph(para) => self.generate_paragraph(doc, para),
            Block::Table(table) => self.generate_table(doc, table),
            Block::PageBreak => self.body.page_break(),
        }
    }

    fn generate_paragraph(&mut self, doc: &Document, para: &Paragraph) {
        if para.page_break_before {
            self.body.page_break();
        }

        let style_id = para
            .style
            .as_deref()
            .and_then(|name| catalog_style_id(&doc.styles, name));
        self.body
            .open_paragraph(style_id.as_deref(), para.alignment, para.list_level);

        for run in &para.runs {
            match &run.image {
                Some(inline) => {
                    let Some(rel_id) = self.image_relationship(doc, &inline.rel_id) else {
                        log::warn!("image {} has no data, dropping it", inline.rel_id);
                        continue;
                    };
                    let extent = inline.extent.unwrap_or_else(|| {
                        let info = doc.image(&inline.rel_id).and_then(|p| ImageInfo::probe(&p.bytes));
                        image::target_extent(None, info.as_ref())
                    });
                    let doc_pr_id = self.next_drawing_id;
                    self.next_drawing_id += 1;
                    let name = inline
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("Picture {}", doc_pr_id));

                    self.body.drawing_run(&Drawing {
                        rel_id: &rel_id,
                        doc_pr_id,
                        name: &name,
                        description: inline.description.as_deref().unwrap_or(""),
                        extent,
                        decorated: inline.decorated,
                    });
                }
                None => self.body.text_run(run),
            }
        }

        self.body.close_paragraph();
    }

    fn generate_table(&mut self, doc: &Document, table: &Table) {
        let style_id = table
            .style
            .as_deref()
            .and_then(|name| catalog_style_id(&doc.styles, name));
        self.body.open_table(style_id.as_deref(), table.column_count());

        for row in &table.rows {
            self.body.open_row();
            for cell in &row.cells {
                self.body.open_cell();
                for para in &cell.paragraphs {
                    self.generate_paragraph(doc, para);
                }
                // A cell must hold at least one paragraph
                if cell.paragraphs.is_empty() {
                    self.body.push_raw("<w:p/>");
                }
                self.body.close_cell();
            }
            self.body.close_row();
        }

        self.body.close_table();
    }

    /// Package relationship for a model image, adding the media part on first use
    fn image_relationship(&mut self, doc: &Document, model_id: &str) -> Option<String> {
        if let Some(rel_id) = self.image_rel_ids.get(model_id) {
            return Some(rel_id.clone());
        }

        let part = doc.image(model_id)?;
        let extension = Path::new(&part.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| extension_for_mime(&part.mime).to_string());

        let index = self.media_files.len() + 1;
        let target = format!("media/image{}.{}", index, extension);
        let content_type = match content_type_for_extension(&extension) {
            "application/octet-stream" => part.mime.as_str(),
            known => known,
        };
        self.content_types.ensure_default(&extension, content_type);
        self.media_files
            .push((format!("word/{}", target), part.bytes.clone()));

        let rel_id = self.relationships.add(target, Relationships::TYPE_IMAGE);
        self.image_rel_ids
            .insert(model_id.to_string(), rel_id.clone());
        Some(rel_id)
    }
}

/// Style id Word would give a style with this display name
pub fn style_id_for_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Style id of `name` if the catalog knows it
fn catalog_style_id(styles: &StyleNames, name: &str) -> Option<String> {
    styles
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
        .map(style_id_for_name)
}

/// `word/styles.xml` declaring every name of the catalog
pub fn styles_xml(styles: &StyleNames) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(
        r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    xml.push('\n');

    for name in styles.iter() {
        let id = style_id_for_name(name);
        let is_table = name.eq_ignore_ascii_case("Table Grid");
        let is_normal = name.eq_ignore_ascii_case("Normal");
        let style_type = if is_table { "table" } else { "paragraph" };

        xml.push_str(&format!(
            "  <w:style w:type=\"{}\" w:styleId=\"{}\"{}>",
            style_type,
            escape_xml(&id),
            if is_normal { " w:default=\"1\"" } else { "" }
        ));
        xml.push_str(&format!("<w:name w:val=\"{}\"/>", escape_xml(name)));
        if !is_normal && !is_table {
            xml.push_str("<w:basedOn w:val=\"Normal\"/>");
        }
        if let Some(level) = heading_level(name) {
            xml.push_str(&format!(
                "<w:pPr><w:keepNext/><w:outlineLvl w:val=\"{}\"/></w:pPr><w:rPr><w:b/></w:rPr>",
                level - 1
            ));
        }
        if let Some(level) = bullet_level(name) {
            xml.push_str(&format!(
                "<w:pPr><w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr></w:pPr>",
                level, BULLET_NUM_ID
            ));
        }
        if is_table {
            xml.push_str(concat!(
                "<w:tblPr><w:tblBorders>",
                "<w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "<w:left w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "<w:bottom w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "<w:right w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "<w:insideH w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "<w:insideV w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
                "</w:tblBorders></w:tblPr>"
            ));
        }
        xml.push_str("</w:style>\n");
    }

    xml.push_str("</w:styles>");
    xml
}

fn heading_level(name: &str) -> Option<u8> {
    let (prefix, level) = name.rsplit_once(' ')?;
    if !prefix.eq_ignore_ascii_case("heading") {
        return None;
    }
    level.parse().ok().filter(|l| (1..=9).contains(l))
}

fn bullet_level(name: &str) -> Option<u32> {
    if name.eq_ignore_ascii_case("List Bullet") {
        Some(0)
    } else if name.eq_ignore_ascii_case("List Bullet 2") {
        Some(1)
    } else {
        None
    }
}

/// `word/numbering.xml` with one two-level bullet list
pub(crate) fn numbering_xml() -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(
        r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    xml.push_str(r#"<w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/>"#);
    for (level, (glyph, font)) in [("\u{2022}", "Symbol"), ("o", "Courier New")].iter().enumerate() {
        let indent = 720 * (level + 1);
        xml.push_str(&format!(
            concat!(
                r#"<w:lvl w:ilvl="{}"><w:start w:val="1"/><w:numFmt w:val="bullet"/>"#,
                r#"<w:lvlText w:val="{}"/><w:lvlJc w:val="left"/>"#,
                r#"<w:pPr><w:ind w:left="{}" w:hanging="360"/></w:pPr>"#,
                r#"<w:rPr><w:rFonts w:ascii="{}" w:hAnsi="{}" w:hint="default"/></w:rPr></w:lvl>"#
            ),
            level, glyph, indent, font, font
        ));
    }
    xml.push_str("</w:abstractNum>");
    xml.push_str(&format!(
        r#"<w:num w:numId="{}"><w:abstractNumId w:val="0"/></w:num>"#,
        BULLET_NUM_ID
    ));
    xml.push_str("</w:numbering>");
    xml
}

/// Minimal `word/settings.xml` asking viewers to refresh fields on open
pub(crate) fn settings_xml() -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(
        r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    xml.push_str(r#"<w:updateFields w:val="true"/>"#);
    xml.push_str("</w:settings>");
    xml
}

fn core_properties_xml() -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(concat!(
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
        r#"xmlns:dc="http://purl.org/dc/elements/1.1/" "#,
        r#"xmlns:dcterms="http://purl.org/dc/terms/" "#,
        r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#
    ));
    xml.push_str("<dc:creator>docweave</dc:creator>");
    xml.push_str("</cp:coreProperties>");
    xml
}

fn package_relationships() -> Relationships {
    let mut rels = Relationships::new();
    rels.add(DOCUMENT_PART, Relationships::TYPE_OFFICE_DOCUMENT);
    rels.add(CORE_PROPERTIES_PART, Relationships::TYPE_CORE_PROPERTIES);
    rels
}

/// A4 portrait with 2.5 cm margins
const SECTION_PROPERTIES: &str = concat!(
    "<w:sectPr>",
    r#"<w:pgSz w:w="11906" w:h="16838"/>"#,
    r#"<w:pgMar w:top="1417" w:right="1417" w:bottom="1134" w:left="1417" w:header="708" w:footer="708" w:gutter="0"/>"#,
    "</w:sectPr>"
);

/// Escape special XML characters
pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
