//! Content document reader (word/document.xml)
//!
//! Turns the body of a DOCX package into a `docweave_ast::Document`:
//! paragraphs with their runs, tables padded to a rectangle, explicit page
//! breaks, and the binary data of every embedded picture.

use std::collections::HashMap;
use std::path::Path;

use docweave_ast::{
    Alignment, Block, Document, Extent, ImagePart, InlineImage, Paragraph, Run, StyleNames,
    Table, TableCell, TableRow,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::archive::{OoxmlArchive, CONTENT_TYPES_PART};
use crate::content_types::ContentTypes;
use crate::error::{OoxmlError, Result};
use crate::image::content_type_for_extension;
use crate::relationships::{resolve_part_path, Relationships};
use crate::styles::StyleSheet;

/// Reads the body of a content document
pub struct ContentReader<'a> {
    archive: &'a OoxmlArchive,
    stylesheet: StyleSheet,
    relationships: Relationships,
    content_types: ContentTypes,
}

impl<'a> ContentReader<'a> {
    /// Prepare a reader; styles, relationships and content types are optional parts
    pub fn new(archive: &'a OoxmlArchive) -> Result<Self> {
        let stylesheet = match archive.styles_xml() {
            Some(xml) => StyleSheet::parse(xml)?,
            None => StyleSheet::default(),
        };
        let relationships = match archive.document_rels_xml() {
            Some(xml) => Relationships::parse(xml)?,
            None => Relationships::new(),
        };
        let content_types = match archive.get(CONTENT_TYPES_PART) {
            Some(xml) => ContentTypes::parse(xml)?,
            None => ContentTypes::new(),
        };

        Ok(Self {
            archive,
            stylesheet,
            relationships,
            content_types,
        })
    }

    /// Parse the body into a document model
    pub fn read(&self) -> Result<Document> {
        let styles: StyleNames = self.stylesheet.all().map(|s| s.name.clone()).collect();
        let mut parser = BodyParser::new(self, Document::with_styles(styles));

        let mut reader = Reader::from_reader(self.archive.document_xml()?);
        // Don't trim text - preserve whitespace in runs
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => parser.start(e),
                Ok(Event::Empty(ref e)) => {
                    parser.start(e);
                    parser.end(e.local_name().as_ref());
                }
                Ok(Event::End(ref e)) => parser.end(e.local_name().as_ref()),
                Ok(Event::Text(ref e)) => {
                    if parser.capturing_text() {
                        let text = e.unescape().unwrap_or_default();
                        parser.push_text(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(parser.doc)
    }

    /// Load the picture behind an `r:embed` id into the document's image table
    fn load_image(&self, rel_id: &str) -> Option<ImagePart> {
        let rel = self.relationships.get_target(rel_id)?;
        if rel.is_external() {
            log::debug!("image {} links outside the package, ignoring", rel_id);
            return None;
        }

        let part_path = resolve_part_path("word", &rel.target);
        let Some(bytes) = self.archive.get(&part_path) else {
            log::warn!("image {} points at missing part {}", rel_id, part_path);
            return None;
        };

        let file_name = part_path.rsplit('/').next().unwrap_or(&part_path).to_string();
        let mime = self
            .content_types
            .content_type_of(&part_path)
            .map(str::to_string)
            .unwrap_or_else(|| {
                let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
                content_type_for_extension(ext).to_string()
            });

        if !mime.starts_with("image/") {
            log::debug!("part {} is {}, not an image", part_path, mime);
            return None;
        }

        Some(ImagePart {
            bytes: bytes.to_vec(),
            mime,
            file_name,
        })
    }
}

/// Read a content document from package bytes already in memory
pub fn read_document(archive: &OoxmlArchive) -> Result<Document> {
    ContentReader::new(archive)?.read()
}

/// Open a `.docx` file and read its body
pub fn read_document_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(OoxmlError::ContentNotFound(path.to_path_buf()));
    }
    let archive = OoxmlArchive::open(path)?;
    read_document(&archive)
}

/// Event-driven body state machine
struct BodyParser<'r, 'a> {
    source: &'r ContentReader<'a>,
    doc: Document,
    in_body: bool,
    para: Option<ParagraphBuilder>,
    run: Option<RunBuilder>,
    image: Option<ImageBuilder>,
    table: Option<TableBuilder>,
    /// Tables opened inside a cell of `table`; their content is flattened
    nested_tables: u32,
    /// Paragraphs opened inside `para` (text boxes); ignored
    nested_paras: u32,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    /// Source relationship id -> model image id
    image_ids: HashMap<String, String>,
}

impl<'r, 'a> BodyParser<'r, 'a> {
    fn new(source: &'r ContentReader<'a>, doc: Document) -> Self {
        Self {
            source,
            doc,
            in_body: false,
            para: None,
            run: None,
            image: None,
            table: None,
            nested_tables: 0,
            nested_paras: 0,
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            image_ids: HashMap::new(),
        }
    }

    fn capturing_text(&self) -> bool {
        self.in_text && self.nested_paras == 0 && self.run.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn start(&mut self, e: &BytesStart) {
        let name = e.local_name();
        match name.as_ref() {
            b"body" => self.in_body = true,
            _ if !self.in_body => {}
            b"tbl" if self.para.is_none() => {
                if self.table.is_some() {
                    self.nested_tables += 1;
                } else {
                    self.table = Some(TableBuilder::default());
                }
            }
            // Rows and cells of a table inside a text box belong to that box
            b"tblStyle" if self.nested_tables == 0 && self.para.is_none() => {
                if let (Some(table), Some(id)) = (self.table.as_mut(), get_attr(e, b"w:val")) {
                    table.style = Some(self.source.stylesheet.display_name(&id).to_string());
                }
            }
            b"tr" if self.nested_tables == 0 && self.para.is_none() => {
                if let Some(table) = self.table.as_mut() {
                    table.current_row = Some(Vec::new());
                }
            }
            b"tc" if self.nested_tables == 0 && self.para.is_none() => {
                if let Some(table) = self.table.as_mut() {
                    table.current_cell = Some(Vec::new());
                }
            }
            b"p" => {
                if self.para.is_some() {
                    self.nested_paras += 1;
                } else {
                    self.para = Some(ParagraphBuilder::default());
                }
            }
            _ if self.nested_paras > 0 => {}
            b"pPr" if self.run.is_none() => self.in_paragraph_props = true,
            b"pStyle" if self.in_paragraph_props => {
                if let (Some(para), Some(id)) = (self.para.as_mut(), get_attr(e, b"w:val")) {
                    para.style = Some(self.source.stylesheet.display_name(&id).to_string());
                }
            }
            b"jc" if self.in_paragraph_props => {
                if let Some(para) = self.para.as_mut() {
                    para.alignment = get_attr(e, b"w:val")
                        .as_deref()
                        .and_then(Alignment::from_ooxml);
                }
            }
            b"pageBreakBefore" if self.in_paragraph_props => {
                if let Some(para) = self.para.as_mut() {
                    para.page_break_before = is_on(e);
                }
            }
            b"ilvl" if self.in_paragraph_props => {
                if let Some(para) = self.para.as_mut() {
                    para.list_level = get_attr(e, b"w:val").and_then(|v| v.parse().ok());
                }
            }
            b"numPr" if self.in_paragraph_props => {
                if let Some(para) = self.para.as_mut() {
                    para.list_level.get_or_insert(0);
                }
            }
            b"r" if self.para.is_some() && self.image.is_none() => {
                self.run = Some(RunBuilder::default());
            }
            b"rPr" if self.run.is_some() => self.in_run_props = true,
            b"b" if self.in_run_props => {
                if let Some(run) = self.run.as_mut() {
                    run.bold = is_on(e);
                }
            }
            b"i" if self.in_run_props => {
                if let Some(run) = self.run.as_mut() {
                    run.italic = is_on(e);
                }
            }
            b"u" if self.in_run_props => {
                if let Some(run) = self.run.as_mut() {
                    run.underline = get_attr(e, b"w:val").as_deref() != Some("none");
                }
            }
            b"t" if self.run.is_some() && self.image.is_none() => self.in_text = true,
            b"tab" if self.run.is_some() && !self.in_paragraph_props => self.push_text("\t"),
            b"br" if self.run.is_some() => {
                if get_attr(e, b"w:type").as_deref() == Some("page") {
                    if let Some(para) = self.para.as_mut() {
                        let run_text_empty = self.run.as_ref().map(|r| r.text.is_empty()).unwrap_or(true);
                        if para.text_is_empty() && run_text_empty {
                            para.leading_page_break = true;
                        }
                    }
                } else {
                    self.push_text("\n");
                }
            }
            b"drawing" if self.run.is_some() => self.image = Some(ImageBuilder::default()),
            b"extent" => {
                if let Some(image) = self.image.as_mut() {
                    let cx = get_attr(e, b"cx").and_then(|v| v.parse().ok());
                    let cy = get_attr(e, b"cy").and_then(|v| v.parse().ok());
                    if let (Some(cx), Some(cy)) = (cx, cy) {
                        image.extent = Some(Extent { cx, cy });
                    }
                }
            }
            b"docPr" => {
                if let Some(image) = self.image.as_mut() {
                    image.name = get_attr(e, b"name");
                    image.description = get_attr(e, b"descr").filter(|d| !d.is_empty());
                }
            }
            b"blip" => {
                if let Some(image) = self.image.as_mut() {
                    image.rel_id = get_attr_with_ns(e, b"r:embed");
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"body" => self.in_body = false,
            b"p" if self.nested_paras > 0 => self.nested_paras -= 1,
            b"p" => {
                if let Some(para) = self.para.take() {
                    self.finish_paragraph(para);
                }
            }
            _ if self.nested_paras > 0 => {}
            b"pPr" => self.in_paragraph_props = false,
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"drawing" => {
                if let Some(image) = self.image.take() {
                    if let Some(inline) = self.finish_image(image) {
                        if let Some(run) = self.run.as_mut() {
                            run.images.push(inline);
                        }
                    }
                }
            }
            b"r" if self.image.is_none() => {
                if let (Some(run), Some(para)) = (self.run.take(), self.para.as_mut()) {
                    para.runs.extend(run.build());
                }
                self.in_run_props = false;
            }
            _ if self.para.is_some() => {}
            b"tc" if self.nested_tables == 0 => {
                if let Some(table) = self.table.as_mut() {
                    if let (Some(cell), Some(row)) = (table.current_cell.take(), table.current_row.as_mut()) {
                        row.push(TableCell { paragraphs: cell });
                    }
                }
            }
            b"tr" if self.nested_tables == 0 => {
                if let Some(table) = self.table.as_mut() {
                    if let Some(row) = table.current_row.take() {
                        table.rows.push(TableRow::new(row));
                    }
                }
            }
            b"tbl" if self.nested_tables > 0 => self.nested_tables -= 1,
            b"tbl" => {
                if let Some(table) = self.table.take() {
                    if let Some(table) = table.build() {
                        self.doc.push(Block::Table(table));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, builder: ParagraphBuilder) {
        self.in_paragraph_props = false;
        let break_only = builder.leading_page_break && builder.text_is_empty() && builder.images_empty();

        if let Some(cell) = self.table.as_mut().and_then(|t| t.current_cell.as_mut()) {
            cell.push(builder.build());
            return;
        }
        if self.table.is_some() {
            // Paragraph outside any cell of a malformed table
            return;
        }

        if break_only {
            self.doc.push(Block::PageBreak);
        } else {
            self.doc.push_paragraph(builder.build());
        }
    }

    fn finish_image(&mut self, image: ImageBuilder) -> Option<InlineImage> {
        let source_id = image.rel_id?;
        let model_id = match self.image_ids.get(&source_id) {
            Some(id) => id.clone(),
            None => {
                let part = self.source.load_image(&source_id)?;
                let id = self.doc.add_image(part);
                self.image_ids.insert(source_id, id.clone());
                id
            }
        };

        let mut inline = InlineImage::new(model_id);
        inline.extent = image.extent;
        inline.name = image.name;
        inline.description = image.description;
        Some(inline)
    }
}

#[derive(Default)]
struct ParagraphBuilder {
    runs: Vec<Run>,
    style: Option<String>,
    alignment: Option<Alignment>,
    page_break_before: bool,
    list_level: Option<u32>,
    /// A page break run came before any text
    leading_page_break: bool,
}

impl ParagraphBuilder {
    fn text_is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    fn images_empty(&self) -> bool {
        self.runs.iter().all(|r| r.image.is_none())
    }

    fn build(self) -> Paragraph {
        Paragraph {
            runs: self.runs,
            style: self.style,
            alignment: self.alignment,
            page_break_before: self.page_break_before || self.leading_page_break,
            list_level: self.list_level,
        }
    }
}

#[derive(Default)]
struct RunBuilder {
    text: String,
    bold: bool,
    italic: bool,
    underline: bool,
    images: Vec<InlineImage>,
}

impl RunBuilder {
    /// One run per picture; the first also carries the text
    fn build(self) -> Vec<Run> {
        let template = Run {
            text: String::new(),
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            image: None,
        };

        let mut images = self.images.into_iter();
        let mut runs = vec![Run {
            text: self.text,
            image: images.next(),
            ..template.clone()
        }];
        runs.extend(images.map(|image| Run {
            image: Some(image),
            ..template.clone()
        }));
        runs
    }
}

#[derive(Default)]
struct ImageBuilder {
    rel_id: Option<String>,
    extent: Option<Extent>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    style: Option<String>,
    current_row: Option<Vec<TableCell>>,
    current_cell: Option<Vec<Paragraph>>,
}

impl TableBuilder {
    fn build(self) -> Option<Table> {
        if self.rows.is_empty() {
            return None;
        }
        let mut table = Table::from_rows(self.rows);
        table.style = self.style;
        Some(table)
    }
}

// Helper functions

fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Get attribute with namespace prefix (e.g., "r:embed"), matching any prefix
fn get_attr_with_ns(e: &BytesStart, name: &[u8]) -> Option<String> {
    let local = name
        .iter()
        .position(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name);
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name || a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Toggle properties are on unless `w:val` says otherwise
fn is_on(e: &BytesStart) -> bool {
    !matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("off")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{png_bytes, ContentDocx};

    fn read(docx: Vec<u8>) -> Document {
        let archive = OoxmlArchive::from_bytes(&docx).unwrap();
        read_document(&archive).unwrap()
    }

    fn paragraph(doc: &Document, index: usize) -> &Paragraph {
        match &doc.blocks[index] {
            Block::Paragraph(p) => p,
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_styled_paragraph() {
        let doc = read(
            ContentDocx::new()
                .body(r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/><w:jc w:val="center"/></w:pPr><w:r><w:t>Overview</w:t></w:r></w:p>"#)
                .build(),
        );

        let para = paragraph(&doc, 0);
        assert_eq!(para.style.as_deref(), Some("heading 2"));
        assert_eq!(para.alignment, Some(Alignment::Center));
        assert_eq!(para.text(), "Overview");
        assert!(doc.styles.contains("Heading 2"));
    }

    #[test]
    fn test_parse_run_formatting() {
        let doc = read(
            ContentDocx::new()
                .body(concat!(
                    r#"<w:p><w:pPr><w:rPr><w:b/></w:rPr></w:pPr>"#,
                    r#"<w:r><w:rPr><w:b/><w:i w:val="0"/></w:rPr><w:t xml:space="preserve">bold </w:t></w:r>"#,
                    r#"<w:r><w:rPr><w:i/><w:u w:val="single"/></w:rPr><w:t>both</w:t></w:r>"#,
                    r#"<w:r><w:rPr><w:u w:val="none"/></w:rPr><w:instrText>PAGE</w:instrText><w:t>plain</w:t></w:r>"#,
                    "</w:p>"
                ))
                .build(),
        );

        let runs = &paragraph(&doc, 0).runs;
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].text.as_str(), runs[0].bold, runs[0].italic), ("bold ", true, false));
        assert!(runs[1].italic && runs[1].underline && !runs[1].bold);
        assert_eq!(runs[2].text, "plain");
        assert!(!runs[2].underline);
    }

    #[test]
    fn test_empty_paragraph_keeps_position() {
        let doc = read(
            ContentDocx::new()
                .body("<w:p/><w:p><w:r><w:t>after</w:t></w:r></w:p>")
                .build(),
        );
        assert_eq!(doc.blocks.len(), 2);
        assert!(paragraph(&doc, 0).runs.is_empty());
    }

    #[test]
    fn test_page_breaks() {
        let doc = read(
            ContentDocx::new()
                .body(concat!(
                    r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#,
                    r#"<w:p><w:pPr><w:pageBreakBefore/></w:pPr><w:r><w:t>A</w:t></w:r></w:p>"#,
                    r#"<w:p><w:r><w:br w:type="page"/><w:t>B</w:t></w:r></w:p>"#,
                    r#"<w:p><w:pPr><w:pageBreakBefore w:val="false"/></w:pPr><w:r><w:t>C</w:t></w:r></w:p>"#
                ))
                .build(),
        );

        assert_eq!(doc.blocks[0], Block::PageBreak);
        assert!(paragraph(&doc, 1).page_break_before);
        assert!(paragraph(&doc, 2).page_break_before);
        assert!(!paragraph(&doc, 3).page_break_before);
    }

    #[test]
    fn test_list_level() {
        let doc = read(
            ContentDocx::new()
                .body(r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr></w:pPr><w:r><w:t>item</w:t></w:r></w:p>"#)
                .build(),
        );
        assert_eq!(paragraph(&doc, 0).list_level, Some(1));
    }

    #[test]
    fn test_table_is_padded_and_flattened() {
        let doc = read(
            ContentDocx::new()
                .body(concat!(
                    r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr>"#,
                    "<w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>C</w:t></w:r></w:p></w:tc></w:tr>",
                    "<w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p>",
                    "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
                    "</w:tc><w:tc><w:p><w:r><w:t>2</w:t></w:r></w:p></w:tc></w:tr>",
                    "</w:tbl>"
                ))
                .build(),
        );

        assert_eq!(doc.blocks.len(), 1);
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.style.as_deref(), Some("Table Grid"));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows[1].cells.len(), 3);

        let first = table.cell(1, 0).unwrap();
        let texts: Vec<String> = first.paragraphs.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["1", "inner"]);
        assert_eq!(table.cell(1, 2).unwrap().text(), "");
    }

    #[test]
    fn test_text_box_table_stays_inside_its_cell() {
        let doc = read(
            ContentDocx::new()
                .body(concat!(
                    "<w:tbl><w:tr>",
                    "<w:tc><w:p><w:r><w:t>outer</w:t></w:r><w:r><w:pict><w:txbxContent>",
                    "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
                    "</w:txbxContent></w:pict></w:r></w:p></w:tc>",
                    "<w:tc><w:p><w:r><w:t>right</w:t></w:r></w:p></w:tc>",
                    "</w:tr></w:tbl>",
                    "<w:p><w:r><w:t>after</w:t></w:r></w:p>"
                ))
                .build(),
        );

        assert_eq!(doc.blocks.len(), 2);
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!((table.row_count(), table.column_count()), (1, 2));
        assert_eq!(table.cell(0, 0).unwrap().text(), "outer");
        assert_eq!(table.cell(0, 1).unwrap().text(), "right");
        assert_eq!(paragraph(&doc, 1).text(), "after");
    }

    #[test]
    fn test_images_are_loaded() {
        let png = png_bytes(4, 4);
        let doc = read(
            ContentDocx::new()
                .body(&format!(
                    "<w:p>{}{}</w:p><w:p>{}</w:p>",
                    ContentDocx::drawing_run("rId10", 1_800_000, 900_000),
                    ContentDocx::drawing_run("rId11", 0, 0),
                    ContentDocx::drawing_run("rId10", 100, 100),
                ))
                .image("rId10", "media/a.png", &png)
                .image("rId11", "media/b.webp", b"RIFF....WEBP")
                .build(),
        );

        assert_eq!(doc.images.len(), 2);
        let first = paragraph(&doc, 0);
        let images: Vec<&InlineImage> = first.images().collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].extent, Some(Extent { cx: 1_800_000, cy: 900_000 }));

        let part = doc.image(&images[0].rel_id).unwrap();
        assert_eq!(part.mime, "image/png");
        assert_eq!(part.bytes, png);
        assert_eq!(doc.image(&images[1].rel_id).unwrap().mime, "image/webp");

        // Same relationship is stored once
        let again = paragraph(&doc, 1).images().next().unwrap();
        assert_eq!(again.rel_id, images[0].rel_id);
    }

    #[test]
    fn test_missing_image_part_is_dropped() {
        let doc = read(
            ContentDocx::new()
                .body(&format!("<w:p>{}</w:p>", ContentDocx::drawing_run("rId99", 10, 10)))
                .build(),
        );
        assert_eq!(doc.image_reference_count(), 0);
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_missing_file_is_content_not_found() {
        let err = read_document_file("/definitely/missing.docx").unwrap_err();
        assert!(matches!(err, OoxmlError::ContentNotFound(_)));
    }

    #[test]
    fn test_written_document_reads_back() {
        use crate::writer::DocxWriter;

        let mut doc = Document::new();
        let mut heading = Paragraph::with_style("Heading 2");
        heading.push(Run::bold("Title"));
        doc.push_paragraph(heading);
        doc.push_paragraph(Paragraph::plain("text").aligned(Alignment::Right));

        let read_back = read(DocxWriter::generate(&doc).unwrap());
        let first = paragraph(&read_back, 0);
        assert_eq!(first.style.as_deref(), Some("Heading 2"));
        assert!(first.runs[0].bold);
        assert_eq!(paragraph(&read_back, 1).alignment, Some(Alignment::Right));
    }
}
