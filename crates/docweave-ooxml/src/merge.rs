//! Merge engine: append a content document to a template
//!
//! The content body is walked in document order. Every paragraph gets its
//! style from the [`StyleResolver`] against the template catalog, keeps its
//! runs' text with bold/italic/underline, and is followed by its pictures.
//! Tables keep their shape; pictures inside a cell stay in that cell.
//! Figure numbering is continuous across the whole merge.

use std::path::Path;

use docweave_ast::{Block, Document, Paragraph, Run, Table};

use crate::document::read_document_file;
use crate::embed::{embed, EmbedOptions, EmbedOutcome, FigureCounter, ImageSource};
use crate::error::{OoxmlError, Result};
use crate::style_resolver::{StyleResolver, BODY_STYLE};
use crate::template::Template;

/// Table style applied to merged tables when the template has it
pub const TABLE_STYLE: &str = "Table Grid";

/// Caption style applied to figure captions when the template has it
pub const CAPTION_STYLE: &str = "Image Description";

/// Image counts of one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted_images: usize,
    pub skipped_images: usize,
}

/// Merge options
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Give merged pictures the border and shadow treatment
    pub decorate_images: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            decorate_images: true,
        }
    }
}

/// One merge operation into a template
///
/// # Example
///
/// ```ignore
/// use docweave_ooxml::{MergeEngine, MergeOptions, Template};
///
/// let mut template = Template::load("corporate.dotx")?;
/// let mut engine = MergeEngine::new(&mut template, &MergeOptions::default());
/// engine.append(&content);
/// let stats = engine.finish();
/// template.save("out.docx")?;
/// ```
pub struct MergeEngine<'t> {
    template: &'t mut Template,
    counter: FigureCounter,
    embed_options: EmbedOptions,
    stats: MergeStats,
}

impl<'t> MergeEngine<'t> {
    pub fn new(template: &'t mut Template, options: &MergeOptions) -> Self {
        let caption_style_id = template.style_id(CAPTION_STYLE).map(str::to_string);
        Self {
            template,
            counter: FigureCounter::new(),
            embed_options: EmbedOptions {
                decorate: options.decorate_images,
                caption_style_id,
            },
            stats: MergeStats::default(),
        }
    }

    /// Append the body of `content` after a page break
    pub fn append(&mut self, content: &Document) {
        self.template.body_mut().page_break();

        for block in &content.blocks {
            match block {
                Block::Paragraph(para) => {
                    if para.page_break_before {
                        self.template.body_mut().page_break();
                    }
                    self.paragraph(para, content);
                }
                Block::Table(table) => self.table(table, content),
                Block::PageBreak => {
                    self.template.body_mut().page_break();
                }
            }
        }
    }

    /// Image counts so far
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Add the skipped-image note if needed and ask for a field refresh
    pub fn finish(self) -> MergeStats {
        let MergeEngine {
            template, stats, ..
        } = self;

        if stats.skipped_images > 0 {
            let note = format!(
                "[note] {} unsupported image(s) were skipped.",
                stats.skipped_images
            );
            let (catalog, body, _) = template.parts_mut();
            body.text_paragraph(&note, catalog.style_id_for(BODY_STYLE), None);
        }
        template.set_update_fields();

        log::info!(
            "merge finished: {} image(s) inserted, {} skipped",
            stats.inserted_images,
            stats.skipped_images
        );
        stats
    }

    fn paragraph(&mut self, para: &Paragraph, content: &Document) {
        let (catalog, body, media) = self.template.parts_mut();

        let style = StyleResolver::new(catalog).resolve(para);
        let style_id = catalog.style_id_for(&style);
        if style_id.is_none() {
            log::debug!("style {:?} is not in the template, using its default", style);
        }

        body.open_paragraph(style_id, None, None);
        if para.runs.is_empty() {
            body.text_run(&Run::text(""));
        }
        for run in &para.runs {
            body.text_run(&Run {
                text: run.text.clone(),
                bold: run.bold,
                italic: run.italic,
                underline: run.underline,
                image: None,
            });
        }
        body.close_paragraph();

        for image in para.images() {
            let Some(part) = content.image(&image.rel_id) else {
                log::warn!("image {} has no binary data, skipping", image.rel_id);
                self.stats.skipped_images += 1;
                continue;
            };
            let source = ImageSource {
                bytes: &part.bytes,
                declared_extent: image.extent,
                mime: &part.mime,
            };
            match embed(body, media, &mut self.counter, &source, &self.embed_options) {
                EmbedOutcome::Inserted { .. } => self.stats.inserted_images += 1,
                EmbedOutcome::Skipped(reason) => {
                    log::info!("{} ({})", reason, part.file_name);
                    self.stats.skipped_images += 1;
                }
            }
        }
    }

    fn table(&mut self, table: &Table, content: &Document) {
        if table.row_count() == 0 {
            log::debug!("skipping table without rows");
            return;
        }

        let (catalog, body, _) = self.template.parts_mut();
        let style_id = catalog.style_id_for(TABLE_STYLE).map(str::to_string);
        body.open_table(style_id.as_deref(), table.column_count());

        for row in &table.rows {
            self.template.body_mut().open_row();
            for cell in &row.cells {
                self.template.body_mut().open_cell();
                if cell.paragraphs.is_empty() {
                    self.template.body_mut().text_paragraph("", None, None);
                }
                for para in &cell.paragraphs {
                    self.paragraph(para, content);
                }
                self.template.body_mut().close_cell();
            }
            self.template.body_mut().close_row();
        }

        self.template.body_mut().close_table();
    }
}

/// Merge one content document into a template
pub fn merge(template: &mut Template, content: &Document, options: &MergeOptions) -> MergeStats {
    let mut engine = MergeEngine::new(template, options);
    engine.append(content);
    engine.finish()
}

/// Merge a content `.docx` into a template file and save the result
///
/// Both inputs are checked before anything is read or written.
pub fn merge_into_template(
    template_path: impl AsRef<Path>,
    content_path: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
    options: &MergeOptions,
) -> Result<MergeStats> {
    let template_path = template_path.as_ref();
    let content_path = content_path.as_ref();
    if !template_path.exists() {
        return Err(OoxmlError::TemplateNotFound(template_path.to_path_buf()));
    }
    if !content_path.exists() {
        return Err(OoxmlError::ContentNotFound(content_path.to_path_buf()));
    }

    let mut template = Template::load(template_path)?;
    let content = read_document_file(content_path)?;
    let stats = merge(&mut template, &content, options);
    template.save(out_path)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{OoxmlArchive, DOCUMENT_PART};
    use crate::test_utils::{corporate_template, png_bytes};
    use docweave_ast::{ImagePart, InlineImage, TableCell, TableRow};

    fn merged_xml(content: &Document) -> (String, MergeStats) {
        let mut template = Template::from_bytes(&corporate_template()).unwrap();
        let stats = merge(&mut template, content, &MergeOptions::default());
        let archive = template.into_archive();
        (archive.get_string(DOCUMENT_PART).unwrap(), stats)
    }

    fn image_paragraph(doc: &mut Document, bytes: Vec<u8>, mime: &str) -> Paragraph {
        let rel_id = doc.add_image(ImagePart {
            bytes,
            mime: mime.to_string(),
            file_name: "picture".to_string(),
        });
        let mut para = Paragraph::new();
        para.push(Run::image(InlineImage::new(rel_id)));
        para
    }

    #[test]
    fn test_styles_and_runs_are_copied() {
        let mut content = Document::new();
        let mut heading = Paragraph::with_style("Heading 2");
        heading.push(Run::bold("Scope"));
        content.push_paragraph(heading);
        let mut bullet = Paragraph::with_style("List Bullet");
        bullet.push(Run {
            text: "item".to_string(),
            italic: true,
            underline: true,
            ..Default::default()
        });
        content.push_paragraph(bullet);
        content.push_paragraph(Paragraph::plain("Narrative"));
        let mut custom = Paragraph::with_style("Instructions");
        custom.push(Run::text("Do the thing"));
        content.push_paragraph(custom);
        content.push_paragraph(Paragraph::new());

        let (xml, stats) = merged_xml(&content);

        assert_eq!(stats, MergeStats::default());
        assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Scope</w:t>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="BulletPoint1"/></w:pPr><w:r><w:rPr><w:i/><w:u w:val="single"/></w:rPr>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="BodyText1"/></w:pPr><w:r><w:t xml:space="preserve">Narrative</w:t>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Step1"/></w:pPr><w:r><w:t xml:space="preserve">Do the thing</w:t>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="BodyText1"/></w:pPr><w:r><w:t xml:space="preserve"></w:t></w:r></w:p>"#));
    }

    #[test]
    fn test_opening_and_explicit_page_breaks() {
        let mut content = Document::new();
        content.push_paragraph(Paragraph::plain("one"));
        content.push(Block::PageBreak);
        let mut later = Paragraph::plain("two");
        later.page_break_before = true;
        content.push_paragraph(later);

        let (xml, _) = merged_xml(&content);
        let appended = &xml[xml.find("Jane Roe").unwrap()..];
        assert_eq!(appended.matches(r#"<w:br w:type="page"/>"#).count(), 3);
        assert!(appended.find(r#"<w:br w:type="page"/>"#).unwrap() < appended.find(">one<").unwrap());
    }

    #[test]
    fn test_table_cells_and_figures() {
        let mut content = Document::new();
        let first = image_paragraph(&mut content, png_bytes(10, 10), "image/png");
        content.push_paragraph(first);

        let in_cell = image_paragraph(&mut content, png_bytes(20, 10), "image/png");
        let table = Table::from_rows(vec![
            TableRow::new(vec![
                TableCell::with_paragraph(Paragraph::plain("A")),
                TableCell::with_paragraph(in_cell),
            ]),
            TableRow::new(vec![TableCell { paragraphs: vec![] }]),
        ]);
        content.push(Block::Table(table));

        let (xml, stats) = merged_xml(&content);

        assert_eq!(stats.inserted_images, 2);
        assert!(xml.contains(r#"<w:tblStyle w:val="TableGrid"/>"#));
        let first = xml.find(">Figure 1<").unwrap();
        let second = xml.find(">Figure 2<").unwrap();
        let table_at = xml.rfind("<w:tbl>").unwrap();
        assert!(first < table_at && table_at < second);
        assert!(xml.contains(r#"<w:pStyle w:val="ImageDescription"/><w:jc w:val="center"/>"#));
        // The padded and the empty cell both hold a paragraph
        assert!(!xml.contains("</w:tcPr></w:tc>"));
    }

    #[test]
    fn test_skipped_image_note() {
        let mut content = Document::new();
        let good = image_paragraph(&mut content, png_bytes(10, 10), "image/png");
        let bad = image_paragraph(&mut content, b"garbage".to_vec(), "image/x-unknown");
        content.push_paragraph(good);
        content.push_paragraph(bad);

        let (xml, stats) = merged_xml(&content);
        assert_eq!(
            stats,
            MergeStats {
                inserted_images: 1,
                skipped_images: 1
            }
        );
        assert!(xml.contains(
            r#"<w:pStyle w:val="BodyText1"/></w:pPr><w:r><w:t xml:space="preserve">[note] 1 unsupported image(s) were skipped.</w:t>"#
        ));
        assert!(!xml.contains("Figure 2"));
    }

    #[test]
    fn test_merge_marks_fields_for_update() {
        let mut template = Template::from_bytes(&corporate_template()).unwrap();
        merge(&mut template, &Document::new(), &MergeOptions::default());
        let archive = OoxmlArchive::from_bytes(&template.to_bytes().unwrap()).unwrap();
        assert!(archive
            .get_string("word/settings.xml")
            .unwrap()
            .contains(r#"w:updateFields w:val="true""#));
    }

    #[test]
    fn test_missing_inputs_are_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let template = dir.path().join("template.docx");
        std::fs::write(&template, corporate_template()).unwrap();
        let out = dir.path().join("out.docx");

        let err = merge_into_template(dir.path().join("nope.docx"), &template, &out, &MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, OoxmlError::TemplateNotFound(_)));

        let err = merge_into_template(&template, dir.path().join("nope.docx"), &out, &MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, OoxmlError::ContentNotFound(_)));
        assert!(!out.exists());
    }
}
