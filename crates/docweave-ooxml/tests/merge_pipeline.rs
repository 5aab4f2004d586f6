//! Merge Pipeline Tests
//!
//! End-to-end merges of content packages into template packages, checked
//! through the written output.
//!
//! Test Categories:
//! 1. Image accounting and figure numbering
//! 2. Style mapping through the package reader
//! 3. Package integrity of the output

use docweave_ast::Block;
use docweave_ooxml::archive::{CONTENT_TYPES_PART, DOCUMENT_PART, SETTINGS_PART};
use docweave_ooxml::test_utils::{corporate_template, png_bytes, ContentDocx, TemplateDocx};
use docweave_ooxml::{
    merge, merge_into_template, read_document, ContentTypes, MergeOptions, MergeStats,
    OoxmlArchive, Relationships, Template,
};

fn cell(inner: &str) -> String {
    format!("<w:tc>{}</w:tc>", inner)
}

fn text_paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn merge_bytes(template: Vec<u8>, content: Vec<u8>) -> (OoxmlArchive, MergeStats) {
    let mut template = Template::from_bytes(&template).unwrap();
    let content = read_document(&OoxmlArchive::from_bytes(&content).unwrap()).unwrap();
    let stats = merge(&mut template, &content, &MergeOptions::default());
    let out = OoxmlArchive::from_bytes(&template.to_bytes().unwrap()).unwrap();
    (out, stats)
}

// =============================================================================
// PART 1: IMAGE ACCOUNTING AND FIGURE NUMBERING
// =============================================================================

mod images {
    use super::*;

    #[test]
    fn test_table_with_one_unsupported_image() {
        let body = format!(
            "<w:tbl><w:tr>{}{}</w:tr></w:tbl>",
            cell(&format!("<w:p>{}</w:p>", ContentDocx::drawing_run("rId10", 0, 0))),
            cell(&format!("<w:p>{}</w:p>", ContentDocx::drawing_run("rId11", 0, 0))),
        );
        let content = ContentDocx::new()
            .body(&body)
            .image("rId10", "media/chart.png", &png_bytes(64, 32))
            .image_with_type("rId11", "media/blob.bin", b"\x00\x01 not a picture", "image/x-unknown")
            .build();

        let dir = tempfile::TempDir::new().unwrap();
        let template_path = dir.path().join("corporate.dotx");
        let content_path = dir.path().join("content.docx");
        let out_path = dir.path().join("merged.docx");
        std::fs::write(&template_path, corporate_template()).unwrap();
        std::fs::write(&content_path, content).unwrap();

        let stats =
            merge_into_template(&template_path, &content_path, &out_path, &MergeOptions::default())
                .unwrap();

        assert_eq!(
            stats,
            MergeStats {
                inserted_images: 1,
                skipped_images: 1
            }
        );

        let out = OoxmlArchive::open(&out_path).unwrap();
        let xml = out.get_string(DOCUMENT_PART).unwrap();
        assert!(xml.contains(">Figure 1<"));
        assert!(!xml.contains(">Figure 2<"));
        assert!(xml.contains("[note] 1 unsupported image(s) were skipped."));
        assert_eq!(
            out.file_list()
                .filter(|p| p.starts_with("word/media/docweave_image"))
                .count(),
            1
        );
    }

    #[test]
    fn test_figure_ordinals_continue_through_cells() {
        let body = format!(
            "<w:p>{}</w:p><w:tbl><w:tr>{}{}</w:tr></w:tbl><w:p>{}</w:p>",
            ContentDocx::drawing_run("rId10", 0, 0),
            cell(&format!("<w:p>{}</w:p>", ContentDocx::drawing_run("rId11", 0, 0))),
            cell(&format!(
                "{}<w:p>{}</w:p>",
                text_paragraph("caption cell"),
                ContentDocx::drawing_run("rId12", 0, 0)
            )),
            ContentDocx::drawing_run("rId13", 0, 0),
        );
        let content = ContentDocx::new()
            .body(&body)
            .image("rId10", "media/a.png", &png_bytes(10, 10))
            .image("rId11", "media/b.png", &png_bytes(11, 10))
            .image("rId12", "media/c.png", &png_bytes(12, 10))
            .image("rId13", "media/d.png", &png_bytes(13, 10))
            .build();

        let (out, stats) = merge_bytes(corporate_template(), content);
        assert_eq!(stats.inserted_images, 4);

        let xml = out.get_string(DOCUMENT_PART).unwrap();
        let positions: Vec<usize> = (1..=4)
            .map(|n| xml.find(&format!(">Figure {}<", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        // Figures 2 and 3 sit inside the merged table
        let table_start = xml.rfind("<w:tbl>").unwrap();
        let table_end = xml.rfind("</w:tbl>").unwrap();
        assert!(table_start < positions[1] && positions[2] < table_end);
        assert!(positions[3] > table_end);
    }

    #[test]
    fn test_identical_pictures_share_a_media_part() {
        let png = png_bytes(10, 10);
        let body = format!(
            "<w:p>{}</w:p><w:p>{}</w:p>",
            ContentDocx::drawing_run("rId10", 0, 0),
            ContentDocx::drawing_run("rId11", 0, 0),
        );
        let content = ContentDocx::new()
            .body(&body)
            .image("rId10", "media/a.png", &png)
            .image("rId11", "media/copy.png", &png)
            .build();

        let (out, stats) = merge_bytes(corporate_template(), content);
        assert_eq!(stats.inserted_images, 2);
        assert_eq!(
            out.file_list()
                .filter(|p| p.starts_with("word/media/docweave_image"))
                .count(),
            1
        );

        // docPr ids continue after the template logo (id 5)
        let xml = out.get_string(DOCUMENT_PART).unwrap();
        assert!(xml.contains(r#"<wp:docPr id="6""#));
        assert!(xml.contains(r#"<wp:docPr id="7""#));
    }
}

// =============================================================================
// PART 2: STYLE MAPPING THROUGH THE PACKAGE READER
// =============================================================================

mod styles {
    use super::*;

    #[test]
    fn test_display_names_map_to_template_ids() {
        let body = concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Scope</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>first</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>1. numbered item</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>2.1 Overview</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>Open the valve</w:t></w:r></w:p>"#,
        );
        let (out, _) = merge_bytes(corporate_template(), ContentDocx::new().body(body).build());
        let merged = read_document(&out).unwrap();

        let styles: Vec<(String, Option<String>)> = merged
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) if !p.text().is_empty() => Some((p.text(), p.style.clone())),
                _ => None,
            })
            .skip_while(|(text, _)| text != "Scope")
            .collect();

        let style_of = |text: &str| {
            styles
                .iter()
                .find(|(t, _)| t == text)
                .and_then(|(_, s)| s.clone())
        };
        assert_eq!(style_of("Scope").as_deref(), Some("heading 2"));
        assert_eq!(style_of("first").as_deref(), Some("Bullet Point 1"));
        assert_eq!(style_of("1. numbered item").as_deref(), Some("Bullet Point 1"));
        assert_eq!(style_of("2.1 Overview").as_deref(), Some("heading 2"));
        assert_eq!(style_of("Open the valve").as_deref(), Some("Step 1"));
    }

    #[test]
    fn test_missing_table_style_is_omitted() {
        let template = TemplateDocx::new()
            .styles(&[("Normal", "Normal"), ("BodyText1", "Body Text1")])
            .build();
        let body = format!("<w:tbl><w:tr>{}</w:tr></w:tbl>", cell(&text_paragraph("x")));
        let (out, _) = merge_bytes(template, ContentDocx::new().body(&body).build());

        let xml = out.get_string(DOCUMENT_PART).unwrap();
        assert!(!xml.contains("<w:tblStyle"));
        assert!(xml.contains(r#"<w:pStyle w:val="BodyText1"/></w:pPr><w:r><w:t xml:space="preserve">x</w:t>"#));
    }
}

// =============================================================================
// PART 3: PACKAGE INTEGRITY OF THE OUTPUT
// =============================================================================

mod package {
    use super::*;

    #[test]
    fn test_content_lands_before_final_section() {
        let content = ContentDocx::new().body(&text_paragraph("MERGED BODY")).build();
        let (out, _) = merge_bytes(corporate_template(), content);

        let xml = out.get_string(DOCUMENT_PART).unwrap();
        let merged = xml.find("MERGED BODY").unwrap();
        assert!(xml.find("Operations manual").unwrap() < merged);
        assert!(merged < xml.rfind("<w:sectPr>").unwrap());
        assert!(xml.trim_end().ends_with("</w:sectPr></w:body></w:document>"));
    }

    #[test]
    fn test_settings_created_with_relationship() {
        let (out, _) = merge_bytes(corporate_template(), ContentDocx::new().build());

        let settings = out.get_string(SETTINGS_PART).unwrap();
        assert!(settings.contains(r#"<w:updateFields w:val="true"/>"#));

        let rels = Relationships::parse(out.document_rels_xml().unwrap()).unwrap();
        let (_, rel) = rels.find_by_type(Relationships::TYPE_SETTINGS).unwrap();
        assert_eq!(rel.target, "settings.xml");

        let types = ContentTypes::parse(out.get(CONTENT_TYPES_PART).unwrap()).unwrap();
        assert!(types.has_override(SETTINGS_PART));
    }

    #[test]
    fn test_existing_settings_are_updated() {
        let template = TemplateDocx::new()
            .settings(concat!(
                r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                r#"<w:zoom w:percent="100"/><w:updateFields w:val="false"/></w:settings>"#
            ))
            .build();
        let (out, _) = merge_bytes(template, ContentDocx::new().build());

        let settings = out.get_string(SETTINGS_PART).unwrap();
        assert!(settings.contains(r#"<w:zoom w:percent="100"/>"#));
        assert_eq!(settings.matches("w:updateFields").count(), 1);
        assert!(settings.contains(r#"<w:updateFields w:val="true"/>"#));

        let rels = Relationships::parse(out.document_rels_xml().unwrap()).unwrap();
        assert_eq!(
            rels.iter()
                .filter(|(_, r)| r.rel_type == Relationships::TYPE_SETTINGS)
                .count(),
            1
        );
    }

    #[test]
    fn test_media_types_and_relationships() {
        let body = format!("<w:p>{}</w:p>", ContentDocx::drawing_run("rId10", 0, 0));
        let content = ContentDocx::new()
            .body(&body)
            .image("rId10", "media/photo.jpeg", &docweave_ooxml::test_utils::jpeg_with_density(320, 240, 72))
            .build();
        let (out, stats) = merge_bytes(corporate_template(), content);
        assert_eq!(stats.inserted_images, 1);

        let types = ContentTypes::parse(out.get(CONTENT_TYPES_PART).unwrap()).unwrap();
        assert_eq!(types.default_for("jpeg"), Some("image/jpeg"));
        assert!(out.contains("word/media/docweave_image1.jpeg"));

        let rels = Relationships::parse(out.document_rels_xml().unwrap()).unwrap();
        assert!(rels
            .iter()
            .any(|(_, r)| r.target == "media/docweave_image1.jpeg" && r.rel_type == Relationships::TYPE_IMAGE));
        // The template's own logo relationship is untouched
        assert_eq!(rels.get("rId3"), Some("media/image1.png"));
    }
}
