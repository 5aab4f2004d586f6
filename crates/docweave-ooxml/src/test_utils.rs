//! Shared test fixtures for docweave-ooxml
//!
//! Packages are assembled in memory with stored (uncompressed) entries so
//! tests stay fast and byte-stable. Enabled for unit tests and, through the
//! `test-utils` feature, for the integration tests of dependent crates.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::archive::OoxmlArchive;
use crate::image::content_type_for_extension;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

/// Build a DOCX package from (path, contents) pairs
///
/// # Example
/// ```ignore
/// use docweave_ooxml::test_utils::build_docx;
/// let docx = build_docx(&[("word/document.xml", b"<w:document/>")]);
/// ```
pub fn build_docx(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (path, contents) in parts {
        zip.start_file(*path, options).unwrap();
        zip.write_all(contents).unwrap();
    }

    zip.finish().unwrap();
    buffer.into_inner()
}

/// A `w:document` wrapping the given body markup
pub fn document_with_body(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="{}" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
            r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        W_NS, body
    )
}

/// A `w:styles` part declaring paragraph styles as (id, name) pairs
///
/// The id "TableGrid" is declared as a table style.
pub fn styles_with(styles: &[(&str, &str)]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{}">"#,
        W_NS
    );
    for (id, name) in styles {
        let kind = if *id == "TableGrid" { "table" } else { "paragraph" };
        let default = if *id == "Normal" { r#" w:default="1""# } else { "" };
        xml.push_str(&format!(
            r#"<w:style w:type="{}"{} w:styleId="{}"><w:name w:val="{}"/></w:style>"#,
            kind, default, id, name
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

/// Style catalog of the corporate template fixture
pub const CORPORATE_STYLES: &[(&str, &str)] = &[
    ("Normal", "Normal"),
    ("Heading1", "heading 1"),
    ("Heading2", "heading 2"),
    ("Heading3", "heading 3"),
    ("BulletPoint1", "Bullet Point 1"),
    ("BodyText1", "Body Text1"),
    ("Step1", "Step 1"),
    ("ImageDescription", "Image Description"),
    ("TableGrid", "Table Grid"),
];

/// Body of the corporate template fixture: cover paragraph, a logo
/// drawing (docPr id 5), the metadata table and the final section
pub const CORPORATE_BODY: &str = concat!(
    r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Cover page</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="720000" cy="360000"/>"#,
    r#"<wp:docPr id="5" name="Logo"/><a:graphic><a:graphicData><pic:pic><pic:blipFill>"#,
    r#"<a:blip r:embed="rId3"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>"#,
    "</wp:inline></w:drawing></w:r></w:p>",
    "<w:tbl>",
    "<w:tr>",
    "<w:tc><w:p><w:r><w:t>Version</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>Author</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>Issued Date</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>Description</w:t></w:r></w:p></w:tc>",
    "</w:tr>",
    "<w:tr>",
    "<w:tc><w:p><w:r><w:t>2.3</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>Jane Roe</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>2024-03-01</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>Operations manual</w:t></w:r></w:p></w:tc>",
    "</w:tr>",
    "</w:tbl>",
    r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#
);

/// The corporate template: custom style catalog, metadata table, a logo
/// picture, no settings part
pub fn corporate_template() -> Vec<u8> {
    template_with_body(CORPORATE_BODY)
}

/// The corporate template catalog and package around a custom body
pub fn template_with_body(body: &str) -> Vec<u8> {
    TemplateDocx::new().body(body).build()
}

/// Builder for template packages
#[derive(Debug, Clone)]
pub struct TemplateDocx {
    body: String,
    styles: Vec<(String, String)>,
    settings: Option<String>,
    core: Option<String>,
}

impl Default for TemplateDocx {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateDocx {
    pub fn new() -> Self {
        Self {
            body: CORPORATE_BODY.to_string(),
            styles: CORPORATE_STYLES
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            settings: None,
            core: Some(core_properties("Corporate Author", "2023-11-20T08:00:00Z", "7")),
        }
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Replace the style catalog with (id, name) pairs
    pub fn styles(mut self, styles: &[(&str, &str)]) -> Self {
        self.styles = styles
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self
    }

    /// Include a `word/settings.xml` part
    pub fn settings(mut self, xml: &str) -> Self {
        self.settings = Some(xml.to_string());
        self
    }

    pub fn core(mut self, xml: Option<String>) -> Self {
        self.core = xml;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let styles: Vec<(&str, &str)> = self
            .styles
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();

        let mut rels = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>"#,
        ));
        let mut overrides = String::new();
        if self.settings.is_some() {
            rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/>"#);
            overrides.push_str(r#"<Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/>"#);
        }
        rels.push_str("</Relationships>");

        let content_types = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Default Extension="png" ContentType="image/png"/>"#,
                r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml"/>"#,
                r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
                "{}</Types>"
            ),
            overrides
        );

        let document = document_with_body(&self.body);
        let styles_xml = styles_with(&styles);
        let logo = png_bytes(8, 4);

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", content_types.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", document.as_bytes()),
            ("word/styles.xml", styles_xml.as_bytes()),
            ("word/_rels/document.xml.rels", rels.as_bytes()),
            ("word/media/image1.png", &logo),
        ];
        if let Some(settings) = &self.settings {
            parts.push(("word/settings.xml", settings.as_bytes()));
        }
        if let Some(core) = &self.core {
            parts.push(("docProps/core.xml", core.as_bytes()));
        }
        build_docx(&parts)
    }
}

/// A `docProps/core.xml` part
pub fn core_properties(creator: &str, created: &str, revision: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:creator>{}</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
            "<cp:revision>{}</cp:revision>",
            "</cp:coreProperties>"
        ),
        creator, created, revision
    )
}

/// Builder for content documents
#[derive(Debug, Clone, Default)]
pub struct ContentDocx {
    body: String,
    /// (rel id, target, bytes, content type)
    images: Vec<(String, String, Vec<u8>, String)>,
}

/// Style catalog of content fixtures
pub const CONTENT_STYLES: &[(&str, &str)] = &[
    ("Normal", "Normal"),
    ("Heading1", "heading 1"),
    ("Heading2", "heading 2"),
    ("Heading3", "heading 3"),
    ("ListBullet", "List Bullet"),
    ("ListBullet2", "List Bullet 2"),
    ("TableGrid", "Table Grid"),
];

impl ContentDocx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Add an image part, typed by the target's extension
    pub fn image(self, rel_id: &str, target: &str, bytes: &[u8]) -> Self {
        let extension = target.rsplit('.').next().unwrap_or_default();
        let content_type = content_type_for_extension(extension).to_string();
        self.image_with_type(rel_id, target, bytes, &content_type)
    }

    /// Add an image part with an explicit content type
    pub fn image_with_type(
        mut self,
        rel_id: &str,
        target: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Self {
        self.images.push((
            rel_id.to_string(),
            target.to_string(),
            bytes.to_vec(),
            content_type.to_string(),
        ));
        self
    }

    /// A run holding an inline picture
    pub fn drawing_run(rel_id: &str, cx: i64, cy: i64) -> String {
        format!(
            concat!(
                "<w:r><w:drawing><wp:inline>",
                r#"<wp:extent cx="{}" cy="{}"/>"#,
                r#"<wp:docPr id="1" name="Picture 1" descr="fixture"/>"#,
                "<a:graphic><a:graphicData><pic:pic><pic:blipFill>",
                r#"<a:blip r:embed="{}"/>"#,
                "</pic:blipFill></pic:pic></a:graphicData></a:graphic>",
                "</wp:inline></w:drawing></w:r>"
            ),
            cx, cy, rel_id
        )
    }

    pub fn build(self) -> Vec<u8> {
        let mut rels = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        ));
        let mut overrides = String::new();
        for (rel_id, target, _, content_type) in &self.images {
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}"/>"#,
                rel_id, target
            ));
            overrides.push_str(&format!(
                r#"<Override PartName="/word/{}" ContentType="{}"/>"#,
                target, content_type
            ));
        }
        rels.push_str("</Relationships>");

        let content_types = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
                "{}</Types>"
            ),
            overrides
        );

        let document = document_with_body(&self.body);
        let styles = styles_with(CONTENT_STYLES);
        let media_paths: Vec<String> = self
            .images
            .iter()
            .map(|(_, target, _, _)| format!("word/{}", target))
            .collect();

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", content_types.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", document.as_bytes()),
            ("word/styles.xml", styles.as_bytes()),
            ("word/_rels/document.xml.rels", rels.as_bytes()),
        ];
        for (path, (_, _, bytes, _)) in media_paths.iter().zip(&self.images) {
            parts.push((path.as_str(), bytes.as_slice()));
        }
        build_docx(&parts)
    }
}

/// The `word/document.xml` of a package, as text
pub fn document_xml(docx: &[u8]) -> String {
    let archive = OoxmlArchive::from_bytes(docx).unwrap();
    String::from_utf8(archive.document_xml().unwrap().to_vec()).unwrap()
}

/// A valid 1-bit grayscale PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    png(width, height, None)
}

/// A PNG whose `pHYs` chunk declares `dpi`
pub fn png_with_dpi(width: u32, height: u32, dpi: u32) -> Vec<u8> {
    png(width, height, Some(dpi))
}

fn png(width: u32, height: u32, dpi: Option<u32>) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // Bit depth 1, grayscale, deflate, adaptive filtering, no interlace
    ihdr.extend_from_slice(&[1, 0, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);

    if let Some(dpi) = dpi {
        let per_metre = (dpi as f64 / 0.0254).round() as u32;
        let mut phys = Vec::with_capacity(9);
        phys.extend_from_slice(&per_metre.to_be_bytes());
        phys.extend_from_slice(&per_metre.to_be_bytes());
        phys.push(1);
        png_chunk(&mut out, b"pHYs", &phys);
    }

    let row = 1 + (width as usize).div_ceil(8);
    let raw = vec![0u8; row * height as usize];
    png_chunk(&mut out, b"IDAT", &zlib_stored(&raw));
    png_chunk(&mut out, b"IEND", &[]);
    out
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// zlib stream made of uncompressed deflate blocks
fn zlib_stored(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x78, 0x01];
    let mut blocks = data.chunks(0xFFFF).peekable();
    if blocks.peek().is_none() {
        out.extend_from_slice(&[1, 0, 0, 0xFF, 0xFF]);
    }
    while let Some(block) = blocks.next() {
        let last = blocks.peek().is_none();
        let len = block.len() as u16;
        out.push(u8::from(last));
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(block);
    }
    out.extend_from_slice(&adler32(data).to_be_bytes());
    out
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

fn adler32(data: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in data {
        a = (a + byte as u32) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

/// JPEG header stream (SOI, JFIF APP0, SOF0, EOI) with a DPI density
pub fn jpeg_with_density(width: u16, height: u16, dpi: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];

    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[1, 1, 1]);
    out.extend_from_slice(&dpi.to_be_bytes());
    out.extend_from_slice(&dpi.to_be_bytes());
    out.extend_from_slice(&[0, 0]);

    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 8]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);

    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}
