//! Image support for OOXML documents
//!
//! Sizing rules, header probing, MIME handling and the DrawingML markup for
//! inline pictures.
//!
//! # OOXML Image Structure
//!
//! ```xml
//! <w:drawing>
//!   <wp:inline>
//!     <wp:extent cx="..." cy="..."/>               <!-- Dimensions in EMUs -->
//!     <wp:docPr id="..." name="..." descr="..."/>  <!-- Alt text -->
//!     <a:graphic>
//!       <a:graphicData uri="...picture">
//!         <pic:pic>
//!           <pic:blipFill>
//!             <a:blip r:embed="rIdNN"/>            <!-- Relationship ID -->
//!           </pic:blipFill>
//!           <pic:spPr>...</pic:spPr>               <!-- Border and shadow -->
//!         </pic:pic>
//!       </a:graphicData>
//!     </a:graphic>
//!   </wp:inline>
//! </w:drawing>
//! ```
//!
//! # Unit Conversions
//!
//! - 914400 EMUs = 1 inch
//! - 360000 EMUs = 1 cm

use docweave_ast::Extent;

/// EMUs per inch (914400)
pub const EMU_PER_INCH: i64 = 914400;

/// EMUs per centimetre (360000)
pub const EMU_PER_CM: i64 = 360000;

/// Presentation width for ordinary images
pub const NORMAL_WIDTH_CM: f64 = 15.0;

/// Presentation width for images narrower than [`SMALL_SOURCE_THRESHOLD_CM`]
pub const SMALL_WIDTH_CM: f64 = 9.0;

/// Native widths below this are shown at [`SMALL_WIDTH_CM`]
pub const SMALL_SOURCE_THRESHOLD_CM: f64 = 10.0;

/// Resolution assumed when an image header carries none
pub const DEFAULT_DPI: f64 = 96.0;

/// MIME types that are embedded without conversion
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

/// Native properties read from an image header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub width_px: u32,
    pub height_px: u32,
    /// Horizontal resolution, `None` when the header has none or it is zero
    pub dpi: Option<f64>,
}

impl ImageInfo {
    /// Read pixel size and resolution from encoded image bytes
    pub fn probe(bytes: &[u8]) -> Option<Self> {
        if let Some(info) = probe_png(bytes).or_else(|| probe_jpeg(bytes)) {
            return Some(info);
        }
        probe_other(bytes)
    }

    /// Physical width in cm at the header resolution (96 DPI when absent)
    pub fn native_width_cm(&self) -> f64 {
        let dpi = self.dpi.unwrap_or(DEFAULT_DPI);
        self.width_px as f64 / dpi * 2.54
    }

    /// Height divided by width
    pub fn aspect(&self) -> Option<f64> {
        (self.width_px > 0 && self.height_px > 0)
            .then(|| self.height_px as f64 / self.width_px as f64)
    }
}

/// Snap a physical width to one of the two presentation widths
pub fn presentation_width_cm(width_cm: f64) -> f64 {
    if width_cm < SMALL_SOURCE_THRESHOLD_CM {
        SMALL_WIDTH_CM
    } else {
        NORMAL_WIDTH_CM
    }
}

/// Convert centimetres to EMUs
pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM as f64).round() as i64
}

/// Convert EMUs to centimetres
pub fn emu_to_cm(emu: i64) -> f64 {
    emu as f64 / EMU_PER_CM as f64
}

/// Convert EMUs to inches
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

/// Rendered size of a picture.
///
/// The width comes from the declared extent when there is one, then from the
/// native resolution, and is the normal width otherwise. The height keeps the
/// aspect ratio of whichever source is available, 4:3 when none is.
pub fn target_extent(declared: Option<Extent>, info: Option<&ImageInfo>) -> Extent {
    let declared = declared.filter(|e| e.cx > 0);

    let width_cm = match (declared, info) {
        (Some(extent), _) => presentation_width_cm(emu_to_cm(extent.cx)),
        (None, Some(info)) if info.width_px > 0 => presentation_width_cm(info.native_width_cm()),
        _ => NORMAL_WIDTH_CM,
    };

    let aspect = declared
        .filter(|e| e.cy > 0)
        .map(|e| e.cy as f64 / e.cx as f64)
        .or_else(|| info.and_then(ImageInfo::aspect))
        .unwrap_or(0.75);

    let cx = cm_to_emu(width_cm);
    Extent {
        cx,
        cy: (cx as f64 * aspect).round() as i64,
    }
}

/// Whether a MIME type can be embedded as-is
pub fn is_supported_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    SUPPORTED_MIME_TYPES.contains(&mime.as_str())
}

/// Decode any raster format the `image` crate knows and encode it as PNG
#[cfg(feature = "raster")]
pub fn reencode_to_png(bytes: &[u8]) -> Option<Vec<u8>> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            log::debug!("cannot decode image for re-encoding: {}", e);
            return None;
        }
    };
    let mut out = std::io::Cursor::new(Vec::new());
    decoded.write_to(&mut out, image::ImageFormat::Png).ok()?;
    Some(out.into_inner())
}

/// Re-encoding needs the `raster` feature
#[cfg(not(feature = "raster"))]
pub fn reencode_to_png(_bytes: &[u8]) -> Option<Vec<u8>> {
    None
}

/// Get the MIME content type for an image extension
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "tiff" | "tif" => "image/tiff",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// File extension used for a media part of the given MIME type
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        "image/x-emf" => "emf",
        "image/x-wmf" => "wmf",
        "image/x-icon" => "ico",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Guess a MIME type from magic bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some("image/tiff")
    } else if bytes.len() > 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Parameters of one inline picture
#[derive(Debug, Clone)]
pub struct Drawing<'a> {
    /// Relationship id of the media part
    pub rel_id: &'a str,
    /// `wp:docPr` id, unique within the document
    pub doc_pr_id: u32,
    pub name: &'a str,
    pub description: &'a str,
    pub extent: Extent,
    /// Apply the thin border and soft drop shadow
    pub decorated: bool,
}

/// DrawingML for an inline picture, the content of a `w:r`
pub fn drawing_xml(drawing: &Drawing<'_>) -> String {
    let Extent { cx, cy } = drawing.extent;
    let mut xml = String::new();

    xml.push_str("<w:drawing>");
    xml.push_str(
        r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
    );
    xml.push_str(&format!(r#"<wp:extent cx="{}" cy="{}"/>"#, cx, cy));
    xml.push_str(r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#);
    xml.push_str(&format!(
        r#"<wp:docPr id="{}" name="{}" descr="{}"/>"#,
        drawing.doc_pr_id,
        escape_xml(drawing.name),
        escape_xml(drawing.description)
    ));
    xml.push_str(r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#);
    xml.push_str(r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#);
    xml.push_str(r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#);
    xml.push_str(r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#);

    xml.push_str(&format!(
        r#"<pic:nvPicPr><pic:cNvPr id="{}" name="{}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
        drawing.doc_pr_id,
        escape_xml(drawing.name)
    ));
    xml.push_str(&format!(
        r#"<pic:blipFill><a:blip r:embed="{}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
        escape_xml(drawing.rel_id)
    ));

    xml.push_str("<pic:spPr>");
    xml.push_str(&format!(
        r#"<a:xfrm><a:off x="0" y="0"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        cx, cy
    ));
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    if drawing.decorated {
        xml.push_str(BORDER_XML);
        xml.push_str(SHADOW_XML);
    }
    xml.push_str("</pic:spPr>");

    xml.push_str("</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>");
    xml
}

/// Thin dark-grey outline
const BORDER_XML: &str = concat!(
    r#"<a:ln w="19050" cap="flat" cmpd="sng" algn="ctr">"#,
    r#"<a:solidFill><a:srgbClr val="404040"/></a:solidFill>"#,
    r#"<a:miter lim="800000"/>"#,
    r#"<a:headEnd type="none" w="med" len="med"/>"#,
    r#"<a:tailEnd type="none" w="med" len="med"/>"#,
    "</a:ln>"
);

/// Soft shadow below the picture
const SHADOW_XML: &str = concat!(
    "<a:effectLst>",
    r#"<a:outerShdw blurRad="6350" dist="3810" dir="2700000" algn="b" rotWithShape="0">"#,
    r#"<a:srgbClr val="404040"><a:alpha val="40000"/></a:srgbClr>"#,
    "</a:outerShdw>",
    "</a:effectLst>"
);

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

/// IHDR dimensions and pHYs resolution
fn probe_png(bytes: &[u8]) -> Option<ImageInfo> {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return None;
    }

    let mut info = ImageInfo {
        width_px: 0,
        height_px: 0,
        dpi: None,
    };
    let mut pos = PNG_SIGNATURE.len();

    while let (Some(length), Some(kind)) = (be_u32(bytes, pos), bytes.get(pos + 4..pos + 8)) {
        let data = pos + 8;
        match kind {
            b"IHDR" => {
                info.width_px = be_u32(bytes, data)?;
                info.height_px = be_u32(bytes, data + 4)?;
            }
            b"pHYs" => {
                let per_unit = be_u32(bytes, data)?;
                // Unit 1 is pixels per metre, 0 only gives an aspect ratio
                if bytes.get(data + 8) == Some(&1) && per_unit > 0 {
                    info.dpi = Some((per_unit as f64 * 0.0254).round());
                }
            }
            b"IDAT" | b"IEND" => break,
            _ => {}
        }
        pos = data + length as usize + 4;
    }

    (info.width_px > 0).then_some(info)
}

/// SOFn dimensions and JFIF density
fn probe_jpeg(bytes: &[u8]) -> Option<ImageInfo> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut dpi = None;
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = be_u16(bytes, pos + 2)? as usize;
        let data = pos + 4;

        match marker {
            0xE0 if bytes.get(data..data + 5) == Some(b"JFIF\0") => {
                let units = *bytes.get(data + 7)?;
                let density = be_u16(bytes, data + 8)? as f64;
                dpi = match units {
                    1 if density > 0.0 => Some(density),
                    2 if density > 0.0 => Some((density * 2.54).round()),
                    _ => None,
                };
            }
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height_px = be_u16(bytes, data + 1)? as u32;
                let width_px = be_u16(bytes, data + 3)? as u32;
                return Some(ImageInfo {
                    width_px,
                    height_px,
                    dpi,
                });
            }
            0xD9 | 0xDA => return None,
            _ => {}
        }
        pos = data + length - 2;
    }

    None
}

#[cfg(feature = "raster")]
fn probe_other(bytes: &[u8]) -> Option<ImageInfo> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width_px, height_px) = reader.into_dimensions().ok()?;
    Some(ImageInfo {
        width_px,
        height_px,
        dpi: None,
    })
}

#[cfg(not(feature = "raster"))]
fn probe_other(_bytes: &[u8]) -> Option<ImageInfo> {
    None
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
