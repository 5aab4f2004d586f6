//! Image path resolution and rendering for the Markdown compiler
//!
//! A requested path is tried, in order, against the Markdown file's
//! directory, the working directory and every global image directory, each
//! with its conventional sub-directories. When none of those exists, the
//! global directories are scanned recursively for a file of the same name.

use std::fmt;
use std::path::{Path, PathBuf};

use docweave_ast::{Alignment, Document, Extent, ImagePart, InlineImage, Paragraph, Run};
use docweave_ooxml::image::{
    cm_to_emu, content_type_for_extension, presentation_width_cm, sniff_mime, ImageInfo,
    NORMAL_WIDTH_CM,
};

/// Label that starts every compiled caption
pub const CAPTION_PREFIX: &str = "Image";

/// Caption style used when the document's catalog has it
pub const CAPTION_STYLE: &str = "Image Description";

/// File extensions the recursive scan accepts
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif", "ico", "bmp", "tiff"];

/// Extensions whose native size decides between the small and normal width
const SIZED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

/// Height over width when the native size is unknown
const DEFAULT_ASPECT: f64 = 0.75;

/// Finds image files for `![alt](path)` references
#[derive(Debug, Clone)]
pub struct ImageResolver {
    base_dir: Option<PathBuf>,
    cwd: PathBuf,
    global_dirs: Vec<PathBuf>,
}

impl ImageResolver {
    /// Resolver for a Markdown file in `base_dir`, searching `global_dirs` last
    pub fn new(base_dir: Option<&Path>, global_dirs: &[PathBuf]) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
            cwd: std::env::current_dir().unwrap_or_default(),
            global_dirs: global_dirs.to_vec(),
        }
    }

    /// Use a fixed working directory instead of the process one
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Direct candidates for a requested path, in search order
    pub fn candidates(&self, requested: &str) -> Vec<PathBuf> {
        let path = PathBuf::from(normalize_image_path(requested));
        let name = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone());

        let mut candidates = Vec::new();
        if let Some(base) = &self.base_dir {
            candidates.push(base.join(&path));
            candidates.push(base.join("images").join(&name));
            candidates.push(base.join("img").join(&name));
        }

        candidates.push(self.cwd.join(&path));
        candidates.push(self.cwd.join("images").join(&name));
        candidates.push(self.cwd.join("static").join("img").join(&name));

        for dir in &self.global_dirs {
            candidates.push(dir.join(&path));
            candidates.push(dir.join("images").join(&name));
            candidates.push(dir.join("static").join("img").join(&name));
        }
        candidates
    }

    /// First existing candidate, then a recursive match in the global directories
    pub fn resolve(&self, requested: &str) -> Option<PathBuf> {
        log::debug!("resolving image {}", requested);
        for candidate in self.candidates(requested) {
            let exists = candidate.is_file();
            log::debug!("  checking {} ({})", candidate.display(), if exists { "found" } else { "missing" });
            if exists {
                return Some(candidate);
            }
        }

        let normalized = normalize_image_path(requested);
        let name = Path::new(&normalized).file_name()?.to_string_lossy().to_lowercase();
        self.global_dirs
            .iter()
            .filter(|dir| dir.is_dir())
            .find_map(|dir| scan_for(dir, &name))
    }
}

/// Trim, use forward slashes, drop leading slashes
pub fn normalize_image_path(raw: &str) -> String {
    raw.trim().replace('\\', "/").trim_start_matches('/').to_string()
}

/// Recursive case-insensitive file name match under `dir`
fn scan_for(dir: &Path, name: &str) -> Option<PathBuf> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot scan {}: {}", dir.display(), e);
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .find(|path| {
            let allowed = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()));
            let same_name = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase() == name);
            allowed && same_name
        })
        .inspect(|path| log::debug!("recursive match {}", path.display()))
}

/// Why an image became a placeholder paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// No candidate exists for the requested path
    NotFound(String),
    /// The resolved file cannot be read or is not an embeddable picture
    Unsupported(String),
}

impl PlaceholderReason {
    /// Text of the placeholder paragraph
    pub fn placeholder_text(&self) -> String {
        match self {
            PlaceholderReason::NotFound(path) => format!("[Image not found: {}]", path),
            PlaceholderReason::Unsupported(path) => format!("[Unsupported image: {}]", path),
        }
    }
}

impl fmt::Display for PlaceholderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderReason::NotFound(path) => write!(f, "image not found: {}", path),
            PlaceholderReason::Unsupported(path) => write!(f, "unsupported image: {}", path),
        }
    }
}

/// What an image reference turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRendering {
    /// Picture paragraph added, with a caption when the alt text is meaningful
    Embedded { caption: bool },
    /// Visible placeholder paragraph added instead
    Placeholder(PlaceholderReason),
}

/// Append an image reference to `doc`
pub fn render_image(
    doc: &mut Document,
    resolved: Option<&Path>,
    requested: &str,
    alt: &str,
    style_images: bool,
) -> ImageRendering {
    let Some(path) = resolved else {
        return placeholder(doc, PlaceholderReason::NotFound(normalize_image_path(requested)));
    };

    let unsupported = || PlaceholderReason::Unsupported(path.display().to_string());
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("cannot read {}: {}", path.display(), e);
            return placeholder(doc, unsupported());
        }
    };
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    // Bytes go in as found; the merge engine converts what Word cannot show
    let mime = match sniff_mime(&bytes) {
        Some(mime) => mime,
        None => match content_type_for_extension(&extension) {
            "application/octet-stream" => return placeholder(doc, unsupported()),
            mime => mime,
        },
    };
    let extent = compiled_extent(&bytes, SIZED_EXTENSIONS.contains(&extension.as_str()));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let rel_id = doc.add_image(ImagePart {
        bytes,
        mime: mime.to_string(),
        file_name: file_name.clone(),
    });
    let mut picture = InlineImage::new(rel_id);
    picture.extent = Some(extent);
    picture.description = Some(if alt.trim().is_empty() {
        file_name.clone()
    } else {
        alt.trim().to_string()
    });
    picture.name = Some(file_name);
    picture.decorated = style_images;

    let mut para = Paragraph::new().aligned(Alignment::Center);
    para.push(Run::image(picture));
    doc.push_paragraph(para);

    let caption = alt.trim();
    let captioned = !caption.is_empty() && !caption.eq_ignore_ascii_case("image");
    if captioned {
        let mut para = Paragraph::plain(format!("{}: {}", CAPTION_PREFIX, alt).trim().to_string())
            .aligned(Alignment::Center);
        if doc.styles.contains(CAPTION_STYLE) {
            para.style = Some(CAPTION_STYLE.to_string());
        }
        doc.push_paragraph(para);
    }

    ImageRendering::Embedded { caption: captioned }
}

/// Small or normal width by native size, height by native aspect ratio
fn compiled_extent(bytes: &[u8], sized_by_native: bool) -> Extent {
    let info = ImageInfo::probe(bytes);
    let width_cm = match info {
        Some(info) if sized_by_native && info.width_px > 0 => {
            presentation_width_cm(info.native_width_cm())
        }
        _ => NORMAL_WIDTH_CM,
    };
    let aspect = info.and_then(|i| i.aspect()).unwrap_or(DEFAULT_ASPECT);

    let cx = cm_to_emu(width_cm);
    Extent {
        cx,
        cy: (cx as f64 * aspect).round() as i64,
    }
}

fn placeholder(doc: &mut Document, reason: PlaceholderReason) -> ImageRendering {
    doc.push_paragraph(Paragraph::plain(reason.placeholder_text()));
    ImageRendering::Placeholder(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_ooxml::image::SMALL_WIDTH_CM;
    use docweave_ooxml::test_utils::{png_bytes, png_with_dpi};
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_normalize_image_path() {
        assert_eq!(normalize_image_path("  \\\\img\\a.png "), "img/a.png");
        assert_eq!(normalize_image_path("//abs/b.png"), "abs/b.png");
    }

    #[test]
    fn test_candidate_order() {
        let resolver = ImageResolver::new(Some(Path::new("/md")), &[PathBuf::from("/g")])
            .with_cwd(PathBuf::from("/cwd"));
        let candidates = resolver.candidates("/pics/a.png");
        let expected: Vec<PathBuf> = [
            "/md/pics/a.png",
            "/md/images/a.png",
            "/md/img/a.png",
            "/cwd/pics/a.png",
            "/cwd/images/a.png",
            "/cwd/static/img/a.png",
            "/g/pics/a.png",
            "/g/images/a.png",
            "/g/static/img/a.png",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(candidates, expected);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("doc");
        let global = dir.path().join("global");
        write(&base, "img/a.png", &png_bytes(2, 2));
        write(&global, "a.png", &png_bytes(2, 2));

        let resolver = ImageResolver::new(Some(&base), &[global]).with_cwd(dir.path().join("cwd"));
        assert_eq!(resolver.resolve("pictures/a.png"), Some(base.join("img/a.png")));
    }

    #[test]
    fn test_recursive_scan_ignores_case() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global");
        let deep = write(&global, "x/y/Logo.PNG", &png_bytes(2, 2));
        write(&global, "x/logo.txt", b"text");

        let resolver = ImageResolver::new(None, &[global, dir.path().join("absent")])
            .with_cwd(dir.path().join("cwd"));
        assert_eq!(resolver.resolve("assets/logo.png"), Some(deep));
        assert_eq!(resolver.resolve("logo.txt"), None);
    }

    #[test]
    fn test_embedded_with_caption() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "chart.png", &png_with_dpi(300, 150, 300));
        let mut doc = Document::new();
        doc.styles.insert(CAPTION_STYLE);

        let outcome = render_image(&mut doc, Some(&path), "chart.png", "Sales chart", true);

        assert_eq!(outcome, ImageRendering::Embedded { caption: true });
        assert_eq!(doc.images.len(), 1);
        let Some(docweave_ast::Block::Paragraph(picture)) = doc.blocks.first() else {
            panic!("expected picture paragraph");
        };
        assert_eq!(picture.alignment, Some(Alignment::Center));
        let inline = picture.images().next().unwrap();
        assert!(inline.decorated);
        // 300 px at 300 DPI is 2.54 cm, below the small threshold
        assert_eq!(inline.extent, Some(Extent { cx: cm_to_emu(SMALL_WIDTH_CM), cy: cm_to_emu(SMALL_WIDTH_CM) / 2 }));

        let Some(docweave_ast::Block::Paragraph(caption)) = doc.blocks.get(1) else {
            panic!("expected caption paragraph");
        };
        assert_eq!(caption.text(), "Image: Sales chart");
        assert_eq!(caption.style.as_deref(), Some(CAPTION_STYLE));
    }

    #[test]
    fn test_placeholder_alt_text_suppresses_caption() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.png", &png_bytes(4, 4));

        for alt in ["", "image", " Image "] {
            let mut doc = Document::new();
            let outcome = render_image(&mut doc, Some(&path), "a.png", alt, false);
            assert_eq!(outcome, ImageRendering::Embedded { caption: false });
            assert_eq!(doc.blocks.len(), 1);
        }
    }

    #[test]
    fn test_unrecognised_bytes_embedded_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "vector.svg", b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
        let mut doc = Document::new();

        let outcome = render_image(&mut doc, Some(&path), "vector.svg", "Vector", true);

        assert_eq!(outcome, ImageRendering::Embedded { caption: true });
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.images.values().next().unwrap().mime, "image/svg+xml");
    }

    #[test]
    fn test_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "diagram.vsdx", b"not a picture");
        let mut doc = Document::new();

        let outcome = render_image(&mut doc, Some(&path), "diagram.vsdx", "Diagram", true);

        assert!(matches!(outcome, ImageRendering::Placeholder(PlaceholderReason::Unsupported(_))));
        assert!(doc.images.is_empty());
        let Some(docweave_ast::Block::Paragraph(para)) = doc.blocks.first() else {
            panic!("expected placeholder paragraph");
        };
        assert!(para.text().starts_with("[Unsupported image: "));
    }

    #[test]
    fn test_not_found_placeholder() {
        let mut doc = Document::new();
        let outcome = render_image(&mut doc, None, " \\missing\\x.png", "x", true);
        assert_eq!(
            outcome,
            ImageRendering::Placeholder(PlaceholderReason::NotFound("missing/x.png".to_string()))
        );
        assert_eq!(doc.paragraphs().next().unwrap().text(), "[Image not found: missing/x.png]");
    }
}
