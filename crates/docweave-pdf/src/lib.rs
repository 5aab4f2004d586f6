//! docweave-pdf - PDF rendering through a headless office suite
//!
//! Word documents are converted by an external office process with an
//! explicit time limit. A timeout or a missing engine is reported as an
//! error and never retried.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let pdf = docweave_pdf::docx_to_pdf("merged.docx", "merged.pdf", Duration::from_secs(180))?;
//! ```

mod detect;
mod error;
mod office;
mod renderer;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use detect::{detect_engine, probe, redetect, EngineStatus};
pub use error::{PdfError, Result};
pub use office::{find_soffice, OfficeRenderer, DEFAULT_TIMEOUT, OUTPUT_WAIT};
pub use renderer::PdfRenderer;

/// Convert `docx` to `pdf` with the detected office suite
pub fn docx_to_pdf(docx: impl AsRef<Path>, pdf: impl AsRef<Path>, timeout: Duration) -> Result<PathBuf> {
    let docx = docx.as_ref();
    if !docx.exists() {
        return Err(PdfError::InputNotFound(docx.to_path_buf()));
    }
    let status = detect_engine();
    if !status.available {
        return Err(PdfError::NoEngine(status.detail));
    }
    render_with(&OfficeRenderer::new().with_timeout(timeout), docx, pdf.as_ref())
}

/// Convert with a specific renderer
pub fn render_with(renderer: &dyn PdfRenderer, docx: &Path, pdf: &Path) -> Result<PathBuf> {
    if !docx.exists() {
        return Err(PdfError::InputNotFound(docx.to_path_buf()));
    }
    if !renderer.is_available() {
        return Err(PdfError::NoEngine(format!("{} renderer is not available", renderer.name())));
    }
    log::info!("rendering {} with {}", docx.display(), renderer.name());
    renderer.render(docx, pdf)
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Recording {
        available: bool,
        calls: AtomicUsize,
    }

    impl PdfRenderer for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn render(&self, _docx: &Path, pdf: &Path) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(pdf, b"%PDF-1.4")?;
            Ok(pdf.to_path_buf())
        }
    }

    #[test]
    fn test_missing_input_checked_first() {
        let err = docx_to_pdf("/no/such.docx", "/tmp/out.pdf", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, PdfError::InputNotFound(_)));
    }

    #[test]
    fn test_render_with_unavailable_renderer() {
        let dir = TempDir::new().unwrap();
        let docx = dir.path().join("in.docx");
        std::fs::write(&docx, b"PK").unwrap();
        let renderer = Recording {
            available: false,
            calls: AtomicUsize::new(0),
        };

        let err = render_with(&renderer, &docx, &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::NoEngine(_)));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_render_with_available_renderer() {
        let dir = TempDir::new().unwrap();
        let docx = dir.path().join("in.docx");
        std::fs::write(&docx, b"PK").unwrap();
        let renderer = Recording {
            available: true,
            calls: AtomicUsize::new(0),
        };

        let out = render_with(&renderer, &docx, &dir.path().join("out.pdf")).unwrap();
        assert!(out.is_file());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PdfError::Timeout(Duration::from_secs(180)).to_string(),
            "PDF conversion timed out after 180s"
        );
    }
}
