//! Renderer trait for DOCX to PDF conversion

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Converts a Word document to PDF out of process
///
/// Implementations must not modify the input document. A failed render
/// leaves no partial file at the requested output path.
pub trait PdfRenderer: Send + Sync {
    /// Human-readable name of this renderer
    fn name(&self) -> &'static str;

    /// Check if the renderer can run on this machine
    fn is_available(&self) -> bool;

    /// Render `docx` to `pdf`, returning the written path
    fn render(&self, docx: &Path, pdf: &Path) -> Result<PathBuf>;
}
