//! Error types for PDF rendering

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Errors that can occur while rendering a PDF
#[derive(Error, Debug)]
pub enum PdfError {
    /// The document to render does not exist
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// No usable office suite was found
    #[error("No PDF engine available: {0}")]
    NoEngine(String),

    /// The office process ran past its time limit and was killed
    #[error("PDF conversion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The office process failed or produced no PDF
    #[error("PDF conversion failed: {0}")]
    Failed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
