//! Error types for OOXML operations

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during OOXML operations
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Required part not found in the package
    #[error("Required file not found: {0}")]
    MissingFile(String),

    /// Template document does not exist on disk
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Content document does not exist on disk
    #[error("Content document not found: {}", .0.display())]
    ContentNotFound(PathBuf),

    /// Invalid document structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
