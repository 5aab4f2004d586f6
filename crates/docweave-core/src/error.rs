//! Error types for compilation and the merge pipeline

use std::path::PathBuf;

use docweave_ooxml::OoxmlError;
use thiserror::Error;

/// Errors that abort a compile or merge before output is written
#[derive(Error, Debug)]
pub enum CompileError {
    /// Markup source does not exist on disk
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// More markup files than one compile accepts
    #[error("Too many source files: {count} given, at most {max} allowed")]
    TooManySources { count: usize, max: usize },

    /// No markup files given
    #[error("No source files given")]
    NoSources,

    /// Content file with an extension the pipeline cannot read
    #[error("Unsupported content file: {}", .0.display())]
    UnsupportedContent(PathBuf),

    /// Error reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error in the OOXML layer
    #[error(transparent)]
    Ooxml(#[from] OoxmlError),

    /// Malformed TOML configuration
    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON configuration
    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for compile operations
pub type Result<T> = std::result::Result<T, CompileError>;
