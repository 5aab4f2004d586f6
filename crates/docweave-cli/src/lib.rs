//! docweave CLI - Command-line interface library
//!
//! This library provides the CLI functionality for docweave, including:
//! - Compile: Markdown to a standalone DOCX
//! - Merge: Markdown or DOCX content into a corporate template
//! - Pdf: DOCX to PDF through a headless office suite
//!
//! # Binary Usage
//!
//! ```bash
//! # Compile Markdown to DOCX
//! docweave compile notes.md -o notes.docx
//!
//! # Merge into a template and render a PDF
//! docweave merge --template corporate.dotx notes.md -o report.docx --pdf report.pdf
//!
//! # Show template metadata
//! docweave metadata corporate.dotx --format json
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{
    compile_command, engine_command, expand_inputs, format_metadata, merge_command,
    load_settings, metadata_command, pdf_command,
};
pub use app::{run_cli, MetadataFormat};
