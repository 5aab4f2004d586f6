//! # docweave-ooxml
//!
//! OOXML (Office Open XML) package handling for docweave.
//!
//! This crate provides functionality to:
//! - Read DOCX/DOTX packages and their body content
//! - Write a document model as a standalone DOCX
//! - Resolve content styles against a template's style catalog
//! - Merge content documents into templates, embedding pictures with
//!   continuous figure numbering
//! - Scrape display metadata from a template
//!
//! ## Example: Merging into a Template
//!
//! ```no_run
//! use docweave_ooxml::{merge, read_document_file, MergeOptions, Template};
//!
//! let mut template = Template::load("corporate.dotx")?;
//! let content = read_document_file("content.docx")?;
//! let stats = merge(&mut template, &content, &MergeOptions::default());
//! println!("{} image(s) inserted, {} skipped", stats.inserted_images, stats.skipped_images);
//! template.save("merged.docx")?;
//! # Ok::<(), docweave_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod content_types;
pub mod document;
pub mod embed;
pub mod error;
pub mod image;
pub mod merge;
pub mod metadata;
pub mod relationships;
pub mod style_resolver;
pub mod styles;
pub mod template;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::OoxmlArchive;
pub use content_types::ContentTypes;
pub use document::{read_document, read_document_file, ContentReader};
pub use embed::{embed, EmbedOptions, EmbedOutcome, FigureCounter, ImageSource, MediaSink, SkipReason};
pub use error::{OoxmlError, Result};
pub use image::{Drawing, ImageInfo};
pub use merge::{merge, merge_into_template, MergeEngine, MergeOptions, MergeStats};
pub use metadata::TemplateMetadata;
pub use relationships::Relationships;
pub use style_resolver::{Resolution, StyleResolver, Tier};
pub use styles::{Style, StyleCatalog, StyleSheet, StyleType};
pub use template::Template;
pub use writer::{BodyXml, DocxWriter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
