//! docweave-ast - Document model definitions
//!
//! This crate provides the block-level document model produced by the
//! markup compiler and by the OOXML reader, and consumed by the merge
//! engine and the standalone writer.

pub mod block;
pub mod document;
pub mod inline;

pub use block::{Alignment, Block, Paragraph, Table, TableCell, TableRow};
pub use document::{Document, ImagePart, StyleNames};
pub use inline::{Extent, InlineImage, Run};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
