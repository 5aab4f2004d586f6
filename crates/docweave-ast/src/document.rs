//! Document root: body blocks, style catalog and image table

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::block::{Block, Paragraph};

/// Style names every freshly created document knows about
pub const DEFAULT_STYLES: &[&str] = &[
    "Normal",
    "Heading 1",
    "Heading 2",
    "Heading 3",
    "Heading 4",
    "List Bullet",
    "List Bullet 2",
    "List Paragraph",
    "Caption",
    "Table Grid",
];

/// A complete document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Body blocks in order
    pub blocks: Vec<Block>,
    /// Paragraph and table style names available in this document
    pub styles: StyleNames,
    /// Image binaries keyed by relationship id
    pub images: BTreeMap<String, ImagePart>,
}

/// Binary image data referenced from runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    /// Raw bytes as stored in the package
    pub bytes: Vec<u8>,
    /// MIME type (e.g. "image/png")
    pub mime: String,
    /// Original file name, used to pick the media extension
    pub file_name: String,
}

/// A set of style names with case-insensitive membership
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleNames {
    names: BTreeSet<String>,
}

impl StyleNames {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of a freshly created document
    pub fn defaults() -> Self {
        DEFAULT_STYLES.iter().copied().collect()
    }

    /// Add a style name
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Check whether a style exists, ignoring ASCII case
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Iterate over names in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for StyleNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with the default style catalog
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            styles: StyleNames::defaults(),
            images: BTreeMap::new(),
        }
    }

    /// Create an empty document with a given style catalog
    pub fn with_styles(styles: StyleNames) -> Self {
        Self {
            blocks: Vec::new(),
            styles,
            images: BTreeMap::new(),
        }
    }

    /// Add a block to the document
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Add a paragraph to the document
    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    /// Check if the document has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Store image data and return the id runs use to refer to it
    pub fn add_image(&mut self, part: ImagePart) -> String {
        let id = format!("rIdImg{}", self.images.len() + 1);
        self.images.insert(id.clone(), part);
        id
    }

    /// Look up image data by id
    pub fn image(&self, rel_id: &str) -> Option<&ImagePart> {
        self.images.get(rel_id)
    }

    /// All paragraphs, with table cells flattened in row order
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Paragraph(p) => vec![p].into_iter(),
            Block::Table(t) => t.paragraphs().collect::<Vec<_>>().into_iter(),
            Block::PageBreak => vec![].into_iter(),
        })
    }

    /// Number of image references across all runs
    pub fn image_reference_count(&self) -> usize {
        self.paragraphs().map(|p| p.images().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Table, TableCell, TableRow};
    use crate::inline::{InlineImage, Run};

    #[test]
    fn test_default_catalog() {
        let doc = Document::new();
        assert!(doc.styles.contains("Heading 2"));
        assert!(doc.styles.contains("heading 2"));
        assert!(!doc.styles.contains("Image Description"));
    }

    #[test]
    fn test_add_image_ids_are_unique() {
        let mut doc = Document::new();
        let part = ImagePart {
            bytes: vec![1, 2, 3],
            mime: "image/png".to_string(),
            file_name: "a.png".to_string(),
        };
        let first = doc.add_image(part.clone());
        let second = doc.add_image(part);
        assert_ne!(first, second);
        assert_eq!(doc.image(&first).unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_paragraphs_flatten_tables() {
        let mut doc = Document::new();
        doc.push_paragraph(Paragraph::plain("before"));
        doc.push(Block::Table(Table::from_rows(vec![TableRow::new(vec![
            TableCell::with_paragraph(Paragraph::plain("cell")),
        ])])));
        doc.push(Block::PageBreak);

        let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["before", "cell"]);
    }

    #[test]
    fn test_image_reference_count() {
        let mut doc = Document::new();
        let mut para = Paragraph::new();
        para.push(Run::image(InlineImage::new("rIdImg1")));
        doc.push_paragraph(para);
        assert_eq!(doc.image_reference_count(), 1);
    }

    #[test]
    fn test_document_serializes_to_json() {
        let mut doc = Document::new();
        doc.push_paragraph(Paragraph::with_style("Heading 1"));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("Heading 1"));
    }
}
