//! Run-level content: formatted text spans and inline image references

use serde::{Deserialize, Serialize};

/// A formatted text span
///
/// A run may additionally carry one inline image; its binary data lives
/// in the owning document's image table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Run {
    /// The text content
    pub text: String,
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
    /// Inline image carried by this run
    pub image: Option<InlineImage>,
}

impl Run {
    /// A plain text run
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A bold text run
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }

    /// A run holding only an image
    pub fn image(image: InlineImage) -> Self {
        Self {
            image: Some(image),
            ..Default::default()
        }
    }
}

/// Reference from a run to an image part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineImage {
    /// Key into the document's image table
    pub rel_id: String,
    /// Rendered size in EMUs, as declared by the source
    pub extent: Option<Extent>,
    /// Drawing name (`docPr/@name`)
    pub name: Option<String>,
    /// Alternative text (`docPr/@descr`)
    pub description: Option<String>,
    /// Whether the picture carries the border and shadow treatment
    pub decorated: bool,
}

impl InlineImage {
    /// Create a reference with no declared extent
    pub fn new(rel_id: impl Into<String>) -> Self {
        Self {
            rel_id: rel_id.into(),
            extent: None,
            name: None,
            description: None,
            decorated: false,
        }
    }
}

/// Width and height in EMUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    /// Width
    pub cx: i64,
    /// Height
    pub cy: i64,
}
