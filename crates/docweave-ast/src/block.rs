//! Block-level elements for document structure
//!
//! A document body is an ordered sequence of paragraphs, tables and
//! explicit page breaks. Table cells hold paragraphs only.

use serde::{Deserialize, Serialize};

use crate::inline::{InlineImage, Run};

/// Block-level content element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// A paragraph of runs
    Paragraph(Paragraph),
    /// A rectangular table
    Table(Table),
    /// An explicit page break
    PageBreak,
}

/// Horizontal paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Left aligned
    Left,
    /// Centered
    Center,
    /// Right aligned
    Right,
    /// Justified on both edges
    Justify,
}

impl Alignment {
    /// Parse a `w:jc` value
    pub fn from_ooxml(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" => Some(Alignment::Justify),
            _ => None,
        }
    }

    /// The `w:jc` value for this alignment
    pub fn as_ooxml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// A paragraph block
///
/// A paragraph with no runs still occupies a position in the body and is
/// rendered as an empty line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Runs in reading order
    pub runs: Vec<Run>,
    /// Style display name (e.g. "Heading 2"); `None` means the default style
    pub style: Option<String>,
    /// Explicit alignment, if any
    pub alignment: Option<Alignment>,
    /// Whether the paragraph starts on a new page
    pub page_break_before: bool,
    /// List indentation level (`w:ilvl`), if the paragraph is numbered
    pub list_level: Option<u32>,
}

impl Paragraph {
    /// Create an empty paragraph with the default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty paragraph with a named style
    pub fn with_style(style: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            ..Default::default()
        }
    }

    /// Create a paragraph holding a single plain run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::text(text)],
            ..Default::default()
        }
    }

    /// Set the alignment (builder style)
    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Append a run
    pub fn push(&mut self, run: Run) {
        self.runs.push(run);
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Images referenced by runs of this paragraph, in order
    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.runs.iter().filter_map(|r| r.image.as_ref())
    }

    /// Whether any run carries an image
    pub fn has_images(&self) -> bool {
        self.images().next().is_some()
    }
}

/// A table: a rectangular grid of cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Rows, the first one being the header row when present
    pub rows: Vec<TableRow>,
    /// Table style display name
    pub style: Option<String>,
}

impl Table {
    /// Build a table from rows, padding short rows with empty cells so
    /// every row has the same number of columns.
    pub fn from_rows(rows: Vec<TableRow>) -> Self {
        let mut table = Self { rows, style: None };
        table.pad_rows();
        table
    }

    /// Number of columns (the widest row)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Pad every row with empty cells up to the column count
    pub fn pad_rows(&mut self) {
        let columns = self.column_count();
        for row in &mut self.rows {
            while row.cells.len() < columns {
                row.cells.push(TableCell::empty());
            }
        }
    }

    /// Get a cell by row and column index
    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(column))
    }

    /// Iterate over every paragraph in every cell, row by row
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.paragraphs.iter())
    }
}

/// A table row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in this row
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// Create a row from cells
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }
}

/// A table cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    /// Paragraphs in this cell
    pub paragraphs: Vec<Paragraph>,
}

impl TableCell {
    /// A cell holding one empty paragraph with one empty run
    pub fn empty() -> Self {
        Self {
            paragraphs: vec![Paragraph {
                runs: vec![Run::text("")],
                ..Default::default()
            }],
        }
    }

    /// A cell holding a single paragraph
    pub fn with_paragraph(paragraph: Paragraph) -> Self {
        Self {
            paragraphs: vec![paragraph],
        }
    }

    /// Concatenated text of the cell's paragraphs, separated by newlines
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
