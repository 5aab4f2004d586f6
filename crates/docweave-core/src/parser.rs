//! Markdown Parser
//!
//! This module compiles Markdown text into a `docweave_ast::Document`.
//!
//! # Supported Syntax
//!
//! - Headings: `#` to `######` (levels 5 and 6 render as level 4)
//! - Paragraphs: consecutive lines joined with spaces
//! - Blank lines: kept as empty paragraphs
//! - Formatting: `**bold**`
//! - Lists: `- item`, indented `  - item` for the second level
//! - Pipe tables with a `---` separator row and `:` alignment markers
//! - Images: `![alt](path)`
//!
//! # Example
//!
//! ```ignore
//! use docweave_core::parser::Parser;
//!
//! let doc = Parser::new(&resolver, true).parse("## Scope\n\nHello **world**.");
//! ```

use docweave_ast::{Alignment, Block, Document, Paragraph, Run, Table, TableCell, TableRow};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::images::{render_image, ImageRendering, ImageResolver};
use crate::strip::strip_hidden;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*\S)\s*$").expect("valid heading pattern"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)-\s+(.*\S)\s*$").expect("valid bullet pattern"));
static SEPARATOR_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*:?-{3,}:?\s*$").expect("valid separator pattern"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("valid image pattern"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*").expect("valid bold pattern"));

/// Deepest heading style a document uses
pub const MAX_HEADING_LEVEL: usize = 4;

/// Style for top-level bullets
pub const BULLET_STYLE: &str = "List Bullet";

/// Style for indented bullets
pub const NESTED_BULLET_STYLE: &str = "List Bullet 2";

/// Parser state for tracking what kind of block we're currently building
#[derive(Debug, Clone, PartialEq)]
enum ParserState {
    /// Not inside any block
    Root,
    /// Building a paragraph with accumulated lines
    Paragraph(Vec<String>),
}

/// Markdown compiler using a line-based state machine with one line of lookahead
pub struct Parser<'r> {
    resolver: &'r ImageResolver,
    style_images: bool,
    doc: Document,
    state: ParserState,
}

impl<'r> Parser<'r> {
    pub fn new(resolver: &'r ImageResolver, style_images: bool) -> Self {
        Self {
            resolver,
            style_images,
            doc: Document::new(),
            state: ParserState::Root,
        }
    }

    /// Compile the whole source
    pub fn parse(mut self, text: &str) -> Document {
        let text = strip_hidden(text);
        let lines: Vec<&str> = text.lines().collect();

        let mut i = 0;
        while i < lines.len() {
            i = self.process_line(&lines, i);
        }

        self.flush_state();
        self.doc
    }

    /// Process the line at `i` and return the index of the next unprocessed line
    fn process_line(&mut self, lines: &[&str], i: usize) -> usize {
        let line = lines[i];

        if line.trim().is_empty() {
            self.flush_state();
            self.doc.push_paragraph(Paragraph::new());
            return i + 1;
        }

        if let Some(caps) = HEADING.captures(line) {
            self.flush_state();
            let level = caps[1].len().min(MAX_HEADING_LEVEL);
            let mut heading = Paragraph::with_style(format!("Heading {}", level));
            heading.runs = bold_runs(&caps[2]);
            self.doc.push_paragraph(heading);
            return i + 1;
        }

        if BULLET.is_match(line) {
            self.flush_state();
            return self.consume_bullets(lines, i);
        }

        if line.contains('|') && lines.get(i + 1).is_some_and(|next| is_separator_row(next)) {
            self.flush_state();
            return self.consume_table(lines, i);
        }

        if let Some(caps) = IMAGE.captures(line) {
            self.flush_state();
            let alt = caps.get(1).map_or("", |m| m.as_str());
            let path = caps.get(2).map_or("", |m| m.as_str());
            self.image(alt, path);
            return i + 1;
        }

        match &mut self.state {
            ParserState::Paragraph(buffer) => buffer.push(line.to_string()),
            ParserState::Root => self.state = ParserState::Paragraph(vec![line.to_string()]),
        }
        i + 1
    }

    /// Bullet paragraphs for as long as lines keep matching
    fn consume_bullets(&mut self, lines: &[&str], mut i: usize) -> usize {
        while let Some(caps) = lines.get(i).and_then(|line| BULLET.captures(line)) {
            let style = if caps[1].is_empty() {
                BULLET_STYLE
            } else {
                NESTED_BULLET_STYLE
            };
            let mut bullet = Paragraph::with_style(style);
            bullet.runs = bold_runs(&caps[2]);
            self.doc.push_paragraph(bullet);
            i += 1;
        }
        i
    }

    /// Header line, separator line, then body rows up to a blank or pipe-less line
    fn consume_table(&mut self, lines: &[&str], i: usize) -> usize {
        let header = split_row(lines[i]);
        let alignments = parse_alignments(lines[i + 1]);

        let mut next = i + 2;
        let mut body = Vec::new();
        while let Some(line) = lines.get(next) {
            if line.trim().is_empty() || !line.contains('|') {
                break;
            }
            body.push(split_row(line));
            next += 1;
        }

        self.doc
            .push(Block::Table(build_table(&header, &body, &alignments)));
        next
    }

    fn image(&mut self, alt: &str, requested: &str) {
        let resolved = self.resolver.resolve(requested);
        match render_image(
            &mut self.doc,
            resolved.as_deref(),
            requested,
            alt,
            self.style_images,
        ) {
            ImageRendering::Embedded { caption } => {
                log::debug!("embedded image {} (caption: {})", requested, caption);
            }
            ImageRendering::Placeholder(reason) => {
                log::warn!("{}", reason);
            }
        }
    }

    /// Flush the current state to blocks
    fn flush_state(&mut self) {
        let state = std::mem::replace(&mut self.state, ParserState::Root);

        if let ParserState::Paragraph(lines) = state {
            let text = lines
                .iter()
                .map(|l| l.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let mut para = Paragraph::new();
            para.runs = bold_runs(text.trim());
            self.doc.push_paragraph(para);
        }
    }
}

/// Split text into plain and `**bold**` runs; empty text yields one empty run
pub fn bold_runs(text: &str) -> Vec<Run> {
    if text.is_empty() {
        return vec![Run::text("")];
    }

    let mut runs = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            runs.push(Run::text(&text[last..whole.start()]));
        }
        runs.push(Run::bold(inner.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        runs.push(Run::text(&text[last..]));
    }
    runs
}

/// Cells of a pipe row, outer pipes removed
pub fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Whether a line is a `| --- | :---: |` separator row
pub fn is_separator_row(line: &str) -> bool {
    line.contains('|')
        && split_row(line)
            .iter()
            .all(|token| SEPARATOR_CELL.is_match(token))
}

/// Column alignments from colon placement in a separator row
pub fn parse_alignments(separator: &str) -> Vec<Alignment> {
    split_row(separator)
        .iter()
        .map(|token| match (token.starts_with(':'), token.ends_with(':')) {
            (true, true) => Alignment::Center,
            (_, true) => Alignment::Right,
            _ => Alignment::Left,
        })
        .collect()
}

/// A rectangular table; the header row is bold and missing cells are empty
fn build_table(header: &[String], body: &[Vec<String>], alignments: &[Alignment]) -> Table {
    let columns = body
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let row = |cells: &[String], bold: bool| {
        TableRow::new(
            (0..columns)
                .map(|j| {
                    let mut runs = bold_runs(cells.get(j).map_or("", String::as_str));
                    if bold {
                        runs.iter_mut().for_each(|run| run.bold = true);
                    }
                    TableCell::with_paragraph(Paragraph {
                        runs,
                        alignment: alignments.get(j).copied(),
                        ..Default::default()
                    })
                })
                .collect(),
        )
    };

    let mut rows = vec![row(header, true)];
    rows.extend(body.iter().map(|cells| row(cells, false)));
    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(text: &str) -> Document {
        let resolver = ImageResolver::new(None, &[]).with_cwd(PathBuf::from("/nonexistent-cwd"));
        Parser::new(&resolver, true).parse(text)
    }

    fn paragraph(doc: &Document, index: usize) -> &Paragraph {
        match &doc.blocks[index] {
            Block::Paragraph(p) => p,
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_bold_runs() {
        let runs = bold_runs("Hello **world** and **more**!");
        let parts: Vec<(&str, bool)> = runs.iter().map(|r| (r.text.as_str(), r.bold)).collect();
        assert_eq!(
            parts,
            vec![
                ("Hello ", false),
                ("world", true),
                (" and ", false),
                ("more", true),
                ("!", false)
            ]
        );
        assert_eq!(bold_runs(""), vec![Run::text("")]);
        assert_eq!(bold_runs("**unclosed"), vec![Run::text("**unclosed")]);
    }

    #[test]
    fn test_headings_clamp_to_level_four() {
        let doc = parse("# One\n###### Six **bold**\n####### seven");
        assert_eq!(paragraph(&doc, 0).style.as_deref(), Some("Heading 1"));
        let six = paragraph(&doc, 1);
        assert_eq!(six.style.as_deref(), Some("Heading 4"));
        assert!(six.runs[1].bold);
        // Seven hashes are plain text
        assert_eq!(paragraph(&doc, 2).style, None);
        assert_eq!(paragraph(&doc, 2).text(), "####### seven");
    }

    #[test]
    fn test_paragraph_lines_join_and_blank_lines_stay() {
        let doc = parse("first line\n  second line\n\nnext");
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(paragraph(&doc, 0).text(), "first line second line");
        assert!(paragraph(&doc, 1).runs.is_empty());
        assert_eq!(paragraph(&doc, 2).text(), "next");
    }

    #[test]
    fn test_bullets() {
        let doc = parse("- one\n  - nested **b**\n- two\ntext after");
        let styles: Vec<Option<&str>> = (0..3).map(|i| paragraph(&doc, i).style.as_deref()).collect();
        assert_eq!(
            styles,
            vec![Some(BULLET_STYLE), Some(NESTED_BULLET_STYLE), Some(BULLET_STYLE)]
        );
        assert_eq!(paragraph(&doc, 3).style, None);
        assert_eq!(paragraph(&doc, 3).text(), "text after");
    }

    #[test]
    fn test_separator_rows() {
        assert!(is_separator_row("|---|:---:|---:|"));
        assert!(is_separator_row("--- | ---"));
        assert!(!is_separator_row("|--|---|"));
        assert!(!is_separator_row("-----"));
        assert!(!is_separator_row("| a | --- |"));
    }

    #[test]
    fn test_alignments() {
        assert_eq!(
            parse_alignments("| :--- | :---: | ---: | --- |"),
            vec![Alignment::Left, Alignment::Center, Alignment::Right, Alignment::Left]
        );
    }

    #[test]
    fn test_table_padding_and_alignment() {
        let doc = parse("| A | B | C |\n|---|---|---:|\n| 1 | 2 |\n\nafter");
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);

        let header = table.cell(0, 0).unwrap();
        assert!(header.paragraphs[0].runs.iter().all(|r| r.bold));
        assert_eq!(table.cell(1, 2).unwrap().text(), "");
        assert_eq!(table.cell(1, 2).unwrap().paragraphs.len(), 1);
        assert_eq!(
            table.cell(1, 2).unwrap().paragraphs[0].alignment,
            Some(Alignment::Right)
        );
        assert_eq!(table.cell(1, 0).unwrap().paragraphs[0].alignment, Some(Alignment::Left));

        // The blank line that ended the table is an empty paragraph
        assert!(paragraph(&doc, 1).runs.is_empty());
        assert_eq!(paragraph(&doc, 2).text(), "after");
    }

    #[test]
    fn test_wider_body_row_widens_table() {
        let doc = parse("| A |\n| --- |\n| 1 | 2 | 3 |");
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.column_count(), 3);
        // Alignment only where the separator has a token
        assert_eq!(table.cell(1, 0).unwrap().paragraphs[0].alignment, Some(Alignment::Left));
        assert_eq!(table.cell(1, 2).unwrap().paragraphs[0].alignment, None);
    }

    #[test]
    fn test_pipe_line_without_separator_is_text() {
        let doc = parse("a | b\nc | d");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(paragraph(&doc, 0).text(), "a | b c | d");
    }

    #[test]
    fn test_missing_image_placeholder() {
        let doc = parse("See ![diagram](img/missing.png) here");
        assert_eq!(paragraph(&doc, 0).text(), "[Image not found: img/missing.png]");
        assert!(doc.images.is_empty());
    }

    #[test]
    fn test_comments_never_reach_output() {
        let doc = parse("---\ntitle: x\n---\nVisible <!-- hidden --> text");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(paragraph(&doc, 0).text(), "Visible  text");
    }
}
