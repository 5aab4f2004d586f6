//! docweave-core - Markdown to Word, merged into corporate templates
//!
//! Compiles a constrained Markdown dialect (headings, bullets, pipe tables,
//! images, `**bold**`) into a [`Document`], and drives the template merge
//! pipeline for Markdown and `.docx` content.
//!
//! # Example
//!
//! ```
//! use docweave_ast::Block;
//! use docweave_core::Compiler;
//!
//! let doc = Compiler::new().compile("## Scope\n\n- first\n- second", None);
//! let Block::Paragraph(heading) = &doc.blocks[0] else { panic!() };
//! assert_eq!(heading.style.as_deref(), Some("Heading 2"));
//! assert_eq!(heading.text(), "Scope");
//! ```

pub mod config;
pub mod error;
pub mod images;
pub mod parser;
pub mod pipeline;
pub mod strip;

use std::path::{Path, PathBuf};

use docweave_ast::Document;

pub use config::Settings;
pub use error::{CompileError, Result};
pub use images::{ImageRendering, ImageResolver, PlaceholderReason};
pub use parser::Parser;
pub use pipeline::{merge_files, ContentKind, MergeReport, PipelineOptions};
pub use strip::strip_hidden;

/// Most Markdown files one compile accepts
pub const MAX_SOURCES: usize = 20;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Markdown compiler with its image search configuration
#[derive(Debug, Clone)]
pub struct Compiler {
    image_dirs: Option<Vec<PathBuf>>,
    cwd: Option<PathBuf>,
    style_images: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Compiler using the installed global image directories
    pub fn new() -> Self {
        Self {
            image_dirs: None,
            cwd: None,
            style_images: true,
        }
    }

    /// Search these directories instead of the installed global ones
    pub fn with_image_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.image_dirs = Some(dirs);
        self
    }

    /// Resolve images against a fixed working directory
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Border and shadow on compiled pictures
    pub fn with_style_images(mut self, style_images: bool) -> Self {
        self.style_images = style_images;
        self
    }

    pub fn style_images(&self) -> bool {
        self.style_images
    }

    /// Compile Markdown text; images are resolved from `base_dir` first
    pub fn compile(&self, source: &str, base_dir: Option<&Path>) -> Document {
        let dirs = self
            .image_dirs
            .as_deref()
            .unwrap_or_else(|| config::global_image_dirs());
        let mut resolver = ImageResolver::new(base_dir, dirs);
        if let Some(cwd) = &self.cwd {
            resolver = resolver.with_cwd(cwd.clone());
        }
        Parser::new(&resolver, self.style_images).parse(source)
    }

    /// Compile one Markdown file, resolving images from its directory
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        self.compile_files(&[path.as_ref()])
    }

    /// Compile several Markdown files as one document
    ///
    /// Files are joined with a blank line; images resolve from the first
    /// file's directory.
    pub fn compile_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Document> {
        if paths.is_empty() {
            return Err(CompileError::NoSources);
        }
        if paths.len() > MAX_SOURCES {
            return Err(CompileError::TooManySources {
                count: paths.len(),
                max: MAX_SOURCES,
            });
        }

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(CompileError::SourceNotFound(path.to_path_buf()));
            }
            log::debug!("reading {}", path.display());
            sources.push(std::fs::read_to_string(path)?);
        }

        let base_dir = paths[0].as_ref().parent();
        Ok(self.compile(&sources.join("\n\n"), base_dir))
    }
}

/// Compile Markdown text with the installed global image directories
pub fn compile(source: &str, base_dir: Option<&Path>, style_images: bool) -> Document {
    Compiler::new()
        .with_style_images(style_images)
        .compile(source, base_dir)
}

/// Compile a Markdown file with the installed global image directories
pub fn compile_file(path: impl AsRef<Path>, style_images: bool) -> Result<Document> {
    Compiler::new()
        .with_style_images(style_images)
        .compile_file(path)
}

/// Compile up to [`MAX_SOURCES`] Markdown files as one document
pub fn compile_files<P: AsRef<Path>>(paths: &[P], style_images: bool) -> Result<Document> {
    Compiler::new()
        .with_style_images(style_images)
        .compile_files(paths)
}
