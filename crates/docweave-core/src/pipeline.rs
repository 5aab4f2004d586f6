//! Template merge pipeline for Markdown and `.docx` content
//!
//! Markdown content is compiled to a [`Document`] first; `.docx` content is
//! read from its package. Every content file is appended to the same
//! template in the order given, so figure numbers run through all of them.

use std::path::{Path, PathBuf};

use docweave_ast::Document;
use docweave_ooxml::{read_document_file, DocxWriter, MergeEngine, MergeOptions, MergeStats, Template};

use crate::error::{CompileError, Result};
use crate::Compiler;

/// Markdown extensions the pipeline compiles
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Package extensions the pipeline reads directly
pub const PACKAGE_EXTENSIONS: &[&str] = &["docx", "docm", "dotx"];

/// How a content file enters the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Markdown,
    Package,
}

impl ContentKind {
    /// Kind by file extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            Some(ContentKind::Markdown)
        } else if PACKAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(ContentKind::Package)
        } else {
            None
        }
    }
}

/// Pipeline options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Decorate pictures, both when compiling and when merging
    pub style_images: bool,
    /// Write each compiled Markdown file next to the output as `<stem>_from_md.docx`
    pub keep_intermediate: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            style_images: true,
            keep_intermediate: false,
        }
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub stats: MergeStats,
    /// Intermediate packages written for Markdown content
    pub intermediates: Vec<PathBuf>,
}

/// Merge content files into a template and save the result
///
/// All inputs are checked before anything is written.
pub fn merge_files<P: AsRef<Path>>(
    compiler: &Compiler,
    template_path: impl AsRef<Path>,
    content_paths: &[P],
    out_path: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<MergeReport> {
    let template_path = template_path.as_ref();
    let out_path = out_path.as_ref();

    if !template_path.exists() {
        return Err(docweave_ooxml::OoxmlError::TemplateNotFound(template_path.to_path_buf()).into());
    }
    if content_paths.is_empty() {
        return Err(CompileError::NoSources);
    }
    let mut inputs = Vec::with_capacity(content_paths.len());
    for path in content_paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(docweave_ooxml::OoxmlError::ContentNotFound(path.to_path_buf()).into());
        }
        let kind = ContentKind::from_path(path)
            .ok_or_else(|| CompileError::UnsupportedContent(path.to_path_buf()))?;
        inputs.push((path, kind));
    }

    let markdown_count = inputs
        .iter()
        .filter(|(_, kind)| *kind == ContentKind::Markdown)
        .count();
    let mut report = MergeReport::default();
    let mut documents: Vec<Document> = Vec::with_capacity(inputs.len());
    for (path, kind) in inputs {
        let document = match kind {
            ContentKind::Package => read_document_file(path)?,
            ContentKind::Markdown => {
                let document = compiler.compile_file(path)?;
                if options.keep_intermediate {
                    let ordinal = report.intermediates.len() + 1;
                    let intermediate = intermediate_path(out_path, ordinal, markdown_count);
                    DocxWriter::write_to_file(&document, &intermediate)?;
                    log::info!("wrote intermediate {}", intermediate.display());
                    report.intermediates.push(intermediate);
                }
                document
            }
        };
        documents.push(document);
    }

    let mut template = Template::load(template_path)?;
    let merge_options = MergeOptions {
        decorate_images: options.style_images,
    };
    let mut engine = MergeEngine::new(&mut template, &merge_options);
    for document in &documents {
        engine.append(document);
    }
    report.stats = engine.finish();
    template.save(out_path)?;

    log::info!(
        "merged {} content file(s) into {}: {} image(s) inserted, {} skipped",
        documents.len(),
        out_path.display(),
        report.stats.inserted_images,
        report.stats.skipped_images
    );
    Ok(report)
}

/// `<out stem>_from_md.docx`, numbered when several Markdown files are merged
pub fn intermediate_path(out_path: &Path, ordinal: usize, total: usize) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if total > 1 {
        format!("{}_from_md{}.docx", stem, ordinal)
    } else {
        format!("{}_from_md.docx", stem)
    };
    out_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind() {
        assert_eq!(ContentKind::from_path(Path::new("a.MD")), Some(ContentKind::Markdown));
        assert_eq!(ContentKind::from_path(Path::new("a.mdx")), Some(ContentKind::Markdown));
        assert_eq!(ContentKind::from_path(Path::new("a.dotx")), Some(ContentKind::Package));
        assert_eq!(ContentKind::from_path(Path::new("a.txt")), None);
        assert_eq!(ContentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_intermediate_path() {
        let out = Path::new("/out/report.docx");
        assert_eq!(intermediate_path(out, 1, 1), PathBuf::from("/out/report_from_md.docx"));
        assert_eq!(intermediate_path(out, 2, 3), PathBuf::from("/out/report_from_md2.docx"));
    }
}
