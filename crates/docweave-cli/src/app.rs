//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;

use docweave_core::config::{install_global_image_dirs, Settings};
use docweave_core::{Compiler, PipelineOptions};
use docweave_ooxml::{DocxWriter, TemplateMetadata};
use docweave_pdf::{OfficeRenderer, PdfRenderer};

/// Output format for template metadata
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum MetadataFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "docweave")]
#[command(author, version, about = "Markdown and Word content, merged into corporate templates", long_about = None)]
struct Cli {
    /// Configuration file (default: docweave.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Markdown files into a standalone DOCX
    Compile {
        /// Input Markdown files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output DOCX file (default: first input with .docx extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the border and shadow on pictures
        #[arg(long)]
        no_image_style: bool,
    },

    /// Merge Markdown or DOCX content into a template
    Merge {
        /// Template DOCX/DOTX file
        #[arg(short, long)]
        template: PathBuf,

        /// Content files (.md, .markdown, .mdx, .docx, .docm, .dotx) or glob patterns
        #[arg(required = true)]
        contents: Vec<String>,

        /// Output DOCX file
        #[arg(short, long)]
        output: PathBuf,

        /// Skip the border and shadow on pictures
        #[arg(long)]
        no_image_style: bool,

        /// Keep the DOCX compiled from Markdown content
        #[arg(long)]
        keep_intermediate: bool,

        /// Also render the merged document to this PDF
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Render a DOCX file to PDF
    Pdf {
        /// Input DOCX file
        input: PathBuf,

        /// Output PDF file (default: input with .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds before the conversion is abandoned
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Report whether a PDF engine is available
    Engine {
        /// Probe again instead of using the cached result
        #[arg(long)]
        recheck: bool,
    },

    /// Show a template's revision metadata
    Metadata {
        /// Template DOCX/DOTX file
        template: PathBuf,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: MetadataFormat,
    },
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let settings = load_settings(cli.config.as_deref(), &cwd)?;
    install_global_image_dirs(settings.images.global_dirs.clone());

    match cli.command {
        Commands::Compile {
            inputs,
            output,
            no_image_style,
        } => {
            let inputs = expand_inputs(&inputs)?;
            let style_images = settings.compile.style_images && !no_image_style;
            compile_command(&Compiler::new().with_style_images(style_images), &inputs, output.as_deref())?;
        }
        Commands::Merge {
            template,
            contents,
            output,
            no_image_style,
            keep_intermediate,
            pdf,
        } => {
            let contents = expand_inputs(&contents)?;
            let options = PipelineOptions {
                style_images: settings.compile.style_images && !no_image_style,
                keep_intermediate,
            };
            let compiler = Compiler::new().with_style_images(options.style_images);
            merge_command(&compiler, &template, &contents, &output, &options)?;
            if let Some(pdf) = pdf {
                pdf_command(&output, Some(&pdf), &settings, None)
                    .with_context(|| format!("Merged document kept at {}", output.display()))?;
            }
        }
        Commands::Pdf {
            input,
            output,
            timeout,
        } => {
            pdf_command(&input, output.as_deref(), &settings, timeout)?;
        }
        Commands::Engine { recheck } => {
            engine_command(&settings, recheck);
        }
        Commands::Metadata { template, format } => {
            metadata_command(&template, format)?;
        }
    }

    Ok(())
}

/// Logging on stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// `--config`, else `docweave.toml` in `cwd`, else defaults
pub fn load_settings(config: Option<&Path>, cwd: &Path) -> Result<Settings> {
    let settings = Settings::discover(config, cwd).context("Failed to load configuration")?;
    tracing::debug!(
        image_dirs = settings.images.global_dirs.len(),
        pdf_timeout = settings.pdf.timeout_secs,
        style_images = settings.compile.style_images,
        "configuration loaded"
    );
    Ok(settings)
}

/// Expand glob patterns; plain paths are kept as given
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            inputs.push(PathBuf::from(pattern));
            continue;
        }
        let mut matched: Vec<PathBuf> = glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        if matched.is_empty() {
            bail!("No files match: {}", pattern);
        }
        matched.sort();
        inputs.append(&mut matched);
    }
    Ok(inputs)
}

/// Execute the compile command
pub fn compile_command(compiler: &Compiler, inputs: &[PathBuf], output: Option<&Path>) -> Result<PathBuf> {
    println!("docweave v{}", docweave_core::VERSION);
    let Some(first) = inputs.first() else {
        bail!("No input files given");
    };
    for input in inputs {
        println!("Compiling: {}", input.display());
    }

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => first.with_extension("docx"),
    };

    let doc = compiler
        .compile_files(inputs)
        .context("Failed to compile Markdown")?;

    println!("Writing: {}", output_path.display());
    DocxWriter::write_to_file(&doc, &output_path)
        .with_context(|| format!("Failed to write DOCX file: {}", output_path.display()))?;

    println!();
    println!("Compile complete!");
    println!("  {} blocks, {} image(s)", doc.blocks.len(), doc.images.len());
    Ok(output_path)
}

/// Execute the merge command
pub fn merge_command(
    compiler: &Compiler,
    template: &Path,
    contents: &[PathBuf],
    output: &Path,
    options: &PipelineOptions,
) -> Result<docweave_core::MergeReport> {
    println!("docweave v{}", docweave_core::VERSION);
    println!("Template: {}", template.display());
    for content in contents {
        println!("Merging: {}", content.display());
    }

    let report = docweave_core::merge_files(compiler, template, contents, output, options)
        .context("Merge failed")?;

    for intermediate in &report.intermediates {
        println!("  Created: {}", intermediate.display());
    }
    println!("Writing: {}", output.display());
    println!();
    println!("Merge complete!");
    println!("  Inserted images: {}", report.stats.inserted_images);
    println!("  Skipped images:  {}", report.stats.skipped_images);
    Ok(report)
}

/// Execute the pdf command
pub fn pdf_command(
    input: &Path,
    output: Option<&Path>,
    settings: &Settings,
    timeout_secs: Option<u64>,
) -> Result<PathBuf> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension("pdf"),
    };
    let timeout = Duration::from_secs(timeout_secs.unwrap_or(settings.pdf.timeout_secs));
    println!("Rendering PDF: {}", output_path.display());

    let written = match &settings.pdf.soffice {
        Some(soffice) => {
            let renderer = OfficeRenderer::new()
                .with_executable(soffice)
                .with_timeout(timeout);
            docweave_pdf::render_with(&renderer, input, &output_path)
        }
        None => docweave_pdf::docx_to_pdf(input, &output_path, timeout),
    }
    .context("PDF conversion failed")?;

    println!("  Created: {}", written.display());
    Ok(written)
}

/// Execute the engine command
pub fn engine_command(settings: &Settings, recheck: bool) -> docweave_pdf::EngineStatus {
    let status = match &settings.pdf.soffice {
        Some(soffice) => docweave_pdf::probe(&OfficeRenderer::new().with_executable(soffice)),
        None if recheck => docweave_pdf::redetect(),
        None => docweave_pdf::detect_engine(),
    };

    let renderer = OfficeRenderer::new();
    if status.available {
        println!("PDF engine ({}): available, {}", renderer.name(), status.detail);
    } else {
        println!("PDF engine ({}): unavailable, {}", renderer.name(), status.detail);
    }
    status
}

/// Execute the metadata command
pub fn metadata_command(template: &Path, format: MetadataFormat) -> Result<TemplateMetadata> {
    let meta = TemplateMetadata::from_file(template)
        .with_context(|| format!("Failed to read template: {}", template.display()))?;

    match format {
        MetadataFormat::Text => print!("{}", format_metadata(&meta)),
        MetadataFormat::Json => println!("{}", meta.to_json()?),
    }
    Ok(meta)
}

/// Labelled lines, one per field
pub fn format_metadata(meta: &TemplateMetadata) -> String {
    let fields = [
        ("Template", &meta.template_name),
        ("Version", &meta.version),
        ("Author", &meta.author),
        ("Issued", &meta.issued_date),
        ("Description", &meta.description),
        ("Total pages", &meta.total_pages),
    ];
    fields
        .iter()
        .map(|(label, value)| {
            let value = if value.is_empty() { "-" } else { value.as_str() };
            format!("{:<12} {}\n", format!("{}:", label), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_arguments() {
        let cli = Cli::try_parse_from([
            "docweave",
            "-v",
            "merge",
            "--template",
            "corp.dotx",
            "a.md",
            "b.docx",
            "-o",
            "out.docx",
            "--pdf",
            "out.pdf",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Merge {
            contents, pdf, keep_intermediate, ..
        } = cli.command
        else {
            panic!("expected merge");
        };
        assert_eq!(contents, vec!["a.md", "b.docx"]);
        assert_eq!(pdf, Some(PathBuf::from("out.pdf")));
        assert!(!keep_intermediate);
    }

    #[test]
    fn test_load_settings_from_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("docweave.toml"),
            "[pdf]\ntimeout_secs = 30\n[compile]\nstyle_images = false\n",
        )
        .unwrap();

        let settings = load_settings(None, dir.path()).unwrap();
        assert_eq!(settings.pdf.timeout_secs, 30);
        assert!(!settings.compile.style_images);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[pdf\n").unwrap();
        let err = load_settings(Some(bad.as_path()), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[test]
    fn test_compile_requires_input() {
        assert!(Cli::try_parse_from(["docweave", "compile"]).is_err());
    }

    #[test]
    fn test_format_metadata_marks_missing_fields() {
        let meta = TemplateMetadata {
            version: "2".to_string(),
            template_name: "corp.dotx".to_string(),
            ..Default::default()
        };
        let text = format_metadata(&meta);
        assert!(text.starts_with("Template:    corp.dotx\n"));
        assert!(text.contains("Author:      -\n"));
    }
}
