//! Command-line surface

use crate::pdf::OcrOptions;
use crate::pipeline::{run_lab, run_ocr_batch, run_ocr_file, run_tables, ExtractOptions};
use crate::source::scan_directory;
use crate::store::write_json;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pdf-tabular",
    version,
    about = "Extract tabular data from lab-report PDFs into JSON and SQLite"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Clone)]
pub struct OcrArgs {
    /// Tesseract language code
    #[arg(long, default_value = "eng")]
    pub lang: String,
    /// Tesseract page segmentation mode
    #[arg(long, default_value_t = 6)]
    pub psm: u8,
    /// Render width in pixels before OCR
    #[arg(long, default_value_t = 1600)]
    pub width: u16,
}

impl From<&OcrArgs> for OcrOptions {
    fn from(args: &OcrArgs) -> Self {
        Self {
            language: args.lang.clone(),
            psm: args.psm,
            render_width: args.width,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract tables from a PDF into JSON and/or a SQLite database
    Tables {
        /// PDF file path or URL
        source: String,
        /// Page selection, e.g. "1-5,10"
        #[arg(long)]
        pages: Option<String>,
        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
        /// JSON output path
        #[arg(long, default_value = "extracted_tables.json")]
        json: PathBuf,
        /// SQLite database path (pass --db with no value for the default)
        #[arg(long, num_args = 0..=1, default_missing_value = "extracted_tables.db")]
        db: Option<PathBuf>,
        /// OCR pages that have no text layer
        #[arg(long)]
        ocr_fallback: bool,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// OCR a PDF or a folder of PDFs into a combined JSON document
    Ocr {
        /// PDF file or directory of PDFs
        input: PathBuf,
        /// JSON output path
        #[arg(long, default_value = "extracted_tables/extracted_tables.json")]
        output: PathBuf,
        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Parse a PDF as a lab report into structured result fields
    Lab {
        /// PDF file path or URL
        source: String,
        /// Page selection, e.g. "1-5,10"
        #[arg(long)]
        pages: Option<String>,
        /// Password for encrypted PDFs
        #[arg(long)]
        password: Option<String>,
        /// JSON output path
        #[arg(long, default_value = "lab_fields.json")]
        json: PathBuf,
        /// OCR pages that have no text layer
        #[arg(long)]
        ocr_fallback: bool,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// List PDF files in a directory
    List {
        /// Directory to search
        directory: PathBuf,
        /// Search subdirectories recursively
        #[arg(long)]
        recursive: bool,
        /// Filename glob, e.g. "report*.pdf"
        #[arg(long)]
        pattern: Option<String>,
    },
}

/// Run the parsed command to completion
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Tables {
            source,
            pages,
            password,
            json,
            db,
            ocr_fallback,
            ocr,
        } => {
            let opts = ExtractOptions {
                pages,
                password,
                ocr_fallback,
                ocr: OcrOptions::from(&ocr),
            };
            let run = run_tables(&source, &opts, Some(json.as_path()), db.as_deref()).await?;
            println!(
                "{}: {} table(s) extracted ({} page(s) via OCR)",
                run.source,
                run.records.len(),
                run.ocr_pages
            );
        }
        Command::Ocr {
            input,
            output,
            password,
            ocr,
        } => {
            let options = OcrOptions::from(&ocr);
            let summary = if input.is_dir() {
                run_ocr_batch(&input, &output, password.as_deref(), &options)?
            } else {
                run_ocr_file(&input, &output, password.as_deref(), &options)?
            };
            println!(
                "{} file(s) processed, {} failed, {} page(s) OCR'd -> {}",
                summary.files_processed,
                summary.files_failed,
                summary.pages,
                output.display()
            );
        }
        Command::Lab {
            source,
            pages,
            password,
            json,
            ocr_fallback,
            ocr,
        } => {
            let opts = ExtractOptions {
                pages,
                password,
                ocr_fallback,
                ocr: OcrOptions::from(&ocr),
            };
            let fields = run_lab(&source, &opts).await?;
            write_json(&json, &fields)?;
            println!("{} field(s) parsed -> {}", fields.len(), json.display());
        }
        Command::List {
            directory,
            recursive,
            pattern,
        } => {
            let files = scan_directory(&directory, recursive, pattern.as_deref())?;
            for file in &files {
                println!(
                    "{}\t{} bytes\t{}",
                    file.path.display(),
                    file.size,
                    file.modified.as_deref().unwrap_or("-")
                );
            }
            println!("{} PDF file(s)", files.len());
        }
    }

    Ok(())
}
