//! The batch jobs
//!
//! Sequential, one source at a time. A failed file in bulk mode is logged
//! and skipped; the run carries on with the rest.

use crate::error::{Error, Result};
use crate::extract::{
    fields_from_record, parse_lab_text, shape_ocr_table, shape_table, LabField, TableRecord,
};
use crate::pdf::{
    detect_tables, parse_page_range, table_from_ocr_text, OcrEngine, OcrOptions, PageOcr,
    PdfReader,
};
use crate::source::{resolve_source, scan_directory};
use crate::store::{write_json, TableStore};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for a table-extraction run
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Page selection (e.g. "1-5,10"); all pages when absent
    pub pages: Option<String>,
    /// Password for encrypted PDFs
    pub password: Option<String>,
    /// OCR pages that have no text layer
    pub ocr_fallback: bool,
    /// OCR engine settings used by the fallback
    pub ocr: OcrOptions,
}

/// Outcome of extracting one source
#[derive(Debug)]
pub struct TablesRun {
    /// Resolved source name (path or URL)
    pub source: String,
    /// Shaped records, in page order
    pub records: Vec<TableRecord>,
    /// Pages that went through the OCR fallback
    pub ocr_pages: u32,
}

/// Extract and shape every table in one source.
///
/// Pages without a text layer are skipped unless `ocr_fallback` is set, in
/// which case each contributes a single pseudo-table keyed by line position.
/// Table indexes restart at 1 on every page.
pub async fn extract_tables(source: &str, opts: &ExtractOptions) -> Result<TablesRun> {
    let resolved = resolve_source(source).await?;
    let reader = PdfReader::open_bytes(&resolved.data, opts.password.as_deref())?;

    let pages = match &opts.pages {
        Some(range) => parse_page_range(range, reader.page_count())?,
        None => (1..=reader.page_count()).collect(),
    };

    let mut records = Vec::new();
    let mut ocr_pages = 0u32;
    let ocr_engine = OcrEngine::new(opts.ocr.clone());

    for page_num in pages {
        if reader.is_scanned_page(page_num)? {
            if !opts.ocr_fallback {
                debug!(page = page_num, "no text layer, OCR fallback disabled; skipping");
                continue;
            }
            if !OcrEngine::available() {
                return Err(Error::OcrUnavailable);
            }

            let ocr = ocr_engine.ocr_page(reader.data(), opts.password.as_deref(), page_num)?;
            ocr_pages += 1;
            if let Some(raw) = table_from_ocr_text(page_num, &ocr.text) {
                records.push(shape_ocr_table(&raw, 1));
            }
            continue;
        }

        let layout = reader.page_layout(page_num)?;
        let raws = detect_tables(layout, page_num);
        debug!(page = page_num, tables = raws.len(), "detected tables");

        for (i, raw) in raws.iter().enumerate() {
            records.push(shape_table(raw, i as u32 + 1));
        }
    }

    info!(
        source = %resolved.source_name,
        records = records.len(),
        ocr_pages,
        "extraction complete"
    );

    Ok(TablesRun {
        source: resolved.source_name,
        records,
        ocr_pages,
    })
}

/// Extract one source and persist the records to JSON and/or SQLite
pub async fn run_tables(
    source: &str,
    opts: &ExtractOptions,
    json_path: Option<&Path>,
    db_path: Option<&Path>,
) -> Result<TablesRun> {
    let run = extract_tables(source, opts).await?;

    if let Some(path) = json_path {
        write_json(path, &run.records)?;
        info!(path = %path.display(), "wrote JSON output");
    }

    if let Some(path) = db_path {
        let store = TableStore::open(path)?;
        let inserted = store.insert_records(&run.source, &run.records)?;
        info!(path = %path.display(), rows = inserted, "stored records");
    }

    Ok(run)
}

/// Outcome of a bulk OCR run over a folder
#[derive(Debug, Default)]
pub struct OcrBatchSummary {
    /// Files successfully processed
    pub files_processed: usize,
    /// Files skipped after an error
    pub files_failed: usize,
    /// Total pages OCR'd
    pub pages: usize,
}

/// OCR every PDF in `dir` into one combined JSON document keyed by filename.
/// Per-file failures are logged and skipped.
pub fn run_ocr_batch(
    dir: &Path,
    output: &Path,
    password: Option<&str>,
    ocr: &OcrOptions,
) -> Result<OcrBatchSummary> {
    if !OcrEngine::available() {
        return Err(Error::OcrUnavailable);
    }

    let files = scan_directory(dir, false, None)?;
    let engine = OcrEngine::new(ocr.clone());

    let mut documents: BTreeMap<String, Vec<PageOcr>> = BTreeMap::new();
    let mut summary = OcrBatchSummary::default();

    for file in files {
        match ocr_one_file(&engine, &file.path, password) {
            Ok(pages) => {
                summary.files_processed += 1;
                summary.pages += pages.len();
                documents.insert(file.name, pages);
            }
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "skipping file");
                summary.files_failed += 1;
            }
        }
    }

    write_json(output, &documents)?;
    info!(
        path = %output.display(),
        files = summary.files_processed,
        pages = summary.pages,
        "wrote OCR output"
    );

    Ok(summary)
}

fn ocr_one_file(engine: &OcrEngine, path: &Path, password: Option<&str>) -> Result<Vec<PageOcr>> {
    let reader = PdfReader::open(path, password)?;
    engine.ocr_document(reader.data(), password, reader.page_count())
}

/// OCR a single PDF into the same filename-keyed JSON document shape as
/// [`run_ocr_batch`], so one file and a folder produce interchangeable output
pub fn run_ocr_file(
    path: &Path,
    output: &Path,
    password: Option<&str>,
    ocr: &OcrOptions,
) -> Result<OcrBatchSummary> {
    if !OcrEngine::available() {
        return Err(Error::OcrUnavailable);
    }

    let engine = OcrEngine::new(ocr.clone());
    let pages = ocr_one_file(&engine, path, password)?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.pdf")
        .to_string();

    let mut documents: BTreeMap<String, Vec<PageOcr>> = BTreeMap::new();
    let summary = OcrBatchSummary {
        files_processed: 1,
        files_failed: 0,
        pages: pages.len(),
    };
    documents.insert(name, pages);

    write_json(output, &documents)?;
    info!(path = %output.display(), pages = summary.pages, "wrote OCR output");

    Ok(summary)
}

/// Parse one source as a lab report.
///
/// Tables whose headers match the lab column aliases are read column-wise;
/// pages that yield no such table fall back to regex line splitting of the
/// page text (OCR'd when the page is scanned).
pub async fn run_lab(source: &str, opts: &ExtractOptions) -> Result<Vec<LabField>> {
    let resolved = resolve_source(source).await?;
    let reader = PdfReader::open_bytes(&resolved.data, opts.password.as_deref())?;

    let pages = match &opts.pages {
        Some(range) => parse_page_range(range, reader.page_count())?,
        None => (1..=reader.page_count()).collect(),
    };

    let ocr_engine = OcrEngine::new(opts.ocr.clone());
    let mut fields = Vec::new();

    for page_num in pages {
        if reader.is_scanned_page(page_num)? {
            if !opts.ocr_fallback {
                debug!(page = page_num, "no text layer, OCR fallback disabled; skipping");
                continue;
            }
            if !OcrEngine::available() {
                return Err(Error::OcrUnavailable);
            }
            let ocr = ocr_engine.ocr_page(reader.data(), opts.password.as_deref(), page_num)?;
            fields.extend(parse_lab_text(&ocr.text));
            continue;
        }

        let layout = reader.page_layout(page_num)?;
        let mut matched_on_page = false;

        for (i, raw) in detect_tables(layout, page_num).iter().enumerate() {
            let record = shape_table(raw, i as u32 + 1);
            if let Some(table_fields) = fields_from_record(&record) {
                matched_on_page = true;
                fields.extend(table_fields);
            }
        }

        if !matched_on_page {
            fields.extend(parse_lab_text(&reader.page_text(page_num)?));
        }
    }

    info!(source = %resolved.source_name, fields = fields.len(), "lab parse complete");
    Ok(fields)
}
