//! pdf-tabular library
//!
//! Batch extraction of tabular data from lab-report style PDFs:
//! - `tables`: rebuild tables from the text layer and persist them as JSON
//!   and/or SQLite rows
//! - `ocr`: tesseract fallback for scanned pages, bulk mode over folders
//! - `lab`: lab-report field parsing (column aliases + regex line splitting)

pub mod cli;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod pipeline;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use extract::{LabField, TableRecord};
pub use pipeline::{extract_tables, run_lab, run_ocr_batch, run_tables, ExtractOptions, TablesRun};
