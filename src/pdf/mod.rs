//! PDF processing layer
//!
//! Document access via PDFium, table reconstruction from positioned text,
//! and the tesseract OCR fallback for scanned pages.

pub mod ocr;
pub mod reader;
pub mod tables;

pub use ocr::{OcrEngine, OcrOptions, PageOcr};
pub use reader::{parse_page_range, render_page_to_png, LineInfo, PageLayout, PdfReader, PositionedChar};
pub use tables::{detect_tables, table_from_ocr_text, RawTable};
