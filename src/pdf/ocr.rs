//! OCR fallback via the tesseract binary
//!
//! Pages are rendered to a scratch PNG and handed to `tesseract ... stdout`.
//! Page segmentation mode 6 ("assume a single uniform block of text") suits
//! the dense row/column layout of lab-report forms.

use crate::error::{Error, Result};
use crate::pdf::reader::render_page_to_png;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::Command;

/// OCR output for one page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageOcr {
    /// Page number (1-indexed)
    pub page: u32,
    /// Raw OCR text for the page
    pub text: String,
}

/// OCR engine configuration
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Tesseract language code (default "eng")
    pub language: String,
    /// Page segmentation mode (default 6, uniform text block)
    pub psm: u8,
    /// Render width in pixels before OCR (default 1600)
    pub render_width: u16,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            psm: 6,
            render_width: 1600,
        }
    }
}

/// Wrapper around the system tesseract binary
pub struct OcrEngine {
    options: OcrOptions,
}

impl OcrEngine {
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    /// Check whether the tesseract binary can be invoked
    pub fn available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// OCR a single page (1-indexed) of the given PDF bytes
    pub fn ocr_page(&self, data: &[u8], password: Option<&str>, page_num: u32) -> Result<PageOcr> {
        let png = render_page_to_png(data, password, page_num, self.options.render_width)?;
        let text = self.run_tesseract(&png)?;
        Ok(PageOcr {
            page: page_num,
            text,
        })
    }

    /// OCR every page of a document
    pub fn ocr_document(
        &self,
        data: &[u8],
        password: Option<&str>,
        page_count: u32,
    ) -> Result<Vec<PageOcr>> {
        let mut pages = Vec::with_capacity(page_count as usize);
        for page_num in 1..=page_count {
            pages.push(self.ocr_page(data, password, page_num)?);
        }
        Ok(pages)
    }

    fn run_tesseract(&self, png: &[u8]) -> Result<String> {
        let mut input = tempfile::Builder::new()
            .prefix("pdf-tabular-ocr-")
            .suffix(".png")
            .tempfile()?;
        input.write_all(png)?;
        input.flush()?;

        let output = Command::new("tesseract")
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.language)
            .arg("--psm")
            .arg(self.options.psm.to_string())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::OcrUnavailable
                } else {
                    Error::Ocr {
                        reason: format!("failed to invoke tesseract: {}", e),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(Error::Ocr {
                reason: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_pipeline_defaults() {
        let opts = OcrOptions::default();
        assert_eq!(opts.language, "eng");
        assert_eq!(opts.psm, 6);
        assert_eq!(opts.render_width, 1600);
    }

    #[test]
    fn test_ocr_rejects_invalid_pdf() {
        let engine = OcrEngine::new(OcrOptions::default());
        let result = engine.ocr_page(b"not a pdf", None, 1);
        assert!(result.is_err());
    }
}
