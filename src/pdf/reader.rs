//! PDF reader wrapper for PDFium
//!
//! Loads a document once and captures per-page character positions up front.
//! Everything downstream (text output, table reconstruction, the scanned-page
//! heuristic) works from that positioned data.

use crate::error::{Error, Result};
use pdfium_render::prelude::*;
use std::path::Path;

/// A page is treated as scanned (image-only) below this many text-layer chars.
const SCANNED_PAGE_CHAR_THRESHOLD: usize = 8;

/// A single positioned character from the text layer
#[derive(Debug, Clone)]
pub struct PositionedChar {
    /// The character
    pub ch: char,
    /// X coordinate (left)
    pub x: f32,
    /// Character width
    pub width: f32,
    /// Character height (used for font size estimation)
    pub height: f32,
}

/// Characters grouped into a visual line
#[derive(Debug, Clone)]
pub struct LineInfo {
    /// Characters in this line, sorted by X
    pub chars: Vec<PositionedChar>,
    /// Y coordinate of the line (top)
    pub y: f32,
    /// Average character height (font size proxy)
    pub avg_height: f32,
    /// Minimum X coordinate (leftmost character)
    pub min_x: f32,
    /// Maximum X coordinate (rightmost character)
    pub max_x: f32,
}

impl LineInfo {
    /// Concatenate the line's characters, inserting a space where the
    /// horizontal gap between neighbours exceeds `space_threshold`.
    pub fn text(&self, space_threshold: f32) -> String {
        let mut out = String::new();
        let mut prev_end: Option<f32> = None;
        for c in &self.chars {
            if let Some(end) = prev_end {
                if c.x - end > space_threshold && c.ch != ' ' {
                    out.push(' ');
                }
            }
            out.push(c.ch);
            prev_end = Some(c.x + c.width);
        }
        out
    }
}

/// Positioned content of one page
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Lines in top-to-bottom order
    pub lines: Vec<LineInfo>,
    /// Word-gap threshold derived from the page's median glyph height
    pub space_threshold: f32,
}

impl PageLayout {
    /// Total number of text-layer characters on the page
    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.chars.len()).sum()
    }
}

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    // Try to bind to system library or use static linking
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

fn validate_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// PDF reader using PDFium
pub struct PdfReader {
    data: Vec<u8>,
    page_count: u32,
    layouts: Vec<PageLayout>,
}

impl PdfReader {
    /// Open a PDF from a file path
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        Self::open_bytes(&data, password)
    }

    /// Open a PDF from bytes and capture every page's positioned characters
    pub fn open_bytes(data: &[u8], password: Option<&str>) -> Result<Self> {
        validate_header(data)?;

        let pdfium = create_pdfium()?;

        let document = match password {
            Some(pwd) => pdfium.load_pdf_from_byte_slice(data, Some(pwd)),
            None => pdfium.load_pdf_from_byte_slice(data, None),
        }
        .map_err(map_pdfium_error)?;

        let pages = document.pages();
        let page_count = pages.len() as u32;
        let mut layouts = Vec::with_capacity(page_count as usize);

        for index in 0..pages.len() {
            let page = pages.get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })?;
            layouts.push(Self::capture_page_layout(&page));
        }

        Ok(Self {
            data: data.to_vec(),
            page_count,
            layouts,
        })
    }

    fn capture_page_layout(page: &PdfPage) -> PageLayout {
        let width = page.width().value;
        let height = page.height().value;

        let chars = match page.text() {
            Ok(text_obj) => Self::collect_chars(&text_obj),
            Err(_) => Vec::new(),
        };

        let (y_tolerance, space_threshold) = Self::calculate_thresholds(&chars);
        let lines = Self::group_into_lines(chars, y_tolerance);

        PageLayout {
            width,
            height,
            lines,
            space_threshold,
        }
    }

    /// Collect character information from page text, with positions
    fn collect_chars(text_obj: &PdfPageText) -> Vec<(char, f32, f32, f32, f32)> {
        let mut chars = Vec::new();

        for segment in text_obj.segments().iter() {
            if let Ok(char_iter) = segment.chars() {
                for char_result in char_iter.iter() {
                    if let Some(c) = char_result.unicode_char() {
                        if let Ok(bounds) = char_result.loose_bounds() {
                            chars.push((
                                c,
                                bounds.left().value,
                                bounds.top().value,
                                bounds.width().value,
                                bounds.height().value,
                            ));
                        }
                    }
                }
            }
        }

        chars
    }

    /// Calculate line-grouping and word-gap thresholds from the median glyph
    /// height, so dense lab forms and sparse cover pages both group sanely.
    fn calculate_thresholds(chars: &[(char, f32, f32, f32, f32)]) -> (f32, f32) {
        let mut heights: Vec<f32> = chars
            .iter()
            .filter(|c| c.4 > 0.0)
            .map(|c| c.4)
            .collect();

        if heights.is_empty() {
            return (5.0, 10.0);
        }

        heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_height = heights[heights.len() / 2];

        let y_tolerance = median_height * 0.4;
        let space_threshold = median_height * 0.3;

        (y_tolerance.max(2.0), space_threshold.max(3.0))
    }

    /// Group characters into lines based on Y-coordinate proximity
    fn group_into_lines(mut chars: Vec<(char, f32, f32, f32, f32)>, y_tolerance: f32) -> Vec<LineInfo> {
        if chars.is_empty() {
            return Vec::new();
        }

        // Sort by Y descending (top to bottom), then X ascending
        chars.sort_by(|a, b| {
            let y_cmp = b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal);
            if y_cmp == std::cmp::Ordering::Equal {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                y_cmp
            }
        });

        let mut lines: Vec<LineInfo> = Vec::new();
        let mut current: Vec<(char, f32, f32, f32, f32)> = Vec::new();
        let mut current_y: Option<f32> = None;

        for c in chars {
            match current_y {
                Some(cur_y) if (cur_y - c.2).abs() <= y_tolerance => {
                    current.push(c);
                }
                _ => {
                    if !current.is_empty() {
                        lines.push(Self::create_line_info(std::mem::take(&mut current)));
                    }
                    current_y = Some(c.2);
                    current.push(c);
                }
            }
        }

        if !current.is_empty() {
            lines.push(Self::create_line_info(current));
        }

        lines
    }

    fn create_line_info(mut chars: Vec<(char, f32, f32, f32, f32)>) -> LineInfo {
        chars.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let avg_height = if chars.is_empty() {
            0.0
        } else {
            chars.iter().map(|c| c.4).sum::<f32>() / chars.len() as f32
        };
        let min_x = chars.iter().map(|c| c.1).fold(f32::MAX, f32::min);
        let max_x = chars.iter().map(|c| c.1 + c.3).fold(f32::MIN, f32::max);
        let y = chars.first().map(|c| c.2).unwrap_or(0.0);

        LineInfo {
            chars: chars
                .into_iter()
                .map(|c| PositionedChar {
                    ch: c.0,
                    x: c.1,
                    width: c.3,
                    height: c.4,
                })
                .collect(),
            y,
            avg_height,
            min_x,
            max_x,
        }
    }

    /// Get the number of pages
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Raw document bytes (for rendering/OCR passes over the same document)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Positioned layout for a specific page (1-indexed)
    pub fn page_layout(&self, page_num: u32) -> Result<&PageLayout> {
        if page_num < 1 || page_num > self.page_count {
            return Err(Error::PageOutOfBounds {
                page: page_num,
                total: self.page_count,
            });
        }
        Ok(&self.layouts[(page_num - 1) as usize])
    }

    /// Layout-ordered text for a specific page (1-indexed)
    pub fn page_text(&self, page_num: u32) -> Result<String> {
        let layout = self.page_layout(page_num)?;
        let mut out = String::new();
        for line in &layout.lines {
            out.push_str(&line.text(layout.space_threshold));
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }

    /// True when the page has no usable text layer and should be OCR'd
    pub fn is_scanned_page(&self, page_num: u32) -> Result<bool> {
        let layout = self.page_layout(page_num)?;
        Ok(layout.char_count() < SCANNED_PAGE_CHAR_THRESHOLD)
    }
}

/// Render one page (1-indexed) as PNG bytes at the given pixel width.
/// Used by the OCR fallback; form data and annotations are rendered so
/// filled-in forms survive rasterization.
pub fn render_page_to_png(
    data: &[u8],
    password: Option<&str>,
    page_num: u32,
    target_width: u16,
) -> Result<Vec<u8>> {
    validate_header(data)?;

    let pdfium = create_pdfium()?;

    let document = match password {
        Some(pwd) => pdfium.load_pdf_from_byte_slice(data, Some(pwd)),
        None => pdfium.load_pdf_from_byte_slice(data, None),
    }
    .map_err(map_pdfium_error)?;

    let pages = document.pages();
    let page_count = pages.len() as u32;

    if page_num < 1 || page_num > page_count {
        return Err(Error::PageOutOfBounds {
            page: page_num,
            total: page_count,
        });
    }

    let page_index = page_num - 1;
    let page = pages.get(page_index as u16).map_err(|e| Error::Pdfium {
        reason: format!("Failed to get page {}: {}", page_num, e),
    })?;

    let config = PdfRenderConfig::new()
        .set_target_width(target_width as i32)
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page.render_with_config(&config).map_err(|e| Error::Pdfium {
        reason: format!("Failed to render page {}: {}", page_num, e),
    })?;

    let dynamic_image = bitmap.as_image();

    let mut png_bytes = Vec::new();
    dynamic_image
        .write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to encode page {} as PNG: {}", page_num, e),
        })?;

    Ok(png_bytes)
}

/// Parse page range string (e.g., "1-5,10,15-20")
pub fn parse_page_range(range: &str, max_pages: u32) -> Result<Vec<u32>> {
    let mut pages = Vec::new();

    for part in range.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.trim().parse().map_err(|_| Error::InvalidPageRange {
                range: range.to_string(),
            })?;
            let end: u32 = end.trim().parse().map_err(|_| Error::InvalidPageRange {
                range: range.to_string(),
            })?;

            if start < 1 || end > max_pages || start > end {
                return Err(Error::InvalidPageRange {
                    range: range.to_string(),
                });
            }

            for page in start..=end {
                pages.push(page);
            }
        } else {
            let page: u32 = part.parse().map_err(|_| Error::InvalidPageRange {
                range: range.to_string(),
            })?;

            if page < 1 || page > max_pages {
                return Err(Error::InvalidPageRange {
                    range: range.to_string(),
                });
            }

            pages.push(page);
        }
    }

    // Remove duplicates and sort
    pages.sort();
    pages.dedup();

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(ch: char, x: f32, width: f32) -> PositionedChar {
        PositionedChar {
            ch,
            x,
            width,
            height: 10.0,
        }
    }

    #[test]
    fn test_invalid_pdf_detection() {
        let result = PdfReader::open_bytes(b"not a pdf", None);
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_open_nonexistent_file() {
        let result = PdfReader::open("/nonexistent/path/file.pdf", None);
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[test]
    fn test_line_text_inserts_word_gaps() {
        let line = LineInfo {
            chars: vec![
                pc('a', 0.0, 5.0),
                pc('b', 5.0, 5.0),
                pc('c', 30.0, 5.0),
            ],
            y: 0.0,
            avg_height: 10.0,
            min_x: 0.0,
            max_x: 35.0,
        };
        assert_eq!(line.text(10.0), "ab c");
    }

    #[test]
    fn test_line_text_no_double_space() {
        // An explicit space char after a gap must not become two spaces
        let line = LineInfo {
            chars: vec![pc('a', 0.0, 5.0), pc(' ', 30.0, 5.0), pc('b', 40.0, 5.0)],
            y: 0.0,
            avg_height: 10.0,
            min_x: 0.0,
            max_x: 45.0,
        };
        assert_eq!(line.text(10.0), "a b");
    }

    #[test]
    fn test_parse_page_range() {
        assert_eq!(parse_page_range("1-3", 10).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_page_range("1,3,5", 10).unwrap(), vec![1, 3, 5]);
        assert_eq!(
            parse_page_range("1-3,5,7-9", 10).unwrap(),
            vec![1, 2, 3, 5, 7, 8, 9]
        );
        assert_eq!(parse_page_range("1,1,2,2", 10).unwrap(), vec![1, 2]); // Dedup
    }

    #[test]
    fn test_parse_page_range_invalid() {
        assert!(parse_page_range("0-3", 10).is_err()); // 0 is invalid
        assert!(parse_page_range("1-15", 10).is_err()); // Out of bounds
        assert!(parse_page_range("5-3", 10).is_err()); // Start > End
        assert!(parse_page_range("abc", 10).is_err()); // Not a number
    }
}
