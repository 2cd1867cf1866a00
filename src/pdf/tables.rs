//! Table reconstruction from positioned lines
//!
//! PDFs carry no table markup; a "table" here is a run of consecutive lines
//! that each split into two or more cells on large X-gaps. Cell boundaries
//! use a multiple of the page's word-gap threshold, so the same document
//! drives both word spacing and column splitting.

use crate::pdf::reader::{LineInfo, PageLayout};

/// A cell gap is this many word gaps wide
const CELL_GAP_FACTOR: f32 = 3.0;

/// Absolute floor for the cell gap, in points
const MIN_CELL_GAP: f32 = 12.0;

/// Minimum consecutive multi-cell lines to count as a table
const MIN_TABLE_ROWS: usize = 2;

/// A rectangular table recovered from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Page number (1-indexed)
    pub page: u32,
    /// Rows of cell text, padded to a uniform column count
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }
}

/// Split a line into cells on gaps wider than `cell_gap`.
/// Within a cell, gaps wider than `space_threshold` become single spaces.
fn split_cells(line: &LineInfo, space_threshold: f32, cell_gap: f32) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut prev_end: Option<f32> = None;

    for c in &line.chars {
        if let Some(end) = prev_end {
            let gap = c.x - end;
            if gap > cell_gap {
                let cell = current.trim().to_string();
                if !cell.is_empty() {
                    cells.push(cell);
                }
                current = String::new();
            } else if gap > space_threshold && c.ch != ' ' {
                current.push(' ');
            }
        }
        current.push(c.ch);
        prev_end = Some(c.x + c.width);
    }

    let cell = current.trim().to_string();
    if !cell.is_empty() {
        cells.push(cell);
    }

    cells
}

/// Detect tables on one page (1-indexed `page_num`).
///
/// Consecutive lines that split into at least two cells form a candidate run;
/// runs shorter than [`MIN_TABLE_ROWS`] are discarded, and ragged rows are
/// padded with empty cells to the run's widest row.
pub fn detect_tables(layout: &PageLayout, page_num: u32) -> Vec<RawTable> {
    let cell_gap = (layout.space_threshold * CELL_GAP_FACTOR).max(MIN_CELL_GAP);

    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in &layout.lines {
        let cells = split_cells(line, layout.space_threshold, cell_gap);
        if cells.len() >= 2 {
            run.push(cells);
        } else {
            flush_run(&mut run, &mut tables, page_num);
        }
    }
    flush_run(&mut run, &mut tables, page_num);

    tables
}

fn flush_run(run: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>, page_num: u32) {
    if run.len() >= MIN_TABLE_ROWS {
        let columns = run.iter().map(|r| r.len()).max().unwrap_or(0);
        let rows = run
            .drain(..)
            .map(|mut r| {
                r.resize(columns, String::new());
                r
            })
            .collect();
        tables.push(RawTable {
            page: page_num,
            rows,
        });
    } else {
        run.clear();
    }
}

/// Build a pseudo-table from OCR text: one row per non-empty line, the whole
/// line as the single cell. Lets scanned pages flow through the same shaping
/// path as text-layer tables.
pub fn table_from_ocr_text(page_num: u32, text: &str) -> Option<RawTable> {
    let rows: Vec<Vec<String>> = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| vec![l.to_string()])
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(RawTable {
            page: page_num,
            rows,
        })
    }
}
