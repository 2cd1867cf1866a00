//! Normalization and row shaping
//!
//! Shapes a raw cell grid into the persisted record form: headers from the
//! first row, each data row keyed on its first cell, all keys and values
//! trimmed and lowercased.

use crate::pdf::tables::RawTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row key used when the first cell of a data row is empty
const UNKNOWN_ROW_KEY: &str = "unknown";

/// One shaped table, as persisted to JSON and SQLite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRecord {
    /// Page number (1-indexed)
    pub page: u32,
    /// Table position on the page (1-indexed)
    pub table_index: u32,
    /// Row key -> (column header -> cell value)
    pub data: BTreeMap<String, BTreeMap<String, String>>,
}

/// Trim and lowercase a key; empty input stays empty
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trim and lowercase a cell value
pub fn normalize_value(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Header for column `i`, falling back to a positional name for empty cells
pub fn header_name(raw: &str, index: usize) -> String {
    let normalized = normalize_key(raw);
    if normalized.is_empty() {
        format!("column_{}", index)
    } else {
        normalized
    }
}

/// Shape one raw table into a [`TableRecord`] (1-indexed `table_index`).
///
/// The first row supplies the headers; every following row keys on its first
/// cell and maps the remaining headers to the remaining cells. A later row
/// with the same key overwrites the earlier one.
pub fn shape_table(raw: &RawTable, table_index: u32) -> TableRecord {
    let headers: Vec<String> = raw
        .rows
        .first()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, h)| header_name(h, i))
                .collect()
        })
        .unwrap_or_default();

    let mut data: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for row in raw.rows.iter().skip(1) {
        let main_key = match row.first() {
            Some(cell) if !normalize_key(cell).is_empty() => normalize_key(cell),
            _ => UNKNOWN_ROW_KEY.to_string(),
        };

        let mut columns = BTreeMap::new();
        for (i, cell) in row.iter().enumerate().skip(1) {
            if i < headers.len() {
                columns.insert(headers[i].clone(), normalize_value(cell));
            }
        }

        data.insert(main_key, columns);
    }

    TableRecord {
        page: raw.page,
        table_index,
        data,
    }
}

/// Shape every table on a page, numbering them in reading order
pub fn shape_tables(raws: &[RawTable]) -> Vec<TableRecord> {
    raws.iter()
        .enumerate()
        .map(|(i, raw)| shape_table(raw, i as u32 + 1))
        .collect()
}

/// Shape an OCR pseudo-table (one cell per line, no headers): rows key on
/// their position and carry the whole line under a single `text` column.
pub fn shape_ocr_table(raw: &RawTable, table_index: u32) -> TableRecord {
    let mut data = BTreeMap::new();
    for (i, row) in raw.rows.iter().enumerate() {
        let mut columns = BTreeMap::new();
        columns.insert("text".to_string(), normalize_value(&row.join(" ")));
        data.insert(format!("line_{}", i + 1), columns);
    }
    TableRecord {
        page: raw.page,
        table_index,
        data,
    }
}
