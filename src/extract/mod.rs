//! Text normalization, row shaping and lab-report field heuristics

pub mod fields;
pub mod normalize;

pub use fields::{fields_from_record, match_column, parse_lab_line, parse_lab_text, LabColumn, LabField};
pub use normalize::{
    header_name, normalize_key, normalize_value, shape_ocr_table, shape_table, shape_tables,
    TableRecord,
};
