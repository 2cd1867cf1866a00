//! Lab-report field heuristics
//!
//! Two complementary paths out of a messy report:
//! * header matching — free-form column names ("Observed Value", "Ref.
//!   Interval") mapped onto canonical lab columns via an alias table;
//! * line splitting — a regex pass that breaks an OCR'd report line into
//!   analyte, numeric result, unit, reference range and abnormality flag.

use crate::extract::normalize::{normalize_key, TableRecord};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// analyte, then the first standalone numeric token, then the rest
    static ref LINE_RE: Regex =
        Regex::new(r"^(?P<analyte>[A-Za-z].*?)\s+(?P<value>[<>]?\d+(?:\.\d+)?)(?:\s+(?P<tail>.*))?\s*$")
            .expect("lab line regex");
    /// low-high reference range, tolerating en dashes and inner spaces
    static ref RANGE_RE: Regex =
        Regex::new(r"\(?\s*(?P<low>\d+(?:\.\d+)?)\s*[-–]\s*(?P<high>\d+(?:\.\d+)?)\s*\)?")
            .expect("reference range regex");
    /// a unit token: starts with a letter/percent, no digits-only noise
    static ref UNIT_RE: Regex =
        Regex::new(r"^[A-Za-z%µμ][A-Za-z0-9%µμ/^.·-]*$").expect("unit regex");
}

/// Canonical lab-report column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabColumn {
    Analyte,
    Result,
    Unit,
    ReferenceRange,
    Flag,
}

/// One parsed lab result line/row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabField {
    /// Test name, lowercased
    pub analyte: String,
    /// Result value as printed (may carry a < or > qualifier)
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// Match a free-form column header against the canonical lab columns.
/// Headers are compared after trimming, lowercasing and collapsing
/// punctuation, so "Ref. Range" and "reference_range" both match.
pub fn match_column(header: &str) -> Option<LabColumn> {
    let canonical: String = normalize_key(header)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match canonical.as_str() {
        "test" | "test name" | "analyte" | "parameter" | "investigation" | "examination"
        | "component" => Some(LabColumn::Analyte),
        "result" | "results" | "value" | "observed value" | "reading" | "finding" => {
            Some(LabColumn::Result)
        }
        "unit" | "units" | "uom" => Some(LabColumn::Unit),
        "reference range" | "ref range" | "reference interval" | "normal range"
        | "normal values" | "biological reference interval" | "range" => {
            Some(LabColumn::ReferenceRange)
        }
        "flag" | "flags" | "abnormal" | "indicator" | "h l" => Some(LabColumn::Flag),
        _ => None,
    }
}

fn is_flag_token(token: &str) -> bool {
    if !token.is_empty() && token.chars().all(|c| c == '*') {
        return true;
    }
    matches!(
        token.to_lowercase().as_str(),
        "h" | "l" | "hh" | "ll" | "high" | "low" | "crit" | "critical" | "abnormal"
    )
}

/// Regex-split a single report line into a [`LabField`].
/// Returns `None` for lines that do not look like a result row.
pub fn parse_lab_line(line: &str) -> Option<LabField> {
    let caps = LINE_RE.captures(line.trim())?;

    let analyte = normalize_key(&caps["analyte"]);
    let value = caps["value"].to_string();
    let tail = caps.name("tail").map(|m| m.as_str()).unwrap_or("");

    let mut reference_range = None;
    let mut remainder = tail.to_string();
    if let Some(m) = RANGE_RE.find(tail) {
        let range_caps = RANGE_RE.captures(tail)?;
        reference_range = Some(format!("{}-{}", &range_caps["low"], &range_caps["high"]));
        remainder.replace_range(m.range(), "");
    }

    let mut unit = None;
    let mut flag = None;
    for token in remainder.split_whitespace() {
        let token = token.trim_matches(|c| c == '(' || c == ')' || c == ',');
        if token.is_empty() {
            continue;
        }
        if flag.is_none() && is_flag_token(token) {
            flag = Some(token.to_uppercase());
        } else if unit.is_none() && UNIT_RE.is_match(token) {
            unit = Some(token.to_string());
        }
    }

    Some(LabField {
        analyte,
        value,
        unit,
        reference_range,
        flag,
    })
}

/// Parse free text (typically OCR output), one candidate field per line
pub fn parse_lab_text(text: &str) -> Vec<LabField> {
    text.lines().filter_map(parse_lab_line).collect()
}

/// Interpret a shaped table as lab results when its headers match the alias
/// table. Row keys are the analytes (the shaping step keys rows on their
/// first cell). Requires a recognizable result column; returns `None`
/// otherwise so callers can fall back to line splitting.
pub fn fields_from_record(record: &TableRecord) -> Option<Vec<LabField>> {
    // Headers are shared across rows; take them from any row.
    let headers: Vec<String> = record
        .data
        .values()
        .next()
        .map(|cols| cols.keys().cloned().collect())
        .unwrap_or_default();

    let find = |kind: LabColumn| -> Option<&String> {
        headers.iter().find(|h| match_column(h.as_str()) == Some(kind))
    };

    let result_col = find(LabColumn::Result)?;
    let unit_col = find(LabColumn::Unit);
    let range_col = find(LabColumn::ReferenceRange);
    let flag_col = find(LabColumn::Flag);

    let non_empty = |v: Option<&String>| -> Option<String> {
        v.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
    };

    let fields = record
        .data
        .iter()
        .map(|(analyte, cols)| LabField {
            analyte: analyte.clone(),
            value: cols.get(result_col).cloned().unwrap_or_default(),
            unit: non_empty(unit_col.and_then(|c| cols.get(c))),
            reference_range: non_empty(range_col.and_then(|c| cols.get(c))),
            flag: non_empty(flag_col.and_then(|c| cols.get(c))).map(|f| f.to_uppercase()),
        })
        .collect();

    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize::shape_table;
    use crate::pdf::tables::RawTable;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Test Name", Some(LabColumn::Analyte))]
    #[case("  RESULT ", Some(LabColumn::Result))]
    #[case("Observed Value", Some(LabColumn::Result))]
    #[case("Units", Some(LabColumn::Unit))]
    #[case("Ref. Range", Some(LabColumn::ReferenceRange))]
    #[case("reference_range", Some(LabColumn::ReferenceRange))]
    #[case("Biological Reference Interval", Some(LabColumn::ReferenceRange))]
    #[case("H/L", Some(LabColumn::Flag))]
    #[case("comments", None)]
    fn test_match_column(#[case] header: &str, #[case] expected: Option<LabColumn>) {
        assert_eq!(match_column(header), expected);
    }

    #[test]
    fn test_parse_lab_line_full() {
        let field = parse_lab_line("Glucose 5.4 mmol/L (3.9-5.8)").unwrap();
        assert_eq!(field.analyte, "glucose");
        assert_eq!(field.value, "5.4");
        assert_eq!(field.unit.as_deref(), Some("mmol/L"));
        assert_eq!(field.reference_range.as_deref(), Some("3.9-5.8"));
        assert_eq!(field.flag, None);
    }

    #[test]
    fn test_parse_lab_line_with_flag() {
        let field = parse_lab_line("WBC 11.2 H 4.0-10.0").unwrap();
        assert_eq!(field.analyte, "wbc");
        assert_eq!(field.value, "11.2");
        assert_eq!(field.flag.as_deref(), Some("H"));
        assert_eq!(field.reference_range.as_deref(), Some("4.0-10.0"));
        assert_eq!(field.unit, None);
    }

    #[test]
    fn test_parse_lab_line_qualified_value() {
        let field = parse_lab_line("CRP <5 mg/L").unwrap();
        assert_eq!(field.value, "<5");
        assert_eq!(field.unit.as_deref(), Some("mg/L"));
    }

    #[test]
    fn test_parse_lab_line_multiword_analyte() {
        let field = parse_lab_line("Total Protein 7.2 g/dL 6.0-8.3").unwrap();
        assert_eq!(field.analyte, "total protein");
        assert_eq!(field.value, "7.2");
    }

    #[test]
    fn test_parse_lab_line_digit_in_analyte() {
        // "b12" must not donate its digits as the value
        let field = parse_lab_line("Vitamin B12 350 pg/mL").unwrap();
        assert_eq!(field.analyte, "vitamin b12");
        assert_eq!(field.value, "350");
    }

    #[rstest]
    #[case("")]
    #[case("PATIENT REPORT")]
    #[case("123 456")]
    fn test_parse_lab_line_rejects(#[case] line: &str) {
        assert!(parse_lab_line(line).is_none());
    }

    #[test]
    fn test_parse_lab_text_skips_prose() {
        let fields = parse_lab_text("Lab Report\nGlucose 5.4 mmol/L\nEnd of report\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].analyte, "glucose");
    }

    #[test]
    fn test_fields_from_record() {
        let raw = RawTable {
            page: 1,
            rows: vec![
                vec![
                    "Test".into(),
                    "Result".into(),
                    "Units".into(),
                    "Ref Range".into(),
                    "Flag".into(),
                ],
                vec![
                    "Glucose".into(),
                    "5.4".into(),
                    "mmol/L".into(),
                    "3.9-5.8".into(),
                    "".into(),
                ],
                vec![
                    "WBC".into(),
                    "11.2".into(),
                    "10^9/L".into(),
                    "4.0-10.0".into(),
                    "h".into(),
                ],
            ],
        };
        let record = shape_table(&raw, 1);
        let fields = fields_from_record(&record).unwrap();

        let glucose = fields.iter().find(|f| f.analyte == "glucose").unwrap();
        assert_eq!(glucose.value, "5.4");
        assert_eq!(glucose.unit.as_deref(), Some("mmol/l"));
        assert_eq!(glucose.flag, None);

        let wbc = fields.iter().find(|f| f.analyte == "wbc").unwrap();
        assert_eq!(wbc.flag.as_deref(), Some("H"));
    }

    #[test]
    fn test_fields_from_record_requires_result_column() {
        let raw = RawTable {
            page: 1,
            rows: vec![
                vec!["Name".into(), "Comment".into()],
                vec!["Glucose".into(), "fine".into()],
            ],
        };
        let record = shape_table(&raw, 1);
        assert!(fields_from_record(&record).is_none());
    }
}
