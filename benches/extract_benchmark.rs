//! Performance benchmarks for the text-only extraction path
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pdf_tabular::extract::{parse_lab_text, shape_table};
use pdf_tabular::pdf::tables::{detect_tables, RawTable};
use pdf_tabular::pdf::{LineInfo, PageLayout, PositionedChar};

fn synthetic_layout(rows: usize) -> PageLayout {
    let mut lines = Vec::with_capacity(rows);
    for row in 0..rows {
        let y = 760.0 - row as f32 * 14.0;
        let mut chars = Vec::new();
        for (col, word) in ["analyte", "5.4", "mmol/l", "3.9-5.8"].iter().enumerate() {
            let mut x = col as f32 * 140.0;
            for ch in word.chars() {
                chars.push(PositionedChar {
                    ch,
                    x,
                    width: 6.0,
                    height: 10.0,
                });
                x += 6.0;
            }
        }
        let min_x = chars.first().map(|c| c.x).unwrap_or(0.0);
        let max_x = chars.last().map(|c| c.x + c.width).unwrap_or(0.0);
        lines.push(LineInfo {
            chars,
            y,
            avg_height: 10.0,
            min_x,
            max_x,
        });
    }
    PageLayout {
        width: 612.0,
        height: 792.0,
        lines,
        space_threshold: 3.0,
    }
}

fn synthetic_grid(rows: usize) -> RawTable {
    let mut grid = vec![vec![
        "Test".to_string(),
        "Result".to_string(),
        "Units".to_string(),
        "Reference Range".to_string(),
    ]];
    for i in 0..rows {
        grid.push(vec![
            format!("Analyte {}", i),
            "5.4".to_string(),
            "mmol/L".to_string(),
            "3.9-5.8".to_string(),
        ]);
    }
    RawTable {
        page: 1,
        rows: grid,
    }
}

fn synthetic_report(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("Analyte {} 5.4 mmol/L 3.9-5.8\n", i))
        .collect()
}

fn bench_table_detection(c: &mut Criterion) {
    let layout = synthetic_layout(50);

    let mut group = c.benchmark_group("table_detection");
    group.throughput(Throughput::Elements(50));
    group.bench_function("detect_tables_50_rows", |b| {
        b.iter(|| detect_tables(black_box(&layout), 1));
    });
    group.finish();
}

fn bench_shaping(c: &mut Criterion) {
    let table = synthetic_grid(100);

    let mut group = c.benchmark_group("shaping");
    group.throughput(Throughput::Elements(100));
    group.bench_function("shape_table_100_rows", |b| {
        b.iter(|| shape_table(black_box(&table), 1));
    });
    group.finish();
}

fn bench_lab_parsing(c: &mut Criterion) {
    let report = synthetic_report(100);

    let mut group = c.benchmark_group("lab_parsing");
    group.throughput(Throughput::Elements(100));
    group.bench_function("parse_lab_text_100_lines", |b| {
        b.iter(|| parse_lab_text(black_box(&report)));
    });
    group.finish();
}

criterion_group!(benches, bench_table_detection, bench_shaping, bench_lab_parsing);
criterion_main!(benches);
