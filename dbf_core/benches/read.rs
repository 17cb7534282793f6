use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbf_core::{
    Filter, MemoryTable, MemoryTableSource, RawValue, ReadOptions, ReadOrder, TableReader,
};

const TABLE_SIZES: &[usize] = &[1_000, 10_000, 100_000];

/// One sale per row, dated over a year, with right-padded codes.
fn sales_table(rows: usize) -> Result<MemoryTableSource> {
    let mut table = MemoryTable::new(["F_EMISION", "CODIGO", "CLIENTE", "TOTAL"]);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).ok_or_else(|| anyhow!("invalid date"))?;
    for i in 0..rows {
        let day = start + chrono::Days::new((i % 365) as u64);
        table.push_row(vec![
            RawValue::Date(day),
            RawValue::Text(format!("V{i:08}  ")),
            RawValue::Text(format!("C{:04}          ", i % 500)),
            RawValue::Decimal((i % 1000) as f64 * 1.25),
        ])?;
    }
    Ok(MemoryTableSource::new().with_table("VENTA", table))
}

fn read_with(reader: &TableReader<MemoryTableSource>, options: &ReadOptions) -> Result<usize> {
    Ok(reader.read("VENTA", options)?.len())
}

pub fn read_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let may = Filter::range("F_EMISION", "01/05/2025", "31/05/2025").dated();

    for &size in TABLE_SIZES {
        let reader = match sales_table(size) {
            Ok(source) => TableReader::new(source),
            Err(e) => panic!("failed to build table: {e}"),
        };

        let all = ReadOptions::new();
        group.bench_with_input(BenchmarkId::new("full scan", size), &all, |b, options| {
            b.iter(|| read_with(&reader, black_box(options)))
        });

        let pushed = ReadOptions::new().with_filter(may.clone());
        group.bench_with_input(BenchmarkId::new("date range", size), &pushed, |b, options| {
            b.iter(|| read_with(&reader, black_box(options)))
        });

        let in_memory = pushed.clone().with_pushdown(false);
        group.bench_with_input(
            BenchmarkId::new("date range in memory", size),
            &in_memory,
            |b, options| b.iter(|| read_with(&reader, black_box(options))),
        );

        let newest = ReadOptions::new()
            .with_order(ReadOrder::NewestFirst)
            .with_limit(50);
        group.bench_with_input(BenchmarkId::new("newest 50", size), &newest, |b, options| {
            b.iter(|| read_with(&reader, black_box(options)))
        });
    }

    group.finish();
}

criterion_group!(benches, read_benchmark);
criterion_main!(benches);
