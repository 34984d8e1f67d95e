//! Criterion benchmark harness: measures each built-in query against a
//! synthetic dataset at two event counts.

use bench_core::constants::WORKING_TABLE;
use bench_core::queries::QuerySet;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hep_bench::engine::{DuckDbEngine, QueryEngine};
use hep_bench::synthetic::{write_dataset, SyntheticParams};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Dataset sizes to benchmark. Several catalog queries cross join the whole
/// table with its own unnested collections, so cost grows with events squared.
fn event_levels() -> Vec<(&'static str, usize)> {
    vec![("100", 100), ("500", 500)]
}

/// Write a synthetic dataset and load it as the working table.
fn setup_engine(dir: &Path, events: usize) -> DuckDbEngine {
    let path = dir.join(format!("synthetic_{events}.parquet"));
    let mut engine = DuckDbEngine::open_in_memory().expect("Failed to open DuckDB");
    write_dataset(engine.connection(), &path, &SyntheticParams::with_events(events))
        .expect("Failed to write synthetic dataset");
    engine
        .replace_table(WORKING_TABLE, &path)
        .expect("Failed to load dataset");
    engine
}

fn bench_queries(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let queries = QuerySet::builtin();

    for (label, events) in event_levels() {
        let mut engine = setup_engine(dir.path(), events);
        let mut group = c.benchmark_group(format!("query/{label}"));
        group.measurement_time(Duration::from_secs(10));
        group.sample_size(10);

        for query in &queries {
            group.bench_with_input(BenchmarkId::from_parameter(&query.id), &query.sql, |b, sql| {
                b.iter(|| engine.execute(sql).expect("query failed").row_count());
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
