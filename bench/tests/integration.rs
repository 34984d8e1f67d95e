//! Integration tests: run the query catalog through DuckDB over synthetic
//! Parquet datasets.

use bench_core::queries::{QueryDef, QuerySet};
use hep_bench::engine::{quote_literal, DuckDbEngine, FailureKind, QueryEngine};
use hep_bench::render::NoopRenderer;
use hep_bench::runner::{BenchmarkRunner, RunSettings, SkipReason};
use hep_bench::synthetic::{write_dataset, SyntheticParams};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const EVENTS: usize = 30;

fn small_params() -> SyntheticParams {
    SyntheticParams {
        events: EVENTS,
        max_jets: 4,
        max_muons: 3,
        ..SyntheticParams::default()
    }
}

fn synthetic_dataset(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let engine = DuckDbEngine::open_in_memory().expect("open");
    write_dataset(engine.connection(), &path, &small_params()).expect("write dataset");
    path
}

/// A Parquet file with none of the columns the catalog expects.
fn flat_dataset(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let engine = DuckDbEngine::open_in_memory().expect("open");
    engine
        .connection()
        .execute_batch(&format!(
            "COPY (SELECT range AS id, range * 2.0 AS energy FROM range(10)) TO {} (FORMAT PARQUET)",
            quote_literal(&path.to_string_lossy())
        ))
        .expect("write flat dataset");
    path
}

fn run(datasets: &[PathBuf], queries: &QuerySet) -> hep_bench::runner::BenchSummary {
    let mut engine = DuckDbEngine::open_in_memory().expect("open");
    let mut renderer = NoopRenderer;
    let settings = RunSettings {
        histograms: false,
        ..RunSettings::default()
    };
    let summary = BenchmarkRunner::new(&mut engine, &mut renderer, settings).run(datasets, queries);
    summary
}

fn source_rows(path: &Path) -> usize {
    let engine = DuckDbEngine::open_in_memory().expect("open");
    let count: i64 = engine
        .connection()
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM read_parquet({})",
                quote_literal(&path.to_string_lossy())
            ),
            [],
            |r| r.get(0),
        )
        .expect("count");
    count as usize
}

#[test]
fn q1_returns_one_row_per_event() {
    let dir = TempDir::new().unwrap();
    let dataset = synthetic_dataset(&dir, "events.parquet");
    let (q1, _) = QuerySet::builtin().filtered(&["Q1".to_string()]);

    let summary = run(&[dataset.clone()], &q1);

    assert!(summary.failures.is_empty(), "{:?}", summary.failures);
    assert_eq!(summary.records.len(), 1);
    assert_eq!(summary.records[0].query_id, "Q1");
    assert_eq!(summary.records[0].result_count, source_rows(&dataset));
    assert_eq!(summary.records[0].result_count, EVENTS);
}

#[test]
fn whole_catalog_runs_on_synthetic_data() {
    let dir = TempDir::new().unwrap();
    let dataset = synthetic_dataset(&dir, "events.parquet");

    let summary = run(&[dataset], &QuerySet::builtin());

    assert!(summary.failures.is_empty(), "{:?}", summary.failures);
    let ids: Vec<&str> = summary.records.iter().map(|r| r.query_id.as_str()).collect();
    assert_eq!(ids, QuerySet::builtin().ids().collect::<Vec<_>>());
    assert!(summary.records.iter().all(|r| r.running_time >= 0.0));
}

#[test]
fn invalid_q2_is_recorded_and_the_rest_still_run() {
    let dir = TempDir::new().unwrap();
    let dataset = synthetic_dataset(&dir, "events.parquet");
    let mut queries = QuerySet::builtin();
    queries.replace("Q2", "SELEC UNNEST(Jet).pt FROM hep_data");

    let summary = run(&[dataset], &queries);

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].query_id, "Q2");
    assert_eq!(summary.failures[0].kind, FailureKind::Syntax);
    let ids: Vec<&str> = summary.records.iter().map(|r| r.query_id.as_str()).collect();
    assert_eq!(ids, ["Q1", "Q3", "Q4", "Q5", "Q6a", "Q6b", "Q7", "Q8"]);
}

#[test]
fn wrong_schema_fails_every_query_without_aborting() {
    let dir = TempDir::new().unwrap();
    let flat = flat_dataset(&dir, "flat.parquet");
    let good = synthetic_dataset(&dir, "events.parquet");
    let queries = QuerySet::builtin();

    let summary = run(&[flat.clone(), good.clone()], &queries);

    let flat_failures: Vec<&str> = summary
        .failures
        .iter()
        .filter(|f| f.dataset == flat)
        .map(|f| f.query_id.as_str())
        .collect();
    assert_eq!(flat_failures, queries.ids().collect::<Vec<_>>());
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Binding));
    assert_eq!(summary.records_for(&flat).count(), 0);
    assert_eq!(summary.records_for(&good).count(), queries.len());
}

#[test]
fn missing_dataset_is_skipped_and_absent_from_summary() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("Run2012B_SingleMu_1000.parquet");
    let present = synthetic_dataset(&dir, "events.parquet");

    let mut engine = DuckDbEngine::open_in_memory().unwrap();
    let mut renderer = NoopRenderer;
    let summary = BenchmarkRunner::new(&mut engine, &mut renderer, RunSettings::default())
        .run(&[missing.clone(), present], &QuerySet::builtin().filtered(&["Q1".into()]).0);

    assert_eq!(summary.records_for(&missing).count(), 0);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].dataset, missing);
    assert_eq!(summary.skipped[0].reason, SkipReason::Missing);
    assert_eq!(summary.records.len(), 1);
}

#[test]
fn missing_dataset_leaves_working_table_untouched() {
    let dir = TempDir::new().unwrap();
    let present = synthetic_dataset(&dir, "events.parquet");
    let missing = dir.path().join("nope.parquet");

    let mut engine = DuckDbEngine::open_in_memory().unwrap();
    let mut renderer = NoopRenderer;
    let mut runner = BenchmarkRunner::new(&mut engine, &mut renderer, RunSettings::default());
    assert_eq!(runner.load_dataset(&present).unwrap(), EVENTS as u64);
    assert!(runner.load_dataset(&missing).is_err());
    drop(runner);

    let set = engine.execute("SELECT COUNT(*) FROM hep_data").unwrap();
    assert_eq!(set.first_column_values(), Some(vec![EVENTS as f64]));
}

#[test]
fn corrupt_dataset_is_skipped_with_reason() {
    let dir = TempDir::new().unwrap();
    let corrupt = dir.path().join("corrupt.parquet");
    std::fs::write(&corrupt, b"definitely not parquet").unwrap();

    let summary = run(&[corrupt.clone()], &QuerySet::builtin());

    assert!(summary.records.is_empty());
    assert!(summary.failures.is_empty());
    assert!(matches!(summary.skipped[0].reason, SkipReason::LoadFailed(_)));
}

#[test]
fn repeated_runs_produce_the_same_id_sequence() {
    let dir = TempDir::new().unwrap();
    let a = synthetic_dataset(&dir, "a.parquet");
    let b = synthetic_dataset(&dir, "b.parquet");
    let datasets = vec![a, dir.path().join("missing.parquet"), b];
    let queries = QuerySet::new(vec![
        QueryDef::new("met", "SELECT MET.pt FROM hep_data"),
        QueryDef::new("broken", "SELECT nothing FROM hep_data"),
        QueryDef::new("jets", "SELECT len(Jet) FROM hep_data"),
    ])
    .unwrap();

    let first = run(&datasets, &queries);
    let second = run(&datasets, &queries);

    let ids = |s: &hep_bench::runner::BenchSummary| {
        s.records
            .iter()
            .map(|r| (r.query_id.clone(), r.dataset.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.records.len(), 4);
    assert_eq!(first.failures.len(), 2);
}
