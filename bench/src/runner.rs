//! Benchmark runner: for each dataset, reload the working table and time every
//! query against it.
//!
//! The runner owns no global state. Everything it produces is accumulated in
//! the [`BenchSummary`] returned by [`BenchmarkRunner::run`].

use crate::engine::{FailureKind, QueryEngine};
use crate::histogram::Histogram;
use crate::render::HistogramRenderer;
use bench_core::constants::{HISTOGRAM_BINS, WORKING_TABLE};
use bench_core::queries::{QueryDef, QuerySet};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Knobs that do not change what is measured.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub histograms: bool,
    pub bins: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            histograms: true,
            bins: HISTOGRAM_BINS,
        }
    }
}

/// One successful query execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    pub query_id: String,
    pub dataset: PathBuf,
    /// Wall-clock execution time in seconds, rendering excluded.
    pub running_time: f64,
    pub result_count: usize,
}

/// One failed query execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub query_id: String,
    pub dataset: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Missing,
    LoadFailed(String),
}

/// A dataset that was never queried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSkip {
    pub dataset: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything a run produced, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchSummary {
    pub records: Vec<QueryRecord>,
    pub failures: Vec<QueryFailure>,
    pub skipped: Vec<DatasetSkip>,
}

impl BenchSummary {
    pub fn records_for<'a>(&'a self, dataset: &'a Path) -> impl Iterator<Item = &'a QueryRecord> {
        self.records.iter().filter(move |r| r.dataset.as_path() == dataset)
    }

    pub fn total_running_time(&self) -> f64 {
        self.records.iter().map(|r| r.running_time).sum()
    }
}

pub struct BenchmarkRunner<'a, E: QueryEngine, R: HistogramRenderer> {
    engine: &'a mut E,
    renderer: &'a mut R,
    settings: RunSettings,
    out: Box<dyn Write + 'a>,
}

impl<'a, E: QueryEngine, R: HistogramRenderer> BenchmarkRunner<'a, E, R> {
    pub fn new(engine: &'a mut E, renderer: &'a mut R, settings: RunSettings) -> Self {
        Self {
            engine,
            renderer,
            settings,
            out: Box::new(io::stdout()),
        }
    }

    /// Send progress lines somewhere other than stdout.
    pub fn with_output(mut self, out: impl Write + 'a) -> Self {
        self.out = Box::new(out);
        self
    }

    fn progress(&mut self, args: fmt::Arguments) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.write_all(b"\n")) {
            log::warn!("Could not write progress line: {e}");
        }
    }

    /// Run every query in `queries` against every dataset in `datasets`.
    pub fn run(&mut self, datasets: &[PathBuf], queries: &QuerySet) -> BenchSummary {
        let mut summary = BenchSummary::default();
        let mut loaded = false;

        for dataset in datasets {
            if let Err(skip) = self.load_dataset(dataset) {
                summary.skipped.push(skip);
                continue;
            }
            loaded = true;

            for query in queries {
                match self.run_query(dataset, query) {
                    Ok(record) => summary.records.push(record),
                    Err(failure) => summary.failures.push(failure),
                }
            }
        }

        // A run that loaded nothing leaves the database as it found it.
        if loaded {
            if let Err(e) = self.engine.drop_table(WORKING_TABLE) {
                log::warn!("Could not drop working table {WORKING_TABLE}: {e}");
            }
        }

        summary
    }

    /// Replace the working table with the contents of `dataset`.
    ///
    /// A missing file is reported without touching the engine.
    pub fn load_dataset(&mut self, dataset: &Path) -> Result<u64, DatasetSkip> {
        if !dataset.exists() {
            self.progress(format_args!("Dataset {} not found, skipping.", dataset.display()));
            log::warn!("Skipping missing dataset {}", dataset.display());
            return Err(DatasetSkip {
                dataset: dataset.to_path_buf(),
                reason: SkipReason::Missing,
            });
        }

        self.progress(format_args!("\nProcessing dataset: {}", dataset.display()));
        match self.engine.replace_table(WORKING_TABLE, dataset) {
            Ok(rows) => {
                log::debug!("Loaded {} rows from {} into {}", rows, dataset.display(), WORKING_TABLE);
                Ok(rows)
            }
            Err(e) => {
                self.progress(format_args!("Error loading dataset {}: {}", dataset.display(), e));
                log::warn!("Skipping dataset {} ({} error): {}", dataset.display(), e.kind, e);
                Err(DatasetSkip {
                    dataset: dataset.to_path_buf(),
                    reason: SkipReason::LoadFailed(e.message),
                })
            }
        }
    }

    /// Execute one query against the current working table.
    pub fn run_query(&mut self, dataset: &Path, query: &QueryDef) -> Result<QueryRecord, QueryFailure> {
        self.progress(format_args!("Running {}...", query.id));

        let start = Instant::now();
        let result = self.engine.execute(&query.sql);
        let elapsed = start.elapsed().as_secs_f64();

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                self.progress(format_args!("Error running {}: {}", query.id, e));
                log::warn!("{} failed with {} error", query.id, e.kind);
                return Err(QueryFailure {
                    query_id: query.id.clone(),
                    dataset: dataset.to_path_buf(),
                    kind: e.kind,
                    message: e.message,
                });
            }
        };

        self.progress(format_args!("{} executed in {:.4} seconds", query.id, elapsed));

        if self.settings.histograms {
            self.render(&query.id, rows.first_column_values());
        }

        Ok(QueryRecord {
            query_id: query.id.clone(),
            dataset: dataset.to_path_buf(),
            running_time: elapsed,
            result_count: rows.row_count(),
        })
    }

    fn render(&mut self, title: &str, values: Option<Vec<f64>>) {
        let Some(values) = values else {
            log::debug!("{title}: first column is not numeric, no histogram");
            return;
        };

        let histogram = Histogram::from_values(&values, self.settings.bins);
        if histogram.rejected > 0 {
            log::debug!("{title}: {} non-finite values left out of the histogram", histogram.rejected);
        }
        if let Err(e) = self.renderer.render(&histogram, title) {
            log::warn!("Could not render histogram for {title}: {e:#}");
        }
    }
}
