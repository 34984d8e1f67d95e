//! Report module: prints the run summary and optionally writes it as JSON.

use crate::runner::{BenchSummary, QueryRecord, SkipReason};
use bench_core::queries::QuerySet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Print the summary to stdout.
pub fn print_summary(summary: &BenchSummary) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = write_summary(&mut out, summary) {
        log::error!("Failed to print summary: {e}");
    }
}

/// Write the summary: every record in insertion order, then failures and
/// skipped datasets.
pub fn write_summary<W: Write>(out: &mut W, summary: &BenchSummary) -> io::Result<()> {
    writeln!(out, "\nSummary of Results:")?;
    for record in &summary.records {
        writeln!(out, "{}", format_record(record))?;
    }

    if !summary.records.is_empty() {
        writeln!(out, "\n  {:8} {:>12} {:>10}  {}", "Query", "Time (s)", "Rows", "Dataset")?;
        writeln!(out, "  {}", "-".repeat(60))?;
        for r in &summary.records {
            writeln!(
                out,
                "  {:8} {:>12.4} {:>10}  {}",
                r.query_id,
                r.running_time,
                r.result_count,
                r.dataset.display()
            )?;
        }
        writeln!(out, "  {}", "-".repeat(60))?;
        writeln!(
            out,
            "  {:8} {:>12.4} {:>10}",
            "Total",
            summary.total_running_time(),
            summary.records.len()
        )?;
    }

    if !summary.failures.is_empty() {
        writeln!(out, "\n  Failed queries:")?;
        for f in &summary.failures {
            writeln!(
                out,
                "  {:8} [{}] {}: {}",
                f.query_id,
                f.kind,
                f.dataset.display(),
                f.message
            )?;
        }
    }

    if !summary.skipped.is_empty() {
        writeln!(out, "\n  Skipped datasets:")?;
        for s in &summary.skipped {
            match &s.reason {
                SkipReason::Missing => writeln!(out, "  {} (not found)", s.dataset.display())?,
                SkipReason::LoadFailed(msg) => {
                    writeln!(out, "  {} (load failed: {})", s.dataset.display(), msg)?
                }
            }
        }
    }

    writeln!(out)
}

/// Write every query id followed by its indented SQL.
pub fn write_catalog<W: Write>(out: &mut W, queries: &QuerySet) -> io::Result<()> {
    for q in queries {
        writeln!(out, "{}:", q.id)?;
        for line in q.sql.lines() {
            writeln!(out, "  {}", line.trim_end())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn format_record(r: &QueryRecord) -> String {
    format!(
        "{{'query_id': '{}', 'dataset': '{}', 'running_time': {}, 'result_count': {}}}",
        r.query_id,
        r.dataset.display(),
        r.running_time,
        r.result_count
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    version: &'static str,
    total_running_time: f64,
    #[serde(flatten)]
    summary: &'a BenchSummary,
}

/// Write the summary as pretty JSON into `output_dir` and return the file path.
pub fn write_json_report(summary: &BenchSummary, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create report directory {}", output_dir.display()))?;

    let timestamp = chrono::Utc::now();
    let path = output_dir.join(format!(
        "hep-bench-{}.json",
        timestamp.format("%Y-%m-%d-%H%M%S")
    ));

    let report = JsonReport {
        timestamp: timestamp.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        total_running_time: summary.total_running_time(),
        summary,
    };
    let json = serde_json::to_string_pretty(&report).context("cannot serialize report")?;
    fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FailureKind;
    use crate::runner::{DatasetSkip, QueryFailure};

    fn sample() -> BenchSummary {
        BenchSummary {
            records: vec![
                QueryRecord {
                    query_id: "Q1".into(),
                    dataset: "a.parquet".into(),
                    running_time: 0.25,
                    result_count: 1000,
                },
                QueryRecord {
                    query_id: "Q3".into(),
                    dataset: "a.parquet".into(),
                    running_time: 0.5,
                    result_count: 42,
                },
            ],
            failures: vec![QueryFailure {
                query_id: "Q2".into(),
                dataset: "a.parquet".into(),
                kind: FailureKind::Syntax,
                message: "Parser Error: syntax error".into(),
            }],
            skipped: vec![DatasetSkip {
                dataset: "missing.parquet".into(),
                reason: SkipReason::Missing,
            }],
        }
    }

    #[test]
    fn summary_lists_records_in_order() {
        let mut out = Vec::new();
        write_summary(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let q1 = text.find("'query_id': 'Q1'").unwrap();
        let q3 = text.find("'query_id': 'Q3'").unwrap();
        assert!(q1 < q3);
        assert!(text.contains("'result_count': 1000"));
        assert!(text.contains("[syntax]"));
        assert!(text.contains("missing.parquet (not found)"));
        assert!(text.contains("0.7500"), "total of running times");
    }

    #[test]
    fn json_report_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json_report(&sample(), dir.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["records"].as_array().unwrap().len(), 2);
        assert_eq!(value["records"][0]["query_id"], "Q1");
        assert_eq!(value["failures"][0]["kind"], "syntax");
        assert_eq!(value["skipped"][0]["reason"], "missing");
        assert_eq!(value["total_running_time"], 0.75);
    }

    #[test]
    fn catalog_lists_ids_then_indented_sql() {
        let queries = QuerySet::builtin().filtered(&["Q1".to_string()]).0;
        let mut out = Vec::new();
        write_catalog(&mut out, &queries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Q1:\n  SELECT MET.pt AS Emiss_T FROM hep_data\n\n");
    }
}
