//! Command line entry point.
//!
//! Usage:
//!   hep-bench run [DATASETS]... [--plot window|text|none] [--only Q1,Q2]
//!   hep-bench generate --out data/synthetic.parquet --events 4000
//!   hep-bench list
//!
//! Datasets can also be given through `HEP_BENCH_DATASETS` (comma-separated),
//! and a `.env` file in the working directory is honoured.

use anyhow::{Context, Result};
use clap::Parser;
use hep_bench::config::{load_queries, BenchConfig, Cli, Command, GenerateArgs, RunArgs};
use hep_bench::engine::DuckDbEngine;
use hep_bench::report::{print_summary, write_catalog, write_json_report};
use hep_bench::runner::BenchmarkRunner;
use hep_bench::synthetic::{self, SyntheticParams};
use std::process;
use std::time::Instant;

fn run(args: &RunArgs) -> Result<bool> {
    let config = BenchConfig::from_args(args)?;

    println!("Running HEP query benchmark...");
    println!("  Datasets:  {}", config.datasets.len());
    println!("  Queries:   {}", config.queries.ids().collect::<Vec<_>>().join(", "));
    println!("  Database:  {}", config.database);

    let mut engine = DuckDbEngine::connect(&config.database)
        .with_context(|| format!("cannot open DuckDB at {}", config.database))?;
    let mut renderer = config.plot.renderer();

    let started = Instant::now();
    let summary = BenchmarkRunner::new(&mut engine, &mut renderer, config.settings.clone())
        .run(&config.datasets, &config.queries);
    log::info!(
        "Benchmark finished in {:.2}s: {} records, {} failures, {} skipped datasets",
        started.elapsed().as_secs_f64(),
        summary.records.len(),
        summary.failures.len(),
        summary.skipped.len()
    );

    print_summary(&summary);

    if let Some(dir) = &config.report_dir {
        match write_json_report(&summary, dir) {
            Ok(path) => println!("  JSON report: {}", path.display()),
            Err(e) => log::error!("Failed to write JSON report: {e:#}"),
        }
    }

    let clean = summary.failures.is_empty() && summary.skipped.is_empty();
    Ok(clean || !config.fail_on_error)
}

fn generate(args: &GenerateArgs) -> Result<()> {
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let params = SyntheticParams {
        events: args.events,
        seed: args.seed,
        max_jets: args.max_jets,
        max_muons: args.max_muons,
    };
    let engine = DuckDbEngine::open_in_memory()?;
    let started = Instant::now();
    let written = synthetic::write_dataset(engine.connection(), &args.out, &params)
        .with_context(|| format!("cannot write {}", args.out.display()))?;
    println!(
        "Wrote {} events to {} in {:.2}s",
        written,
        args.out.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn list(queries: Option<&std::path::PathBuf>) -> Result<()> {
    let set = load_queries(queries)?;
    write_catalog(&mut std::io::stdout().lock(), &set)?;
    Ok(())
}

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = cli.level_filter().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(2);
    });
    bench_core::initialize_logger(level, cli.log_file.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}. Exiting.", e);
        process::exit(1);
    });

    let outcome = match &cli.command {
        Command::Run(args) => run(args),
        Command::Generate(args) => generate(args).map(|()| true),
        Command::List { queries } => list(queries.as_ref()).map(|()| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            log::error!("{e:#}");
            process::exit(1);
        }
    }
}
