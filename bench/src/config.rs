use crate::render::PlotMode;
use crate::runner::RunSettings;
use crate::synthetic::DEFAULT_SEED;
use anyhow::{bail, Context, Result};
use bench_core::constants::{DEFAULT_DATASETS, HISTOGRAM_BINS, IN_MEMORY_DATABASE};
use bench_core::queries::QuerySet;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface.
#[derive(Parser, Debug)]
#[command(
    name = "hep-bench",
    version,
    about = "Times HEP event-selection SQL queries against DuckDB over Parquet datasets"
)]
pub struct Cli {
    /// Log level for stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "HEP_BENCH_LOG")]
    pub log_level: String,

    /// Also append log records to this file
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the query benchmark over one or more datasets
    Run(RunArgs),
    /// Write a synthetic NanoAOD-shaped Parquet dataset
    Generate(GenerateArgs),
    /// Print the query catalog and exit
    List {
        /// JSON query file to list instead of the built-in catalog
        #[arg(long)]
        queries: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Parquet datasets to benchmark, in order
    #[arg(value_delimiter = ',', env = "HEP_BENCH_DATASETS")]
    pub datasets: Vec<PathBuf>,

    /// JSON file of [{"id": ..., "sql": ...}] replacing the built-in queries
    #[arg(long)]
    pub queries: Option<PathBuf>,

    /// Run only these query ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// How to show result histograms
    #[arg(long, value_enum, default_value_t = PlotMode::Window)]
    pub plot: PlotMode,

    /// Histogram bucket count
    #[arg(long, default_value_t = HISTOGRAM_BINS)]
    pub bins: usize,

    /// DuckDB database location
    #[arg(long, default_value = IN_MEMORY_DATABASE)]
    pub database: String,

    /// Write a JSON report into this directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Exit with status 1 if any query or dataset failed
    #[arg(long, default_value_t = false)]
    pub fail_on_error: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output Parquet file
    #[arg(long)]
    pub out: PathBuf,

    /// Number of events
    #[arg(long, default_value_t = 1000)]
    pub events: usize,

    /// RNG seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum jets per event
    #[arg(long, default_value_t = 8)]
    pub max_jets: usize,

    /// Maximum muons per event
    #[arg(long, default_value_t = 4)]
    pub max_muons: usize,
}

impl Cli {
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level `{}`", self.log_level))
    }
}

/// Everything a benchmark run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub datasets: Vec<PathBuf>,
    pub queries: QuerySet,
    pub settings: RunSettings,
    pub plot: PlotMode,
    pub database: String,
    pub report_dir: Option<PathBuf>,
    pub fail_on_error: bool,
}

impl BenchConfig {
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        let datasets = if args.datasets.is_empty() {
            DEFAULT_DATASETS.iter().map(PathBuf::from).collect()
        } else {
            args.datasets.clone()
        };

        let mut queries = load_queries(args.queries.as_ref())?;
        if !args.only.is_empty() {
            let (subset, unknown) = queries.filtered(&args.only);
            if !unknown.is_empty() {
                bail!("unknown query ids: {}", unknown.join(", "));
            }
            queries = subset;
        }

        if args.bins == 0 {
            bail!("--bins must be at least 1");
        }

        Ok(Self {
            datasets,
            queries,
            settings: RunSettings {
                histograms: args.plot.enabled(),
                bins: args.bins,
            },
            plot: args.plot,
            database: args.database.clone(),
            report_dir: args.report_dir.clone(),
            fail_on_error: args.fail_on_error,
        })
    }
}

pub fn load_queries(path: Option<&PathBuf>) -> Result<QuerySet> {
    match path {
        Some(path) => QuerySet::from_json_file(path)
            .with_context(|| format!("cannot load queries from {}", path.display())),
        None => Ok(QuerySet::builtin()),
    }
}
