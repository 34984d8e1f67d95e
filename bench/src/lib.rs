//! HEP query benchmark
//!
//! Loads CMS NanoAOD-style Parquet datasets into DuckDB, one at a time, and
//! times a catalog of event-selection queries (jet and muon kinematics over
//! nested list columns) against each of them. Successful runs are summarised;
//! failed queries are reported and never stop the run.
//!
//! Run: `cargo run --release -- run data/*.parquet`
//! Generate a dataset: `cargo run --release -- generate --out data/synthetic.parquet`
//! Run benchmarks: `cargo bench`

pub mod config;
pub mod engine;
pub mod histogram;
pub mod render;
pub mod report;
pub mod runner;
pub mod synthetic;
