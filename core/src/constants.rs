//! Constants shared by the benchmark crates.

/// Name of the single working table each dataset is loaded into.
pub const WORKING_TABLE: &str = "hep_data";

/// Number of buckets used for result histograms.
pub const HISTOGRAM_BINS: usize = 100;

/// Axis labels for rendered histograms.
pub const HISTOGRAM_X_LABEL: &str = "Value";
pub const HISTOGRAM_Y_LABEL: &str = "Frequency";

/// Default in-process database location.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Default datasets: CMS 2012B SingleMu open data, 1000 and 4000 event slices.
pub const DEFAULT_DATASETS: [&str; 2] = [
    "data/Run2012B_SingleMu_1000.parquet",
    "data/Run2012B_SingleMu_4000.parquet",
];
