//! Fixed-width frequency histogram of a query's first result column.
//!
//! Binning follows the usual plotting-library conventions: the range spans
//! the finite minimum and maximum, a degenerate range is widened by 0.5 on
//! each side, an empty input uses `[0, 1]`, and the last bucket is closed so
//! that the maximum lands inside it.

/// Bucket counts over an evenly divided range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
    /// Values dropped because they were NaN or infinite.
    pub rejected: usize,
}

impl Histogram {
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let rejected = values.len() - finite.len();

        let (mut min, mut max) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if finite.is_empty() {
            min = 0.0;
            max = 1.0;
        } else if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let mut counts = vec![0u64; bins];
        let width = (max - min) / bins as f64;
        for v in finite {
            let idx = ((v - min) / width) as usize;
            counts[idx.min(bins - 1)] += 1;
        }

        Self {
            min,
            max,
            counts,
            rejected,
        }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins() as f64
    }

    /// `bins() + 1` bucket boundaries from `min` to `max`.
    pub fn edges(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..=self.bins())
            .map(|i| {
                if i == self.bins() {
                    self.max
                } else {
                    self.min + width * i as f64
                }
            })
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
