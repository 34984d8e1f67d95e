use super::HistogramRenderer;
use crate::histogram::Histogram;
use anyhow::Result;
use bench_core::constants::{HISTOGRAM_X_LABEL, HISTOGRAM_Y_LABEL};
use std::io::{self, Write};

const BAR_WIDTH: usize = 50;

/// Horizontal bar chart, one row per non-empty bucket.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl TextRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HistogramRenderer for TextRenderer<W> {
    fn render(&mut self, histogram: &Histogram, title: &str) -> Result<()> {
        let peak = histogram.max_count().max(1);
        let edges = histogram.edges();

        writeln!(
            self.out,
            "\n  {title}  ({} values in [{:.3}, {:.3}], {} buckets)",
            histogram.total(),
            histogram.min,
            histogram.max,
            histogram.bins()
        )?;
        writeln!(
            self.out,
            "  {:>23} | {}",
            HISTOGRAM_X_LABEL, HISTOGRAM_Y_LABEL
        )?;
        writeln!(self.out, "  {}", "-".repeat(26 + BAR_WIDTH))?;

        for (i, &count) in histogram.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let len = ((count as f64 / peak as f64) * BAR_WIDTH as f64).ceil() as usize;
            writeln!(
                self.out,
                "  [{:>10.3}, {:>10.3}) | {} {}",
                edges[i],
                edges[i + 1],
                "#".repeat(len),
                count
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}
