//! Histogram renderers.
//!
//! - [`window::WindowRenderer`]: blocking native window, returns once closed
//! - [`text::TextRenderer`]: bar chart written to a terminal or any writer
//! - [`NoopRenderer`]: draws nothing

pub mod text;
pub mod window;

use crate::histogram::Histogram;
use anyhow::Result;
use clap::ValueEnum;

/// Something that can display a histogram of query results.
///
/// Rendering is synchronous: `render` returns only when the output is done
/// (for a window, when the user closes it).
pub trait HistogramRenderer {
    fn render(&mut self, histogram: &Histogram, title: &str) -> Result<()>;
}

impl<R: HistogramRenderer + ?Sized> HistogramRenderer for Box<R> {
    fn render(&mut self, histogram: &Histogram, title: &str) -> Result<()> {
        (**self).render(histogram, title)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl HistogramRenderer for NoopRenderer {
    fn render(&mut self, _histogram: &Histogram, _title: &str) -> Result<()> {
        Ok(())
    }
}

/// How result histograms are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotMode {
    /// One blocking window per query.
    Window,
    /// ASCII bar chart on stdout.
    Text,
    /// No histograms.
    None,
}

impl PlotMode {
    pub fn renderer(self) -> Box<dyn HistogramRenderer> {
        match self {
            PlotMode::Window => Box::new(window::WindowRenderer::default()),
            PlotMode::Text => Box::new(text::TextRenderer::stdout()),
            PlotMode::None => Box::new(NoopRenderer),
        }
    }

    pub fn enabled(self) -> bool {
        self != PlotMode::None
    }
}
