use super::HistogramRenderer;
use crate::histogram::Histogram;
use anyhow::{anyhow, Result};
use bench_core::constants::{HISTOGRAM_X_LABEL, HISTOGRAM_Y_LABEL};
use eframe::egui;
use std::f32::consts::FRAC_PI_2;

const MARGIN_LEFT: f32 = 70.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 10.0;
const MARGIN_BOTTOM: f32 = 50.0;

/// Opens a native window per histogram and blocks until it is closed.
#[derive(Debug, Clone)]
pub struct WindowRenderer {
    pub size: [f32; 2],
}

impl Default for WindowRenderer {
    fn default() -> Self {
        Self {
            size: [900.0, 600.0],
        }
    }
}

impl HistogramRenderer for WindowRenderer {
    fn render(&mut self, histogram: &Histogram, title: &str) -> Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(self.size)
                .with_title(title),
            run_and_return: true,
            ..Default::default()
        };

        let app = HistogramApp {
            title: title.to_string(),
            histogram: histogram.clone(),
        };
        eframe::run_native(title, options, Box::new(|_cc| Ok(Box::new(app))))
            .map_err(|e| anyhow!("cannot open histogram window: {e}"))
    }
}

struct HistogramApp {
    title: String,
    histogram: Histogram,
}

impl eframe::App for HistogramApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading(&self.title);
            });
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            draw_histogram(&painter, response.rect, &self.histogram);
        });
    }
}

fn draw_histogram(painter: &egui::Painter, area: egui::Rect, histogram: &Histogram) {
    let text_color = painter.ctx().style().visuals.text_color();
    let font = egui::FontId::proportional(13.0);
    let plot = egui::Rect::from_min_max(
        area.min + egui::vec2(MARGIN_LEFT, MARGIN_TOP),
        area.max - egui::vec2(MARGIN_RIGHT, MARGIN_BOTTOM),
    );
    if plot.width() <= 0.0 || plot.height() <= 0.0 {
        return;
    }

    let peak = histogram.max_count().max(1) as f32;
    let bar_width = plot.width() / histogram.bins() as f32;
    let fill = egui::Color32::from_rgb(31, 119, 180);
    let edge = egui::Stroke::new(0.5, egui::Color32::BLACK);

    for (i, &count) in histogram.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let left = plot.left() + bar_width * i as f32;
        let top = plot.bottom() - plot.height() * (count as f32 / peak);
        let bar = egui::Rect::from_min_max(
            egui::pos2(left, top),
            egui::pos2(left + bar_width, plot.bottom()),
        );
        painter.rect_filled(bar, 0.0, fill);
        painter.rect_stroke(bar, 0.0, edge);
    }

    let axis = egui::Stroke::new(1.0, text_color);
    painter.line_segment([plot.left_bottom(), plot.right_bottom()], axis);
    painter.line_segment([plot.left_bottom(), plot.left_top()], axis);

    // Ticks: both ends and the middle of each axis.
    for frac in [0.0f32, 0.5, 1.0] {
        let x = plot.left() + plot.width() * frac;
        let value = histogram.min + (histogram.max - histogram.min) * frac as f64;
        painter.line_segment(
            [egui::pos2(x, plot.bottom()), egui::pos2(x, plot.bottom() + 4.0)],
            axis,
        );
        painter.text(
            egui::pos2(x, plot.bottom() + 6.0),
            egui::Align2::CENTER_TOP,
            format!("{value:.2}"),
            font.clone(),
            text_color,
        );

        let y = plot.bottom() - plot.height() * frac;
        let count = (peak * frac).round() as u64;
        painter.line_segment([egui::pos2(plot.left() - 4.0, y), egui::pos2(plot.left(), y)], axis);
        painter.text(
            egui::pos2(plot.left() - 6.0, y),
            egui::Align2::RIGHT_CENTER,
            count.to_string(),
            font.clone(),
            text_color,
        );
    }

    painter.text(
        egui::pos2(plot.center().x, area.bottom() - 4.0),
        egui::Align2::CENTER_BOTTOM,
        HISTOGRAM_X_LABEL,
        font.clone(),
        text_color,
    );

    let galley = painter.layout_no_wrap(HISTOGRAM_Y_LABEL.to_string(), font, text_color);
    let anchor = egui::pos2(area.left() + 4.0, plot.center().y + galley.size().x / 2.0);
    painter.add(egui::Shape::Text(
        egui::epaint::TextShape::new(anchor, galley, text_color).with_angle(-FRAC_PI_2),
    ));
}
