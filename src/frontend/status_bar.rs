//! Status bar panel - bottom bar showing rate, frame and error info.

use egui::{Color32, RichText, Ui};

use crate::types::RateReport;

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub report: Option<&'a RateReport>,
    pub target_hz: f64,
    pub current_index: usize,
    pub frame_count: usize,
    pub buffered: usize,
    pub dataset: Option<&'a str>,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Measured rate ===
        let measured = ctx.report.map(|r| r.measured_hz).unwrap_or(0.0);
        let stalled = ctx.report.is_some_and(|r| r.stalled);
        let rate_color = if stalled {
            Color32::LIGHT_RED
        } else if measured > 0.0 {
            Color32::from_rgb(100, 255, 100)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new("Rate:").small());
        ui.colored_label(
            rate_color,
            RichText::new(format!("{:.1} / {:.0} Hz", measured, ctx.target_hz)).small(),
        );
        if let Some(report) = ctx.report.filter(|r| r.target_hz > 0.0) {
            ui.label(RichText::new(format!("({:.0}%)", report.efficiency() * 100.0)).small());
        }
        if stalled {
            ui.colored_label(Color32::LIGHT_RED, RichText::new("stalled").small());
        }

        ui.separator();

        ui.label(RichText::new(format!("Frame: {} / {}", ctx.current_index, ctx.frame_count)).small());

        ui.separator();

        ui.label(RichText::new(format!("Buffered: {}", ctx.buffered)).small());

        if let Some(report) = ctx.report {
            ui.separator();
            ui.label(RichText::new(format!("Render: {:.0} μs", report.avg_render_time_us)).small());
            if report.dropped_events > 0 {
                ui.separator();
                ui.colored_label(
                    Color32::YELLOW,
                    RichText::new(format!("Dropped: {}", report.dropped_events)).small(),
                );
            }
        }

        if let Some(dataset) = ctx.dataset {
            ui.separator();
            ui.label(RichText::new(dataset).small());
        }

        // === Error message (right-aligned) ===
        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
