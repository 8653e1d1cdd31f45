//! Frontend module for the egui viewer
//!
//! A thin display consumer of the heatmap pipeline. The viewer owns a
//! [`PipelineController`], drains its events every repaint and shows the
//! newest frame as a texture. Rendering never happens on the UI thread.
//!
//! # Main Types
//!
//! - [`HeatmapViewerApp`] - Main application state implementing [`eframe::App`]
//! - [`SimulatedVideoClock`] - Master clock used when sync is enabled
//!
//! # Submodules
//!
//! - `toolbar` - Dataset, playback, rate and rendering controls
//! - `status_bar` - Measured rate, frame position and errors
//! - `state` - Actions emitted by the panels

pub mod state;
pub mod status_bar;
pub mod toolbar;
pub mod video_clock;

pub use state::{ControlState, ViewerAction};
pub use video_clock::SimulatedVideoClock;

use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::{EventReceiver, PipelineController};
use crate::types::{RateReport, RenderedImage};
use status_bar::{render_status_bar, StatusBarContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolbar::{render_toolbar, ToolbarContext};

/// Main application state for the heatmap viewer
pub struct HeatmapViewerApp {
    controller: PipelineController,
    events: EventReceiver,
    config: AppConfig,
    controls: ControlState,
    clock: SimulatedVideoClock,

    texture: Option<egui::TextureHandle>,
    /// Frame currently uploaded to `texture`
    shown: Option<Arc<RenderedImage>>,
    last_report: Option<RateReport>,
    dataset_label: Option<String>,
    last_error: Option<String>,
}

impl HeatmapViewerApp {
    /// Create the viewer, loading `dataset` (or the last used directory) if given
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        dataset: Option<PathBuf>,
    ) -> Result<Self> {
        if config.viewer.dark_mode {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }

        let controller = PipelineController::new(config.pipeline.clone(), config.playback.clone())?;
        let events = controller.subscribe();
        let clock = SimulatedVideoClock::new(config.viewer.video_fps, config.viewer.video_total_frames);
        let controls = ControlState::from_config(&config.pipeline);

        let mut app = Self {
            controller,
            events,
            controls,
            clock,
            config,
            texture: None,
            shown: None,
            last_report: None,
            dataset_label: None,
            last_error: None,
        };

        if let Some(dir) = dataset.or_else(|| app.config.viewer.last_dataset_dir.clone()) {
            app.controls.dataset_input = dir.display().to_string();
            app.load_dataset(&dir);
        }
        Ok(app)
    }

    fn load_dataset(&mut self, dir: &Path) {
        let result = Dataset::load_dir(dir).and_then(|dataset| {
            let (left, right, layout) = dataset.into_parts();
            self.controller.set_data(left, right, layout)
        });
        match result {
            Ok(()) => {
                self.config.viewer.last_dataset_dir = Some(dir.to_path_buf());
                self.dataset_label = dir
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                self.shown = None;
                self.last_report = None;
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!("Failed to load dataset {:?}: {}", dir, e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn handle_action(&mut self, action: ViewerAction) {
        match action {
            ViewerAction::Play => {
                if self.controller.playback_state().is_paused() {
                    self.controller.resume();
                } else if let Err(e) = self.controller.start() {
                    self.last_error = Some(e.to_string());
                }
                self.clock.play();
            }
            ViewerAction::Pause => {
                self.controller.pause();
                self.clock.pause();
            }
            ViewerAction::Stop => {
                self.controller.stop();
                self.clock.pause();
            }
            ViewerAction::Seek(index) => {
                self.controller.seek(index);
            }
            ViewerAction::SetRate(hz) => {
                self.controls.rate_hz = self.controller.set_rate(hz);
            }
            ViewerAction::UpdateConfig(patch) => {
                if let Err(e) = self.controller.update_config(patch) {
                    self.last_error = Some(e.to_string());
                }
            }
            ViewerAction::SetSync(enabled) => {
                self.controller.set_sync_enabled(enabled);
            }
            ViewerAction::LoadDataset(dir) => self.load_dataset(&dir),
        }
    }

    /// Pull pipeline events and upload the newest frame of the current session
    ///
    /// Returns whether anything changed.
    fn process_pipeline_events(&mut self, ctx: &egui::Context) -> bool {
        if self.controller.check_producer() {
            self.last_error = Some("Heatmap producer stopped unexpectedly, press Play to restart".into());
        }
        if self.controller.is_sync_enabled() && self.clock.is_playing() {
            self.controller.sync_to(&self.clock);
        }

        let (frame, report) = self.events.latest();
        if let Some(report) = report {
            self.last_report = Some(report);
        }

        let session = self.controller.session();
        let frame = frame.filter(|f| f.session == session).or_else(|| {
            // Nothing queued for a fresh viewer; the buffer still has the frame
            if self.shown.is_none() {
                self.controller
                    .reader()
                    .get_or_latest(self.controller.current_frame_index())
            } else {
                None
            }
        });

        let Some(frame) = frame else {
            return report.is_some();
        };
        if self.shown.as_ref().is_some_and(|shown| Arc::ptr_eq(shown, &frame)) {
            return false;
        }

        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.as_rgb_bytes());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("heatmap", image, egui::TextureOptions::LINEAR));
            }
        }
        self.shown = Some(frame);
        true
    }

    fn render_heatmap(&self, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            ui.centered_and_justified(|ui| {
                ui.label("Load a dataset directory and press Play");
            });
            return;
        };

        let available = ui.available_size();
        let tex_size = texture.size_vec2();
        let scale = (available.x / tex_size.x)
            .min(available.y / tex_size.y)
            .clamp(0.1, 4.0);
        ui.centered_and_justified(|ui| {
            ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(
                texture.id(),
                tex_size * scale,
            )));
        });
    }
}

impl eframe::App for HeatmapViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let changed = self.process_pipeline_events(ctx);

        let state = self.controller.playback_state();
        if state.is_active() || self.controller.is_sync_enabled() || changed {
            ctx.request_repaint();
        }

        let current_index = self.shown.as_ref().map(|f| f.index).unwrap_or(0);

        let actions = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                render_toolbar(
                    ui,
                    ToolbarContext {
                        state,
                        frame_count: self.controller.frame_count(),
                        current_index,
                        sync_enabled: self.controller.is_sync_enabled(),
                        controls: &mut self.controls,
                    },
                )
            })
            .inner;

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    report: self.last_report.as_ref(),
                    target_hz: self.controller.target_rate(),
                    current_index,
                    frame_count: self.controller.frame_count(),
                    buffered: self.controller.reader().len(),
                    dataset: self.dataset_label.as_deref(),
                    last_error: self.last_error.as_deref(),
                },
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_heatmap(ui);
        });

        for action in actions {
            self.handle_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.stop();

        self.config.pipeline = (*self.controller.config()).clone();
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {}", e);
        }
    }
}
