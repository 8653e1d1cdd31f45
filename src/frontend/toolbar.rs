//! Toolbar panel - dataset, playback, rate and rendering controls.

use egui::{Color32, RichText, Ui};

use crate::config::{ConfigPatch, MAX_RATE_HZ, MIN_RATE_HZ};
use crate::frontend::state::{ControlState, ViewerAction};
use crate::types::PlaybackState;

/// Context needed to render the toolbar.
pub struct ToolbarContext<'a> {
    pub state: PlaybackState,
    pub frame_count: usize,
    pub current_index: usize,
    pub sync_enabled: bool,
    pub controls: &'a mut ControlState,
}

/// Render the toolbar.
///
/// Returns the actions to be applied by the app.
pub fn render_toolbar(ui: &mut Ui, ctx: ToolbarContext<'_>) -> Vec<ViewerAction> {
    let ToolbarContext {
        state,
        frame_count,
        current_index,
        sync_enabled,
        controls,
    } = ctx;
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;
        render_dataset_group(ui, controls, &mut actions);
        ui.separator();
        render_playback_group(ui, state, frame_count > 0, sync_enabled, &mut actions);
    });

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 6.0;
        render_seek_group(ui, controls, frame_count, current_index, sync_enabled, &mut actions);
        ui.separator();
        render_rendering_group(ui, controls, &mut actions);
    });

    actions
}

fn render_dataset_group(ui: &mut Ui, controls: &mut ControlState, actions: &mut Vec<ViewerAction>) {
    ui.label("Dataset:");
    let response = ui.add(
        egui::TextEdit::singleline(&mut controls.dataset_input)
            .hint_text("directory with L.csv / R.csv")
            .desired_width(260.0),
    );
    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
    if (ui.button("Load").clicked() || submitted) && !controls.dataset_input.trim().is_empty() {
        actions.push(ViewerAction::LoadDataset(controls.dataset_input.trim().into()));
    }
}

fn render_playback_group(
    ui: &mut Ui,
    state: PlaybackState,
    has_data: bool,
    sync_enabled: bool,
    actions: &mut Vec<ViewerAction>,
) {
    match state {
        PlaybackState::Running => {
            if ui.button("⏸ Pause").clicked() {
                actions.push(ViewerAction::Pause);
            }
        }
        _ => {
            if ui.add_enabled(has_data, egui::Button::new("▶ Play")).clicked() {
                actions.push(ViewerAction::Play);
            }
        }
    }
    if ui
        .add_enabled(state.is_active(), egui::Button::new("⏹ Stop"))
        .clicked()
    {
        actions.push(ViewerAction::Stop);
    }

    let mut sync = sync_enabled;
    if ui.checkbox(&mut sync, "Sync to video").changed() {
        actions.push(ViewerAction::SetSync(sync));
    }

    let (color, text) = match state {
        PlaybackState::Running => (Color32::GREEN, "Running"),
        PlaybackState::Paused => (Color32::YELLOW, "Paused"),
        PlaybackState::Stopped => (Color32::GRAY, "Stopped"),
        PlaybackState::Idle => (Color32::GRAY, "Idle"),
    };
    ui.colored_label(color, "●");
    ui.label(RichText::new(text).small());
}

fn render_seek_group(
    ui: &mut Ui,
    controls: &mut ControlState,
    frame_count: usize,
    current_index: usize,
    sync_enabled: bool,
    actions: &mut Vec<ViewerAction>,
) {
    ui.label("Frame:");
    let last = frame_count.saturating_sub(1);
    let slider = egui::Slider::new(&mut controls.seek_index, 0..=last);
    let response = ui.add_enabled(frame_count > 0 && !sync_enabled, slider);
    if response.changed() {
        actions.push(ViewerAction::Seek(controls.seek_index));
    } else if !response.dragged() {
        controls.seek_index = current_index.min(last);
    }
}

fn render_rendering_group(ui: &mut Ui, controls: &mut ControlState, actions: &mut Vec<ViewerAction>) {
    let rate = ui.add(
        egui::Slider::new(&mut controls.rate_hz, MIN_RATE_HZ..=MAX_RATE_HZ)
            .text("Hz")
            .integer(),
    );
    if rate.changed() {
        actions.push(ViewerAction::SetRate(controls.rate_hz));
    }

    let radius = ui.add(egui::Slider::new(&mut controls.radius, 10.0..=200.0).text("Radius"));
    if radius.changed() {
        actions.push(ViewerAction::UpdateConfig(ConfigPatch::new().radius(controls.radius)));
    }

    let smoothness = ui.add(
        egui::Slider::new(&mut controls.smoothness, 0.5..=8.0).text("Smoothness"),
    );
    if smoothness.changed() {
        actions.push(ViewerAction::UpdateConfig(
            ConfigPatch::new().smoothness(controls.smoothness),
        ));
    }
}
