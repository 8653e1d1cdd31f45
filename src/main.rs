//! Gait Heatmap Viewer - Main Entry Point
//!
//! Plays pressure heatmap animations rendered by the background pipeline.
//! An optional first argument names a dataset directory to open on start.

use anyhow::Context;
use gaitvis_rs::{
    config::{app_data_dir, ensure_dir, AppConfig},
    frontend::HeatmapViewerApp,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber; the guard flushes the log file on drop
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let file_writer = app_data_dir()
        .map(|dir| dir.join("logs"))
        .filter(|dir| ensure_dir(dir).is_ok())
        .map(|dir| {
            let appender = tracing_appender::rolling::daily(dir, "gaitvis.log");
            tracing_appender::non_blocking(appender)
        });
    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gaitvis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    tracing::info!("Starting Gait Heatmap Viewer");

    let config = AppConfig::load_or_default();
    let dataset = std::env::args_os().nth(1).map(PathBuf::from);
    if let Some(dir) = &dataset {
        tracing::info!("Opening dataset from command line: {:?}", dir);
    }

    let [width, height] = config.viewer.window_size;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Gait Heatmap Viewer"),
        ..Default::default()
    };

    eframe::run_native(
        "Gait Heatmap Viewer",
        native_options,
        Box::new(move |cc| {
            let app = HeatmapViewerApp::new(cc, config, dataset)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("Viewer exited with an error")?;

    tracing::info!("Shutting down");
    Ok(())
}
