//! Pipeline controller - the public facade of the animation pipeline.
//!
//! Owns the pre-render buffer, the producer thread and the sync bridge, and
//! exposes the lifecycle operations a display consumer needs:
//!
//! ```text
//!          start            pause
//!   Idle ────────► Running ◄──────► Paused
//!                    │      resume    │
//!                    └──── stop ──────┴────► Stopped ──start──► Running
//! ```
//!
//! Lifecycle operations are idempotent: starting a running pipeline or
//! stopping a stopped one does nothing. `stop` joins the producer thread
//! before returning. A producer thread that dies on its own (a panic in the
//! renderer) is noticed by the next lifecycle call or [`check_producer`],
//! which joins it and moves the pipeline to `Stopped` so it can be restarted.
//!
//! [`check_producer`]: PipelineController::check_producer

use crate::config::{ConfigPatch, PipelineConfig, PlaybackConfig};
use crate::error::{GaitVisError, Result, ResultExt};
use crate::pipeline::bridge::EventReceiver;
use crate::pipeline::buffer::{BufferReader, PrerenderBuffer};
use crate::pipeline::producer::{
    Producer, ProducerCommand, ProducerContext, ProducerShared, SessionData,
};
use crate::pipeline::sync::{ExternalPosition, MasterClock, SyncBridge};
use crate::types::{PlaybackState, SensorFrame, SensorLayout, Side};
use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Channel capacity for commands (controller → producer).
const CMD_CHANNEL_CAPACITY: usize = 256;

const PRODUCER_THREAD_NAME: &str = "heatmap-producer";

/// Handle to a running producer thread.
struct Worker {
    cmd_tx: Sender<ProducerCommand>,
    join: JoinHandle<ProducerContext>,
}

/// Facade over the renderer, buffer, producer and sync bridge.
pub struct PipelineController {
    playback: PlaybackConfig,
    shared: Arc<ProducerShared>,
    reader: BufferReader,
    data: Arc<SessionData>,
    /// Present whenever no producer thread is running
    context: Option<ProducerContext>,
    worker: Option<Worker>,
    state: PlaybackState,
    sync: SyncBridge,
    session: u64,
}

impl PipelineController {
    /// Create an idle controller with no data loaded
    ///
    /// # Errors
    ///
    /// [`GaitVisError::Configuration`] if `config` fails validation.
    pub fn new(config: PipelineConfig, playback: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let (writer, reader) = PrerenderBuffer::new(playback.buffer_capacity);
        let shared = Arc::new(ProducerShared::new(config, playback.event_queue_capacity));
        let data = Arc::new(SessionData::default());
        let mut context = ProducerContext::new(writer, data.clone(), playback.trail_reset_gap);
        context.set_synced(playback.start_in_sync);

        tracing::debug!(
            buffer_capacity = reader.capacity(),
            policy = %playback.frame_count_policy,
            "Pipeline controller created"
        );

        Ok(Self {
            sync: SyncBridge::new(playback.start_in_sync),
            playback,
            shared,
            reader,
            data,
            context: Some(context),
            worker: None,
            state: PlaybackState::Idle,
            session: 0,
        })
    }

    /// Load new sensor sequences and layout
    ///
    /// Stops a running producer, clears the buffer and trails and resets the
    /// position to 0. Playback must be restarted explicitly.
    ///
    /// # Errors
    ///
    /// [`GaitVisError::DataShape`] if any frame's reading count differs from
    /// its side's sensor count. Nothing changes in that case.
    pub fn set_data(
        &mut self,
        left: Vec<SensorFrame>,
        right: Vec<SensorFrame>,
        layout: SensorLayout,
    ) -> Result<()> {
        for (side, frames) in [(Side::Left, &left), (Side::Right, &right)] {
            let expected = layout.sensor_count(side);
            if let Some(bad) = frames.iter().find(|f| f.readings.len() != expected) {
                return Err(GaitVisError::DataShape {
                    side,
                    frame: bad.index,
                    expected,
                    actual: bad.readings.len(),
                });
            }
        }

        let was_active = self.state.is_active();
        self.stop();

        self.session += 1;
        let data = Arc::new(SessionData::new(
            left,
            right,
            layout,
            self.playback.frame_count_policy,
            self.session,
        ));
        self.data = data.clone();
        self.context_mut().reset(data);
        self.shared.reset_counters(0);
        self.sync.reset();
        if was_active {
            self.state = PlaybackState::Stopped;
        }

        tracing::info!(
            session = self.session,
            frames = self.data.frame_count(),
            left_frames = self.data.left.len(),
            right_frames = self.data.right.len(),
            "Loaded sensor data"
        );
        Ok(())
    }

    /// Apply a partial config update
    ///
    /// The new snapshot is picked up by the next render; the producer keeps
    /// running.
    ///
    /// # Errors
    ///
    /// [`GaitVisError::Configuration`] if the result fails validation. The
    /// previous config stays in effect.
    pub fn update_config(&mut self, patch: ConfigPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let current = self.shared.config_snapshot();
        let updated = patch.apply(&current);
        updated.validate()?;
        if patch.target_rate_hz.is_some() {
            self.shared.rate.set_rate(updated.target_rate_hz);
        }
        tracing::debug!(?patch, "Config updated");
        self.shared.replace_config(updated);
        Ok(())
    }

    /// Start producing frames
    ///
    /// No-op while running or paused, and (with a warning) when no frames
    /// are loaded.
    ///
    /// # Errors
    ///
    /// [`GaitVisError::Io`] if the producer thread cannot be spawned.
    pub fn start(&mut self) -> Result<()> {
        self.check_producer();
        if self.state.is_active() {
            tracing::debug!(state = %self.state, "start ignored, producer already active");
            return Ok(());
        }
        if self.data.frame_count() == 0 {
            tracing::warn!("start ignored, no sensor frames loaded");
            return Ok(());
        }
        let context = self.context.take().unwrap_or_else(|| self.fresh_context());

        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        self.shared.reset_counters(context.next_index());
        let producer = Producer::new(
            context,
            self.shared.clone(),
            cmd_rx,
            self.playback.rate_report_interval(),
            self.playback.stall_streak,
        );

        let spawned = std::thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.into())
            .spawn(move || producer.run())
            .context("Failed to spawn producer thread");
        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                tracing::error!(error = %e, "Producer thread failed to start");
                self.context = Some(self.fresh_context());
                return Err(e);
            }
        };

        self.worker = Some(Worker { cmd_tx, join });
        self.state = PlaybackState::Running;
        tracing::info!(
            frames = self.data.frame_count(),
            target_hz = self.shared.rate.target_rate(),
            "Pipeline started"
        );
        Ok(())
    }

    /// Stop and join the producer thread
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.cmd_tx.send(ProducerCommand::Shutdown);
        self.join_worker(worker);
        tracing::info!("Pipeline stopped");
    }

    /// Reap a producer thread that exited without being stopped
    ///
    /// Joins it, rebuilds its state if it panicked and moves to `Stopped`.
    /// Returns whether a dead producer was found.
    pub fn check_producer(&mut self) -> bool {
        if !self.worker.as_ref().is_some_and(|w| w.join.is_finished()) {
            return false;
        }
        if let Some(worker) = self.worker.take() {
            self.join_worker(worker);
            tracing::error!("Producer thread exited unexpectedly, pipeline stopped");
        }
        true
    }

    /// Halt advancement, keeping the producer thread alive
    pub fn pause(&mut self) {
        self.check_producer();
        if self.state.is_running() && self.send(ProducerCommand::Pause) {
            self.state = PlaybackState::Paused;
            tracing::info!("Pipeline paused");
        }
    }

    pub fn resume(&mut self) {
        self.check_producer();
        if self.state.is_paused() && self.send(ProducerCommand::Resume) {
            self.state = PlaybackState::Running;
            tracing::info!("Pipeline resumed");
        }
    }

    /// Change the production rate; returns the clamped rate in effect
    pub fn set_rate(&mut self, hz: f64) -> f64 {
        let hz = self.shared.rate.set_rate(hz);
        let mut config = (*self.shared.config_snapshot()).clone();
        config.target_rate_hz = hz;
        self.shared.replace_config(config);
        tracing::debug!(hz, "Target rate changed");
        hz
    }

    /// Make `index` the next frame to render, clamped to `[0, N - 1]`
    ///
    /// While running this applies at the start of the next cycle. While
    /// paused the frame is rendered once without resuming. Returns the
    /// clamped index.
    pub fn seek(&mut self, index: usize) -> usize {
        let n = self.data.frame_count();
        if n == 0 {
            return 0;
        }
        let target = index.min(n - 1);
        if !self.send(ProducerCommand::Seek(target)) {
            self.context_mut().apply_seek(target);
        }
        target
    }

    /// Follow the external clock instead of self-advancing
    ///
    /// Buffer and trails are kept across toggles.
    pub fn set_sync_enabled(&mut self, enabled: bool) {
        if !self.sync.set_enabled(enabled) {
            return;
        }
        if !self.send(ProducerCommand::SetSynced(enabled)) {
            self.context_mut().set_synced(enabled);
        }
        tracing::info!(enabled, "External sync toggled");
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.is_enabled()
    }

    /// Feed an external timeline position; seeks when sync is enabled
    ///
    /// Returns the seek target, if a seek was issued.
    pub fn external_advance(&mut self, external_frame: u64, external_total: u64) -> Option<usize> {
        let position = ExternalPosition::new(external_frame, external_total);
        let target = self.sync.on_external_advance(position, self.data.frame_count())?;
        Some(self.seek(target))
    }

    /// Poll `clock` and follow it when sync is enabled
    pub fn sync_to(&mut self, clock: &dyn MasterClock) -> Option<usize> {
        let target = self.sync.poll(clock, self.data.frame_count())?;
        Some(self.seek(target))
    }

    /// Register a new consumer of frame-ready and rate events
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.subscribers.subscribe()
    }

    /// Read handle to the pre-render buffer
    pub fn reader(&self) -> BufferReader {
        self.reader.clone()
    }

    /// Effective frame count `N` of the loaded data
    pub fn frame_count(&self) -> usize {
        self.data.frame_count()
    }

    /// Index of the most recently rendered frame
    pub fn current_frame_index(&self) -> usize {
        self.shared.current_index()
    }

    /// Lifecycle state; `Stopped` as soon as the producer thread has died
    pub fn playback_state(&self) -> PlaybackState {
        if self.worker.as_ref().is_some_and(|w| w.join.is_finished()) {
            return PlaybackState::Stopped;
        }
        self.state
    }

    /// Production rate over the last second, 0.0 when not producing
    pub fn measured_rate(&self) -> f64 {
        self.shared.measured_hz()
    }

    pub fn target_rate(&self) -> f64 {
        self.shared.rate.target_rate()
    }

    /// Frames rendered since the producer last started
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames_rendered()
    }

    /// Current config snapshot
    pub fn config(&self) -> Arc<PipelineConfig> {
        self.shared.config_snapshot()
    }

    pub fn playback_config(&self) -> &PlaybackConfig {
        &self.playback
    }

    /// Generation number of the loaded data; images carry it as `session`
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Send a command to the producer thread
    ///
    /// Returns false when there is no producer. A producer that hung up is
    /// reaped, leaving the pipeline `Stopped`.
    fn send(&mut self, cmd: ProducerCommand) -> bool {
        let Some(worker) = &self.worker else {
            return false;
        };
        if worker.cmd_tx.send(cmd).is_ok() {
            return true;
        }
        tracing::error!(?cmd, "Producer thread is gone, pipeline stopped");
        if let Some(worker) = self.worker.take() {
            self.join_worker(worker);
        }
        false
    }

    /// Join `worker` and take back its context, rebuilding it after a panic
    fn join_worker(&mut self, worker: Worker) {
        match worker.join.join() {
            Ok(context) => self.context = Some(context),
            Err(_) => {
                tracing::error!("Producer thread panicked, resetting its state");
                self.context = Some(self.fresh_context());
            }
        }
        self.shared.set_measured_hz(0.0);
        self.state = PlaybackState::Stopped;
    }

    fn context_mut(&mut self) -> &mut ProducerContext {
        let Self {
            context,
            reader,
            data,
            playback,
            sync,
            ..
        } = self;
        context.get_or_insert_with(|| build_context(reader, data, playback, sync))
    }

    /// A context for the current data, used when the previous one was lost
    fn fresh_context(&self) -> ProducerContext {
        build_context(&self.reader, &self.data, &self.playback, &self.sync)
    }
}

fn build_context(
    reader: &BufferReader,
    data: &Arc<SessionData>,
    playback: &PlaybackConfig,
    sync: &SyncBridge,
) -> ProducerContext {
    let mut context = ProducerContext::new(reader.reclaim_writer(), data.clone(), playback.trail_reset_gap);
    context.set_synced(sync.is_enabled());
    context
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}
