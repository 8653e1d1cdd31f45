//! Frame producer - the background render loop.
//!
//! The producer runs on a dedicated thread. Each cycle:
//! 1. Drain commands from the controller.
//! 2. Wait for the next deadline from the [`RateController`].
//! 3. Read the config snapshot and render the next index.
//! 4. Store the image in the pre-render buffer and broadcast `FrameReady`.
//! 5. Advance `(i + 1) mod N`, unless following an external clock.
//! 6. Periodically broadcast a [`RateReport`].
//!
//! While paused, or while synced with no pending seek, the thread blocks on
//! its command channel instead of spinning. On shutdown the thread hands its
//! [`ProducerContext`] back through the join handle so the next start
//! continues with the same trail and position.

use crate::config::{FrameCountPolicy, PipelineConfig};
use crate::error::{GaitVisError, Result};
use crate::heatmap::{FrameRequest, HeatmapRenderer, TrailState};
use crate::pipeline::bridge::{PipelineEvent, Subscribers};
use crate::pipeline::buffer::BufferWriter;
use crate::pipeline::rate::{wait_until, RateController, RateHandle};
use crate::types::{RateReport, RenderedImage, SensorFrame, SensorLayout};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Remaining wait below which the producer spins instead of blocking.
const SPIN_THRESHOLD: Duration = Duration::from_millis(2);

/// Commands sent from the controller to the producer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerCommand {
    /// Halt advancement, keeping the thread alive.
    Pause,
    /// Continue advancing from the current index.
    Resume,
    /// Render this index next.
    Seek(usize),
    /// Follow seeks only (`true`) or self-advance (`false`).
    SetSynced(bool),
    /// Exit the loop and return the context.
    Shutdown,
}

/// Sensor sequences and layout of one loaded dataset.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub left: Vec<SensorFrame>,
    pub right: Vec<SensorFrame>,
    pub layout: SensorLayout,
    /// Generation number stamped on every image rendered from this data
    pub session: u64,
    frame_count: usize,
}

impl SessionData {
    pub fn new(
        left: Vec<SensorFrame>,
        right: Vec<SensorFrame>,
        layout: SensorLayout,
        policy: FrameCountPolicy,
        session: u64,
    ) -> Self {
        let frame_count = policy.effective_count(left.len(), right.len());
        Self {
            left,
            right,
            layout,
            session,
            frame_count,
        }
    }

    /// Effective number of frames `N`
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Frames of both sides at `index`
    ///
    /// A side shorter than `N` wraps around its own length. A side without
    /// frames yields `None`.
    pub fn frame_pair(&self, index: usize) -> (Option<&SensorFrame>, Option<&SensorFrame>) {
        (wrapped(&self.left, index), wrapped(&self.right, index))
    }
}

fn wrapped(frames: &[SensorFrame], index: usize) -> Option<&SensorFrame> {
    if frames.is_empty() {
        None
    } else {
        frames.get(index % frames.len())
    }
}

/// Everything the render loop mutates, owned by whichever side is driving it.
///
/// Lives on the producer thread while it runs and is handed back to the
/// controller when the thread is joined.
#[derive(Debug)]
pub struct ProducerContext {
    data: Arc<SessionData>,
    renderer: HeatmapRenderer,
    trail: TrailState,
    writer: BufferWriter,
    next_index: usize,
    last_rendered: Option<usize>,
    synced: bool,
    trail_reset_gap: usize,
}

impl ProducerContext {
    pub fn new(writer: BufferWriter, data: Arc<SessionData>, trail_reset_gap: usize) -> Self {
        Self {
            data,
            renderer: HeatmapRenderer::new(),
            trail: TrailState::default(),
            writer,
            next_index: 0,
            last_rendered: None,
            synced: false,
            trail_reset_gap,
        }
    }

    /// Swap in new session data, clearing the buffer, trail and position
    pub fn reset(&mut self, data: Arc<SessionData>) {
        self.data = data;
        self.trail.clear();
        self.writer.clear();
        self.next_index = 0;
        self.last_rendered = None;
    }

    pub fn data(&self) -> &Arc<SessionData> {
        &self.data
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn last_rendered(&self) -> Option<usize> {
        self.last_rendered
    }

    pub fn trail(&self) -> &TrailState {
        &self.trail
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Switch between following seeks and self-advancing
    pub fn set_synced(&mut self, synced: bool) {
        if self.synced && !synced {
            // The seek target was already shown; free-running continues after it
            let n = self.data.frame_count();
            if n > 0 && self.last_rendered == Some(self.next_index) {
                self.next_index = (self.next_index + 1) % n;
            }
        }
        self.synced = synced;
    }

    /// Make `target` the next index to render
    ///
    /// Clears the trails unless the jump is a short forward step from the
    /// last rendered frame.
    pub fn apply_seek(&mut self, target: usize) -> usize {
        let n = self.data.frame_count();
        if n == 0 {
            return 0;
        }
        let target = target.min(n - 1);
        let sequential = match self.last_rendered {
            Some(last) => target >= last && target - last <= self.trail_reset_gap,
            None => true,
        };
        if !sequential {
            tracing::debug!(from = ?self.last_rendered, to = target, "Non-sequential seek, clearing trails");
            self.trail.clear();
        }
        self.next_index = target;
        target
    }

    /// Render the next index, store it and advance
    pub fn produce(&mut self, config: &PipelineConfig) -> Result<Arc<RenderedImage>> {
        let n = self.data.frame_count();
        if n == 0 {
            return Err(GaitVisError::Dataset("no frames loaded".into()));
        }
        let index = self.next_index.min(n - 1);
        let (left, right) = self.data.frame_pair(index);
        let request = FrameRequest::new(index, left, right).with_session(self.data.session);
        let image = self
            .renderer
            .render(request, &self.data.layout, &mut self.trail, config)?;

        let image = Arc::new(image);
        self.writer.put(image.clone());
        self.last_rendered = Some(index);
        if !self.synced {
            self.next_index = (index + 1) % n;
        }
        Ok(image)
    }
}

/// State shared between the controller and the producer thread.
#[derive(Debug)]
pub struct ProducerShared {
    config: RwLock<Arc<PipelineConfig>>,
    pub rate: RateHandle,
    pub subscribers: Subscribers,
    current_index: AtomicUsize,
    frames_rendered: AtomicU64,
    measured_hz: AtomicU64,
}

impl ProducerShared {
    pub fn new(config: PipelineConfig, event_queue_capacity: usize) -> Self {
        Self {
            rate: RateHandle::new(config.target_rate_hz),
            config: RwLock::new(Arc::new(config)),
            subscribers: Subscribers::new(event_queue_capacity),
            current_index: AtomicUsize::new(0),
            frames_rendered: AtomicU64::new(0),
            measured_hz: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// The current config; read once per render cycle
    pub fn config_snapshot(&self) -> Arc<PipelineConfig> {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn replace_config(&self, config: PipelineConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(config);
    }

    /// Index of the most recently rendered frame
    pub fn current_index(&self) -> usize {
        self.current_index.load(Ordering::Relaxed)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    pub fn measured_hz(&self) -> f64 {
        f64::from_bits(self.measured_hz.load(Ordering::Relaxed))
    }

    pub(crate) fn set_measured_hz(&self, hz: f64) {
        self.measured_hz.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn reset_counters(&self, index: usize) {
        self.current_index.store(index, Ordering::Relaxed);
        self.frames_rendered.store(0, Ordering::Relaxed);
        self.set_measured_hz(0.0);
    }
}

/// Producer loop state, moved onto the producer thread.
pub struct Producer {
    ctx: ProducerContext,
    shared: Arc<ProducerShared>,
    cmd_rx: Receiver<ProducerCommand>,
    rate: RateController,
    paused: bool,
    pending_render: bool,
    failing: bool,
    // Stall detection
    stall_streak: u32,
    over_budget: u32,
    stalled: bool,
    // Rate reports
    report_interval: Duration,
    last_report: Instant,
    render_time_sum: Duration,
    render_count: u32,
}

impl Producer {
    pub fn new(
        ctx: ProducerContext,
        shared: Arc<ProducerShared>,
        cmd_rx: Receiver<ProducerCommand>,
        report_interval: Duration,
        stall_streak: u32,
    ) -> Self {
        let rate = RateController::new(shared.rate.clone());
        Self {
            ctx,
            shared,
            cmd_rx,
            rate,
            paused: false,
            pending_render: false,
            failing: false,
            stall_streak: stall_streak.max(1),
            over_budget: 0,
            stalled: false,
            report_interval,
            last_report: Instant::now(),
            render_time_sum: Duration::ZERO,
            render_count: 0,
        }
    }

    /// Run until shutdown, then hand the context back.
    pub fn run(mut self) -> ProducerContext {
        tracing::info!(
            frames = self.ctx.data().frame_count(),
            start = self.ctx.next_index(),
            "Producer thread started"
        );

        'outer: loop {
            while let Ok(cmd) = self.cmd_rx.try_recv() {
                if !self.handle_command(cmd) {
                    break 'outer;
                }
            }

            if self.is_idle() {
                match self.cmd_rx.recv_timeout(self.report_interval) {
                    Ok(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => self.maybe_report(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                continue;
            }

            if !self.paused {
                let deadline = self.rate.next_deadline(Instant::now());
                loop {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let remaining = deadline - now;
                    if remaining <= SPIN_THRESHOLD {
                        wait_until(deadline);
                        break;
                    }
                    match self.cmd_rx.recv_timeout(remaining - SPIN_THRESHOLD / 2) {
                        Ok(cmd) => {
                            if !self.handle_command(cmd) {
                                break 'outer;
                            }
                            if self.is_idle() || self.paused {
                                self.rate.restart_schedule();
                                continue 'outer;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break 'outer,
                    }
                }
            }

            self.render_cycle();
            self.maybe_report();
        }

        tracing::info!(
            frames_rendered = self.shared.frames_rendered(),
            "Producer thread exiting"
        );
        self.ctx
    }

    /// Nothing to render until a command arrives
    fn is_idle(&self) -> bool {
        (self.paused || self.ctx.is_synced()) && !self.pending_render
    }

    /// Returns `false` on shutdown.
    fn handle_command(&mut self, cmd: ProducerCommand) -> bool {
        match cmd {
            ProducerCommand::Pause => {
                if !self.paused {
                    self.paused = true;
                    self.shared.set_measured_hz(0.0);
                    tracing::debug!(index = self.ctx.next_index(), "Producer paused");
                }
            }
            ProducerCommand::Resume => {
                if self.paused {
                    self.paused = false;
                    self.rate.reset();
                    tracing::debug!(index = self.ctx.next_index(), "Producer resumed");
                }
            }
            ProducerCommand::Seek(index) => {
                let target = self.ctx.apply_seek(index);
                self.pending_render = self.paused || self.ctx.is_synced();
                tracing::debug!(target, "Seek");
            }
            ProducerCommand::SetSynced(synced) => {
                self.ctx.set_synced(synced);
                if !synced {
                    self.pending_render = false;
                    self.rate.restart_schedule();
                }
            }
            ProducerCommand::Shutdown => return false,
        }
        true
    }

    fn render_cycle(&mut self) {
        let config = self.shared.config_snapshot();
        let started = Instant::now();
        let result = self.ctx.produce(&config);
        self.pending_render = false;

        let image = match result {
            Ok(image) => {
                if self.failing {
                    tracing::info!("Rendering recovered");
                    self.failing = false;
                }
                image
            }
            Err(e) => {
                if !self.failing {
                    tracing::error!(error = %e, "Render failed");
                    self.failing = true;
                }
                return;
            }
        };

        let elapsed = started.elapsed();
        self.rate.record_frame(Instant::now());
        self.render_time_sum += elapsed;
        self.render_count += 1;

        self.shared.current_index.store(image.index, Ordering::Relaxed);
        self.shared.frames_rendered.fetch_add(1, Ordering::Relaxed);
        if !self.paused {
            self.shared.set_measured_hz(self.rate.measured_rate());
        }
        self.shared.subscribers.broadcast(PipelineEvent::FrameReady(image));

        self.check_stall(elapsed);
    }

    fn check_stall(&mut self, render_time: Duration) {
        if self.paused || self.ctx.is_synced() {
            return;
        }
        if render_time > self.shared.rate.interval() {
            self.over_budget += 1;
        } else {
            self.over_budget = 0;
            if self.stalled {
                self.stalled = false;
                tracing::info!("Producer caught up with target rate");
            }
        }

        if self.over_budget >= self.stall_streak && !self.stalled {
            self.stalled = true;
            tracing::warn!(
                render_ms = render_time.as_secs_f64() * 1000.0,
                target_hz = self.rate.target_rate(),
                "Producer stall: renders exceed the frame budget"
            );
            self.send_report();
        }
    }

    fn maybe_report(&mut self) {
        if self.last_report.elapsed() >= self.report_interval {
            self.send_report();
        }
    }

    fn send_report(&mut self) {
        let active = !self.is_idle() && !self.paused;
        let measured_hz = if active { self.rate.measured_rate() } else { 0.0 };
        let avg_render_time_us = if self.render_count > 0 {
            self.render_time_sum.as_secs_f64() * 1e6 / self.render_count as f64
        } else {
            0.0
        };
        let report = RateReport {
            measured_hz,
            target_hz: self.rate.target_rate(),
            avg_render_time_us,
            frames_rendered: self.shared.frames_rendered(),
            dropped_events: self.shared.subscribers.dropped(),
            stalled: self.stalled,
        };
        self.shared.set_measured_hz(measured_hz);
        self.shared.subscribers.broadcast(PipelineEvent::RateReport(report));

        self.last_report = Instant::now();
        self.render_time_sum = Duration::ZERO;
        self.render_count = 0;
    }
}
