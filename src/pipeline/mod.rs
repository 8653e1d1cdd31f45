//! Heatmap animation pipeline.
//!
//! Sensor frames flow from a dedicated producer thread through the renderer
//! into a bounded pre-render buffer, and consumers are notified through
//! per-subscriber channels. The [`PipelineController`] is the only type a
//! display consumer needs to drive it.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────── PipelineController ────────────┐
//!  set_data ─────►│                                            │
//!  seek/pause ───►│ cmd_tx ──► [Producer thread]               │
//!  external  ────►│ SyncBridge    │ RateController (deadlines) │
//!  clock          │               │ HeatmapRenderer            │
//!                 │               ├──► BufferWriter ──► PrerenderBuffer ◄── BufferReader (consumers)
//!                 │               └──► Subscribers ──► EventReceiver (consumers)
//!                 └────────────────────────────────────────────┘
//! ```
//!
//! # Design
//!
//! - **Single writer** - only the producer holds the [`BufferWriter`]; readers
//!   are cheap clones.
//! - **Never blocks on consumers** - events go out with `try_send`; a full
//!   queue drops the event and counts it.
//! - **Snapshot config** - the producer reads one `Arc<PipelineConfig>` per
//!   render, so updates never tear a frame.
//! - **Context hand-back** - the producer thread returns its state on join,
//!   so stop/start keeps the trail and position.

pub mod bridge;
pub mod buffer;
pub mod controller;
pub mod producer;
pub mod rate;
pub mod sync;

pub use bridge::{EventReceiver, PipelineEvent, Subscribers};
pub use buffer::{BufferReader, BufferWriter, PrerenderBuffer};
pub use controller::PipelineController;
pub use producer::{ProducerCommand, ProducerContext, SessionData};
pub use rate::{RateController, RateHandle};
pub use sync::{map_external_position, ExternalPosition, MasterClock, SyncBridge};
