//! Thread boundary between the producer and display consumers.
//!
//! The producer broadcasts [`PipelineEvent`]s to every subscriber through a
//! bounded channel per subscriber. Sends never block: when a subscriber's
//! queue is full its oldest queued event is evicted and counted so the
//! newest state always gets through. Subscribers whose receiver was dropped
//! are pruned on the next broadcast.

use crate::types::{RateReport, RenderedImage};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Producer-side end of one subscriber queue
#[derive(Debug)]
struct Subscriber {
    tx: Sender<PipelineEvent>,
    /// Used to evict the oldest event when the queue is full
    evict: Receiver<PipelineEvent>,
    /// Dead once the [`EventReceiver`] is dropped
    alive: Weak<()>,
}

/// Messages sent from the producer thread to consumers.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A frame was rendered and stored in the pre-render buffer.
    FrameReady(Arc<RenderedImage>),

    /// Periodic (or stall-triggered) production rate report.
    RateReport(RateReport),
}

/// Registry of subscriber queues shared by the controller and the producer.
#[derive(Debug)]
pub struct Subscribers {
    senders: Mutex<Vec<Subscriber>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Subscribers {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = bounded(self.capacity);
        let token = Arc::new(());
        self.senders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscriber {
                tx,
                evict: rx.clone(),
                alive: Arc::downgrade(&token),
            });
        EventReceiver { rx, _token: token }
    }

    /// Send `event` to every subscriber without blocking.
    ///
    /// Returns the number of subscribers that received it.
    pub fn broadcast(&self, event: PipelineEvent) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;
        senders.retain(|sub| {
            if sub.alive.strong_count() == 0 {
                tracing::debug!("Pruning disconnected pipeline subscriber");
                return false;
            }
            if self.offer(sub, event.clone()) {
                delivered += 1;
            }
            true
        });
        delivered
    }

    /// Queue `event` for one subscriber, evicting its oldest events to make room
    fn offer(&self, sub: &Subscriber, mut event: PipelineEvent) -> bool {
        // The consumer may drain between attempts
        for _ in 0..=self.capacity {
            match sub.tx.try_send(event) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    if sub.evict.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
        self.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }

    pub fn len(&self) -> usize {
        self.senders.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total events evicted because a subscriber queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer-side handle for pipeline events.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<PipelineEvent>,
    _token: Arc<()>,
}

impl EventReceiver {
    /// Drain all pending events.
    pub fn drain(&self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Try to receive a single event without blocking.
    pub fn try_recv(&self) -> Option<PipelineEvent> {
        self.rx.try_recv().ok()
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<PipelineEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drain pending events, keeping only the newest frame.
    pub fn latest_frame(&self) -> Option<Arc<RenderedImage>> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::FrameReady(frame) => Some(frame),
                PipelineEvent::RateReport(_) => None,
            })
            .last()
    }

    /// Drain pending events, returning the newest frame and the newest rate report.
    pub fn latest(&self) -> (Option<Arc<RenderedImage>>, Option<RateReport>) {
        let mut frame = None;
        let mut report = None;
        for event in self.drain() {
            match event {
                PipelineEvent::FrameReady(f) => frame = Some(f),
                PipelineEvent::RateReport(r) => report = Some(r),
            }
        }
        (frame, report)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(index: usize) -> PipelineEvent {
        PipelineEvent::FrameReady(Arc::new(RenderedImage {
            index,
            session: 1,
            pixels: RgbImage::new(1, 1),
        }))
    }

    #[test]
    fn test_broadcast_reaches_all_subscribers() {
        let subs = Subscribers::new(4);
        let a = subs.subscribe();
        let b = subs.subscribe();
        assert_eq!(subs.broadcast(frame(0)), 2);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_full_queue_evicts_oldest() {
        let subs = Subscribers::new(4);
        let rx = subs.subscribe();
        for i in 0..100 {
            assert_eq!(subs.broadcast(frame(i)), 1);
        }
        assert_eq!(rx.len(), 4);
        assert_eq!(subs.dropped(), 96);
        let indices: Vec<usize> = rx
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::FrameReady(f) => Some(f.index),
                PipelineEvent::RateReport(_) => None,
            })
            .collect();
        assert_eq!(indices, vec![96, 97, 98, 99]);
    }

    #[test]
    fn test_slow_subscriber_does_not_starve_others() {
        let subs = Subscribers::new(2);
        let slow = subs.subscribe();
        let fast = subs.subscribe();
        for i in 0..10 {
            subs.broadcast(frame(i));
            assert_eq!(fast.latest_frame().map(|f| f.index), Some(i));
        }
        assert_eq!(slow.latest_frame().map(|f| f.index), Some(9));
    }

    #[test]
    fn test_disconnected_subscribers_are_pruned() {
        let subs = Subscribers::new(2);
        let keep = subs.subscribe();
        drop(subs.subscribe());
        assert_eq!(subs.len(), 2);
        subs.broadcast(frame(0));
        assert_eq!(subs.len(), 1);
        assert_eq!(keep.drain().len(), 1);
    }

    #[test]
    fn test_latest_coalesces() {
        let subs = Subscribers::new(8);
        let rx = subs.subscribe();
        subs.broadcast(frame(3));
        subs.broadcast(PipelineEvent::RateReport(RateReport {
            measured_hz: 30.0,
            ..Default::default()
        }));
        subs.broadcast(frame(4));
        let (frame, report) = rx.latest();
        assert_eq!(frame.map(|f| f.index), Some(4));
        assert_eq!(report.map(|r| r.measured_hz), Some(30.0));
        assert!(rx.is_empty());
    }
}
