//! Pre-render buffer
//!
//! A bounded store of rendered frames keyed by frame index. The producer
//! thread owns the single [`BufferWriter`]; any number of [`BufferReader`]s
//! can look frames up concurrently.
//!
//! Eviction is by insertion order: once `capacity` frames are stored, putting
//! a new index drops the oldest inserted one. Putting an index that is already
//! present replaces its image and moves it to the newest position without
//! evicting anything.

use crate::types::RenderedImage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Inner {
    capacity: usize,
    /// Indices in insertion order, oldest first
    order: VecDeque<usize>,
    slots: HashMap<usize, Arc<RenderedImage>>,
}

impl Inner {
    fn put(&mut self, index: usize, image: Arc<RenderedImage>) {
        if self.slots.insert(index, image).is_some() {
            if let Some(pos) = self.order.iter().position(|i| *i == index) {
                self.order.remove(pos);
            }
        } else if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.slots.remove(&evicted);
            }
        }
        self.order.push_back(index);
    }
}

type Shared = Arc<RwLock<Inner>>;

fn read(shared: &Shared) -> RwLockReadGuard<'_, Inner> {
    // A panicking writer cannot leave `Inner` half-updated in a way readers care about
    shared.read().unwrap_or_else(|e| e.into_inner())
}

fn write(shared: &Shared) -> RwLockWriteGuard<'_, Inner> {
    shared.write().unwrap_or_else(|e| e.into_inner())
}

/// Constructor for a writer/reader pair sharing one buffer
pub struct PrerenderBuffer;

impl PrerenderBuffer {
    /// Create a buffer holding at most `capacity` frames (at least one)
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> (BufferWriter, BufferReader) {
        let capacity = capacity.max(1);
        let shared = Arc::new(RwLock::new(Inner {
            capacity,
            order: VecDeque::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }));
        (
            BufferWriter {
                shared: shared.clone(),
            },
            BufferReader { shared },
        )
    }
}

/// Write half of the pre-render buffer
///
/// Not `Clone`: the producer is the only writer.
#[derive(Debug)]
pub struct BufferWriter {
    shared: Shared,
}

impl BufferWriter {
    /// Store `image` under its frame index, evicting the oldest insert if full
    pub fn put(&self, image: Arc<RenderedImage>) {
        let index = image.index;
        write(&self.shared).put(index, image);
    }

    /// Remove every frame
    pub fn clear(&self) {
        let mut inner = write(&self.shared);
        inner.order.clear();
        inner.slots.clear();
    }

    /// A new reader of this buffer
    pub fn reader(&self) -> BufferReader {
        BufferReader {
            shared: self.shared.clone(),
        }
    }
}

/// Read half of the pre-render buffer
#[derive(Debug, Clone)]
pub struct BufferReader {
    shared: Shared,
}

impl BufferReader {
    /// Frame stored under exactly `index`
    pub fn get(&self, index: usize) -> Option<Arc<RenderedImage>> {
        read(&self.shared).slots.get(&index).cloned()
    }

    /// Stored frame with the greatest index not exceeding `target`
    pub fn latest_ready_at_or_before(&self, target: usize) -> Option<Arc<RenderedImage>> {
        let inner = read(&self.shared);
        inner
            .slots
            .iter()
            .filter(|(index, _)| **index <= target)
            .max_by_key(|(index, _)| **index)
            .map(|(_, image)| image.clone())
    }

    /// Exact frame if present, else the nearest earlier one
    pub fn get_or_latest(&self, target: usize) -> Option<Arc<RenderedImage>> {
        self.get(target)
            .or_else(|| self.latest_ready_at_or_before(target))
    }

    /// Most recently inserted frame
    pub fn newest(&self) -> Option<Arc<RenderedImage>> {
        let inner = read(&self.shared);
        inner
            .order
            .back()
            .and_then(|index| inner.slots.get(index))
            .cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.shared).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        read(&self.shared).capacity
    }

    /// Stored indices in insertion order, oldest first
    pub fn indices(&self) -> Vec<usize> {
        read(&self.shared).order.iter().copied().collect()
    }

    /// Recreate the writer after the previous one was lost with its thread
    pub(crate) fn reclaim_writer(&self) -> BufferWriter {
        BufferWriter {
            shared: self.shared.clone(),
        }
    }
}
