//! Chunk Cache implementation
//!
//! HashMap of resident windows plus an insertion-order queue for eviction.
//! Owned and mutated by the consumer thread only, so it carries no locks.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::store::Record;

use super::Window;

/// Bounded window cache with in-flight fetch tracking
#[derive(Debug)]
pub struct ChunkCache {
    /// Rows per window
    window_size: u64,
    /// Max resident windows
    capacity: usize,
    /// Resident windows by start position
    windows: HashMap<u64, Window>,
    /// Window starts, oldest insertion first
    order: VecDeque<u64>,
    /// Window starts with a fetch in flight
    pending: HashSet<u64>,
}

impl ChunkCache {
    /// Create an empty cache
    ///
    /// Panics if `window_size` or `capacity` is zero; `Config::validate`
    /// rejects both before a cache is built from configuration.
    pub fn new(window_size: usize, capacity: usize) -> Self {
        assert!(window_size > 0, "window_size must be at least 1");
        assert!(capacity > 0, "cache capacity must be at least 1");
        Self {
            window_size: window_size as u64,
            capacity,
            windows: HashMap::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            pending: HashSet::new(),
        }
    }

    /// Start position of the window holding `position`
    pub fn window_start(&self, position: u64) -> u64 {
        (position / self.window_size) * self.window_size
    }

    /// Record at absolute `position`, if its window is resident
    pub fn lookup(&self, position: u64) -> Option<&Record> {
        self.windows
            .get(&self.window_start(position))
            .and_then(|window| window.get(position))
    }

    /// Resident window starting at `window_start`
    pub fn window(&self, window_start: u64) -> Option<&Window> {
        self.windows.get(&window_start)
    }

    /// Whether a fetch for `window_start` is in flight
    pub fn is_pending(&self, window_start: u64) -> bool {
        self.pending.contains(&window_start)
    }

    /// Whether the window is resident
    pub fn contains(&self, window_start: u64) -> bool {
        self.windows.contains_key(&window_start)
    }

    /// Mark a fetch for `window_start` as in flight
    ///
    /// Returns `false` (and changes nothing) when the window is already
    /// pending or resident; the caller must only issue a request on `true`.
    pub fn begin_fetch(&mut self, window_start: u64) -> bool {
        if self.pending.contains(&window_start) || self.windows.contains_key(&window_start) {
            return false;
        }
        self.pending.insert(window_start);
        true
    }

    /// Drop the in-flight mark without inserting anything (fetch failed)
    pub fn cancel_fetch(&mut self, window_start: u64) -> bool {
        self.pending.remove(&window_start)
    }

    /// Install fetched rows, clear the in-flight mark, then evict
    ///
    /// Eviction removes the oldest-inserted windows other than this one until
    /// the cache is back within capacity. Returns the evicted window starts.
    pub fn complete_fetch(&mut self, window_start: u64, rows: Vec<Record>) -> Vec<u64> {
        if self.windows.insert(window_start, Window::new(window_start, rows)).is_some() {
            // Replacement counts as a fresh insertion
            self.order.retain(|&start| start != window_start);
        }
        self.order.push_back(window_start);
        self.pending.remove(&window_start);

        let mut evicted = Vec::new();
        while self.windows.len() > self.capacity {
            let Some(idx) = self.order.iter().position(|&start| start != window_start) else {
                break;
            };
            if let Some(oldest) = self.order.remove(idx) {
                self.windows.remove(&oldest);
                evicted.push(oldest);
            }
        }

        if !evicted.is_empty() {
            tracing::trace!("Evicted windows {:?} after inserting {}", evicted, window_start);
        }
        evicted
    }

    /// Resident window starts, oldest insertion first
    pub fn resident(&self) -> impl Iterator<Item = u64> + '_ {
        self.order.iter().copied()
    }

    /// Number of resident windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Number of fetches in flight
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window_size(&self) -> usize {
        self.window_size as usize
    }
}
