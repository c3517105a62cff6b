//! Frontier: the pending queue and visited set driving traversal
//!
//! Both halves live behind one mutex so that "check absent, then enqueue"
//! and "dequeue, then mark visited" are each a single critical section.
//! A locator therefore leaves the frontier at most once per run, however
//! many workers offer it concurrently.

use crate::url::{in_boundary, Boundary, Locator};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Why an offered locator was or was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Newly appended to the pending queue
    Queued,
    /// Already pending or already visited; nothing changed
    Known,
    /// Outside the crawl boundary; nothing changed
    OutOfBoundary,
}

impl Offer {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<Locator>,
    pending_set: HashSet<Locator>,
    visited: HashSet<Locator>,
}

/// Breadth-first worklist for one crawl run
#[derive(Debug)]
pub struct Frontier {
    boundary: Boundary,
    inner: Mutex<Inner>,
}

impl Frontier {
    pub fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner holds plain collections; a panic elsewhere cannot leave them torn.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends `locator` to the queue if it is in boundary and unseen
    pub fn offer(&self, locator: Locator) -> Offer {
        if !in_boundary(&locator, &self.boundary) {
            return Offer::OutOfBoundary;
        }

        let mut inner = self.lock();
        if inner.visited.contains(&locator) || inner.pending_set.contains(&locator) {
            return Offer::Known;
        }

        inner.pending_set.insert(locator.clone());
        inner.pending.push_back(locator);
        Offer::Queued
    }

    /// Removes the oldest pending locator and marks it visited
    pub fn next(&self) -> Option<Locator> {
        let mut inner = self.lock();
        let locator = inner.pending.pop_front()?;
        inner.pending_set.remove(&locator);
        inner.visited.insert(locator.clone());
        Some(locator)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn is_visited(&self, locator: &Locator) -> bool {
        self.lock().visited.contains(locator)
    }

    /// Consistent copy of (pending in queue order, visited sorted)
    pub fn snapshot(&self) -> (Vec<Locator>, Vec<Locator>) {
        let inner = self.lock();
        let pending = inner.pending.iter().cloned().collect();
        let mut visited: Vec<Locator> = inner.visited.iter().cloned().collect();
        visited.sort();
        (pending, visited)
    }
}
