//! Pending request queue with submission dedup.

use crate::debug_event;
use crate::indexing::{IndexRequest, RequestAction};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct QueueInner {
    pending: VecDeque<Arc<IndexRequest>>,
    keys: HashSet<RequestAction>,
    running: usize,
    shutdown: bool,
}

/// FIFO of requests waiting for a worker. At most one pending request per
/// action.
#[derive(Default)]
pub struct RequestQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
    idle: Condvar,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `request` unless an equal one is already pending.
    pub fn submit(&self, request: Arc<IndexRequest>) -> bool {
        let mut inner = self.inner.lock();
        if inner.shutdown || inner.keys.contains(request.action()) {
            debug_event!("queue", "dropped duplicate", "{}", request.action());
            return false;
        }
        inner.keys.insert(request.action().clone());
        inner.pending.push_back(request);
        self.available.notify_one();
        true
    }

    /// Block until a request is available. `None` once the queue shuts down.
    pub fn next(&self) -> Option<Arc<IndexRequest>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return None;
            }
            if let Some(request) = inner.pending.pop_front() {
                inner.keys.remove(request.action());
                inner.running += 1;
                return Some(request);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Report that a request handed out by [`next`](Self::next) has finished.
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        inner.running = inner.running.saturating_sub(1);
        if inner.running == 0 && inner.pending.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Withdraw `request` if it is still pending. An equal request submitted
    /// later is left alone.
    pub fn remove(&self, request: &IndexRequest) -> Option<Arc<IndexRequest>> {
        let mut inner = self.inner.lock();
        let position = inner.pending.iter().position(|r| r.id() == request.id())?;
        let request = inner.pending.remove(position);
        if let Some(removed) = &request {
            inner.keys.remove(removed.action());
        }
        if inner.running == 0 && inner.pending.is_empty() {
            self.idle.notify_all();
        }
        request
    }

    /// Requests waiting for a worker, oldest first.
    pub fn pending(&self) -> Vec<Arc<IndexRequest>> {
        self.inner.lock().pending.iter().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.running == 0 && inner.pending.is_empty()
    }

    /// Block until nothing is pending or running.
    pub fn wait_idle(&self) {
        let mut inner = self.inner.lock();
        while inner.running > 0 || !inner.pending.is_empty() {
            self.idle.wait(&mut inner);
        }
    }

    /// Wake every worker and refuse further submissions. Pending requests are
    /// returned to the caller.
    pub fn shutdown(&self) -> Vec<Arc<IndexRequest>> {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        inner.keys.clear();
        let drained: Vec<_> = inner.pending.drain(..).collect();
        self.available.notify_all();
        self.idle.notify_all();
        drained
    }
}
