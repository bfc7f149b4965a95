use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::assets::decode::DecodedImage;
use crate::assets::font::GlyphPage;
use crate::assets::store::{FontHandle, ImageHandle, ImageKind, SourceBytes};

/// Lock a mutex, recovering the data if another thread panicked while holding it.
///
/// Capacity exhaustion panics inside a lock; the protected state is still consistent at that
/// point, so later callers keep working.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work for a decode worker.
#[derive(Debug)]
pub(crate) enum DecodeTask {
    Image {
        handle: ImageHandle,
        kind: ImageKind,
        source: SourceBytes,
    },
    Font {
        handle: FontHandle,
        size: u16,
        source: SourceBytes,
    },
}

/// Work for the render-thread upload pass.
///
/// A `None` payload marks a failed decode.
#[derive(Debug)]
pub(crate) enum Completed {
    Image {
        handle: ImageHandle,
        decoded: Option<DecodedImage>,
    },
    Font {
        handle: FontHandle,
        page: Option<GlyphPage>,
    },
    /// Already-decoded image that needs device textures again after a render mode switch.
    ReuploadImage(ImageHandle),
    ReuploadFont(FontHandle),
}

impl Completed {
    pub(crate) fn is_reupload(&self) -> bool {
        matches!(self, Self::ReuploadImage(_) | Self::ReuploadFont(_))
    }
}

/// FIFO with a reserved capacity that is never exceeded.
#[derive(Debug)]
pub(crate) struct TaskQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    what: &'static str,
}

impl<T> TaskQueue<T> {
    pub(crate) fn with_capacity(capacity: usize, what: &'static str) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            what,
        }
    }

    /// Append at the back. Pushing into a full queue is a configuration error and panics.
    pub(crate) fn push(&mut self, item: T) {
        assert!(
            self.items.len() < self.capacity,
            "{} queue exhausted: more than {} assets in flight (raise the configured queue capacity)",
            self.what,
            self.capacity
        );
        self.items.push_back(item);
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Remove every entry, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

/// The pending (submission -> decode) and post-process (decode -> upload) queues.
///
/// Pushing a pending task wakes one idle worker; workers also re-check on a timer so a missed
/// wake-up only costs one poll interval.
#[derive(Debug)]
pub(crate) struct Queues {
    pending: Mutex<TaskQueue<DecodeTask>>,
    wake: Condvar,
    completed: Mutex<TaskQueue<Completed>>,
    running: AtomicBool,
}

impl Queues {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(TaskQueue::with_capacity(capacity, "pending")),
            wake: Condvar::new(),
            completed: Mutex::new(TaskQueue::with_capacity(capacity, "post-process")),
            running: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn submit(&self, task: DecodeTask) {
        lock(&self.pending).push(task);
        self.wake.notify_one();
    }

    /// Pop the oldest pending task, waiting at most `poll` for one to arrive.
    ///
    /// Returns `None` on timeout or once [`Queues::stop`] has been called.
    pub(crate) fn next_task(&self, poll: Duration) -> Option<DecodeTask> {
        let mut pending = lock(&self.pending);
        if pending.is_empty() && self.is_running() {
            pending = self
                .wake
                .wait_timeout(pending, poll)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        if !self.is_running() {
            return None;
        }
        pending.pop()
    }

    pub(crate) fn complete(&self, done: Completed) {
        lock(&self.completed).push(done);
    }

    pub(crate) fn take_completed(&self) -> Vec<Completed> {
        lock(&self.completed).take_all()
    }

    pub(crate) fn drop_reuploads(&self) {
        lock(&self.completed).retain(|c| !c.is_reupload());
    }

    pub(crate) fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub(crate) fn completed_len(&self) -> usize {
        lock(&self.completed).len()
    }

    /// Mark the pipeline done and wake every waiting worker.
    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Taking the lock orders the store against workers between their check and their wait.
        drop(lock(&self.pending));
        self.wake.notify_all();
    }

    pub(crate) fn clear(&self) {
        lock(&self.pending).clear();
        lock(&self.completed).clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/queue.rs"]
mod tests;
