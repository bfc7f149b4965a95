use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::assets::bitmap::decode_bitmap;
use crate::assets::decode::{DecodedImage, decode_image};
use crate::assets::font::{GlyphPage, rasterize_glyph_page};
use crate::assets::store::ImageKind;
use crate::foundation::error::{AssetError, AssetResult};
use crate::pipeline::queue::{Completed, DecodeTask, Queues};

/// Decode outcome counters shared by all workers.
#[derive(Debug, Default)]
pub(crate) struct DecodeCounters {
    pub(crate) decoded: AtomicU64,
    pub(crate) failed: AtomicU64,
}

/// Run one task to completion. Never panics: decoder errors and panics both become a
/// payload-less [`Completed`] entry.
pub(crate) fn decode_task(task: DecodeTask, counters: &DecodeCounters) -> Completed {
    let started = Instant::now();
    let (completed, outcome) = match task {
        DecodeTask::Image {
            handle,
            kind,
            source,
        } => {
            let bytes = source.as_slice();
            let res = guarded(|| match kind {
                ImageKind::Encoded => decode_image(bytes),
                ImageKind::Bitmap => decode_bitmap(bytes),
            });
            let ok = res
                .as_ref()
                .map(DecodedImage::byte_len)
                .map_err(|e| e.to_string());
            (
                Completed::Image {
                    handle,
                    decoded: res.ok(),
                },
                ok,
            )
        }
        DecodeTask::Font {
            handle,
            size,
            source,
        } => {
            let res = guarded(|| rasterize_glyph_page(source.as_slice(), size));
            let ok = res
                .as_ref()
                .map(GlyphPage::byte_len)
                .map_err(|e| e.to_string());
            (
                Completed::Font {
                    handle,
                    page: res.ok(),
                },
                ok,
            )
        }
    };

    match outcome {
        Ok(bytes) => {
            counters.decoded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                bytes,
                elapsed_us = started.elapsed().as_micros() as u64,
                "decoded asset"
            );
        }
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%err, "asset decode failed; it will never load");
        }
    }
    completed
}

fn guarded<T>(f: impl FnOnce() -> AssetResult<T>) -> AssetResult<T> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(AssetError::decode("decoder panicked on malformed input")))
}

fn run_worker(queues: &Queues, counters: &DecodeCounters, poll: Duration) {
    while queues.is_running() {
        let Some(task) = queues.next_task(poll) else {
            continue;
        };
        let done = decode_task(task, counters);
        if !queues.is_running() {
            break;
        }
        queues.complete(done);
    }
    tracing::debug!("decode worker exiting");
}

/// Fixed set of decode threads draining [`Queues`].
///
/// Dropping the pool without calling [`WorkerPool::join`] also stops and joins the threads.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    queues: Arc<Queues>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        count: usize,
        queues: Arc<Queues>,
        counters: Arc<DecodeCounters>,
        poll: Duration,
    ) -> AssetResult<Self> {
        let mut pool = Self {
            queues,
            handles: Vec::with_capacity(count),
        };
        for i in 0..count {
            let queues = Arc::clone(&pool.queues);
            let counters = Arc::clone(&counters);
            let handle = std::thread::Builder::new()
                .name(format!("assetpipe-decode-{i}"))
                .spawn(move || run_worker(&queues, &counters, poll))
                .map_err(|e| AssetError::io(format!("failed to spawn decode worker: {e}")))?;
            pool.handles.push(handle);
        }
        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Stop the queues and wait for every worker. A worker busy decoding finishes that task
    /// first; its result is discarded.
    pub(crate) fn join(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.queues.stop();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("decode worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/worker.rs"]
mod tests;
