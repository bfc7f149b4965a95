use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;

use crate::assets::store::{
    CacheStore, DedupKey, FontHandle, FontInfo, FontRecord, ImageHandle, ImageInfo, ImageKind,
    ImageRecord, SourceBytes,
};
use crate::foundation::error::{AssetError, AssetResult};
use crate::foundation::hash::hash_path;
use crate::pipeline::queue::{Completed, DecodeTask, Queues, lock};
use crate::pipeline::worker::{DecodeCounters, WorkerPool};
use crate::render::backend::{GpuDevice, RenderMode, TextureId};
use crate::render::upload;

/// Options for [`AssetSystem::new`].
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetSystemOpts {
    /// Image and bitmap slots reserved in the cache store.
    pub image_capacity: usize,
    /// Font slots (one per source and pixel size).
    pub font_capacity: usize,
    /// Bound of both the pending and the post-process queue.
    pub queue_capacity: usize,
    /// Decode threads.
    pub worker_count: usize,
    /// Longest a worker idles before re-checking the pending queue.
    pub poll_interval_ms: u64,
    /// Render mode in effect when the system starts.
    pub render_mode: RenderMode,
    /// Base directory for relative asset paths. `None` uses the process working directory.
    pub asset_root: Option<PathBuf>,
}

impl Default for AssetSystemOpts {
    fn default() -> Self {
        Self {
            image_capacity: 10,
            font_capacity: 3,
            queue_capacity: 20,
            worker_count: 1,
            poll_interval_ms: 1,
            render_mode: RenderMode::Cpu,
            asset_root: None,
        }
    }
}

impl AssetSystemOpts {
    pub fn validate(&self) -> AssetResult<()> {
        if self.image_capacity == 0 || self.font_capacity == 0 {
            return Err(AssetError::config("image and font capacity must be non-zero"));
        }
        if self.worker_count == 0 {
            return Err(AssetError::config("worker_count must be non-zero"));
        }
        // Idle workers block on the queue for this long between shutdown checks.
        if self.poll_interval_ms == 0 {
            return Err(AssetError::config("poll_interval_ms must be non-zero"));
        }
        // Each record has at most one entry in flight on either queue.
        if self.queue_capacity < self.image_capacity + self.font_capacity {
            return Err(AssetError::config(format!(
                "queue_capacity ({}) must cover image_capacity + font_capacity ({})",
                self.queue_capacity,
                self.image_capacity + self.font_capacity
            )));
        }
        Ok(())
    }

    /// Parse options from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> AssetResult<Self> {
        let opts: Self = serde_json::from_str(json).context("parse asset system options")?;
        Ok(opts)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.asset_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Counters describing the cache and the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct AssetStats {
    /// Image records ever created (released slots included).
    pub images: usize,
    pub fonts: usize,
    pub image_capacity: usize,
    pub font_capacity: usize,
    /// Tasks waiting for a decode worker.
    pub pending: usize,
    /// Decoded tasks waiting for [`AssetSystem::run_post_process`].
    pub post_process: usize,
    /// Files read by the `*_from_path` acquire calls.
    pub file_reads: u64,
    pub decoded: u64,
    pub decode_failures: u64,
    /// Device textures created.
    pub uploads: u64,
    /// Device textures deleted.
    pub textures_freed: u64,
    /// Textures detached by a release and not yet deleted.
    pub retired: usize,
}

#[derive(Debug)]
struct StoreState {
    cache: CacheStore,
    mode: RenderMode,
    retired: Vec<TextureId>,
    file_reads: u64,
    uploads: u64,
    textures_freed: u64,
}

/// Reference-counted image and font cache with background decoding.
///
/// Any thread may acquire and release assets. [`AssetSystem::run_post_process`] and
/// [`AssetSystem::on_render_mode_changed`] must be called from the thread that owns the graphics
/// device passed to them.
///
/// Locks are always taken store first, then a queue.
#[derive(Debug)]
pub struct AssetSystem {
    opts: AssetSystemOpts,
    state: Mutex<StoreState>,
    queues: Arc<Queues>,
    counters: Arc<DecodeCounters>,
    workers: Option<WorkerPool>,
}

impl AssetSystem {
    pub fn new(opts: AssetSystemOpts) -> AssetResult<Self> {
        opts.validate()?;

        let queues = Arc::new(Queues::new(opts.queue_capacity));
        let counters = Arc::new(DecodeCounters::default());
        let workers = WorkerPool::spawn(
            opts.worker_count,
            Arc::clone(&queues),
            Arc::clone(&counters),
            opts.poll_interval(),
        )?;

        tracing::info!(
            images = opts.image_capacity,
            fonts = opts.font_capacity,
            workers = workers.len(),
            mode = ?opts.render_mode,
            "asset system started"
        );

        Ok(Self {
            state: Mutex::new(StoreState {
                cache: CacheStore::new(opts.image_capacity, opts.font_capacity),
                mode: opts.render_mode,
                retired: Vec::new(),
                file_reads: 0,
                uploads: 0,
                textures_freed: 0,
            }),
            opts,
            queues,
            counters,
            workers: Some(workers),
        })
    }

    pub fn opts(&self) -> &AssetSystemOpts {
        &self.opts
    }

    pub fn render_mode(&self) -> RenderMode {
        lock(&self.state).mode
    }

    /// Acquire an image in any format the `image` crate decodes.
    ///
    /// The same bytes (same start address) return the same handle with one more reference.
    pub fn acquire_image(&self, bytes: impl Into<SourceBytes>) -> ImageHandle {
        let source = bytes.into();
        self.acquire_image_keyed(ImageKind::Encoded, DedupKey::for_bytes(&source), || source)
    }

    /// Acquire an uncompressed legacy bitmap.
    pub fn acquire_bitmap(&self, bytes: impl Into<SourceBytes>) -> ImageHandle {
        let source = bytes.into();
        self.acquire_image_keyed(ImageKind::Bitmap, DedupKey::for_bytes(&source), || source)
    }

    /// Acquire an image file. A second call with the same path string does not read the file
    /// again while the first reference is alive.
    pub fn acquire_image_from_path(&self, path: impl AsRef<Path>) -> ImageHandle {
        let path = path.as_ref();
        self.acquire_image_keyed(ImageKind::Encoded, DedupKey::PathHash(hash_path(path)), || {
            self.read_source(path)
        })
    }

    pub fn acquire_bitmap_from_path(&self, path: impl AsRef<Path>) -> ImageHandle {
        let path = path.as_ref();
        self.acquire_image_keyed(ImageKind::Bitmap, DedupKey::PathHash(hash_path(path)), || {
            self.read_source(path)
        })
    }

    /// Acquire a font rasterized at `size_px`. Each size is a separate record.
    pub fn acquire_font(&self, bytes: impl Into<SourceBytes>, size_px: u16) -> FontHandle {
        let source = bytes.into();
        self.acquire_font_keyed(DedupKey::for_bytes(&source), size_px, || source)
    }

    pub fn acquire_font_from_path(&self, path: impl AsRef<Path>, size_px: u16) -> FontHandle {
        let path = path.as_ref();
        self.acquire_font_keyed(DedupKey::PathHash(hash_path(path)), size_px, || {
            self.read_source(path)
        })
    }

    fn acquire_image_keyed(
        &self,
        kind: ImageKind,
        key: DedupKey,
        load: impl FnOnce() -> SourceBytes,
    ) -> ImageHandle {
        if let Some(handle) = self.retain_image(&mut lock(&self.state), key) {
            return handle;
        }

        // File reads happen outside the lock; another caller may insert the same key meanwhile.
        let source = load();
        let mut st = lock(&self.state);
        if let Some(handle) = self.retain_image(&mut st, key) {
            return handle;
        }
        let handle = st
            .cache
            .insert_image(ImageRecord::pending(key, kind, source.clone()));
        self.queues.submit(DecodeTask::Image {
            handle,
            kind,
            source,
        });
        tracing::debug!(?key, ?kind, "image queued for decode");
        handle
    }

    fn retain_image(&self, st: &mut StoreState, key: DedupKey) -> Option<ImageHandle> {
        let handle = st.cache.find_image(key)?;
        let rec = st.cache.image_mut(handle)?;
        rec.references += 1;
        tracing::debug!(?key, references = rec.references, "image cache hit");
        Some(handle)
    }

    fn acquire_font_keyed(
        &self,
        key: DedupKey,
        size: u16,
        load: impl FnOnce() -> SourceBytes,
    ) -> FontHandle {
        if let Some(handle) = self.retain_font(&mut lock(&self.state), key, size) {
            return handle;
        }

        let source = load();
        let mut st = lock(&self.state);
        if let Some(handle) = self.retain_font(&mut st, key, size) {
            return handle;
        }
        let handle = st
            .cache
            .insert_font(FontRecord::pending(key, size, source.clone()));
        self.queues.submit(DecodeTask::Font {
            handle,
            size,
            source,
        });
        tracing::debug!(?key, size, "font queued for rasterization");
        handle
    }

    fn retain_font(&self, st: &mut StoreState, key: DedupKey, size: u16) -> Option<FontHandle> {
        let handle = st.cache.find_font(key, size)?;
        let rec = st.cache.font_mut(handle)?;
        rec.references += 1;
        tracing::debug!(?key, size, references = rec.references, "font cache hit");
        Some(handle)
    }

    /// Read a whole file. Failures yield an empty buffer, which then fails to decode.
    fn read_source(&self, path: &Path) -> SourceBytes {
        let resolved = self.opts.resolve(path);
        let bytes = match std::fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %resolved.display(), %err, "failed to read asset file");
                Vec::new()
            }
        };
        let mut st = lock(&self.state);
        st.file_reads = st.file_reads.saturating_add(1);
        SourceBytes::from(bytes)
    }

    /// Drop one reference. At zero the record's textures are detached for deletion on the next
    /// post-process pass and its pixel data is dropped; the slot stays until shutdown.
    ///
    /// Releasing a record that has no references left is ignored.
    pub fn release_image(&self, handle: ImageHandle) {
        let mut st = lock(&self.state);
        let StoreState { cache, retired, .. } = &mut *st;
        let Some(rec) = cache.image_mut(handle) else {
            tracing::warn!(?handle, "release of unknown image handle");
            return;
        };
        if rec.references == 0 {
            tracing::warn!(?handle, "image released more times than acquired");
            return;
        }
        rec.references -= 1;
        if rec.references > 0 {
            return;
        }

        retired.extend(rec.texture.take());
        rec.loaded = false;
        rec.release_payload();
        tracing::debug!(?handle, "image released");
    }

    pub fn release_font(&self, handle: FontHandle) {
        let mut st = lock(&self.state);
        let StoreState { cache, retired, .. } = &mut *st;
        let Some(rec) = cache.font_mut(handle) else {
            tracing::warn!(?handle, "release of unknown font handle");
            return;
        };
        if rec.references == 0 {
            tracing::warn!(?handle, "font released more times than acquired");
            return;
        }
        rec.references -= 1;
        if rec.references > 0 {
            return;
        }

        if let Some(page) = rec.page_mut() {
            retired.extend(upload::take_glyph_textures(page));
        }
        rec.loaded = false;
        rec.release_payload();
        tracing::debug!(?handle, "font released");
    }

    /// Live image cached under `key`, without taking a reference.
    pub fn find_image(&self, key: DedupKey) -> Option<ImageHandle> {
        lock(&self.state).cache.find_image(key)
    }

    pub fn find_font(&self, key: DedupKey, size_px: u16) -> Option<FontHandle> {
        lock(&self.state).cache.find_font(key, size_px)
    }

    pub fn image_info(&self, handle: ImageHandle) -> Option<ImageInfo> {
        lock(&self.state).cache.image(handle).map(ImageRecord::info)
    }

    pub fn font_info(&self, handle: FontHandle) -> Option<FontInfo> {
        lock(&self.state).cache.font(handle).map(FontRecord::info)
    }

    pub fn is_image_loaded(&self, handle: ImageHandle) -> bool {
        self.with_image(handle, ImageRecord::loaded).unwrap_or(false)
    }

    pub fn is_font_loaded(&self, handle: FontHandle) -> bool {
        self.with_font(handle, FontRecord::loaded).unwrap_or(false)
    }

    /// Run `f` on the record under the store lock. Keep `f` short: decoding and uploads wait on
    /// the same lock.
    pub fn with_image<R>(&self, handle: ImageHandle, f: impl FnOnce(&ImageRecord) -> R) -> Option<R> {
        lock(&self.state).cache.image(handle).map(f)
    }

    pub fn with_font<R>(&self, handle: FontHandle, f: impl FnOnce(&FontRecord) -> R) -> Option<R> {
        lock(&self.state).cache.font(handle).map(f)
    }

    /// Finalize every decoded asset: upload textures in GPU mode, or just mark them loaded in CPU
    /// mode. Also deletes textures retired by releases since the last call.
    ///
    /// Call once per frame on the thread that owns `device`. Returns `true` when the post-process
    /// queue had entries, meaning the frame should be redrawn.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_post_process(&self, device: &mut dyn GpuDevice) -> bool {
        let mut st = lock(&self.state);
        let st = &mut *st;

        for id in st.retired.drain(..) {
            device.delete_texture(id);
            st.textures_freed = st.textures_freed.saturating_add(1);
        }

        let completed = self.queues.take_completed();
        let did_work = !completed.is_empty();
        for done in completed {
            match done {
                Completed::Image { handle, decoded } => {
                    let Some(rec) = live_image(&mut st.cache, handle) else {
                        continue;
                    };
                    match decoded {
                        Some(image) => {
                            rec.set_decoded(image);
                            st.uploads += finish_image(rec, st.mode, device);
                        }
                        None => rec.failed = true,
                    }
                }
                Completed::Font { handle, page } => {
                    let Some(rec) = live_font(&mut st.cache, handle) else {
                        continue;
                    };
                    match page {
                        Some(page) => {
                            rec.set_page(page);
                            st.uploads += finish_font(rec, st.mode, device);
                        }
                        None => rec.failed = true,
                    }
                }
                Completed::ReuploadImage(handle) => {
                    if let Some(rec) = live_image(&mut st.cache, handle)
                        && rec.decoded().is_some()
                    {
                        st.uploads += finish_image(rec, st.mode, device);
                    }
                }
                Completed::ReuploadFont(handle) => {
                    if let Some(rec) = live_font(&mut st.cache, handle)
                        && rec.page().is_some()
                    {
                        st.uploads += finish_font(rec, st.mode, device);
                    }
                }
            }
        }
        did_work
    }

    /// Re-materialize decoded assets for a new render mode.
    ///
    /// Leaving GPU mode deletes every texture right away and marks every record holding decoded
    /// data loaded, including records whose upload failed. Entering GPU mode queues every such
    /// record for upload on the next [`AssetSystem::run_post_process`].
    #[tracing::instrument(level = "debug", skip(self, device))]
    pub fn on_render_mode_changed(&self, mode: RenderMode, device: &mut dyn GpuDevice) {
        let mut st = lock(&self.state);
        if st.mode == mode {
            return;
        }
        tracing::info!(from = ?st.mode, to = ?mode, "render mode changed");
        st.mode = mode;
        let st = &mut *st;

        if mode.uses_gpu() {
            for (handle, rec) in st.cache.image_handles() {
                if rec.references > 0 && rec.decoded().is_some() {
                    self.queues.complete(Completed::ReuploadImage(handle));
                }
            }
            for (handle, rec) in st.cache.font_handles() {
                if rec.references > 0 && rec.page().is_some() {
                    self.queues.complete(Completed::ReuploadFont(handle));
                }
            }
            return;
        }

        let mut freed = 0u64;
        for id in st.retired.drain(..) {
            device.delete_texture(id);
            freed += 1;
        }
        for rec in st.cache.images_mut() {
            if let Some(id) = rec.texture.take() {
                device.delete_texture(id);
                freed += 1;
            }
            if rec.references > 0 && rec.decoded().is_some() {
                rec.loaded = true;
                rec.failed = false;
            }
        }
        for rec in st.cache.fonts_mut() {
            let live = rec.references > 0;
            if let Some(page) = rec.page_mut() {
                freed += upload::free_glyph_textures(device, page) as u64;
                if live {
                    rec.loaded = true;
                    rec.failed = false;
                }
            }
        }
        st.textures_freed = st.textures_freed.saturating_add(freed);
        self.queues.drop_reuploads();
    }

    pub fn stats(&self) -> AssetStats {
        let st = lock(&self.state);
        AssetStats {
            images: st.cache.image_count(),
            fonts: st.cache.font_count(),
            image_capacity: st.cache.image_capacity(),
            font_capacity: st.cache.font_capacity(),
            pending: self.queues.pending_len(),
            post_process: self.queues.completed_len(),
            file_reads: st.file_reads,
            decoded: self.counters.decoded.load(Ordering::Relaxed),
            decode_failures: self.counters.failed.load(Ordering::Relaxed),
            uploads: st.uploads,
            textures_freed: st.textures_freed,
            retired: st.retired.len(),
        }
    }

    /// Stop and join the decode workers, then drop every record and queued task.
    ///
    /// Device textures are not freed; switch to [`RenderMode::Cpu`] first to release them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(workers) = self.workers.take() else {
            return;
        };
        workers.join();

        let mut st = lock(&self.state);
        self.queues.clear();
        st.cache.clear();
        st.retired.clear();
        tracing::info!("asset system shut down");
    }
}

impl Drop for AssetSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

fn live_image(cache: &mut CacheStore, handle: ImageHandle) -> Option<&mut ImageRecord> {
    cache.image_mut(handle).filter(|rec| rec.references > 0)
}

fn live_font(cache: &mut CacheStore, handle: FontHandle) -> Option<&mut FontRecord> {
    cache.font_mut(handle).filter(|rec| rec.references > 0)
}

/// Mark a decoded image ready for `mode`. Returns the number of textures created.
fn finish_image(rec: &mut ImageRecord, mode: RenderMode, device: &mut dyn GpuDevice) -> u64 {
    if !mode.uses_gpu() || rec.texture.is_some() {
        rec.loaded = true;
        rec.failed = false;
        return 0;
    }
    let res = match rec.decoded() {
        Some(image) => upload::upload_image(device, image),
        None => Err(AssetError::device("image has no decoded pixels to upload")),
    };
    match res {
        Ok(id) => {
            rec.texture = Some(id);
            rec.loaded = true;
            rec.failed = false;
            1
        }
        Err(err) => {
            tracing::error!(%err, "image upload failed; kept for the next mode switch");
            rec.loaded = false;
            rec.failed = true;
            0
        }
    }
}

fn finish_font(rec: &mut FontRecord, mode: RenderMode, device: &mut dyn GpuDevice) -> u64 {
    if !mode.uses_gpu() {
        rec.loaded = true;
        rec.failed = false;
        return 0;
    }
    let Some(page) = rec.page_mut() else {
        rec.loaded = false;
        return 0;
    };
    let before = page.textured_glyphs();
    match upload::upload_glyph_page(device, page) {
        Ok(()) => {
            let created = page.textured_glyphs() - before;
            rec.loaded = true;
            rec.failed = false;
            created as u64
        }
        Err(err) => {
            tracing::error!(%err, "glyph upload failed; kept for the next mode switch");
            rec.loaded = false;
            rec.failed = true;
            0
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/system.rs"]
mod tests;
