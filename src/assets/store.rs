use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::assets::decode::{DecodedImage, PixelOrder};
use crate::assets::font::{Glyph, GlyphPage};
use crate::render::backend::TextureId;

/// Bytes an asset is decoded from.
///
/// `Static` borrows data compiled into the binary (`include_bytes!`); `Shared` owns a buffer such as
/// a file read from disk. Cloning never copies the bytes.
#[derive(Clone, Debug)]
pub enum SourceBytes {
    Static(&'static [u8]),
    Shared(Arc<[u8]>),
}

impl SourceBytes {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Static(b) => b,
            Self::Shared(b) => b,
        }
    }

    /// Start address of the bytes; the identity used to deduplicate in-memory sources.
    pub fn address(&self) -> usize {
        self.as_slice().as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<&'static [u8]> for SourceBytes {
    fn from(value: &'static [u8]) -> Self {
        Self::Static(value)
    }
}

impl<const N: usize> From<&'static [u8; N]> for SourceBytes {
    fn from(value: &'static [u8; N]) -> Self {
        Self::Static(value)
    }
}

impl From<Arc<[u8]>> for SourceBytes {
    fn from(value: Arc<[u8]>) -> Self {
        Self::Shared(value)
    }
}

impl From<Vec<u8>> for SourceBytes {
    fn from(value: Vec<u8>) -> Self {
        Self::Shared(value.into())
    }
}

/// Identity used to find an already-cached asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    /// Start address of an in-memory source.
    ///
    /// Empty slices carry no storage, so distinct empty sources may report the same dangling
    /// address and share one record. That record fails to decode either way.
    Address(usize),
    /// [`crate::hash_path`] of the path a file was loaded from.
    PathHash(u32),
}

impl DedupKey {
    pub fn for_bytes(bytes: &SourceBytes) -> Self {
        Self::Address(bytes.address())
    }
}

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

fn fresh_generation() -> u32 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Index into a [`CacheStore`] arena plus the arena generation it was issued under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
    index: u32,
    generation: u32,
}

/// Handle to a cached image or bitmap.
///
/// Valid until the owning [`crate::AssetSystem`] shuts down; handles from another system or from
/// before a shutdown resolve to nothing instead of aliasing a different record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub(crate) SlotKey);

/// Handle to a cached font at one pixel size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontHandle(pub(crate) SlotKey);

/// Append-only arena with a capacity fixed at construction.
///
/// The backing `Vec` is allocated once and never grows, so slots keep their address for the
/// arena's lifetime. Running out of slots is a configuration error and panics.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<T>,
    capacity: usize,
    generation: u32,
    what: &'static str,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize, what: &'static str) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            generation: fresh_generation(),
            what,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> SlotKey {
        assert!(
            self.slots.len() < self.capacity,
            "asset store exhausted: attempted to cache more than {} {} (raise the configured capacity)",
            self.capacity,
            self.what
        );
        let index = self.slots.len() as u32;
        self.slots.push(value);
        SlotKey {
            index,
            generation: self.generation,
        }
    }

    pub(crate) fn get(&self, key: SlotKey) -> Option<&T> {
        if key.generation != self.generation {
            return None;
        }
        self.slots.get(key.index as usize)
    }

    pub(crate) fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        if key.generation != self.generation {
            return None;
        }
        self.slots.get_mut(key.index as usize)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        let generation = self.generation;
        self.slots.iter().enumerate().map(move |(i, v)| {
            (
                SlotKey {
                    index: i as u32,
                    generation,
                },
                v,
            )
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every slot and invalidate all outstanding keys.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.generation = fresh_generation();
    }
}

/// Which decoder an image record goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Any format the `image` crate recognizes.
    Encoded,
    /// Legacy uncompressed bitmap.
    Bitmap,
}

/// Cache entry for one image.
#[derive(Debug)]
pub struct ImageRecord {
    key: DedupKey,
    kind: ImageKind,
    source: Option<SourceBytes>,
    image: Option<DecodedImage>,
    pub(crate) texture: Option<TextureId>,
    pub(crate) loaded: bool,
    pub(crate) failed: bool,
    pub(crate) references: u32,
}

impl ImageRecord {
    pub(crate) fn pending(key: DedupKey, kind: ImageKind, source: SourceBytes) -> Self {
        Self {
            key,
            kind,
            source: Some(source),
            image: None,
            texture: None,
            loaded: false,
            failed: false,
            references: 1,
        }
    }

    pub fn key(&self) -> DedupKey {
        self.key
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Ready for drawing in the current render mode.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// Decoding or upload failed. A decode failure is permanent; an upload failure clears on
    /// the next render mode switch, which re-materializes the kept pixels.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn references(&self) -> u32 {
        self.references
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Decoded pixels, retained while the record is referenced.
    pub fn decoded(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn source(&self) -> Option<&SourceBytes> {
        self.source.as_ref()
    }

    pub fn info(&self) -> ImageInfo {
        let (width, height, channels, order) = match &self.image {
            Some(img) => (img.width, img.height, img.channels, Some(img.order)),
            None => (0, 0, 0, None),
        };
        ImageInfo {
            kind: self.kind,
            width,
            height,
            channels,
            order,
            loaded: self.loaded,
            failed: self.failed,
            references: self.references,
            texture: self.texture,
        }
    }

    pub(crate) fn set_decoded(&mut self, image: DecodedImage) {
        self.image = Some(image);
    }

    /// Forget payloads once the last reference is gone. The slot itself stays until shutdown.
    pub(crate) fn release_payload(&mut self) {
        self.source = None;
        self.image = None;
    }
}

/// Plain-data snapshot of an [`ImageRecord`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ImageInfo {
    pub kind: ImageKind,
    /// Width in pixels (0 until decoded).
    pub width: u32,
    /// Height in pixels (0 until decoded).
    pub height: u32,
    pub channels: u8,
    pub order: Option<PixelOrder>,
    pub loaded: bool,
    pub failed: bool,
    pub references: u32,
    pub texture: Option<TextureId>,
}

impl ImageInfo {
    /// Size scaled to `width`, keeping the aspect ratio.
    pub fn scale_to_width(&self, width: u32) -> (f32, f32) {
        if self.width == 0 {
            return (0.0, 0.0);
        }
        let s = width as f32 / self.width as f32;
        (self.width as f32 * s, self.height as f32 * s)
    }

    /// Size scaled to `height`, keeping the aspect ratio.
    pub fn scale_to_height(&self, height: u32) -> (f32, f32) {
        if self.height == 0 {
            return (0.0, 0.0);
        }
        let s = height as f32 / self.height as f32;
        (self.width as f32 * s, self.height as f32 * s)
    }
}

/// Cache entry for one font at one pixel size.
#[derive(Debug)]
pub struct FontRecord {
    key: DedupKey,
    size: u16,
    source: Option<SourceBytes>,
    page: Option<GlyphPage>,
    pub(crate) loaded: bool,
    pub(crate) failed: bool,
    pub(crate) references: u32,
}

impl FontRecord {
    pub(crate) fn pending(key: DedupKey, size: u16, source: SourceBytes) -> Self {
        Self {
            key,
            size,
            source: Some(source),
            page: None,
            loaded: false,
            failed: false,
            references: 1,
        }
    }

    pub fn key(&self) -> DedupKey {
        self.key
    }

    /// Requested pixel height.
    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn references(&self) -> u32 {
        self.references
    }

    pub fn page(&self) -> Option<&GlyphPage> {
        self.page.as_ref()
    }

    pub(crate) fn page_mut(&mut self) -> Option<&mut GlyphPage> {
        self.page.as_mut()
    }

    /// Glyph for `codepoint` once rasterized.
    pub fn glyph(&self, codepoint: impl Into<u32>) -> Option<&Glyph> {
        self.page.as_ref()?.glyph(codepoint)
    }

    pub fn source(&self) -> Option<&SourceBytes> {
        self.source.as_ref()
    }

    pub fn info(&self) -> FontInfo {
        FontInfo {
            size: self.size,
            loaded: self.loaded,
            failed: self.failed,
            references: self.references,
            scale: self.page.as_ref().map(GlyphPage::scale),
            baseline: self.page.as_ref().map(GlyphPage::baseline),
            textured_glyphs: self.page.as_ref().map_or(0, GlyphPage::textured_glyphs),
        }
    }

    pub(crate) fn set_page(&mut self, page: GlyphPage) {
        self.page = Some(page);
    }

    pub(crate) fn release_payload(&mut self) {
        self.source = None;
        self.page = None;
    }
}

/// Plain-data snapshot of a [`FontRecord`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FontInfo {
    pub size: u16,
    pub loaded: bool,
    pub failed: bool,
    pub references: u32,
    pub scale: Option<f32>,
    pub baseline: Option<i32>,
    pub textured_glyphs: usize,
}

/// Fixed-capacity image and font arenas with dedup lookup.
#[derive(Debug)]
pub(crate) struct CacheStore {
    images: Arena<ImageRecord>,
    fonts: Arena<FontRecord>,
}

impl CacheStore {
    pub(crate) fn new(image_capacity: usize, font_capacity: usize) -> Self {
        Self {
            images: Arena::with_capacity(image_capacity, "images"),
            fonts: Arena::with_capacity(font_capacity, "fonts"),
        }
    }

    /// Live image matching `key`. Released records (no references) are skipped, never reused.
    pub(crate) fn find_image(&self, key: DedupKey) -> Option<ImageHandle> {
        self.images
            .iter()
            .find(|(_, rec)| rec.key == key && rec.references > 0)
            .map(|(slot, _)| ImageHandle(slot))
    }

    pub(crate) fn find_font(&self, key: DedupKey, size: u16) -> Option<FontHandle> {
        self.fonts
            .iter()
            .find(|(_, rec)| rec.key == key && rec.size == size && rec.references > 0)
            .map(|(slot, _)| FontHandle(slot))
    }

    pub(crate) fn insert_image(&mut self, record: ImageRecord) -> ImageHandle {
        ImageHandle(self.images.insert(record))
    }

    pub(crate) fn insert_font(&mut self, record: FontRecord) -> FontHandle {
        FontHandle(self.fonts.insert(record))
    }

    pub(crate) fn image(&self, handle: ImageHandle) -> Option<&ImageRecord> {
        self.images.get(handle.0)
    }

    pub(crate) fn image_mut(&mut self, handle: ImageHandle) -> Option<&mut ImageRecord> {
        self.images.get_mut(handle.0)
    }

    pub(crate) fn font(&self, handle: FontHandle) -> Option<&FontRecord> {
        self.fonts.get(handle.0)
    }

    pub(crate) fn font_mut(&mut self, handle: FontHandle) -> Option<&mut FontRecord> {
        self.fonts.get_mut(handle.0)
    }

    pub(crate) fn image_handles(&self) -> impl Iterator<Item = (ImageHandle, &ImageRecord)> {
        self.images.iter().map(|(slot, rec)| (ImageHandle(slot), rec))
    }

    pub(crate) fn font_handles(&self) -> impl Iterator<Item = (FontHandle, &FontRecord)> {
        self.fonts.iter().map(|(slot, rec)| (FontHandle(slot), rec))
    }

    pub(crate) fn images_mut(&mut self) -> impl Iterator<Item = &mut ImageRecord> {
        self.images.iter_mut()
    }

    pub(crate) fn fonts_mut(&mut self) -> impl Iterator<Item = &mut FontRecord> {
        self.fonts.iter_mut()
    }

    pub(crate) fn image_count(&self) -> usize {
        self.images.len()
    }

    pub(crate) fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub(crate) fn image_capacity(&self) -> usize {
        self.images.capacity()
    }

    pub(crate) fn font_capacity(&self) -> usize {
        self.fonts.capacity()
    }

    pub(crate) fn clear(&mut self) {
        self.images.clear();
        self.fonts.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
