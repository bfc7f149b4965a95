use std::collections::HashMap;

use crate::foundation::error::{AssetError, AssetResult};
use crate::render::backend::{
    FilterMode, GpuDevice, TexelFormat, TexelPacking, TextureDesc, TextureId, WrapMode,
};

/// A texture held by [`HeadlessDevice`].
#[derive(Clone, Debug)]
pub struct HeadlessTexture {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub packing: TexelPacking,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    /// Tightly packed copy of the uploaded texels (alignment padding removed).
    pub texels: Vec<u8>,
}

/// Upload counters kept by [`HeadlessDevice`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub created: u64,
    pub deleted: u64,
    pub uploaded_bytes: u64,
}

/// In-memory [`GpuDevice`] that never touches real hardware.
///
/// Texture names start at 1 so that 0 keeps its conventional "no texture" meaning. Deleting an
/// unknown name is ignored, like `glDeleteTextures`.
#[derive(Debug)]
pub struct HeadlessDevice {
    next_id: u32,
    textures: HashMap<TextureId, HeadlessTexture>,
    stats: HeadlessStats,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            textures: HashMap::new(),
            stats: HeadlessStats::default(),
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    /// Number of textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&id)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId> {
        let required = desc.required_len();
        if desc.pixels.len() < required {
            return Err(AssetError::device(format!(
                "texture {}x{} needs {required} bytes, got {}",
                desc.width,
                desc.height,
                desc.pixels.len()
            )));
        }

        let row = desc.width as usize * desc.format.bytes_per_texel();
        let stride = desc.row_stride();
        let mut texels = Vec::with_capacity(row * desc.height as usize);
        if row > 0 {
            for src in desc.pixels.chunks(stride).take(desc.height as usize) {
                texels.extend_from_slice(&src[..row]);
            }
        }

        let id = TextureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.stats.created = self.stats.created.saturating_add(1);
        self.stats.uploaded_bytes = self.stats.uploaded_bytes.saturating_add(texels.len() as u64);
        self.textures.insert(
            id,
            HeadlessTexture {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                packing: desc.packing,
                filter: desc.filter,
                wrap: desc.wrap,
                texels,
            },
        );
        Ok(id)
    }

    fn delete_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_some() {
            self.stats.deleted = self.stats.deleted.saturating_add(1);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/headless.rs"]
mod tests;
