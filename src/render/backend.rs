use crate::foundation::error::AssetResult;

/// Which driver the application is currently rendering with.
///
/// - `Cpu` is always available and never touches a graphics device.
/// - `Gpu` requires every decoded asset to be uploaded as device textures on the render thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Software rasterization straight from decoded pixel buffers.
    #[default]
    Cpu,
    /// GPU-backed driver owning device textures.
    Gpu,
}

impl RenderMode {
    /// Return `true` when assets need device textures in this mode.
    pub fn uses_gpu(self) -> bool {
        matches!(self, Self::Gpu)
    }
}

/// Opaque device texture name handed out by a [`GpuDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct TextureId(pub u32);

/// Channel layout of the bytes passed to [`GpuDevice::create_texture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    /// Straight-alpha RGBA, one byte per channel.
    Rgba8,
    /// Byte-swapped BGRA, as stored by legacy bitmap files.
    Bgra8,
    /// Single coverage channel (glyph masks).
    Alpha8,
}

impl TexelFormat {
    /// Bytes per texel.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Alpha8 => 1,
        }
    }
}

/// How a 4-byte texel is packed when read as one 32-bit word.
///
/// Byte-addressed RGBA data reads as `8_8_8_8` on big-endian hosts and as the reversed packing on
/// little-endian hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TexelPacking {
    /// Most significant byte holds the first channel.
    Packed8888,
    /// Least significant byte holds the first channel.
    Packed8888Rev,
}

impl TexelPacking {
    /// Packing that matches plain byte order on the running host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Packed8888
        } else {
            Self::Packed8888Rev
        }
    }
}

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

/// Everything a device needs to allocate and fill one 2D texture.
#[derive(Clone, Copy, Debug)]
pub struct TextureDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub packing: TexelPacking,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    /// Row alignment of `pixels` in bytes (1 for tightly packed glyph masks).
    pub row_alignment: u32,
    /// Row-major texel bytes, `height` rows of `width * bytes_per_texel` bytes (plus alignment).
    pub pixels: &'a [u8],
}

impl TextureDesc<'_> {
    /// Bytes in one row including alignment padding.
    pub fn row_stride(&self) -> usize {
        let unpadded = self.width as usize * self.format.bytes_per_texel();
        let align = self.row_alignment.max(1) as usize;
        unpadded.div_ceil(align) * align
    }

    /// Minimum byte length `pixels` must have for this description.
    pub fn required_len(&self) -> usize {
        self.row_stride() * self.height as usize
    }
}

/// A graphics device bound to the render thread.
///
/// Implementations are deliberately not required to be `Send`: the asset system only ever calls
/// them from [`crate::AssetSystem::run_post_process`] and
/// [`crate::AssetSystem::on_render_mode_changed`], which the caller runs on the thread that owns the
/// graphics context.
pub trait GpuDevice {
    /// Allocate a texture and upload `desc.pixels` into it.
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId>;

    /// Free a texture previously returned by [`GpuDevice::create_texture`].
    fn delete_texture(&mut self, id: TextureId);
}

impl<D: GpuDevice + ?Sized> GpuDevice for &mut D {
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId> {
        (**self).create_texture(desc)
    }

    fn delete_texture(&mut self, id: TextureId) {
        (**self).delete_texture(id)
    }
}

impl<D: GpuDevice + ?Sized> GpuDevice for Box<D> {
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId> {
        (**self).create_texture(desc)
    }

    fn delete_texture(&mut self, id: TextureId) {
        (**self).delete_texture(id)
    }
}

/// Available device kinds.
///
/// - `Headless` is always available.
/// - `Wgpu` requires the `gpu` cargo feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// In-memory device that keeps uploaded texels for inspection.
    Headless,
    /// `wgpu` device on the default adapter.
    Wgpu,
}

/// Create a device implementation.
pub fn create_device(kind: DeviceKind) -> AssetResult<Box<dyn GpuDevice>> {
    match kind {
        DeviceKind::Headless => Ok(Box::new(crate::render::headless::HeadlessDevice::new())),
        #[cfg(feature = "gpu")]
        DeviceKind::Wgpu => Ok(Box::new(crate::render::wgpu_device::WgpuDevice::new()?)),
        #[cfg(not(feature = "gpu"))]
        DeviceKind::Wgpu => Err(crate::foundation::error::AssetError::device(
            "wgpu device requires the 'gpu' feature",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
