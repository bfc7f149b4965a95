use std::collections::HashMap;

use crate::foundation::error::{AssetError, AssetResult};
use crate::render::backend::{
    FilterMode, GpuDevice, TexelFormat, TexelPacking, TextureDesc, TextureId, WrapMode,
};

/// A texture owned by [`WgpuDevice`], ready to bind.
pub struct WgpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// [`GpuDevice`] backed by a `wgpu` device/queue pair.
///
/// Texture names are local to this device; the `wgpu` objects are reachable through
/// [`WgpuDevice::texture`] for binding.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u32,
    textures: HashMap<TextureId, WgpuTexture>,
}

impl WgpuDevice {
    /// Open the default high-performance adapter.
    pub fn new() -> AssetResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                AssetError::device("no gpu adapter available")
            }
            other => AssetError::device(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("assetpipe"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| AssetError::device(format!("wgpu request_device failed: {e:?}")))?;

        Ok(Self::from_parts(device, queue))
    }

    /// Wrap a device/queue pair the application already owns.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next_id: 1,
            textures: HashMap::new(),
        }
    }

    pub fn texture(&self, id: TextureId) -> Option<&WgpuTexture> {
        self.textures.get(&id)
    }
}

fn texture_format(format: TexelFormat) -> wgpu::TextureFormat {
    match format {
        TexelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        TexelFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
        // No alpha-only formats in wgpu; shaders read coverage from `.r`.
        TexelFormat::Alpha8 => wgpu::TextureFormat::R8Unorm,
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

impl GpuDevice for WgpuDevice {
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(AssetError::device("wgpu textures must be at least 1x1"));
        }
        if desc.pixels.len() < desc.required_len() {
            return Err(AssetError::device(format!(
                "texture {}x{} needs {} bytes, got {}",
                desc.width,
                desc.height,
                desc.required_len(),
                desc.pixels.len()
            )));
        }

        // wgpu formats are byte addressed, which is what the host-native packing describes.
        let swizzled;
        let pixels = if desc.format.bytes_per_texel() == 4 && desc.packing != TexelPacking::native()
        {
            swizzled = desc
                .pixels
                .chunks_exact(4)
                .flat_map(|px| [px[3], px[2], px[1], px[0]])
                .collect::<Vec<u8>>();
            swizzled.as_slice()
        } else {
            desc.pixels
        };

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("assetpipe_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_row = u32::try_from(desc.row_stride())
            .map_err(|_| AssetError::device("texture row stride exceeds u32"))?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("assetpipe_sampler"),
            address_mode_u: address_mode(desc.wrap),
            address_mode_v: address_mode(desc.wrap),
            address_mode_w: address_mode(desc.wrap),
            mag_filter: filter_mode(desc.filter),
            min_filter: filter_mode(desc.filter),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let id = TextureId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.textures.insert(
            id,
            WgpuTexture {
                texture,
                view,
                sampler,
            },
        );
        Ok(id)
    }

    fn delete_texture(&mut self, id: TextureId) {
        if let Some(t) = self.textures.remove(&id) {
            t.texture.destroy();
        }
    }
}
