#![forbid(unsafe_code)]
//! Reference-counted image and font cache with background decoding and render-thread texture
//! upload.
//!
//! Callers acquire assets from any thread and get a handle back immediately. Decode workers turn
//! the source bytes into pixels or glyph bitmaps, and the render thread finalizes them once per
//! frame with [`AssetSystem::run_post_process`]:
//!
//! ```no_run
//! use assetpipe::{AssetSystem, AssetSystemOpts, HeadlessDevice};
//!
//! let assets = AssetSystem::new(AssetSystemOpts::default())?;
//! let logo = assets.acquire_image_from_path("logo.png");
//! let mut device = HeadlessDevice::new();
//! while !assets.is_image_loaded(logo) {
//!     assets.run_post_process(&mut device);
//! #   break;
//! }
//! assets.release_image(logo);
//! assets.shutdown();
//! # Ok::<(), assetpipe::AssetError>(())
//! ```

pub mod assets;
pub mod foundation;
mod pipeline;
pub mod render;
pub mod system;

pub use assets::bitmap::{BitmapHeader, decode_bitmap};
pub use assets::decode::{DecodedImage, PixelOrder, decode_image};
pub use assets::font::{GLYPH_PAGE_LEN, GLYPH_PAGE_START, Glyph, GlyphPage, rasterize_glyph_page};
pub use assets::store::{
    DedupKey, FontHandle, FontInfo, FontRecord, ImageHandle, ImageInfo, ImageKind, ImageRecord,
    SourceBytes,
};
pub use foundation::error::{AssetError, AssetResult};
pub use foundation::hash::hash_path;
pub use render::backend::{
    DeviceKind, FilterMode, GpuDevice, RenderMode, TexelFormat, TexelPacking, TextureDesc,
    TextureId, WrapMode, create_device,
};
pub use render::headless::{HeadlessDevice, HeadlessStats, HeadlessTexture};
#[cfg(feature = "gpu")]
pub use render::wgpu_device::WgpuDevice;
pub use system::{AssetStats, AssetSystem, AssetSystemOpts};
