/// Render mode, device trait and texture descriptions.
pub mod backend;
/// Always-available in-memory device.
pub mod headless;
pub(crate) mod upload;
/// `wgpu`-backed device.
#[cfg(feature = "gpu")]
pub mod wgpu_device;
