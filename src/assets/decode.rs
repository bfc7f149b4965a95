use anyhow::Context;

use crate::foundation::error::AssetResult;

/// Byte order of the four channels in a decoded pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelOrder {
    /// Straight-alpha RGBA (general compressed images).
    Rgba,
    /// Byte-swapped BGRA (legacy bitmaps).
    Bgra,
}

/// Decoded raster image, one byte per channel.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel in `pixels`.
    pub channels: u8,
    pub order: PixelOrder,
    /// Row-major, top row first, tightly packed.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub(crate) fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Decode any format the `image` crate recognizes into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> AssetResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        channels: 4,
        order: PixelOrder::Rgba,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
