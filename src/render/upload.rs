use crate::assets::decode::{DecodedImage, PixelOrder};
use crate::assets::font::{Glyph, GlyphPage};
use crate::foundation::error::AssetResult;
use crate::render::backend::{
    FilterMode, GpuDevice, TexelFormat, TexelPacking, TextureDesc, TextureId, WrapMode,
};

pub(crate) fn image_desc(image: &DecodedImage) -> TextureDesc<'_> {
    TextureDesc {
        width: image.width,
        height: image.height,
        format: match image.order {
            PixelOrder::Rgba => TexelFormat::Rgba8,
            PixelOrder::Bgra => TexelFormat::Bgra8,
        },
        packing: TexelPacking::native(),
        filter: FilterMode::Nearest,
        wrap: WrapMode::Repeat,
        row_alignment: 4,
        pixels: &image.pixels,
    }
}

pub(crate) fn glyph_desc(glyph: &Glyph) -> TextureDesc<'_> {
    TextureDesc {
        width: glyph.width,
        height: glyph.height,
        format: TexelFormat::Alpha8,
        packing: TexelPacking::native(),
        filter: FilterMode::Nearest,
        wrap: WrapMode::ClampToEdge,
        row_alignment: 1,
        pixels: &glyph.bitmap,
    }
}

#[tracing::instrument(level = "debug", skip_all, fields(w = image.width, h = image.height))]
pub(crate) fn upload_image(
    device: &mut dyn GpuDevice,
    image: &DecodedImage,
) -> AssetResult<TextureId> {
    device.create_texture(&image_desc(image))
}

/// Give every non-empty glyph without a texture its own alpha texture.
///
/// All-or-nothing: on failure the textures created so far are deleted again and the page is left
/// without any.
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn upload_glyph_page(device: &mut dyn GpuDevice, page: &mut GlyphPage) -> AssetResult<()> {
    for i in 0..page.glyphs().len() {
        let glyph = &page.glyphs()[i];
        if glyph.is_empty() || glyph.texture.is_some() {
            continue;
        }
        match device.create_texture(&glyph_desc(glyph)) {
            Ok(id) => page.glyphs_mut()[i].texture = Some(id),
            Err(err) => {
                free_glyph_textures(device, page);
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Detach every glyph texture from `page` without touching the device.
pub(crate) fn take_glyph_textures(page: &mut GlyphPage) -> Vec<TextureId> {
    page.glyphs_mut()
        .iter_mut()
        .filter_map(|g| g.texture.take())
        .collect()
}

/// Delete every glyph texture of `page`. Returns how many were freed.
pub(crate) fn free_glyph_textures(device: &mut dyn GpuDevice, page: &mut GlyphPage) -> usize {
    let ids = take_glyph_textures(page);
    for &id in &ids {
        device.delete_texture(id);
    }
    ids.len()
}

#[cfg(test)]
#[path = "../../tests/unit/render/upload.rs"]
mod tests;
