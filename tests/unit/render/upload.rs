use super::*;
use crate::foundation::error::AssetError;
use crate::render::headless::HeadlessDevice;

fn glyph(w: u32, h: u32) -> Glyph {
    Glyph {
        width: w,
        height: h,
        bitmap: vec![0x80; (w * h) as usize],
        ..Glyph::default()
    }
}

fn page() -> GlyphPage {
    GlyphPage::new(vec![glyph(2, 3), glyph(0, 0), glyph(1, 1)], 0.01, 12)
}

/// Headless device that refuses to create more than `budget` textures.
struct Limited {
    inner: HeadlessDevice,
    budget: usize,
}

impl GpuDevice for Limited {
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> AssetResult<TextureId> {
        if self.budget == 0 {
            return Err(AssetError::device("out of texture memory"));
        }
        self.budget -= 1;
        self.inner.create_texture(desc)
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.inner.delete_texture(id)
    }
}

#[test]
fn image_upload_uses_order_specific_format_and_nearest_repeat() {
    let mut dev = HeadlessDevice::new();
    let img = DecodedImage {
        width: 2,
        height: 1,
        channels: 4,
        order: PixelOrder::Bgra,
        pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
    };
    let id = upload_image(&mut dev, &img).unwrap();
    let tex = dev.texture(id).unwrap();
    assert_eq!(tex.format, TexelFormat::Bgra8);
    assert_eq!(tex.packing, TexelPacking::native());
    assert_eq!(tex.filter, FilterMode::Nearest);
    assert_eq!(tex.wrap, WrapMode::Repeat);
    assert_eq!(tex.texels, img.pixels);
}

#[test]
fn glyph_upload_skips_empty_glyphs() {
    let mut dev = HeadlessDevice::new();
    let mut page = page();
    upload_glyph_page(&mut dev, &mut page).unwrap();

    assert_eq!(page.textured_glyphs(), 2);
    assert!(page.glyphs()[1].texture.is_none());
    let tex = dev.texture(page.glyphs()[0].texture.unwrap()).unwrap();
    assert_eq!(tex.format, TexelFormat::Alpha8);
    assert_eq!(tex.wrap, WrapMode::ClampToEdge);
    assert_eq!((tex.width, tex.height), (2, 3));
}

#[test]
fn failed_glyph_upload_rolls_back() {
    let mut dev = Limited {
        inner: HeadlessDevice::new(),
        budget: 1,
    };
    let mut page = page();
    assert!(upload_glyph_page(&mut dev, &mut page).is_err());
    assert_eq!(page.textured_glyphs(), 0);
    assert_eq!(dev.inner.live_textures(), 0);
}

#[test]
fn free_and_take_detach_textures() {
    let mut dev = HeadlessDevice::new();
    let mut page = page();
    upload_glyph_page(&mut dev, &mut page).unwrap();
    assert_eq!(free_glyph_textures(&mut dev, &mut page), 2);
    assert_eq!(dev.live_textures(), 0);

    upload_glyph_page(&mut dev, &mut page).unwrap();
    let ids = take_glyph_textures(&mut page);
    assert_eq!(ids.len(), 2);
    assert_eq!(page.textured_glyphs(), 0);
    assert_eq!(dev.live_textures(), 2);
}
