use super::*;

fn alpha_desc(pixels: &[u8], width: u32, height: u32, row_alignment: u32) -> TextureDesc<'_> {
    TextureDesc {
        width,
        height,
        format: TexelFormat::Alpha8,
        packing: TexelPacking::native(),
        filter: FilterMode::Nearest,
        wrap: WrapMode::ClampToEdge,
        row_alignment,
        pixels,
    }
}

#[test]
fn ids_start_at_one_and_are_unique() {
    let mut dev = HeadlessDevice::new();
    let a = dev.create_texture(&alpha_desc(&[1], 1, 1, 1)).unwrap();
    let b = dev.create_texture(&alpha_desc(&[2], 1, 1, 1)).unwrap();
    assert_eq!(a, TextureId(1));
    assert_ne!(a, b);
    assert_eq!(dev.live_textures(), 2);
}

#[test]
fn padding_is_stripped_from_stored_texels() {
    let mut dev = HeadlessDevice::new();
    let pixels = [1u8, 2, 3, 0, 4, 5, 6, 0];
    let id = dev.create_texture(&alpha_desc(&pixels, 3, 2, 4)).unwrap();
    assert_eq!(dev.texture(id).unwrap().texels, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn short_pixel_buffers_are_rejected() {
    let mut dev = HeadlessDevice::new();
    let err = dev.create_texture(&alpha_desc(&[1, 2], 2, 2, 1)).unwrap_err();
    assert!(err.to_string().contains("device error:"));
    assert_eq!(dev.stats().created, 0);
}

#[test]
fn delete_ignores_unknown_names() {
    let mut dev = HeadlessDevice::new();
    let id = dev.create_texture(&alpha_desc(&[9], 1, 1, 1)).unwrap();
    dev.delete_texture(TextureId(999));
    assert_eq!(dev.stats().deleted, 0);
    dev.delete_texture(id);
    dev.delete_texture(id);
    assert_eq!(dev.stats().deleted, 1);
    assert!(!dev.contains(id));
}
