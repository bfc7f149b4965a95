use super::*;

static FONT: &[u8] = include_bytes!("../../fixtures/DejaVuSansMono.ttf");

#[test]
fn zero_size_is_rejected() {
    let err = rasterize_glyph_page(b"", 0).unwrap_err();
    assert!(err.to_string().contains("pixel size"));
}

#[test]
fn garbage_bytes_are_rejected() {
    assert!(rasterize_glyph_page(b"not a font at all", 16).is_err());
    assert!(rasterize_glyph_page(&[], 16).is_err());
}

#[test]
fn page_covers_fixed_range() {
    let page = rasterize_glyph_page(FONT, 16).unwrap();
    assert_eq!(page.glyphs().len(), GLYPH_PAGE_LEN);
    assert!(page.scale() > 0.0);

    let m = page.glyph('M').unwrap();
    assert!(m.width > 0 && m.height > 0);
    assert_eq!(m.bitmap.len(), (m.width * m.height) as usize);
    assert_eq!(page.baseline(), -m.yoff);
    assert!(page.baseline() > 0 && page.baseline() <= 16);
    assert!(m.advance > 0);

    let space = page.glyph(' ').unwrap();
    assert!(space.bitmap.is_empty());
    assert!(space.advance > 0);

    assert!(page.glyph(GLYPH_PAGE_LEN as u32).is_none());
    assert_eq!(page.textured_glyphs(), 0);
}

#[test]
fn larger_sizes_produce_larger_glyphs() {
    let small = rasterize_glyph_page(FONT, 12).unwrap();
    let large = rasterize_glyph_page(FONT, 48).unwrap();
    assert!(large.glyph('M').unwrap().height > small.glyph('M').unwrap().height);
    assert!(large.baseline() > small.baseline());
}

#[test]
fn monospace_fixture_has_uniform_advances() {
    let page = rasterize_glyph_page(FONT, 20).unwrap();
    let advance = page.glyph('i').unwrap().advance;
    assert_eq!(page.glyph('W').unwrap().advance, advance);
    assert_eq!(page.glyph(' ').unwrap().advance, advance);
}
