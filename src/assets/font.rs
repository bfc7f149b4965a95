use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use swash::FontRef;

use crate::foundation::error::{AssetError, AssetResult};
use crate::render::backend::TextureId;

/// First codepoint covered by a glyph page.
pub const GLYPH_PAGE_START: u32 = 0;
/// Number of consecutive codepoints rasterized per font.
pub const GLYPH_PAGE_LEN: usize = 255;

/// Codepoint whose bitmap top defines [`GlyphPage::baseline`].
const BASELINE_REFERENCE: char = 'M';

/// One rasterized codepoint.
///
/// Offsets follow the usual y-down convention: `yoff` is the distance from the baseline to the top
/// row of `bitmap`, negative above the baseline.
#[derive(Clone, Debug, Default)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// Horizontal advance in pixels, truncated.
    pub advance: i32,
    /// Left side bearing in pixels, truncated.
    pub lsb: i32,
    pub xoff: i32,
    pub yoff: i32,
    /// `width * height` coverage bytes, top row first.
    pub bitmap: Vec<u8>,
    /// Device texture, present only while uploaded under a GPU render mode.
    pub texture: Option<TextureId>,
}

impl Glyph {
    pub(crate) fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rasterized glyphs for codepoints `GLYPH_PAGE_START..GLYPH_PAGE_START + GLYPH_PAGE_LEN` at one
/// pixel height.
#[derive(Clone, Debug)]
pub struct GlyphPage {
    glyphs: Vec<Glyph>,
    scale: f32,
    baseline: i32,
}

impl GlyphPage {
    pub(crate) fn new(glyphs: Vec<Glyph>, scale: f32, baseline: i32) -> Self {
        Self {
            glyphs,
            scale,
            baseline,
        }
    }

    /// Glyph for `codepoint`, or `None` outside the page.
    pub fn glyph(&self, codepoint: impl Into<u32>) -> Option<&Glyph> {
        let cp = codepoint.into();
        let idx = cp.checked_sub(GLYPH_PAGE_START)? as usize;
        self.glyphs.get(idx)
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub(crate) fn glyphs_mut(&mut self) -> &mut [Glyph] {
        &mut self.glyphs
    }

    /// Font units to pixels factor for the requested pixel height.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Distance in pixels from the top of a line to the baseline (top of the `M` bitmap).
    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    /// Number of glyphs currently holding a device texture.
    pub fn textured_glyphs(&self) -> usize {
        self.glyphs.iter().filter(|g| g.texture.is_some()).count()
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.glyphs.iter().map(|g| g.bitmap.len()).sum()
    }
}

/// Parse the first face in `bytes` and rasterize the whole glyph page at `size_px`.
///
/// `size_px` is the distance from the highest ascender to the lowest descender, so a 16px font
/// fits a 16px line.
pub fn rasterize_glyph_page(bytes: &[u8], size_px: u16) -> AssetResult<GlyphPage> {
    if size_px == 0 {
        return Err(AssetError::decode("font pixel size must be > 0"));
    }
    let font = FontRef::from_index(bytes, 0)
        .ok_or_else(|| AssetError::decode("not a TrueType/OpenType font"))?;

    let metrics = font.metrics(&[]);
    let extent = metrics.ascent + metrics.descent.abs();
    if !extent.is_finite() || extent <= 0.0 || metrics.units_per_em == 0 {
        return Err(AssetError::decode("font reports no vertical extent"));
    }
    let scale = f32::from(size_px) / extent;
    let ppem = scale * f32::from(metrics.units_per_em);

    let charmap = font.charmap();
    let hmetrics = font.glyph_metrics(&[]).scale(ppem);
    let mut context = ScaleContext::new();
    let mut scaler = context.builder(font).size(ppem).hint(false).build();
    let sources = [Source::Outline];
    let mut render = Render::new(&sources);
    render.format(Format::Alpha);

    let mut glyphs = Vec::with_capacity(GLYPH_PAGE_LEN);
    let mut baseline = 0;
    for i in 0..GLYPH_PAGE_LEN as u32 {
        let cp = GLYPH_PAGE_START + i;
        let id = charmap.map(cp);

        let mut glyph = Glyph {
            advance: hmetrics.advance_width(id) as i32,
            lsb: hmetrics.lsb(id) as i32,
            ..Glyph::default()
        };
        if let Some(image) = render.render(&mut scaler, id) {
            glyph.width = image.placement.width;
            glyph.height = image.placement.height;
            glyph.xoff = image.placement.left;
            glyph.yoff = -image.placement.top;
            glyph.bitmap = image.data;
        }
        if char::from_u32(cp) == Some(BASELINE_REFERENCE) {
            baseline = -glyph.yoff;
        }
        glyphs.push(glyph);
    }

    Ok(GlyphPage::new(glyphs, scale, baseline))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/font.rs"]
mod tests;
