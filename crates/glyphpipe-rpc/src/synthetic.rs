//! Deterministic in-memory glyph provider.
//!
//! Stands in for a real font stack: every value is a pure function of the
//! face, the scaler parameters and the glyph id, so two calls with the same
//! inputs always produce bit-identical metrics, pixels and outlines.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glyphpipe_frame::{
    FontId, FontMetrics, GlyphId, GlyphMetrics, MaskFormat, Path, ScalerDescriptor, ScalerParams,
    DEFAULT_MAX_TRAILING,
};
use tracing::debug;

use crate::provider::{GlyphProvider, ProviderError, ScalingContext};

/// Largest glyph image edge, in pixels, before embolden and height variation.
///
/// The widest Argb image this provider reports still fits in one default
/// trailing block.
const MAX_GLYPH_EDGE: u16 = max_glyph_edge(DEFAULT_MAX_TRAILING);

/// Largest `edge` with `4 * (edge + 1) * (edge + 2) <= capacity`: embolden adds
/// one column and `glyph_id % 3` up to two rows.
const fn max_glyph_edge(capacity: usize) -> u16 {
    let mut edge: usize = 1;
    while edge < u16::MAX as usize - 2 && 4 * (edge + 2) * (edge + 3) <= capacity {
        edge += 1;
    }
    edge as u16
}

/// Glyph id rendered as blank space.
pub const SPACE_GLYPH: GlyphId = 32;

/// Design-space parameters of a synthetic font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFace {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub cap_height: i16,
    pub x_height: i16,
    pub avg_advance: u16,
    /// Glyph ids at or above this value are missing and render empty.
    pub glyph_count: u16,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            line_gap: 90,
            cap_height: 700,
            x_height: 500,
            avg_advance: 550,
            glyph_count: 512,
        }
    }
}

/// A synthetic face resolved at one set of scaler parameters.
#[derive(Debug, Clone)]
pub struct SyntheticContext {
    face: SyntheticFace,
    params: ScalerParams,
    scale: f32,
}

impl SyntheticContext {
    pub fn new(face: SyntheticFace, params: ScalerParams) -> Self {
        let scale = params.text_size / f32::from(face.units_per_em.max(1));
        Self {
            face,
            params,
            scale,
        }
    }

    fn is_missing(&self, glyph_id: GlyphId) -> bool {
        glyph_id >= self.face.glyph_count
    }

    fn advance_units(&self, glyph_id: GlyphId) -> f32 {
        f32::from(self.face.avg_advance) + f32::from(glyph_id % 7) * 20.0 - 60.0
    }

    fn embolden(&self) -> u16 {
        u16::from(self.params.flags & ScalerParams::FLAG_EMBOLDEN != 0)
    }
}

impl ScalingContext for SyntheticContext {
    fn font_metrics(&self) -> FontMetrics {
        let s = self.scale;
        let ascent = -f32::from(self.face.ascender) * s;
        let descent = -f32::from(self.face.descender) * s;
        let max_advance = (f32::from(self.face.avg_advance) + 60.0) * s * self.params.scale_x;
        FontMetrics {
            flags: FontMetrics::UNDERLINE_THICKNESS_VALID | FontMetrics::UNDERLINE_POSITION_VALID,
            top: ascent * 1.1,
            ascent,
            descent,
            bottom: descent * 1.1,
            leading: f32::from(self.face.line_gap) * s,
            avg_char_width: f32::from(self.face.avg_advance) * s * self.params.scale_x,
            max_char_width: max_advance,
            x_min: -0.1 * max_advance,
            x_max: max_advance,
            x_height: f32::from(self.face.x_height) * s,
            cap_height: f32::from(self.face.cap_height) * s,
            underline_thickness: (self.params.text_size / 14.0).max(1.0),
            underline_position: descent * 0.5,
        }
    }

    fn glyph_metrics(&self, glyph_id: GlyphId) -> GlyphMetrics {
        let mask_format = self.params.mask_format;
        if self.is_missing(glyph_id) {
            return GlyphMetrics {
                mask_format,
                ..GlyphMetrics::placeholder(glyph_id)
            };
        }

        let advance = self.advance_units(glyph_id) * self.scale * self.params.scale_x;
        let (advance_x, advance_y) = if self.params.flags & ScalerParams::FLAG_VERTICAL != 0 {
            (0.0, self.params.text_size)
        } else {
            (advance, 0.0)
        };
        if glyph_id == SPACE_GLYPH {
            return GlyphMetrics {
                mask_format,
                advance_x,
                advance_y,
                ..GlyphMetrics::placeholder(glyph_id)
            };
        }

        let max_edge = f32::from(MAX_GLYPH_EDGE);
        let width = ((advance * 0.8).ceil().clamp(1.0, max_edge) as u16) + self.embolden();
        let extra_height = glyph_id % 3;
        let height = (f32::from(self.face.cap_height) * self.scale)
            .ceil()
            .clamp(1.0, max_edge) as u16
            + extra_height;
        let left = (advance * 0.1).round() as i16;

        GlyphMetrics {
            glyph_id,
            mask_format,
            advance_x,
            advance_y,
            width,
            height,
            row_bytes: mask_format.row_bytes(width),
            left,
            top: -(height as i16),
        }
    }

    fn render_image(&self, glyph: &GlyphMetrics, dst: &mut [u8]) {
        dst.fill(0);
        let (w, h) = (usize::from(glyph.width), usize::from(glyph.height));
        let row_bytes = glyph.row_bytes as usize;
        if w == 0 || h == 0 || row_bytes == 0 {
            return;
        }

        // Pixels that fall outside the row or the buffer are dropped.
        for (y, row) in dst.chunks_exact_mut(row_bytes).take(h).enumerate() {
            for x in 0..w {
                let coverage = coverage_at(glyph.glyph_id, x, y, w, h);
                match glyph.mask_format {
                    MaskFormat::Bw => {
                        if let Some(byte) = row.get_mut(x / 8).filter(|_| coverage >= 0x80) {
                            *byte |= 0x80 >> (x % 8);
                        }
                    }
                    MaskFormat::A8 => {
                        if let Some(pixel) = row.get_mut(x) {
                            *pixel = coverage;
                        }
                    }
                    MaskFormat::Argb => {
                        if let Some(pixel) = row.get_mut(x * 4..x * 4 + 4) {
                            pixel.fill(coverage);
                        }
                    }
                }
            }
        }
    }

    fn glyph_path(&self, glyph_id: GlyphId) -> Path {
        let metrics = self.glyph_metrics(glyph_id);
        let mut path = Path::new();
        if metrics.is_empty() {
            return path;
        }

        let (w, h) = (f32::from(metrics.width), f32::from(metrics.height));
        let skew = self.params.skew_x;
        let at = |x: f32, y: f32| (x - skew * y, -y);

        let (x, y) = at(0.0, 0.0);
        path.move_to(x, y);
        for (px, py) in [(w, 0.0), (w, h), (0.0, h)] {
            let (x, y) = at(px, py);
            path.line_to(x, y);
        }
        path.close();

        // Inner stroke varies with the glyph id so outlines are distinguishable.
        let bend = f32::from(glyph_id % 5) / 5.0;
        let (x0, y0) = at(w * 0.25, h * 0.25);
        let (cx, cy) = at(w * bend, h * 0.5);
        let (x1, y1) = at(w * 0.75, h * 0.75);
        path.move_to(x0, y0).quad_to(cx, cy, x1, y1).close();
        path
    }
}

fn coverage_at(glyph_id: GlyphId, x: usize, y: usize, w: usize, h: usize) -> u8 {
    let border = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
    let diagonal = x * h / w == y;
    if border || diagonal {
        0xFF
    } else if (x + y + usize::from(glyph_id)) % 4 == 0 {
        0x80
    } else {
        0x10
    }
}

/// Context cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// In-memory provider over registered synthetic faces.
///
/// Contexts are memoized by `(FontId, ScalerDescriptor)`.
#[derive(Debug, Default)]
pub struct SyntheticProvider {
    faces: HashMap<FontId, SyntheticFace>,
    contexts: HashMap<(FontId, ScalerDescriptor), SyntheticContext>,
    hits: u64,
    misses: u64,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `face` under `font_id`, builder style.
    pub fn with_face(mut self, font_id: FontId, face: SyntheticFace) -> Self {
        self.add_face(font_id, face);
        self
    }

    /// Register `face` under `font_id`, replacing any earlier face and its contexts.
    pub fn add_face(&mut self, font_id: FontId, face: SyntheticFace) {
        self.contexts.retain(|(id, _), _| *id != font_id);
        self.faces.insert(font_id, face);
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.contexts.len(),
        }
    }
}

impl GlyphProvider for SyntheticProvider {
    type Context = SyntheticContext;

    fn resolve_context(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<&SyntheticContext, ProviderError> {
        match self.contexts.entry((font_id, *descriptor)) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let face = *self
                    .faces
                    .get(&font_id)
                    .ok_or(ProviderError::UnknownFont(font_id))?;
                let params = descriptor.params()?;
                self.misses += 1;
                debug!(%font_id, text_size = params.text_size, "created scaling context");
                Ok(entry.insert(SyntheticContext::new(face, params)))
            }
        }
    }
}
