//! Rasterizer-side replay of a draw list.
//!
//! Walks every run and glyph, pulling metrics, pixels and outlines from a
//! [`GlyphSource`], and folds everything received into a [`ReplaySummary`].
//! Replaying the same list against the RPC client and directly against the
//! provider must give identical summaries.

use std::io::{Read, Write};

use bytes::BytesMut;
use glyphpipe_frame::{FontId, FontMetrics, Glyph, GlyphId, GlyphMetrics, Path, ScalerDescriptor};
use glyphpipe_rpc::{GlyphProvider, Result, RpcClient, ScalingContext};
use serde::Serialize;
use tracing::debug;

use crate::drawlist::DrawList;

/// Where replay gets its glyph data from.
pub trait GlyphSource {
    fn font_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<FontMetrics>;

    fn glyph_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<GlyphMetrics>;

    fn glyph_image(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph: &mut Glyph,
    ) -> Result<()>;

    fn glyph_path(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<Path>;
}

impl<R: Read, W: Write> GlyphSource for RpcClient<R, W> {
    fn font_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<FontMetrics> {
        self.fetch_font_metrics(font_id, descriptor)
    }

    fn glyph_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<GlyphMetrics> {
        self.fetch_glyph_metrics(font_id, descriptor, glyph_id)
    }

    fn glyph_image(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph: &mut Glyph,
    ) -> Result<()> {
        self.fetch_glyph_image(font_id, descriptor, glyph)
    }

    fn glyph_path(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<Path> {
        self.fetch_glyph_path(font_id, descriptor, glyph_id)
    }
}

/// Calls a provider in-process, bypassing the pipes.
pub struct DirectSource<P>(pub P);

impl<P: GlyphProvider> GlyphSource for DirectSource<P> {
    fn font_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<FontMetrics> {
        Ok(self.0.resolve_context(font_id, descriptor)?.font_metrics())
    }

    fn glyph_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<GlyphMetrics> {
        Ok(self
            .0
            .resolve_context(font_id, descriptor)?
            .glyph_metrics(glyph_id))
    }

    fn glyph_image(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph: &mut Glyph,
    ) -> Result<()> {
        let context = self.0.resolve_context(font_id, descriptor)?;
        glyph.image.clear();
        glyph.image.resize(glyph.metrics.image_size(), 0);
        context.render_image(&glyph.metrics, &mut glyph.image);
        Ok(())
    }

    fn glyph_path(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<Path> {
        Ok(self.0.resolve_context(font_id, descriptor)?.glyph_path(glyph_id))
    }
}

/// Totals and checksum of everything a replay received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub runs: u64,
    pub glyphs: u64,
    pub images: u64,
    pub image_bytes: u64,
    pub path_verbs: u64,
    /// FNV-1a over font metrics, glyph metrics, pixels and encoded outlines,
    /// in replay order.
    pub checksum: u64,
}

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy)]
struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn write_f32s(&mut self, values: &[f32]) {
        for value in values {
            self.write(&value.to_bits().to_le_bytes());
        }
    }

    fn finish(self) -> u64 {
        self.0
    }
}

/// Replay every run of `list` against `source`.
///
/// Per run: font metrics once; per glyph: metrics, then the image when the
/// glyph has pixels, then the outline.
pub fn replay<S: GlyphSource>(source: &mut S, list: &DrawList) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut hash = Fnv1a::new();
    let mut encoded = BytesMut::new();

    for run in &list.runs {
        let font_id = run.font();
        let descriptor = run.params.descriptor()?;
        hash_font_metrics(&mut hash, &source.font_metrics(font_id, &descriptor)?);

        let glyph_ids = run.glyph_ids();
        debug!(%font_id, glyphs = glyph_ids.len(), size = run.params.size, "replaying run");
        for glyph_id in glyph_ids {
            let metrics = source.glyph_metrics(font_id, &descriptor, glyph_id)?;
            hash_glyph_metrics(&mut hash, &metrics);
            summary.glyphs += 1;

            if !metrics.is_empty() {
                let mut glyph = Glyph::new(metrics);
                source.glyph_image(font_id, &descriptor, &mut glyph)?;
                hash.write(&glyph.image);
                summary.images += 1;
                summary.image_bytes += glyph.image.len() as u64;
            }

            let path = source.glyph_path(font_id, &descriptor, glyph_id)?;
            encoded.clear();
            path.encode(&mut encoded);
            hash.write(&encoded);
            summary.path_verbs += path.verbs().len() as u64;
        }
        summary.runs += 1;
    }

    summary.checksum = hash.finish();
    Ok(summary)
}

fn hash_font_metrics(hash: &mut Fnv1a, metrics: &FontMetrics) {
    hash.write(&metrics.flags.to_le_bytes());
    hash.write_f32s(&[
        metrics.top,
        metrics.ascent,
        metrics.descent,
        metrics.bottom,
        metrics.leading,
        metrics.avg_char_width,
        metrics.max_char_width,
        metrics.x_min,
        metrics.x_max,
        metrics.x_height,
        metrics.cap_height,
        metrics.underline_thickness,
        metrics.underline_position,
    ]);
}

fn hash_glyph_metrics(hash: &mut Fnv1a, metrics: &GlyphMetrics) {
    hash.write(&metrics.glyph_id.to_le_bytes());
    hash.write(&[metrics.mask_format as u8]);
    hash.write_f32s(&[metrics.advance_x, metrics.advance_y]);
    hash.write(&metrics.width.to_le_bytes());
    hash.write(&metrics.height.to_le_bytes());
    hash.write(&metrics.row_bytes.to_le_bytes());
    hash.write(&metrics.left.to_le_bytes());
    hash.write(&metrics.top.to_le_bytes());
}
