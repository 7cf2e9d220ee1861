//! The seam between the dispatch loop and whatever actually owns fonts.

use glyphpipe_frame::{
    FontId, FontMetrics, FrameError, GlyphId, GlyphMetrics, Path, ScalerDescriptor,
};

/// Errors a provider may report while resolving a scaling context.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No font with this id is known to the provider.
    #[error("unknown font {0}")]
    UnknownFont(FontId),

    /// The descriptor bytes do not decode to usable parameters.
    #[error("unusable scaler descriptor: {0}")]
    Descriptor(#[from] FrameError),
}

/// A font resolved at one set of rendering parameters.
///
/// Implementations are synchronous and side-effect free beyond producing the
/// requested data.
pub trait ScalingContext {
    /// Font-wide metrics.
    fn font_metrics(&self) -> FontMetrics;

    /// Metrics for one glyph, including its image geometry.
    fn glyph_metrics(&self, glyph_id: GlyphId) -> GlyphMetrics;

    /// Render `glyph` into `dst`, which is exactly `glyph.image_size()` bytes
    /// laid out as `height` rows of `row_bytes`.
    fn render_image(&self, glyph: &GlyphMetrics, dst: &mut [u8]);

    /// Outline of one glyph.
    fn glyph_path(&self, glyph_id: GlyphId) -> Path;
}

/// Resolves `(font, descriptor)` pairs into scaling contexts.
///
/// Providers are expected to memoize contexts by `(FontId, ScalerDescriptor)`;
/// the RPC layer resolves on every request and does no caching of its own.
pub trait GlyphProvider {
    type Context: ScalingContext;

    fn resolve_context(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<&Self::Context, ProviderError>;
}

impl<P: GlyphProvider + ?Sized> GlyphProvider for &mut P {
    type Context = P::Context;

    fn resolve_context(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<&Self::Context, ProviderError> {
        (**self).resolve_context(font_id, descriptor)
    }
}
