//! Value types carried inside frames.

use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

/// Encoded size of [`FontMetrics`] in the payload area.
pub const FONT_METRICS_SIZE: usize = 56;

/// Encoded size of [`GlyphMetrics`] in the payload area.
pub const GLYPH_METRICS_SIZE: usize = 24;

/// Opaque identifier of a font resource owned by the renderer.
///
/// The rasterizer never dereferences it; it is only a lookup key for the
/// glyph data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

impl std::fmt::Display for FontId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "font#{}", self.0)
    }
}

/// Glyph index within a font.
pub type GlyphId = u16;

/// Request/response operation carried in the first field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    FontMetrics = 0,
    GlyphMetrics = 1,
    GlyphImage = 2,
    GlyphPath = 3,
}

impl Opcode {
    /// All opcodes in wire order.
    pub const ALL: [Opcode; 4] = [
        Opcode::FontMetrics,
        Opcode::GlyphMetrics,
        Opcode::GlyphImage,
        Opcode::GlyphPath,
    ];

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Human-readable name for logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::FontMetrics => "font-metrics",
            Opcode::GlyphMetrics => "glyph-metrics",
            Opcode::GlyphImage => "glyph-image",
            Opcode::GlyphPath => "glyph-path",
        }
    }

    /// Whether responses to this opcode carry trailing bytes.
    pub fn has_trailing(self) -> bool {
        matches!(self, Opcode::GlyphImage | Opcode::GlyphPath)
    }
}

impl TryFrom<u32> for Opcode {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Opcode::FontMetrics),
            1 => Ok(Opcode::GlyphMetrics),
            2 => Ok(Opcode::GlyphImage),
            3 => Ok(Opcode::GlyphPath),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel layout of a rendered glyph image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MaskFormat {
    /// 1 bit per pixel, rows padded to whole bytes.
    Bw = 0,
    /// 8-bit coverage.
    #[default]
    A8 = 1,
    /// 32-bit premultiplied color.
    Argb = 2,
}

impl MaskFormat {
    /// Bytes per row for an image `width` pixels wide.
    pub fn row_bytes(self, width: u16) -> u32 {
        let width = u32::from(width);
        match self {
            MaskFormat::Bw => width.div_ceil(8),
            MaskFormat::A8 => width,
            MaskFormat::Argb => width * 4,
        }
    }
}

impl TryFrom<u8> for MaskFormat {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MaskFormat::Bw),
            1 => Ok(MaskFormat::A8),
            2 => Ok(MaskFormat::Argb),
            other => Err(FrameError::InvalidField {
                field: "mask_format",
                value: u32::from(other),
            }),
        }
    }
}

/// Font-wide metrics for one scaling context.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    pub flags: u32,
    pub top: f32,
    pub ascent: f32,
    pub descent: f32,
    pub bottom: f32,
    pub leading: f32,
    pub avg_char_width: f32,
    pub max_char_width: f32,
    pub x_min: f32,
    pub x_max: f32,
    pub x_height: f32,
    pub cap_height: f32,
    pub underline_thickness: f32,
    pub underline_position: f32,
}

impl FontMetrics {
    /// `underline_thickness` is meaningful.
    pub const UNDERLINE_THICKNESS_VALID: u32 = 1 << 0;
    /// `underline_position` is meaningful.
    pub const UNDERLINE_POSITION_VALID: u32 = 1 << 1;

    pub(crate) fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.flags);
        for value in [
            self.top,
            self.ascent,
            self.descent,
            self.bottom,
            self.leading,
            self.avg_char_width,
            self.max_char_width,
            self.x_min,
            self.x_max,
            self.x_height,
            self.cap_height,
            self.underline_thickness,
            self.underline_position,
        ] {
            dst.put_f32_le(value);
        }
    }

    pub(crate) fn decode(src: &mut impl Buf) -> Self {
        Self {
            flags: src.get_u32_le(),
            top: src.get_f32_le(),
            ascent: src.get_f32_le(),
            descent: src.get_f32_le(),
            bottom: src.get_f32_le(),
            leading: src.get_f32_le(),
            avg_char_width: src.get_f32_le(),
            max_char_width: src.get_f32_le(),
            x_min: src.get_f32_le(),
            x_max: src.get_f32_le(),
            x_height: src.get_f32_le(),
            cap_height: src.get_f32_le(),
            underline_thickness: src.get_f32_le(),
            underline_position: src.get_f32_le(),
        }
    }
}

/// Per-glyph metrics, including the geometry of its rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub glyph_id: GlyphId,
    pub mask_format: MaskFormat,
    pub advance_x: f32,
    pub advance_y: f32,
    pub width: u16,
    pub height: u16,
    /// Bytes per image row; at least `mask_format.row_bytes(width)`.
    pub row_bytes: u32,
    pub left: i16,
    pub top: i16,
}

impl GlyphMetrics {
    /// Metrics with only the glyph id set, as sent in a metrics request.
    pub fn placeholder(glyph_id: GlyphId) -> Self {
        Self {
            glyph_id,
            ..Self::default()
        }
    }

    /// Number of bytes in this glyph's image (`row_bytes * height`).
    pub fn image_size(&self) -> usize {
        self.row_bytes as usize * usize::from(self.height)
    }

    /// Whether the glyph has no pixels to render.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` describes the same image layout.
    pub fn same_image_geometry(&self, other: &GlyphMetrics) -> bool {
        self.glyph_id == other.glyph_id
            && self.mask_format == other.mask_format
            && self.width == other.width
            && self.height == other.height
            && self.row_bytes == other.row_bytes
    }

    pub(crate) fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.glyph_id);
        dst.put_u8(self.mask_format as u8);
        dst.put_u8(0);
        dst.put_f32_le(self.advance_x);
        dst.put_f32_le(self.advance_y);
        dst.put_u16_le(self.width);
        dst.put_u16_le(self.height);
        dst.put_u32_le(self.row_bytes);
        dst.put_i16_le(self.left);
        dst.put_i16_le(self.top);
    }

    pub(crate) fn decode(src: &mut impl Buf) -> Result<Self> {
        let glyph_id = src.get_u16_le();
        let mask_format = MaskFormat::try_from(src.get_u8())?;
        src.advance(1);
        let metrics = Self {
            glyph_id,
            mask_format,
            advance_x: src.get_f32_le(),
            advance_y: src.get_f32_le(),
            width: src.get_u16_le(),
            height: src.get_u16_le(),
            row_bytes: src.get_u32_le(),
            left: src.get_i16_le(),
            top: src.get_i16_le(),
        };
        if metrics.row_bytes < mask_format.row_bytes(metrics.width) {
            return Err(FrameError::InvalidField {
                field: "row_bytes",
                value: metrics.row_bytes,
            });
        }
        Ok(metrics)
    }
}

/// A glyph as the rasterizer holds it: metrics plus a caller-owned image buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Glyph {
    pub metrics: GlyphMetrics,
    pub image: Vec<u8>,
}

impl Glyph {
    /// A glyph with known metrics and an empty image buffer.
    pub fn new(metrics: GlyphMetrics) -> Self {
        Self {
            metrics,
            image: Vec::new(),
        }
    }
}
