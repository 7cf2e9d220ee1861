use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::types::MaskFormat;

/// Encoded size of a [`ScalerDescriptor`].
pub const DESCRIPTOR_SIZE: usize = 32;

/// Outline hinting strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Hinting {
    None = 0,
    Slight = 1,
    #[default]
    Normal = 2,
    Full = 3,
}

impl TryFrom<u8> for Hinting {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Hinting::None),
            1 => Ok(Hinting::Slight),
            2 => Ok(Hinting::Normal),
            3 => Ok(Hinting::Full),
            other => Err(FrameError::InvalidField {
                field: "hinting",
                value: u32::from(other),
            }),
        }
    }
}

/// Rendering parameters a provider needs to build a scaling context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalerParams {
    /// Text size in pixels.
    pub text_size: f32,
    /// Horizontal stretch.
    pub scale_x: f32,
    /// Horizontal skew (synthetic oblique).
    pub skew_x: f32,
    /// 2x2 device transform, row-major.
    pub post_matrix: [f32; 4],
    pub hinting: Hinting,
    pub mask_format: MaskFormat,
    pub flags: u16,
}

impl ScalerParams {
    /// Request embolden.
    pub const FLAG_EMBOLDEN: u16 = 1 << 0;
    /// Request subpixel positioning.
    pub const FLAG_SUBPIXEL: u16 = 1 << 1;
    /// Request vertical layout.
    pub const FLAG_VERTICAL: u16 = 1 << 2;

    /// Default parameters at the given text size.
    pub fn with_size(text_size: f32) -> Self {
        Self {
            text_size,
            ..Self::default()
        }
    }
}

impl Default for ScalerParams {
    fn default() -> Self {
        Self {
            text_size: 12.0,
            scale_x: 1.0,
            skew_x: 0.0,
            post_matrix: [1.0, 0.0, 0.0, 1.0],
            hinting: Hinting::default(),
            mask_format: MaskFormat::default(),
            flags: 0,
        }
    }
}

/// Fixed-size, content-addressable encoding of [`ScalerParams`].
///
/// Equality and hashing operate on the encoded bytes, so two descriptors with
/// identical bytes request identical behavior. The bytes travel through the
/// protocol untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalerDescriptor {
    bytes: [u8; DESCRIPTOR_SIZE],
}

impl ScalerDescriptor {
    /// Encode parameters into a descriptor.
    ///
    /// Rejects non-finite or non-positive text sizes and non-finite transform
    /// components, which no provider can honor.
    pub fn new(params: &ScalerParams) -> Result<Self> {
        if !params.text_size.is_finite() || params.text_size <= 0.0 {
            return Err(FrameError::InvalidField {
                field: "text_size",
                value: params.text_size.to_bits(),
            });
        }
        for value in [params.scale_x, params.skew_x]
            .into_iter()
            .chain(params.post_matrix)
        {
            if !value.is_finite() {
                return Err(FrameError::InvalidField {
                    field: "transform",
                    value: value.to_bits(),
                });
            }
        }

        let mut bytes = [0u8; DESCRIPTOR_SIZE];
        let mut dst = &mut bytes[..];
        dst.put_f32_le(params.text_size);
        dst.put_f32_le(params.scale_x);
        dst.put_f32_le(params.skew_x);
        for value in params.post_matrix {
            dst.put_f32_le(value);
        }
        dst.put_u8(params.hinting as u8);
        dst.put_u8(params.mask_format as u8);
        dst.put_u16_le(params.flags);
        Ok(Self { bytes })
    }

    /// Wrap raw descriptor bytes received from the wire, without validation.
    pub fn from_bytes(bytes: [u8; DESCRIPTOR_SIZE]) -> Self {
        Self { bytes }
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8; DESCRIPTOR_SIZE] {
        &self.bytes
    }

    /// Decode the parameters back out of the descriptor.
    pub fn params(&self) -> Result<ScalerParams> {
        let mut src = &self.bytes[..];
        let text_size = src.get_f32_le();
        let scale_x = src.get_f32_le();
        let skew_x = src.get_f32_le();
        let post_matrix = [
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
        ];
        let hinting = Hinting::try_from(src.get_u8())?;
        let mask_format = MaskFormat::try_from(src.get_u8())?;
        let flags = src.get_u16_le();
        Ok(ScalerParams {
            text_size,
            scale_x,
            skew_x,
            post_matrix,
            hinting,
            mask_format,
            flags,
        })
    }
}

impl std::fmt::Debug for ScalerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScalerDescriptor(")?;
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
