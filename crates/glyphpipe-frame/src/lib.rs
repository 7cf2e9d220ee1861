//! Fixed-size glyph request/response frames with bounded trailing data.
//!
//! Every message starts with one fixed frame of [`FRAME_SIZE`] bytes:
//! - A 4-byte little-endian opcode
//! - A 4-byte little-endian font id
//! - A 32-byte opaque scaler descriptor
//! - A 64-byte opcode-specific payload area
//!
//! Image and path responses are followed by trailing bytes whose length is
//! carried in the fixed fields and bounded by [`FrameConfig::max_trailing_size`].

pub mod codec;
pub mod descriptor;
pub mod error;
mod io;
pub mod outline;
pub mod payload;
pub mod reader;
pub mod trailing;
pub mod types;
pub mod writer;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, FrameConfig, Request,
    RequestFrame, Response, ResponseFrame, DEFAULT_MAX_MESSAGE, DEFAULT_MAX_TRAILING, FRAME_SIZE,
    HEADER_SIZE, PAGE_SIZE, PAYLOAD_AREA_SIZE,
};
pub use descriptor::{Hinting, ScalerDescriptor, ScalerParams, DESCRIPTOR_SIZE};
pub use error::{FrameError, Result};
pub use outline::{FillRule, Path, PathVerb, Point};
pub use payload::{read_payload, write_payload, DEFAULT_MAX_DRAW_PAYLOAD, LENGTH_PREFIX_SIZE};
pub use reader::FrameReader;
pub use trailing::TrailingBuffer;
pub use types::{FontId, FontMetrics, Glyph, GlyphId, GlyphMetrics, MaskFormat, Opcode};
pub use writer::FrameWriter;
