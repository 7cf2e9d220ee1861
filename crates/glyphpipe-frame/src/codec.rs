use bytes::{Buf, BufMut, BytesMut};

use crate::descriptor::{ScalerDescriptor, DESCRIPTOR_SIZE};
use crate::error::{FrameError, Result};
use crate::types::{FontId, FontMetrics, GlyphId, GlyphMetrics, Opcode};

/// Frame header: opcode (4) + font id (4) + scaler descriptor (32) = 40 bytes.
pub const HEADER_SIZE: usize = 8 + DESCRIPTOR_SIZE;

/// Opcode-specific payload area, sized for the largest variant (font metrics).
pub const PAYLOAD_AREA_SIZE: usize = 64;

/// Fixed wire size of every frame, request or response, regardless of opcode.
pub const FRAME_SIZE: usize = HEADER_SIZE + PAYLOAD_AREA_SIZE;

/// Unit of the agreed message capacity.
pub const PAGE_SIZE: usize = 4096;

/// Largest fixed frame plus trailing bytes either end will accept: 4 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 1024 * PAGE_SIZE;

/// Largest trailing block either end will accept by default.
pub const DEFAULT_MAX_TRAILING: usize = DEFAULT_MAX_MESSAGE - FRAME_SIZE;

/// A request from the rasterizer, one variant per opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    /// Font-wide metrics for the frame's scaling context.
    FontMetrics,
    /// Metrics for one glyph. Only `glyph_id` is meaningful on the way in.
    GlyphMetrics(GlyphMetrics),
    /// Pixels for a glyph whose geometry came from a prior metrics call.
    GlyphImage(GlyphMetrics),
    /// Encoded outline for one glyph.
    GlyphPath(GlyphId),
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::FontMetrics => Opcode::FontMetrics,
            Request::GlyphMetrics(_) => Opcode::GlyphMetrics,
            Request::GlyphImage(_) => Opcode::GlyphImage,
            Request::GlyphPath(_) => Opcode::GlyphPath,
        }
    }
}

/// A response from the renderer, one variant per opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    FontMetrics(FontMetrics),
    GlyphMetrics(GlyphMetrics),
    /// Followed by `row_bytes * height` trailing bytes of pixel data.
    GlyphImage(GlyphMetrics),
    /// Followed by `path_size` trailing bytes of encoded outline.
    GlyphPath { glyph_id: GlyphId, path_size: u32 },
}

impl Response {
    pub fn opcode(&self) -> Opcode {
        match self {
            Response::FontMetrics(_) => Opcode::FontMetrics,
            Response::GlyphMetrics(_) => Opcode::GlyphMetrics,
            Response::GlyphImage(_) => Opcode::GlyphImage,
            Response::GlyphPath { .. } => Opcode::GlyphPath,
        }
    }

    /// Number of trailing bytes that follow this response on the wire.
    ///
    /// Always derived from fixed fields, never from how many bytes a read
    /// happened to return.
    pub fn trailing_len(&self) -> usize {
        match self {
            Response::GlyphImage(metrics) => metrics.image_size(),
            Response::GlyphPath { path_size, .. } => *path_size as usize,
            Response::FontMetrics(_) | Response::GlyphMetrics(_) => 0,
        }
    }
}

/// A request addressed to one scaling context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestFrame {
    pub font_id: FontId,
    pub descriptor: ScalerDescriptor,
    pub request: Request,
}

impl RequestFrame {
    pub fn new(font_id: FontId, descriptor: ScalerDescriptor, request: Request) -> Self {
        Self {
            font_id,
            descriptor,
            request,
        }
    }
}

/// A response, echoing the font id and descriptor of its request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseFrame {
    pub font_id: FontId,
    pub descriptor: ScalerDescriptor,
    pub response: Response,
}

impl ResponseFrame {
    /// Build the response envelope for `request`.
    pub fn answering(request: &RequestFrame, response: Response) -> Self {
        Self {
            font_id: request.font_id,
            descriptor: request.descriptor,
            response,
        }
    }
}

/// Encode a request into exactly [`FRAME_SIZE`] bytes.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬──────────────────┬───────────────────────┐
/// │ Opcode     │ Font id    │ Scaler descriptor│ Payload area          │
/// │ (4B LE)    │ (4B LE)    │ (32B, opaque)    │ (64B, zero padded)    │
/// └────────────┴────────────┴──────────────────┴───────────────────────┘
/// ```
pub fn encode_request(frame: &RequestFrame, dst: &mut BytesMut) {
    let mut area = [0u8; PAYLOAD_AREA_SIZE];
    {
        let mut payload = &mut area[..];
        match &frame.request {
            Request::FontMetrics => {}
            Request::GlyphMetrics(metrics) | Request::GlyphImage(metrics) => {
                metrics.encode(&mut payload)
            }
            Request::GlyphPath(glyph_id) => payload.put_u16_le(*glyph_id),
        }
    }
    put_frame(
        dst,
        frame.request.opcode(),
        frame.font_id,
        &frame.descriptor,
        &area,
    );
}

/// Decode a request from the first [`FRAME_SIZE`] bytes of `src`.
pub fn decode_request(src: &[u8]) -> Result<RequestFrame> {
    let (opcode, font_id, descriptor, mut payload) = split_frame(src)?;
    let request = match opcode {
        Opcode::FontMetrics => Request::FontMetrics,
        Opcode::GlyphMetrics => Request::GlyphMetrics(GlyphMetrics::decode(&mut payload)?),
        Opcode::GlyphImage => Request::GlyphImage(GlyphMetrics::decode(&mut payload)?),
        Opcode::GlyphPath => Request::GlyphPath(payload.get_u16_le()),
    };
    Ok(RequestFrame {
        font_id,
        descriptor,
        request,
    })
}

/// Encode a response's fixed part into exactly [`FRAME_SIZE`] bytes.
///
/// Trailing bytes are not part of the fixed frame; the writer appends them.
pub fn encode_response(frame: &ResponseFrame, dst: &mut BytesMut) {
    let mut area = [0u8; PAYLOAD_AREA_SIZE];
    {
        let mut payload = &mut area[..];
        match &frame.response {
            Response::FontMetrics(metrics) => metrics.encode(&mut payload),
            Response::GlyphMetrics(metrics) | Response::GlyphImage(metrics) => {
                metrics.encode(&mut payload)
            }
            Response::GlyphPath {
                glyph_id,
                path_size,
            } => {
                payload.put_u16_le(*glyph_id);
                payload.put_u16_le(0);
                payload.put_u32_le(*path_size);
            }
        }
    }
    put_frame(
        dst,
        frame.response.opcode(),
        frame.font_id,
        &frame.descriptor,
        &area,
    );
}

/// Decode a response's fixed part from the first [`FRAME_SIZE`] bytes of `src`.
pub fn decode_response(src: &[u8]) -> Result<ResponseFrame> {
    let (opcode, font_id, descriptor, mut payload) = split_frame(src)?;
    let response = match opcode {
        Opcode::FontMetrics => Response::FontMetrics(FontMetrics::decode(&mut payload)),
        Opcode::GlyphMetrics => Response::GlyphMetrics(GlyphMetrics::decode(&mut payload)?),
        Opcode::GlyphImage => Response::GlyphImage(GlyphMetrics::decode(&mut payload)?),
        Opcode::GlyphPath => {
            let glyph_id = payload.get_u16_le();
            payload.advance(2);
            Response::GlyphPath {
                glyph_id,
                path_size: payload.get_u32_le(),
            }
        }
    };
    Ok(ResponseFrame {
        font_id,
        descriptor,
        response,
    })
}

fn put_frame(
    dst: &mut BytesMut,
    opcode: Opcode,
    font_id: FontId,
    descriptor: &ScalerDescriptor,
    area: &[u8; PAYLOAD_AREA_SIZE],
) {
    dst.reserve(FRAME_SIZE);
    dst.put_u32_le(opcode.as_u32());
    dst.put_u32_le(font_id.0);
    dst.put_slice(descriptor.as_bytes());
    dst.put_slice(area);
}

fn split_frame(src: &[u8]) -> Result<(Opcode, FontId, ScalerDescriptor, &[u8])> {
    if src.len() < FRAME_SIZE {
        return Err(FrameError::ShortFrame {
            len: src.len(),
            need: FRAME_SIZE,
        });
    }

    let mut header = &src[..HEADER_SIZE];
    let opcode = Opcode::try_from(header.get_u32_le())?;
    let font_id = FontId(header.get_u32_le());
    let mut descriptor = [0u8; DESCRIPTOR_SIZE];
    header.copy_to_slice(&mut descriptor);

    Ok((
        opcode,
        font_id,
        ScalerDescriptor::from_bytes(descriptor),
        &src[HEADER_SIZE..FRAME_SIZE],
    ))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum trailing block size in bytes. Default: 4 MiB minus one frame.
    pub max_trailing_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_trailing_size: DEFAULT_MAX_TRAILING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ScalerParams;
    use crate::types::MaskFormat;

    fn descriptor() -> ScalerDescriptor {
        ScalerDescriptor::new(&ScalerParams::with_size(16.0)).unwrap()
    }

    fn glyph_metrics() -> GlyphMetrics {
        GlyphMetrics {
            glyph_id: 65,
            mask_format: MaskFormat::A8,
            advance_x: 9.0,
            advance_y: 0.0,
            width: 8,
            height: 12,
            row_bytes: 8,
            left: 0,
            top: -12,
        }
    }

    #[test]
    fn layout_constants() {
        assert_eq!(HEADER_SIZE, 40);
        assert_eq!(FRAME_SIZE, 104);
        assert!(crate::types::FONT_METRICS_SIZE <= PAYLOAD_AREA_SIZE);
        assert!(crate::types::GLYPH_METRICS_SIZE <= PAYLOAD_AREA_SIZE);
    }

    #[test]
    fn every_request_encodes_to_one_frame() {
        let requests = [
            Request::FontMetrics,
            Request::GlyphMetrics(GlyphMetrics::placeholder(3)),
            Request::GlyphImage(glyph_metrics()),
            Request::GlyphPath(77),
        ];
        for request in requests {
            let frame = RequestFrame::new(FontId(5), descriptor(), request);
            let mut buf = BytesMut::new();
            encode_request(&frame, &mut buf);
            assert_eq!(buf.len(), FRAME_SIZE);
            assert_eq!(decode_request(&buf).unwrap(), frame);
        }
    }

    #[test]
    fn header_layout_is_little_endian() {
        let frame = RequestFrame::new(FontId(0x0102_0304), descriptor(), Request::GlyphPath(10));
        let mut buf = BytesMut::new();
        encode_request(&frame, &mut buf);

        assert_eq!(&buf[0..4], &[3, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[8..40], descriptor().as_bytes());
        assert_eq!(&buf[40..42], &[10, 0]);
        assert!(buf[42..].iter().all(|b| *b == 0));
    }

    #[test]
    fn response_trailing_len_comes_from_fixed_fields() {
        assert_eq!(Response::GlyphImage(glyph_metrics()).trailing_len(), 96);
        assert_eq!(
            Response::GlyphPath {
                glyph_id: 1,
                path_size: 33
            }
            .trailing_len(),
            33
        );
        assert_eq!(Response::GlyphMetrics(glyph_metrics()).trailing_len(), 0);
    }

    #[test]
    fn response_echoes_request_envelope() {
        let request = RequestFrame::new(FontId(9), descriptor(), Request::FontMetrics);
        let metrics = FontMetrics {
            ascent: 10.0,
            descent: -2.0,
            leading: 1.0,
            ..FontMetrics::default()
        };
        let response = ResponseFrame::answering(&request, Response::FontMetrics(metrics));

        let mut buf = BytesMut::new();
        encode_response(&response, &mut buf);
        assert_eq!(buf.len(), FRAME_SIZE);

        let decoded = decode_response(&buf).unwrap();
        assert_eq!(decoded.font_id, FontId(9));
        assert_eq!(decoded.descriptor, request.descriptor);
        assert_eq!(decoded.response, Response::FontMetrics(metrics));
    }

    #[test]
    fn path_response_roundtrip() {
        let request = RequestFrame::new(FontId(1), descriptor(), Request::GlyphPath(11));
        let response = ResponseFrame::answering(
            &request,
            Response::GlyphPath {
                glyph_id: 11,
                path_size: 4000,
            },
        );
        let mut buf = BytesMut::new();
        encode_response(&response, &mut buf);
        assert_eq!(decode_response(&buf).unwrap(), response);
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        let frame = RequestFrame::new(FontId(1), descriptor(), Request::FontMetrics);
        let mut buf = BytesMut::new();
        encode_request(&frame, &mut buf);
        buf[0] = 42;

        assert!(matches!(decode_request(&buf), Err(FrameError::UnknownOpcode(42))));
        assert!(matches!(decode_response(&buf), Err(FrameError::UnknownOpcode(42))));
    }

    #[test]
    fn decode_rejects_short_input() {
        let err = decode_request(&[0u8; FRAME_SIZE - 1]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortFrame {
                len: 103,
                need: FRAME_SIZE
            }
        ));
    }

    #[test]
    fn decode_ignores_bytes_past_the_fixed_frame() {
        let frame = RequestFrame::new(FontId(2), descriptor(), Request::GlyphPath(4));
        let mut buf = BytesMut::new();
        encode_request(&frame, &mut buf);
        buf.extend_from_slice(&[0xFF; 32]);

        assert_eq!(decode_request(&buf).unwrap(), frame);
    }

    #[test]
    fn default_config_matches_message_capacity() {
        let config = FrameConfig::default();
        assert_eq!(config.max_trailing_size + FRAME_SIZE, DEFAULT_MAX_MESSAGE);
    }
}
