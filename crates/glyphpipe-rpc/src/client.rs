//! Rasterizer side of the glyph RPC.
//!
//! Every call is one strict request/response exchange: exactly one fixed
//! frame goes out, exactly one fixed frame comes back, and for image and path
//! requests exactly the declared number of trailing bytes follow.

use std::io::{Read, Write};

use glyphpipe_frame::{
    FontId, FontMetrics, FrameConfig, FrameReader, FrameWriter, Glyph, GlyphId, GlyphMetrics,
    Opcode, Path, Request, RequestFrame, Response, ResponseFrame, ScalerDescriptor,
    TrailingBuffer, FRAME_SIZE,
};
use tracing::{debug, trace};

use crate::error::{Result, RpcError};

/// Byte and request counters for one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Completed request/response exchanges.
    pub requests: u64,
    pub frame_bytes_written: u64,
    pub frame_bytes_read: u64,
    pub trailing_bytes_read: u64,
}

/// Synchronous client over one reader and one writer.
pub struct RpcClient<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    trailing: TrailingBuffer,
    stats: ExchangeStats,
}

impl<R: Read, W: Write> RpcClient<R, W> {
    /// Create a client with default frame configuration.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    /// Create a client with explicit frame configuration.
    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            trailing: TrailingBuffer::with_config(&config),
            reader: FrameReader::with_config(reader, config.clone()),
            writer: FrameWriter::with_config(writer, config),
            stats: ExchangeStats::default(),
        }
    }

    /// Font-wide metrics for `(font_id, descriptor)`.
    pub fn fetch_font_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
    ) -> Result<FontMetrics> {
        let frame = RequestFrame::new(font_id, *descriptor, Request::FontMetrics);
        match self.exchange(&frame)? {
            Response::FontMetrics(metrics) => Ok(metrics),
            other => Err(unexpected(&frame, &other)),
        }
    }

    /// Metrics for one glyph.
    pub fn fetch_glyph_metrics(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<GlyphMetrics> {
        let request = Request::GlyphMetrics(GlyphMetrics::placeholder(glyph_id));
        let frame = RequestFrame::new(font_id, *descriptor, request);
        match self.exchange(&frame)? {
            Response::GlyphMetrics(metrics) if metrics.glyph_id == glyph_id => Ok(metrics),
            Response::GlyphMetrics(metrics) => Err(RpcError::Protocol(format!(
                "metrics for glyph {} answered request for glyph {glyph_id}",
                metrics.glyph_id
            ))),
            other => Err(unexpected(&frame, &other)),
        }
    }

    /// Fill `glyph.image` with pixels for the geometry in `glyph.metrics`.
    ///
    /// The metrics must come from a prior [`fetch_glyph_metrics`](Self::fetch_glyph_metrics)
    /// with the same font and descriptor. The image buffer is resized to
    /// `row_bytes * height` and overwritten. An image larger than the trailing
    /// bound fails before anything is sent.
    pub fn fetch_glyph_image(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph: &mut Glyph,
    ) -> Result<()> {
        self.trailing.check(glyph.metrics.image_size())?;
        let frame = RequestFrame::new(font_id, *descriptor, Request::GlyphImage(glyph.metrics));
        match self.exchange(&frame)? {
            Response::GlyphImage(metrics) if metrics.same_image_geometry(&glyph.metrics) => {
                glyph.image.clear();
                glyph.image.extend_from_slice(self.trailing.as_slice());
                Ok(())
            }
            Response::GlyphImage(metrics) => Err(RpcError::Protocol(format!(
                "image geometry changed in flight (sent {:?}, got {:?})",
                glyph.metrics, metrics
            ))),
            other => Err(unexpected(&frame, &other)),
        }
    }

    /// Outline of one glyph.
    pub fn fetch_glyph_path(
        &mut self,
        font_id: FontId,
        descriptor: &ScalerDescriptor,
        glyph_id: GlyphId,
    ) -> Result<Path> {
        let frame = RequestFrame::new(font_id, *descriptor, Request::GlyphPath(glyph_id));
        match self.exchange(&frame)? {
            Response::GlyphPath { glyph_id: got, .. } if got == glyph_id => {
                Ok(Path::decode(self.trailing.as_slice())?)
            }
            Response::GlyphPath { glyph_id: got, .. } => Err(RpcError::Protocol(format!(
                "path for glyph {got} answered request for glyph {glyph_id}"
            ))),
            other => Err(unexpected(&frame, &other)),
        }
    }

    /// One write, one fixed read, and the trailing read if the response has one.
    ///
    /// On success the trailing buffer holds exactly the response's trailing bytes.
    fn exchange(&mut self, frame: &RequestFrame) -> Result<Response> {
        let opcode = frame.request.opcode();
        debug!(%opcode, font_id = %frame.font_id, "sending request");

        self.trailing.clear();
        self.writer.write_request(frame)?;
        self.stats.frame_bytes_written += FRAME_SIZE as u64;

        let response = self.reader.read_response()?.ok_or_else(|| {
            RpcError::Disconnected(format!("peer closed before answering {opcode}"))
        })?;
        self.stats.frame_bytes_read += FRAME_SIZE as u64;
        check_envelope(frame, &response)?;

        let trailing = response.response.trailing_len();
        if trailing > 0 {
            self.reader.read_trailing(trailing, &mut self.trailing)?;
            self.stats.trailing_bytes_read += trailing as u64;
        }
        trace!(%opcode, trailing, "exchange complete");

        self.stats.requests += 1;
        Ok(response.response)
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> ExchangeStats {
        self.stats
    }

    /// Consume the client and return the underlying reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}

fn check_envelope(request: &RequestFrame, response: &ResponseFrame) -> Result<()> {
    let sent = request.request.opcode();
    let got = response.response.opcode();
    if sent != got {
        return Err(RpcError::Protocol(format!(
            "response opcode {got} does not match request opcode {sent}"
        )));
    }
    if response.font_id != request.font_id || response.descriptor != request.descriptor {
        return Err(RpcError::Protocol(format!(
            "{got} response addressed to {} does not echo its request for {}",
            response.font_id, request.font_id
        )));
    }
    Ok(())
}

fn unexpected(request: &RequestFrame, response: &Response) -> RpcError {
    let sent: Opcode = request.request.opcode();
    RpcError::Protocol(format!(
        "unexpected {} response to {sent} request",
        response.opcode()
    ))
}
