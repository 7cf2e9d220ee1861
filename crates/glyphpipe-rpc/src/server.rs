//! Renderer side of the glyph RPC: the dispatch loop.

use std::io::{Read, Write};

use bytes::BytesMut;
use glyphpipe_frame::{
    FrameConfig, FrameReader, FrameWriter, Opcode, Request, RequestFrame, Response,
    ResponseFrame, TrailingBuffer,
};
use tracing::{debug, error, info, trace};

use crate::error::Result;
use crate::provider::{GlyphProvider, ScalingContext};

/// What a dispatch loop did before it ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Requests answered.
    pub requests: u64,
    /// Requests answered per opcode, indexed by wire value.
    pub by_opcode: [u64; 4],
    /// Trailing bytes sent across all responses.
    pub trailing_bytes: u64,
}

impl ServeSummary {
    /// Requests answered for `opcode`.
    pub fn count(&self, opcode: Opcode) -> u64 {
        self.by_opcode[opcode.as_u32() as usize]
    }

    fn record(&mut self, opcode: Opcode, trailing: usize) {
        self.requests += 1;
        self.by_opcode[opcode.as_u32() as usize] += 1;
        self.trailing_bytes += trailing as u64;
    }
}

/// Answers glyph requests from one client until it closes its end.
pub struct RpcServer<P, R, W> {
    provider: P,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    trailing: TrailingBuffer,
    scratch: BytesMut,
}

impl<P: GlyphProvider, R: Read, W: Write> RpcServer<P, R, W> {
    pub fn new(provider: P, reader: R, writer: W) -> Self {
        Self::with_config(provider, reader, writer, FrameConfig::default())
    }

    pub fn with_config(provider: P, reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            provider,
            trailing: TrailingBuffer::with_config(&config),
            reader: FrameReader::with_config(reader, config.clone()),
            writer: FrameWriter::with_config(writer, config),
            scratch: BytesMut::new(),
        }
    }

    /// Run the dispatch loop.
    ///
    /// Returns `Ok` when the client closes its end on a frame boundary. Any
    /// other condition, including an unknown opcode or an oversized trailing
    /// block, ends the loop with an error and without a response. Both pipe
    /// ends are closed when this returns.
    pub fn serve(mut self) -> Result<ServeSummary> {
        info!("dispatch loop started");
        let mut summary = ServeSummary::default();
        match self.serve_until_eof(&mut summary) {
            Ok(()) => {
                info!(
                    requests = summary.requests,
                    font_metrics = summary.count(Opcode::FontMetrics),
                    glyph_metrics = summary.count(Opcode::GlyphMetrics),
                    glyph_images = summary.count(Opcode::GlyphImage),
                    glyph_paths = summary.count(Opcode::GlyphPath),
                    trailing = summary.trailing_bytes,
                    "dispatch loop finished"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(requests = summary.requests, error = %err, "dispatch loop aborted");
                Err(err)
            }
        }
    }

    fn serve_until_eof(&mut self, summary: &mut ServeSummary) -> Result<()> {
        while let Some(frame) = self.reader.read_request()? {
            let opcode = frame.request.opcode();
            debug!(%opcode, font_id = %frame.font_id, "dispatching request");

            let response = self.dispatch(&frame)?;
            let trailing = response.trailing_len();
            self.writer.write_response(
                &ResponseFrame::answering(&frame, response),
                &self.trailing.as_slice()[..trailing],
            )?;
            trace!(%opcode, trailing, "response sent");
            summary.record(opcode, trailing);
        }
        debug!("client closed its end");
        Ok(())
    }

    /// Build the response for `frame`, leaving any trailing bytes in `self.trailing`.
    fn dispatch(&mut self, frame: &RequestFrame) -> Result<Response> {
        self.trailing.clear();
        let context = self
            .provider
            .resolve_context(frame.font_id, &frame.descriptor)?;

        let response = match frame.request {
            Request::FontMetrics => Response::FontMetrics(context.font_metrics()),
            Request::GlyphMetrics(metrics) => {
                Response::GlyphMetrics(context.glyph_metrics(metrics.glyph_id))
            }
            Request::GlyphImage(metrics) => {
                let dst = self.trailing.resize_for(metrics.image_size())?;
                context.render_image(&metrics, dst);
                Response::GlyphImage(metrics)
            }
            Request::GlyphPath(glyph_id) => {
                self.scratch.clear();
                let path_size = context.glyph_path(glyph_id).encode(&mut self.scratch);
                self.trailing.extend_from_slice(&self.scratch)?;
                Response::GlyphPath {
                    glyph_id,
                    path_size: path_size as u32,
                }
            }
        };
        Ok(response)
    }
}
