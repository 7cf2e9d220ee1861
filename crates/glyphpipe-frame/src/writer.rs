use std::io::Write;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{
    encode_request, encode_response, FrameConfig, RequestFrame, ResponseFrame, FRAME_SIZE,
};
use crate::error::{FrameError, Result};
use crate::io::write_full;

/// Writes fixed-size frames, plus trailing blocks for responses, to any `Write` stream.
///
/// Owns its own send buffer; nothing is shared with the reading side.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    frames_written: u64,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(FRAME_SIZE),
            config,
            frames_written: 0,
        }
    }

    /// Write one request frame (blocking).
    pub fn write_request(&mut self, frame: &RequestFrame) -> Result<()> {
        self.buf.clear();
        encode_request(frame, &mut self.buf);
        self.send()
    }

    /// Write one response frame followed by its trailing bytes as a single message.
    ///
    /// `trailing.len()` must equal the length implied by the response's fixed
    /// fields and fit within the configured maximum.
    pub fn write_response(&mut self, frame: &ResponseFrame, trailing: &[u8]) -> Result<()> {
        let declared = frame.response.trailing_len();
        if declared != trailing.len() {
            return Err(FrameError::TrailingMismatch {
                declared,
                actual: trailing.len(),
            });
        }
        if declared > self.config.max_trailing_size {
            return Err(FrameError::TrailingTooLarge {
                size: declared,
                max: self.config.max_trailing_size,
            });
        }

        self.buf.clear();
        self.buf.reserve(FRAME_SIZE + trailing.len());
        encode_response(frame, &mut self.buf);
        self.buf.extend_from_slice(trailing);
        self.send()
    }

    fn send(&mut self) -> Result<()> {
        write_full(&mut self.inner, &self.buf)?;
        self.frames_written += 1;
        trace!(bytes = self.buf.len(), "wrote frame");
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{decode_request, decode_response, Request, Response};
    use crate::descriptor::{ScalerDescriptor, ScalerParams};
    use crate::types::{FontId, GlyphMetrics, MaskFormat};

    fn request(op: Request) -> RequestFrame {
        RequestFrame::new(
            FontId(2),
            ScalerDescriptor::new(&ScalerParams::with_size(10.0)).unwrap(),
            op,
        )
    }

    fn image_metrics() -> GlyphMetrics {
        GlyphMetrics {
            glyph_id: 65,
            mask_format: MaskFormat::A8,
            width: 8,
            height: 12,
            row_bytes: 8,
            ..GlyphMetrics::default()
        }
    }

    #[test]
    fn write_single_request() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_request(&request(Request::FontMetrics)).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), FRAME_SIZE);
        assert_eq!(decode_request(&wire).unwrap(), request(Request::FontMetrics));
    }

    #[test]
    fn write_multiple_requests() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_request(&request(Request::GlyphPath(1))).unwrap();
        writer.write_request(&request(Request::GlyphPath(2))).unwrap();
        assert_eq!(writer.frames_written(), 2);

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), 2 * FRAME_SIZE);
        assert_eq!(
            decode_request(&wire[FRAME_SIZE..]).unwrap().request,
            Request::GlyphPath(2)
        );
    }

    #[test]
    fn response_and_trailing_are_one_message() {
        let req = request(Request::GlyphImage(image_metrics()));
        let response = ResponseFrame::answering(&req, Response::GlyphImage(image_metrics()));
        let pixels = vec![0x5A; 96];

        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_response(&response, &pixels).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), FRAME_SIZE + 96);
        assert_eq!(decode_response(&wire).unwrap(), response);
        assert_eq!(&wire[FRAME_SIZE..], pixels.as_slice());
    }

    #[test]
    fn trailing_mismatch_rejected() {
        let req = request(Request::GlyphImage(image_metrics()));
        let response = ResponseFrame::answering(&req, Response::GlyphImage(image_metrics()));

        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.write_response(&response, &[0u8; 95]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::TrailingMismatch {
                declared: 96,
                actual: 95
            }
        ));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn trailing_over_capacity_rejected() {
        let cfg = FrameConfig {
            max_trailing_size: 4,
        };
        let req = request(Request::GlyphPath(3));
        let response = ResponseFrame::answering(
            &req,
            Response::GlyphPath {
                glyph_id: 3,
                path_size: 5,
            },
        );

        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.write_response(&response, b"12345").unwrap_err();
        assert!(matches!(err, FrameError::TrailingTooLarge { size: 5, max: 4 }));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.write_request(&request(Request::FontMetrics)).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _ = writer.config();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.write_request(&request(Request::GlyphPath(5))).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), FRAME_SIZE);
    }

    #[test]
    fn handles_short_writes() {
        let mut writer = FrameWriter::new(ShortWriter {
            chunk: 7,
            data: Vec::new(),
        });
        let req = request(Request::GlyphImage(image_metrics()));
        let response = ResponseFrame::answering(&req, Response::GlyphImage(image_metrics()));
        writer.write_response(&response, &[1u8; 96]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), FRAME_SIZE + 96);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.write_request(&request(Request::FontMetrics)).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn broken_pipe_is_an_io_error() {
        let pair = glyphpipe_transport::pipe_pair().unwrap();
        drop(pair.reader);

        let mut writer = FrameWriter::new(pair.writer);
        let err = writer.write_request(&request(Request::FontMetrics)).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ShortWriter {
        chunk: usize,
        data: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
