use std::io::Read;

use tracing::trace;

use crate::codec::{
    decode_request, decode_response, FrameConfig, RequestFrame, ResponseFrame, FRAME_SIZE,
};
use crate::error::{FrameError, Result};
use crate::io::read_full;
use crate::trailing::TrailingBuffer;

/// Reads fixed-size frames and their trailing blocks from any `Read` stream.
///
/// Handles partial reads internally. Each call consumes exactly the bytes it
/// asks for, so nothing belonging to the next message is ever buffered.
pub struct FrameReader<T> {
    inner: T,
    buf: [u8; FRAME_SIZE],
    config: FrameConfig,
    frames_read: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: [0u8; FRAME_SIZE],
            config,
            frames_read: 0,
        }
    }

    /// Read the next request frame (blocking).
    ///
    /// Returns `Ok(None)` if the stream ends cleanly on a frame boundary.
    pub fn read_request(&mut self) -> Result<Option<RequestFrame>> {
        if !self.read_fixed()? {
            return Ok(None);
        }
        decode_request(&self.buf).map(Some)
    }

    /// Read the next response frame's fixed part (blocking).
    ///
    /// Returns `Ok(None)` if the stream ends cleanly on a frame boundary.
    /// Trailing bytes, if any, must be consumed with [`read_trailing`](Self::read_trailing).
    pub fn read_response(&mut self) -> Result<Option<ResponseFrame>> {
        if !self.read_fixed()? {
            return Ok(None);
        }
        decode_response(&self.buf).map(Some)
    }

    /// Read exactly `len` trailing bytes into `dst`, replacing its contents.
    ///
    /// `len` is checked against both the configured maximum and `dst`'s own
    /// bound before anything is read.
    pub fn read_trailing(&mut self, len: usize, dst: &mut TrailingBuffer) -> Result<()> {
        if len > self.config.max_trailing_size {
            return Err(FrameError::TrailingTooLarge {
                size: len,
                max: self.config.max_trailing_size,
            });
        }
        let slot = dst.resize_for(len)?;
        read_full(&mut self.inner, slot, false)?;
        trace!(len, "read trailing bytes");
        Ok(())
    }

    fn read_fixed(&mut self) -> Result<bool> {
        if !read_full(&mut self.inner, &mut self.buf, true)? {
            trace!(frames = self.frames_read, "stream ended on frame boundary");
            return Ok(false);
        }
        self.frames_read += 1;
        Ok(true)
    }

    /// Number of fixed frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
