//! Exact-length blocking I/O over any `Read`/`Write`.
//!
//! Short reads and writes are retried until the requested byte count is
//! reached. `Interrupted` is retried; every other error is returned.

use std::io::{ErrorKind, Read, Write};

use crate::error::{FrameError, Result};

/// Fill `buf` completely.
///
/// Returns `Ok(false)` if the stream ended before the first byte and
/// `allow_clean_eof` is set. End-of-stream anywhere else is
/// [`FrameError::ConnectionClosed`].
pub(crate) fn read_full<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    allow_clean_eof: bool,
) -> Result<bool> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 && allow_clean_eof => return Ok(false),
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(true)
}

/// Write all of `buf` and flush.
pub(crate) fn write_full<W: Write>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
