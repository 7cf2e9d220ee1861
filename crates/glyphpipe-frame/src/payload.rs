//! Length-prefixed transport for the opaque drawing payload.
//!
//! Sent once at session start, before any glyph request:
//! ```text
//! length (u64 LE) | payload (length bytes)
//! ```

use std::io::{Read, Write};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::io::{read_full, write_full};

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Default maximum drawing payload size: 40 MiB.
pub const DEFAULT_MAX_DRAW_PAYLOAD: usize = 10 * 1024 * crate::codec::PAGE_SIZE;

/// Write `payload` with its length prefix, retrying partial writes.
pub fn write_payload<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    write_full(writer, &buf)?;
    debug!(len = payload.len(), "wrote drawing payload");
    Ok(())
}

/// Read one length-prefixed payload.
///
/// Returns `Ok(None)` if the stream ends before the first length byte, which
/// means the peer shut down without sending anything.
pub fn read_payload<R: Read>(reader: &mut R, max_size: usize) -> Result<Option<Bytes>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    if !read_full(reader, &mut prefix, true)? {
        debug!("peer closed before sending a drawing payload");
        return Ok(None);
    }

    let declared = u64::from_le_bytes(prefix);
    if declared > max_size as u64 {
        return Err(FrameError::PayloadTooLarge {
            size: declared,
            max: max_size,
        });
    }

    let mut buf = BytesMut::zeroed(declared as usize);
    read_full(reader, &mut buf, false)?;
    debug!(len = declared, "read drawing payload");
    Ok(Some(buf.freeze()))
}
