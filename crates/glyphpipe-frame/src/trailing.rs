use bytes::{Bytes, BytesMut};

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};

/// Owned buffer for the variable-length bytes that follow a fixed frame.
///
/// Capacity is bounded: any operation that would grow the buffer past
/// `max_size` fails with [`FrameError::TrailingTooLarge`] and leaves the
/// buffer empty.
#[derive(Debug, Clone)]
pub struct TrailingBuffer {
    buf: BytesMut,
    max_size: usize,
}

impl TrailingBuffer {
    /// Create an empty buffer that will hold at most `max_size` bytes.
    pub fn new(max_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_size,
        }
    }

    /// Create an empty buffer bounded by `config.max_trailing_size`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self::new(config.max_trailing_size)
    }

    /// Largest number of bytes this buffer accepts.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drop the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Fail unless `len` bytes fit.
    pub fn check(&self, len: usize) -> Result<()> {
        if len > self.max_size {
            return Err(FrameError::TrailingTooLarge {
                size: len,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Replace the contents with `len` zero bytes and return them for filling.
    pub fn resize_for(&mut self, len: usize) -> Result<&mut [u8]> {
        self.buf.clear();
        self.check(len)?;
        self.buf.resize(len, 0);
        Ok(&mut self.buf[..])
    }

    /// Append `data`, failing if the total would exceed the bound.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<()> {
        let total = self.buf.len().saturating_add(data.len());
        if let Err(err) = self.check(total) {
            self.buf.clear();
            return Err(err);
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Take the contents, leaving the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_for_zero_fills() {
        let mut trailing = TrailingBuffer::new(16);
        trailing.extend_from_slice(b"stale").unwrap();

        let slot = trailing.resize_for(8).unwrap();
        assert_eq!(slot, &[0u8; 8]);
        slot.copy_from_slice(b"abcdefgh");
        assert_eq!(trailing.as_slice(), b"abcdefgh");
    }

    #[test]
    fn resize_past_capacity_is_reported() {
        let mut trailing = TrailingBuffer::new(95);
        let err = trailing.resize_for(96).unwrap_err();
        assert!(matches!(
            err,
            FrameError::TrailingTooLarge { size: 96, max: 95 }
        ));
        assert!(trailing.is_empty());
    }

    #[test]
    fn extend_respects_bound_across_calls() {
        let mut trailing = TrailingBuffer::new(6);
        trailing.extend_from_slice(b"abc").unwrap();
        trailing.extend_from_slice(b"def").unwrap();
        assert_eq!(trailing.len(), 6);

        let err = trailing.extend_from_slice(b"g").unwrap_err();
        assert!(matches!(err, FrameError::TrailingTooLarge { size: 7, max: 6 }));
        assert!(trailing.is_empty());
    }

    #[test]
    fn take_empties_buffer() {
        let mut trailing = TrailingBuffer::with_config(&FrameConfig::default());
        trailing.extend_from_slice(b"pixels").unwrap();
        let taken = trailing.take();
        assert_eq!(taken.as_ref(), b"pixels");
        assert!(trailing.is_empty());
        assert_eq!(trailing.max_size(), FrameConfig::default().max_trailing_size);
    }
}
