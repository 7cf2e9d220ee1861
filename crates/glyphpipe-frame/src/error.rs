/// Errors that can occur while encoding, decoding or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame carries an opcode this build does not define.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    /// A fixed field holds a value outside its defined range.
    #[error("invalid {field} value {value}")]
    InvalidField { field: &'static str, value: u32 },

    /// Fewer bytes than one fixed frame were handed to the decoder.
    #[error("short frame ({len} bytes, need {need})")]
    ShortFrame { len: usize, need: usize },

    /// The trailing length implied by a fixed field exceeds the agreed capacity.
    #[error("trailing data too large ({size} bytes, max {max})")]
    TrailingTooLarge { size: usize, max: usize },

    /// The trailing bytes handed to the writer disagree with the frame's fixed fields.
    #[error("trailing length mismatch (frame declares {declared}, got {actual})")]
    TrailingMismatch { declared: usize, actual: usize },

    /// A length-prefixed payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: usize },

    /// Encoded outline bytes could not be decoded.
    #[error("malformed path data: {0}")]
    MalformedPath(&'static str),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a frame, trailing block or payload.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error means the two ends disagree about the wire format.
    ///
    /// Both ends share one build, so these indicate a bug or memory
    /// corruption rather than a condition worth recovering from.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownOpcode(_)
                | FrameError::InvalidField { .. }
                | FrameError::ShortFrame { .. }
                | FrameError::TrailingTooLarge { .. }
                | FrameError::TrailingMismatch { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::MalformedPath(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
