use glyphpipe_frame::FrameError;
use glyphpipe_transport::TransportError;

use crate::provider::ProviderError;

/// Errors that can occur in RPC client, server and topology operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Pipe or process setup failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error, including I/O on the pipes.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The glyph data provider could not serve a request.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The peer closed its end before the exchange completed.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// A well-formed frame that does not answer the request it follows.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The other role of a launched session failed.
    #[error("{role} role failed: {reason}")]
    RoleFailed { role: &'static str, reason: String },

    /// Work driven on top of the channel failed.
    #[error("session error: {0}")]
    Session(String),
}

impl RpcError {
    /// Whether this error means the two ends disagree about the protocol.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            RpcError::Protocol(_) => true,
            RpcError::Frame(err) => err.is_protocol_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
