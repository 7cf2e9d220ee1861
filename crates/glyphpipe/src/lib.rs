//! Out-of-process glyph rasterization over a pair of pipes.
//!
//! A renderer process owns fonts; a rasterizer process replays a drawing
//! payload and asks the renderer for glyph data one synchronous request at a
//! time.
//!
//! # Crate Structure
//!
//! - [`transport`]: anonymous pipes and fork/wait helpers
//! - [`frame`]: fixed 104-byte frames, trailing blocks, outline codec and payload transport
//! - [`rpc`]: client, dispatch loop, glyph providers and the role topology

/// Re-export transport types.
pub mod transport {
    pub use glyphpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use glyphpipe_frame::*;
}

/// Re-export RPC types.
pub mod rpc {
    pub use glyphpipe_rpc::*;
}
