//! Unidirectional pipe transport for the glyph RPC layer.
//!
//! Provides the two OS primitives the protocol is built on:
//! - [`pipe_pair`]: one half-duplex byte channel with an owned read end and
//!   an owned write end
//! - [`fork`]: split the current process so each role can run in its own process
//!
//! This is the lowest layer of glyphpipe. Dropping a [`PipeReader`] or
//! [`PipeWriter`] closes the descriptor, which is how a peer learns that the
//! other side has gone away.

pub mod error;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod process;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use pipe::{pipe_pair, PipePair, PipeReader, PipeWriter};

#[cfg(unix)]
pub use process::{exit_child, fork, ChildExit, ChildProcess, Fork};
