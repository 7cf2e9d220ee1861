//! Synchronous glyph-data RPC between a renderer and a rasterizer.
//!
//! The rasterizer ([`RpcClient`]) asks for font metrics, glyph metrics, glyph
//! images and glyph outlines. The renderer ([`RpcServer`]) answers from a
//! [`GlyphProvider`] until the rasterizer closes its end. The two roles talk
//! over a pair of pipes set up by [`Topology`].

pub mod client;
pub mod error;
pub mod provider;
pub mod server;
pub mod synthetic;
#[cfg(unix)]
pub mod topology;

#[cfg(all(test, unix))]
mod session_tests;

pub use client::{ExchangeStats, RpcClient};
pub use error::{Result, RpcError};
pub use provider::{GlyphProvider, ProviderError, ScalingContext};
pub use server::{RpcServer, ServeSummary};
pub use synthetic::{CacheStats, SyntheticContext, SyntheticFace, SyntheticProvider, SPACE_GLYPH};
#[cfg(unix)]
pub use topology::{Endpoint, LaunchConfig, LaunchMode, Role, RoleKind, Topology};
