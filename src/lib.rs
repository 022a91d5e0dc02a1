//! Texture resource management for a small tiled-sampler device: a
//! name-keyed registry, power-of-two dimension planning, CPU-side
//! resampling, packing and cache-tile swizzling, and a fast-pool-first
//! memory model with heap fallback.
//!
//! [`TextureSystem`] owns everything. Loads are synchronous; when one
//! returns, the texture is resident, flushed and addressable through its
//! [`TextureHandle`] until freed. The image decoder sits outside this
//! crate and hands over [`PixelSource`] descriptors.

pub mod config;
pub mod error;
pub mod flags;
pub mod format;
pub mod memory;
pub mod plan;
pub mod registry;
pub mod source;
pub mod system;
pub mod transform;

pub use config::TextureConfig;
pub use error::{TextureError, TextureResult};
pub use flags::TextureFlags;
pub use format::NativeFormat;
pub use memory::{FlushStats, MemoryUsage};
pub use registry::{EntryInfo, TextureHandle};
pub use source::{Palette, PixelSource, SourceFormat};
pub use system::{ReprocessOp, SamplerFilter, TextureSystem};
