use thiserror::Error;

/// Errors produced by texture operations.
///
/// Two classes share the enum: resource exhaustion, after which the host
/// session cannot meaningfully continue, and validation failures that
/// leave the registry untouched. [`TextureError::is_fatal`] tells them
/// apart.
#[derive(Debug, Error)]
pub enum TextureError {
    /// Every usable registry slot is occupied.
    #[error("out of texture slots ({capacity} in use)")]
    OutOfSlots { capacity: usize },

    /// Neither the fast pool nor the heap could provide storage.
    #[error("out of texture memory requesting {requested} bytes")]
    OutOfMemory { requested: usize },

    /// An update was requested for a name that was never loaded.
    #[error("update requested for unknown texture {name:?}")]
    UpdateTargetMissing { name: String },

    /// Empty or over-length texture name.
    #[error("invalid texture name {name:?}")]
    InvalidName { name: String },

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Descriptor claims more precomputed levels than the dimensions can
    /// halve down to.
    #[error("{count} precomputed levels do not derive from a {width}x{height} source")]
    InvalidMipCount { count: u32, width: u32, height: u32 },

    /// Indexed pixel data arrived without a palette.
    #[error("indexed source {name:?} carries no palette")]
    MissingPalette { name: String },

    /// Source buffer smaller than its descriptor implies.
    #[error("source buffer holds {actual} bytes, descriptor implies {expected}")]
    ShortSourceBuffer { expected: usize, actual: usize },

    /// Operation applied to a handle that is not live.
    #[error("stale texture handle {handle}")]
    StaleHandle { handle: u32 },

    /// Partial update rectangle falls outside the atlas page.
    #[error(
        "update rect {width}x{height} at ({offset_x},{offset_y}) exceeds {page_width}x{page_height} page"
    )]
    RectOutOfBounds {
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    /// Operation needs the retained source copy, which was not kept.
    #[error("texture {name:?} kept no source copy to reprocess")]
    NoSourceCopy { name: String },

    /// Operation does not apply to the entry's source or format.
    #[error("unsupported operation on {name:?}: {reason}")]
    Unsupported { name: String, reason: &'static str },
}

impl TextureError {
    /// True for the resource-exhaustion errors a host must treat as
    /// session-fatal; everything else is recoverable validation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OutOfSlots { .. } | Self::OutOfMemory { .. } | Self::UpdateTargetMissing { .. }
        )
    }
}

pub type TextureResult<T> = Result<T, TextureError>;
