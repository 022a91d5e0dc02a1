use bitflags::bitflags;

bitflags! {
    /// Per-texture attributes supplied at load time and carried on the
    /// entry. Bits 16 and up are state managed by the system; load paths
    /// strip them from caller input.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TextureFlags: u32 {
        /// Clamp addressing at the edges instead of wrapping.
        const CLAMP = 1 << 0;
        /// Store only the base level.
        const NO_MIPMAP = 1 << 1;
        /// Atlas page: row-major storage, partial updates allowed.
        const ATLAS_PAGE = 1 << 2;
        /// Source carries meaningful alpha.
        const HAS_ALPHA = 1 << 3;
        /// Source carries a fullbright luma mask.
        const HAS_LUMA = 1 << 4;
        /// Keep a copy of the source for later reprocessing.
        const KEEP_SOURCE = 1 << 5;
        /// Texels encode directions, not colors; reductions renormalize.
        const NORMAL_MAP = 1 << 6;
        /// Legacy alpha-contrast content; mip levels are filled, not
        /// filtered.
        const ALPHA_CONTRAST = 1 << 7;
        /// Sample with nearest-neighbor filtering.
        const NEAREST = 1 << 8;
        /// Treat the source as colored even when the decoder flagged none.
        const FORCE_COLOR = 1 << 9;

        /// Storage lives in the fast pool.
        const FAST_RESIDENT = 1 << 16;
        /// Storage holds a complete upload.
        const UPLOADED = 1 << 17;
    }
}

impl TextureFlags {
    /// Bits a caller may set when loading.
    pub fn caller_bits(self) -> TextureFlags {
        self.difference(TextureFlags::FAST_RESIDENT | TextureFlags::UPLOADED)
    }
}
