/// Smallest axis the sampler addresses; dimension planning never goes
/// below this.
pub const TEXTURE_SIZE_MIN: u32 = 16;

/// Hard bound on mip chain length, base level included.
pub const MIP_LEVELS_MAX: u32 = 8;

/// Longest accepted texture name in bytes.
pub const NAME_LEN_MAX: usize = 256;

/// Largest source axis accepted from the decoder. Keeps every descriptor
/// inside the range the planner and the fixed-point resampler address.
pub const SOURCE_SIZE_MAX: u32 = 32768;

/// Hardware limits and pool sizing for a texture system.
///
/// Defaults model the small tiled-sampler device this crate targets:
/// 512x512 maximum textures, a 16-texel floor and a few megabytes of
/// sampler-local memory.
#[derive(Clone, Debug)]
pub struct TextureConfig {
    /// Largest storable axis; planned dimensions are halved until both fit.
    pub max_texture_size: u32,
    /// Usable registry slots, excluding the reserved sentinel slot.
    pub max_textures: usize,
    /// Capacity of the fast device-local pool in bytes.
    pub fast_pool_bytes: usize,
    /// Optional ceiling on fallback heap bytes; `None` means unbounded.
    pub heap_limit_bytes: Option<usize>,
    /// Edge length of atlas pages (lightmap blocks, dynamic light pages).
    pub atlas_page_size: u32,
    /// Force nearest-neighbor sampling on every bind.
    pub force_nearest: bool,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            max_texture_size: 512,
            max_textures: 1024,
            fast_pool_bytes: 4 * 1024 * 1024,
            heap_limit_bytes: None,
            atlas_page_size: 128,
            force_nearest: false,
        }
    }
}
