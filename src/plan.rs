//! Dimension and mip chain planning: what shape a texture takes in
//! storage before any pixel is touched.

use smallvec::SmallVec;

use crate::config::{MIP_LEVELS_MAX, TEXTURE_SIZE_MIN};
use crate::format::NativeFormat;

/// Planned power-of-two extent of one texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

/// One planned mip level: dimensions plus placement inside the texture's
/// storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub offset: usize,
    pub bytes: usize,
}

/// The full planned chain.
#[derive(Clone, Debug)]
pub struct MipChain {
    pub levels: SmallVec<[MipLevel; MIP_LEVELS_MAX as usize]>,
    pub total_bytes: usize,
}

fn prev_power_of_two(v: u32) -> u32 {
    debug_assert!(v > 0);
    1 << v.ilog2()
}

/// Round a requested size to device-legal dimensions.
///
/// Policy: floor each axis to the previous power of two (300 becomes
/// 256), halve both axes while either still exceeds `max_size`, then
/// clamp to the 16 floor. The requested size is kept separately by the
/// caller for resample ratios.
pub fn plan_extent(src_width: u32, src_height: u32, max_size: u32) -> Extent {
    let mut w = prev_power_of_two(src_width);
    let mut h = prev_power_of_two(src_height);
    while w > max_size || h > max_size {
        w >>= 1;
        h >>= 1;
    }
    Extent {
        width: w.max(TEXTURE_SIZE_MIN),
        height: h.max(TEXTURE_SIZE_MIN),
    }
}

/// Dimensions of level `index` below `base`: each axis halves and floors
/// at 16 independently.
pub fn level_extent(base: Extent, index: u32) -> Extent {
    Extent {
        width: (base.width >> index).max(TEXTURE_SIZE_MIN),
        height: (base.height >> index).max(TEXTURE_SIZE_MIN),
    }
}

/// Count levels for a mipmapped texture of `base` extent.
///
/// Keeps the legacy loop shape: the level where both axes reach the 16
/// floor is excluded, so a 64x64 base plans two levels (64 and 32) and a
/// 16x16 base plans one.
pub fn plan_level_count(base: Extent) -> u32 {
    let mut count = 1;
    for mip in 1..MIP_LEVELS_MAX {
        let level = level_extent(base, mip);
        if level.width == TEXTURE_SIZE_MIN && level.height == TEXTURE_SIZE_MIN {
            break;
        }
        count = mip + 1;
    }
    count
}

/// Lay out `level_count` levels of `base` in `format`, accumulating
/// per-level byte offsets.
pub fn plan_chain(base: Extent, format: NativeFormat, level_count: u32) -> MipChain {
    let mut levels = SmallVec::new();
    let mut offset = 0usize;
    for mip in 0..level_count.clamp(1, MIP_LEVELS_MAX) {
        let extent = level_extent(base, mip);
        let bytes = format.level_bytes(extent.width, extent.height);
        levels.push(MipLevel {
            width: extent.width,
            height: extent.height,
            offset,
            bytes,
        });
        offset += bytes;
    }
    MipChain {
        levels,
        total_bytes: offset,
    }
}
