//! Mip level synthesis. Each level is written into a fresh buffer and
//! reads only from the finalized level above it; the two buffers ping-pong
//! down the chain.

use super::average_normals;

/// How a texture's chain is reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipMode {
    /// 2x2 box average.
    Color,
    /// Average the encoded directions, renormalize.
    NormalMap,
    /// Legacy placeholder: flood each level with its own width byte
    /// instead of filtered content. Kept byte-for-byte for shipped assets.
    AlphaContrast,
}

/// Produce one RGBA level from its parent.
///
/// Each destination axis is either half the source axis or equal to it;
/// the planner floors axes at 16 independently, so one axis can stall
/// while the other still halves.
pub fn shrink_level(
    mode: MipMode,
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
) {
    debug_assert!(dst_width == src_width || dst_width * 2 == src_width);
    debug_assert!(dst_height == src_height || dst_height * 2 == src_height);
    debug_assert!(src.len() >= src_width as usize * src_height as usize * 4);
    debug_assert!(dst.len() >= dst_width as usize * dst_height as usize * 4);

    if mode == MipMode::AlphaContrast {
        dst[..dst_width as usize * dst_height as usize * 4].fill(dst_width as u8);
        return;
    }

    let step_x = (src_width / dst_width) as usize;
    let step_y = (src_height / dst_height) as usize;
    let src_pitch = src_width as usize * 4;
    let dst_pitch = dst_width as usize * 4;

    for y in 0..dst_height as usize {
        let sy = y * step_y;
        let row = &src[sy * src_pitch..][..src_pitch];
        // Second sample row, clamped at the bottom edge.
        let next = if step_y == 2 && sy + 1 < src_height as usize {
            &src[(sy + 1) * src_pitch..][..src_pitch]
        } else {
            row
        };
        let out = &mut dst[y * dst_pitch..][..dst_pitch];

        for x in 0..dst_width as usize {
            let sx = x * step_x;
            // Second sample column, clamped at the right edge.
            let sx2 = if step_x == 2 && sx + 1 < src_width as usize {
                sx + 1
            } else {
                sx
            };
            let t1 = &row[sx * 4..sx * 4 + 4];
            let t2 = &row[sx2 * 4..sx2 * 4 + 4];
            let t3 = &next[sx * 4..sx * 4 + 4];
            let t4 = &next[sx2 * 4..sx2 * 4 + 4];
            let out = &mut out[x * 4..x * 4 + 4];

            match mode {
                MipMode::NormalMap => average_normals(t1, t2, t3, t4, out),
                _ => {
                    for ch in 0..4 {
                        out[ch] = ((t1[ch] as u32 + t2[ch] as u32 + t3[ch] as u32 + t4[ch] as u32)
                            >> 2) as u8;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_reduction_averages_2x2_quads() {
        // 4x2 source shrinking to 2x1.
        #[rustfmt::skip]
        let src = [
            10u8, 0, 0, 255,  20, 0, 0, 255,  100, 0, 0, 255,  120, 0, 0, 255,
            30,   0, 0, 255,  40, 0, 0, 255,  140, 0, 0, 255,  160, 0, 0, 255,
        ];
        let mut dst = [0u8; 8];
        shrink_level(MipMode::Color, &src, 4, 2, &mut dst, 2, 1);
        assert_eq!(&dst[0..4], &[25, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[130, 0, 0, 255]);
    }

    #[test]
    fn stalled_axis_passes_rows_through() {
        // Height stays 2 while width halves; rows are sampled 1:1.
        #[rustfmt::skip]
        let src = [
            8u8, 8, 8, 8,     16, 16, 16, 16,
            64, 64, 64, 64,   96, 96, 96, 96,
        ];
        let mut dst = [0u8; 8];
        shrink_level(MipMode::Color, &src, 2, 2, &mut dst, 1, 2);
        // Row 0 averages 8 and 16, row 1 averages 64 and 96.
        assert_eq!(&dst[0..4], &[12, 12, 12, 12]);
        assert_eq!(&dst[4..8], &[80, 80, 80, 80]);
    }

    #[test]
    fn normal_levels_preserve_uniform_directions() {
        // A quad of identical unit directions reduces to that direction;
        // (0, 0.6, 0.8) encodes as (128, 204, 229).
        let texel = [128u8, 204, 229, 255];
        let src: Vec<u8> = texel.iter().copied().cycle().take(4 * 2 * 2).collect();
        let mut dst = [0u8; 4];
        shrink_level(MipMode::NormalMap, &src, 2, 2, &mut dst, 1, 1);
        for (got, want) in dst.iter().zip(texel.iter()) {
            assert!((*got as i32 - *want as i32).abs() <= 1, "{dst:?} vs {texel:?}");
        }
    }

    #[test]
    fn alpha_contrast_floods_with_level_width() {
        let src = [0u8; 32 * 32 * 4];
        let mut dst = [0u8; 16 * 16 * 4];
        shrink_level(MipMode::AlphaContrast, &src, 32, 32, &mut dst, 16, 16);
        assert!(dst.iter().all(|&b| b == 16));
    }
}
