//! Rescaling source pixels to planned dimensions. Full-color data takes a
//! 2x2 box filter; indexed data takes nearest-neighbor, since averaging
//! palette indices is meaningless.

use super::average_normals;

/// Fixed-point column sample tables: texel byte offsets at the quarter
/// and three-quarter points of each output column. The 16.16 accumulator
/// runs in usize so the widest accepted rows stay exact.
fn column_offsets(src_width: u32, dst_width: u32) -> (Vec<usize>, Vec<usize>) {
    let frac_step = src_width as usize * 0x10000 / dst_width as usize;
    let mut col1 = vec![0usize; dst_width as usize];
    let mut col2 = vec![0usize; dst_width as usize];

    let mut frac = frac_step >> 2;
    for c in col1.iter_mut() {
        *c = 4 * (frac >> 16);
        frac += frac_step;
    }
    let mut frac = (frac_step >> 2) * 3;
    for c in col2.iter_mut() {
        *c = 4 * (frac >> 16);
        frac += frac_step;
    }
    (col1, col2)
}

/// Box-resample RGBA pixels. Each output texel averages four samples
/// taken at the quarter points of its source footprint; `normal_map`
/// switches to direction averaging with renormalization.
pub fn resample_rgba(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    normal_map: bool,
) {
    debug_assert!(src.len() >= src_width as usize * src_height as usize * 4);
    debug_assert!(dst.len() >= dst_width as usize * dst_height as usize * 4);

    let (col1, col2) = column_offsets(src_width, dst_width);
    let src_pitch = src_width as usize * 4;
    let dst_pitch = dst_width as usize * 4;

    for y in 0..dst_height as usize {
        let row1 = ((y as f32 + 0.25) * src_height as f32 / dst_height as f32) as usize;
        let row2 = ((y as f32 + 0.75) * src_height as f32 / dst_height as f32) as usize;
        let in1 = &src[row1 * src_pitch..][..src_pitch];
        let in2 = &src[row2 * src_pitch..][..src_pitch];
        let out = &mut dst[y * dst_pitch..][..dst_pitch];

        for x in 0..dst_width as usize {
            let (o1, o2) = (col1[x], col2[x]);
            let t1 = &in1[o1..o1 + 4];
            let t2 = &in1[o2..o2 + 4];
            let t3 = &in2[o1..o1 + 4];
            let t4 = &in2[o2..o2 + 4];
            let out = &mut out[x * 4..x * 4 + 4];

            if normal_map {
                average_normals(t1, t2, t3, t4, out);
            } else {
                for ch in 0..4 {
                    out[ch] =
                        ((t1[ch] as u32 + t2[ch] as u32 + t3[ch] as u32 + t4[ch] as u32) >> 2) as u8;
                }
            }
        }
    }
}

/// Nearest-neighbor resample of 8-bit palette indices.
pub fn resample_indexed(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
) {
    debug_assert!(src.len() >= src_width as usize * src_height as usize);
    debug_assert!(dst.len() >= dst_width as usize * dst_height as usize);

    let frac_step = src_width as usize * 0x10000 / dst_width as usize;

    for y in 0..dst_height as usize {
        let src_row = y * src_height as usize / dst_height as usize;
        let in_row = &src[src_row * src_width as usize..][..src_width as usize];
        let out = &mut dst[y * dst_width as usize..][..dst_width as usize];

        let mut frac = frac_step >> 1;
        for o in out.iter_mut() {
            *o = in_row[frac >> 16];
            frac += frac_step;
        }
    }
}
