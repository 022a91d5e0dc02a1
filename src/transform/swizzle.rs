//! Cache-tile reordering. The sampler reads 16-byte x 8-row tiles; rows
//! inside a tile become contiguous in storage, tiles walk row-major. A
//! pure byte permutation, invertible by [`unswizzle`].

/// Bytes per tile row.
pub const TILE_BYTES: usize = 16;
/// Rows per tile.
pub const TILE_ROWS: usize = 8;

/// Reorder `src` (row-major, `pitch` bytes per row, `rows` rows) into the
/// tiled layout. `pitch` must be a multiple of 16 and `rows` a multiple
/// of 8; the 16-texel dimension floor guarantees both for every format
/// that reaches the swizzler.
pub fn swizzle(src: &[u8], dst: &mut [u8], pitch: usize, rows: usize) {
    debug_assert_eq!(pitch % TILE_BYTES, 0);
    debug_assert_eq!(rows % TILE_ROWS, 0);
    debug_assert!(src.len() >= pitch * rows);
    debug_assert!(dst.len() >= pitch * rows);

    let tiles_x = pitch / TILE_BYTES;
    let tiles_y = rows / TILE_ROWS;
    let mut out = 0;

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let corner = ty * TILE_ROWS * pitch + tx * TILE_BYTES;
            for row in 0..TILE_ROWS {
                let at = corner + row * pitch;
                dst[out..out + TILE_BYTES].copy_from_slice(&src[at..at + TILE_BYTES]);
                out += TILE_BYTES;
            }
        }
    }
}

/// Inverse of [`swizzle`]: scatter contiguous tile rows back to row-major
/// order.
pub fn unswizzle(src: &[u8], dst: &mut [u8], pitch: usize, rows: usize) {
    debug_assert_eq!(pitch % TILE_BYTES, 0);
    debug_assert_eq!(rows % TILE_ROWS, 0);
    debug_assert!(src.len() >= pitch * rows);
    debug_assert!(dst.len() >= pitch * rows);

    let tiles_x = pitch / TILE_BYTES;
    let tiles_y = rows / TILE_ROWS;
    let mut inp = 0;

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let corner = ty * TILE_ROWS * pitch + tx * TILE_BYTES;
            for row in 0..TILE_ROWS {
                let at = corner + row * pitch;
                dst[at..at + TILE_BYTES].copy_from_slice(&src[inp..inp + TILE_BYTES]);
                inp += TILE_BYTES;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 253) as u8).collect()
    }

    #[test]
    fn first_tile_rows_become_contiguous() {
        // Two tiles across, one down: 32-byte pitch, 8 rows.
        let src = pattern(32 * 8);
        let mut dst = vec![0u8; src.len()];
        swizzle(&src, &mut dst, 32, 8);

        // Tile 0 row 1 starts at source offset 32 and lands right after
        // tile 0 row 0.
        assert_eq!(&dst[0..16], &src[0..16]);
        assert_eq!(&dst[16..32], &src[32..48]);
        // Tile 1 row 0 is the second half of source row 0 and lands after
        // the whole first tile.
        assert_eq!(&dst[128..144], &src[16..32]);
    }

    #[test]
    fn swizzle_roundtrips_through_unswizzle() {
        for (pitch, rows) in [(16, 8), (32, 16), (64, 8), (128, 64)] {
            let src = pattern(pitch * rows);
            let mut tiled = vec![0u8; src.len()];
            let mut back = vec![0u8; src.len()];
            swizzle(&src, &mut tiled, pitch, rows);
            unswizzle(&tiled, &mut back, pitch, rows);
            assert_eq!(src, back, "pitch {pitch} rows {rows}");
        }
    }

    #[test]
    fn swizzle_is_a_permutation() {
        let src = pattern(64 * 16);
        let mut dst = vec![0u8; src.len()];
        swizzle(&src, &mut dst, 64, 16);

        let mut a = src.clone();
        let mut b = dst.clone();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
        assert_ne!(src, dst);
    }
}
