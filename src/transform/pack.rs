//! Bit-packing 32-bit texels into the 16-bit native encodings. Words are
//! written little-endian; the shift formulas below are the storage
//! contract, not an implementation detail.

use crate::format::NativeFormat;
use crate::source::Palette;

/// The three 16-bit packed encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packed16 {
    /// `a>>4 << 12 | b>>4 << 8 | g>>4 << 4 | r>>4`
    Rgba4444,
    /// `a>>7 << 15 | b>>3 << 10 | g>>3 << 5 | r>>3`
    Rgba5551,
    /// `b>>3 << 11 | g>>2 << 5 | r>>3`
    Rgb565,
}

impl NativeFormat {
    /// The 16-bit packing for this format, if it has one.
    pub fn packed16(self) -> Option<Packed16> {
        match self {
            Self::Rgba4444 => Some(Packed16::Rgba4444),
            Self::Rgba5551 => Some(Packed16::Rgba5551),
            Self::Rgb565 => Some(Packed16::Rgb565),
            _ => None,
        }
    }
}

#[inline]
pub fn pack_4444(r: u8, g: u8, b: u8, a: u8) -> u16 {
    (r as u16 >> 4) | ((g as u16 >> 4) << 4) | ((b as u16 >> 4) << 8) | ((a as u16 >> 4) << 12)
}

#[inline]
pub fn pack_5551(r: u8, g: u8, b: u8, a: u8) -> u16 {
    (r as u16 >> 3) | ((g as u16 >> 3) << 5) | ((b as u16 >> 3) << 10) | ((a as u16 >> 7) << 15)
}

#[inline]
pub fn pack_565(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 >> 3) | ((g as u16 >> 2) << 5) | ((b as u16 >> 3) << 11)
}

#[inline]
pub fn pack_texel(format: Packed16, r: u8, g: u8, b: u8, a: u8) -> u16 {
    match format {
        Packed16::Rgba4444 => pack_4444(r, g, b, a),
        Packed16::Rgba5551 => pack_5551(r, g, b, a),
        Packed16::Rgb565 => pack_565(r, g, b),
    }
}

/// Pack RGBA texels into little-endian 16-bit words. `has_alpha` false
/// forces the packed alpha fully opaque.
pub fn pack_rgba16(format: Packed16, src: &[u8], dst: &mut [u8], has_alpha: bool) {
    debug_assert!(dst.len() / 2 >= src.len() / 4);

    for (texel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(2)) {
        let a = if has_alpha { texel[3] } else { 0xff };
        let word = pack_texel(format, texel[0], texel[1], texel[2], a);
        out.copy_from_slice(&word.to_le_bytes());
    }
}

/// Raw 32-bit pass-through; alpha forced opaque when the source has none.
pub fn copy_rgba32(src: &[u8], dst: &mut [u8], has_alpha: bool) {
    debug_assert!(dst.len() >= src.len());

    if has_alpha {
        dst[..src.len()].copy_from_slice(src);
    } else {
        for (texel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
            out[..3].copy_from_slice(&texel[..3]);
            out[3] = 0xff;
        }
    }
}

/// Convert a 256-entry palette into the stored palette format (4444).
pub fn pack_palette(palette: &Palette, dst: &mut [u8]) {
    debug_assert!(dst.len() >= crate::format::PALETTE_BYTES);

    for (entry, out) in dst.chunks_exact_mut(2).enumerate() {
        let [r, g, b, a] = palette.color(entry);
        out.copy_from_slice(&pack_4444(r, g, b, a).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_565_keeps_the_top_bits_of_each_channel() {
        // 0xF8 red, 0xFC green, 0xF8 blue saturate every field.
        assert_eq!(pack_565(0xf8, 0xfc, 0xf8), 0xffff);
        assert_eq!(pack_565(0xff, 0x00, 0x00), 0x001f);
        assert_eq!(pack_565(0x00, 0xff, 0x00), 0x07e0);
        assert_eq!(pack_565(0x00, 0x00, 0xff), 0xf800);
        // Truncation: the bottom 3/2/3 bits vanish.
        assert_eq!(pack_565(0x07, 0x03, 0x07), 0x0000);
        assert_eq!(pack_565(0x08, 0x04, 0x08), 0x0001 | 0x0020 | 0x0800);
    }

    #[test]
    fn packed_4444_lays_out_abgr() {
        assert_eq!(pack_4444(0xf0, 0x00, 0x00, 0x00), 0x000f);
        assert_eq!(pack_4444(0x00, 0xf0, 0x00, 0x00), 0x00f0);
        assert_eq!(pack_4444(0x00, 0x00, 0xf0, 0x00), 0x0f00);
        assert_eq!(pack_4444(0x00, 0x00, 0x00, 0xf0), 0xf000);
        assert_eq!(pack_4444(0x12, 0x34, 0x56, 0x78), 0x7531);
    }

    #[test]
    fn packed_5551_uses_one_alpha_bit() {
        assert_eq!(pack_5551(0, 0, 0, 0x80), 0x8000);
        assert_eq!(pack_5551(0, 0, 0, 0x7f), 0x0000);
        assert_eq!(pack_5551(0xff, 0xff, 0xff, 0xff), 0xffff);
    }

    #[test]
    fn missing_alpha_packs_opaque() {
        let texel = [0u8, 0, 0, 0];
        let mut out = [0u8; 2];
        pack_rgba16(Packed16::Rgba4444, &texel, &mut out, false);
        assert_eq!(u16::from_le_bytes(out), 0xf000);

        pack_rgba16(Packed16::Rgba4444, &texel, &mut out, true);
        assert_eq!(u16::from_le_bytes(out), 0x0000);
    }

    #[test]
    fn words_are_little_endian_in_memory() {
        let texel = [0xffu8, 0, 0, 0xff];
        let mut out = [0u8; 2];
        pack_rgba16(Packed16::Rgba5551, &texel, &mut out, true);
        // 0x801f stored low byte first.
        assert_eq!(out, [0x1f, 0x80]);
    }

    #[test]
    fn palette_packs_256_entries_of_4444() {
        let mut rows = Vec::with_capacity(256 * 4);
        for i in 0..256usize {
            rows.extend_from_slice(&[i as u8, 0x20, 0x40, 0x80]);
        }
        let palette = Palette { data: &rows, has_alpha: true };
        let mut dst = [0u8; crate::format::PALETTE_BYTES];
        pack_palette(&palette, &mut dst);

        let first = u16::from_le_bytes([dst[0], dst[1]]);
        assert_eq!(first, pack_4444(0, 0x20, 0x40, 0x80));
        let last = u16::from_le_bytes([dst[510], dst[511]]);
        assert_eq!(last, pack_4444(0xff, 0x20, 0x40, 0x80));
    }
}
