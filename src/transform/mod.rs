//! CPU-side pixel transforms of the upload pipeline: resampling, mip
//! synthesis, bit-packing and cache-tile swizzling. Every routine here is
//! pure buffer-to-buffer work; planning and storage live elsewhere.

pub mod mipmap;
pub mod pack;
pub mod resample;
pub mod swizzle;

use glam::Vec3;

/// Stand-in when an averaged normal degenerates to zero length. Kept
/// unnormalized to match legacy content byte-for-byte.
const NORMAL_FALLBACK: Vec3 = Vec3::new(0.5, 0.5, 1.0);

/// Decode an encoded direction texel into a signed vector.
#[inline]
fn decode_normal(texel: &[u8]) -> Vec3 {
    Vec3::new(
        texel[0] as f32 / 127.5 - 1.0,
        texel[1] as f32 / 127.5 - 1.0,
        texel[2] as f32 / 127.5 - 1.0,
    )
}

/// Re-encode a direction, opaque alpha. The truncating cast wraps
/// negative components exactly like the legacy encoder.
#[inline]
fn encode_normal(n: Vec3, out: &mut [u8]) {
    out[0] = (128 + (127.0 * n.x) as i32) as u8;
    out[1] = (128 + (127.0 * n.y) as i32) as u8;
    out[2] = (128 + (127.0 * n.z) as i32) as u8;
    out[3] = 0xff;
}

/// Average four encoded directions and renormalize, falling back to the
/// fixed up-vector when the sum degenerates.
#[inline]
fn average_normals(t1: &[u8], t2: &[u8], t3: &[u8], t4: &[u8], out: &mut [u8]) {
    let sum = decode_normal(t1) + decode_normal(t2) + decode_normal(t3) + decode_normal(t4);
    encode_normal(sum.normalize_or(NORMAL_FALLBACK), out);
}

/// Expand any full-color source layout to tightly packed RGBA.
///
/// The decoder black box may hand over RGB/BGR triplets, BGRA or a bare
/// luminance channel; the pipeline resamples and packs RGBA only.
pub fn normalize_rgba(
    format: crate::source::SourceFormat,
    src: &[u8],
    dst: &mut Vec<u8>,
    texels: usize,
) {
    use crate::source::SourceFormat;

    dst.clear();
    dst.reserve(texels * 4);
    match format {
        SourceFormat::Rgba32 => dst.extend_from_slice(&src[..texels * 4]),
        SourceFormat::Bgra32 => {
            for t in src[..texels * 4].chunks_exact(4) {
                dst.extend_from_slice(&[t[2], t[1], t[0], t[3]]);
            }
        }
        SourceFormat::Rgb24 => {
            for t in src[..texels * 3].chunks_exact(3) {
                dst.extend_from_slice(&[t[0], t[1], t[2], 0xff]);
            }
        }
        SourceFormat::Bgr24 => {
            for t in src[..texels * 3].chunks_exact(3) {
                dst.extend_from_slice(&[t[2], t[1], t[0], 0xff]);
            }
        }
        SourceFormat::Luminance8 => {
            for &l in &src[..texels] {
                dst.extend_from_slice(&[l, l, l, 0xff]);
            }
        }
        SourceFormat::Indexed8 | SourceFormat::Dxt1 | SourceFormat::Dxt3 | SourceFormat::Dxt5 => {
            debug_assert!(false, "{format:?} data never takes the full-color path");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFormat;

    #[test]
    fn normalize_reorders_bgr_and_expands_luminance() {
        let mut out = Vec::new();
        normalize_rgba(SourceFormat::Bgr24, &[10, 20, 30], &mut out, 1);
        assert_eq!(out, [30, 20, 10, 0xff]);

        normalize_rgba(SourceFormat::Luminance8, &[77], &mut out, 1);
        assert_eq!(out, [77, 77, 77, 0xff]);

        normalize_rgba(SourceFormat::Bgra32, &[1, 2, 3, 4], &mut out, 1);
        assert_eq!(out, [3, 2, 1, 4]);
    }

    #[test]
    fn normal_codec_roundtrips_axis_vectors() {
        let mut out = [0u8; 4];
        encode_normal(Vec3::new(0.0, 0.0, 1.0), &mut out);
        assert_eq!(out, [128, 128, 255, 255]);

        let decoded = decode_normal(&out);
        assert!((decoded.z - 1.0).abs() < 0.01);
        assert!(decoded.x.abs() < 0.01);
    }

    #[test]
    fn degenerate_average_takes_the_fallback() {
        // (-1,-1,1) and (1,1,-1) cancel exactly.
        let a = [0u8, 0, 255, 255];
        let b = [255u8, 255, 0, 255];
        let mut out = [0u8; 4];
        average_normals(&a, &b, &a, &b, &mut out);
        // Encoded fallback (0.5, 0.5, 1.0).
        assert_eq!(out, [191, 191, 255, 255]);
    }
}
