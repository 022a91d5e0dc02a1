//! Native storage formats of the tiled sampler and the rules for picking
//! one.

use crate::flags::TextureFlags;
use crate::source::SourceFormat;

/// Entries in a stored palette.
pub const PALETTE_ENTRIES: usize = 256;

/// Bytes of a stored palette: 256 entries packed 4444.
pub const PALETTE_BYTES: usize = PALETTE_ENTRIES * 2;

/// What the sampler actually reads. Compressed variants are stored
/// verbatim; everything else is produced by the packer or taken raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeFormat {
    /// 4-bit palette indices.
    Index4,
    /// 8-bit palette indices.
    Index8,
    /// Block-compressed, half a byte per texel.
    Dxt1,
    /// Block-compressed, one byte per texel.
    Dxt3,
    /// Block-compressed, one byte per texel.
    Dxt5,
    /// Packed 16-bit, 4 bits per channel.
    Rgba4444,
    /// Packed 16-bit, 5/5/5 color plus 1-bit alpha.
    Rgba5551,
    /// Packed 16-bit, 5/6/5 color, no alpha.
    Rgb565,
    /// Raw 32-bit RGBA.
    Rgba8888,
}

impl NativeFormat {
    pub const ALL: &'static [NativeFormat] = &[
        NativeFormat::Index4,
        NativeFormat::Index8,
        NativeFormat::Dxt1,
        NativeFormat::Dxt3,
        NativeFormat::Dxt5,
        NativeFormat::Rgba4444,
        NativeFormat::Rgba5551,
        NativeFormat::Rgb565,
        NativeFormat::Rgba8888,
    ];

    /// Pick the native format for a source. Decision order: compressed
    /// passes through, indexed stays indexed, atlas pages take 565,
    /// alpha takes 4444, everything else 565.
    pub fn select(source: SourceFormat, flags: TextureFlags) -> NativeFormat {
        match source {
            SourceFormat::Dxt1 => NativeFormat::Dxt1,
            SourceFormat::Dxt3 => NativeFormat::Dxt3,
            SourceFormat::Dxt5 => NativeFormat::Dxt5,
            SourceFormat::Indexed8 => NativeFormat::Index8,
            _ if flags.contains(TextureFlags::ATLAS_PAGE) => NativeFormat::Rgb565,
            _ if flags.contains(TextureFlags::HAS_ALPHA) => NativeFormat::Rgba4444,
            _ => NativeFormat::Rgb565,
        }
    }

    /// Bytes one `w` x `h` level occupies in storage.
    pub fn level_bytes(self, w: u32, h: u32) -> usize {
        let texels = w as usize * h as usize;
        match self {
            Self::Index4 | Self::Dxt1 => texels / 2,
            Self::Index8 | Self::Dxt3 | Self::Dxt5 => texels,
            Self::Rgba4444 | Self::Rgba5551 | Self::Rgb565 => texels * 2,
            Self::Rgba8888 => texels * 4,
        }
    }

    /// Whole bytes per texel for row-pitch math; `None` for block
    /// compression and sub-byte indices.
    pub fn texel_bytes(self) -> Option<usize> {
        match self {
            Self::Index8 => Some(1),
            Self::Rgba4444 | Self::Rgba5551 | Self::Rgb565 => Some(2),
            Self::Rgba8888 => Some(4),
            Self::Index4 | Self::Dxt1 | Self::Dxt3 | Self::Dxt5 => None,
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Index4 | Self::Index8)
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    /// Short tag for diagnostic listings.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Index4 => "IDX4",
            Self::Index8 => "IDX8",
            Self::Dxt1 => "DXT1",
            Self::Dxt3 => "DXT3",
            Self::Dxt5 => "DXT5",
            Self::Rgba4444 => "4444",
            Self::Rgba5551 => "5551",
            Self::Rgb565 => "565 ",
            Self::Rgba8888 => "8888",
        }
    }
}
