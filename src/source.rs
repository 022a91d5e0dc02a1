//! Descriptors for decoded pixel data as handed over by the external
//! image loader. The loader is a black box; everything the pipeline needs
//! to know about its output is captured here.

/// Pixel layouts the external decoder may hand in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// 8-bit palette indices plus a 256-entry palette.
    Indexed8,
    Rgb24,
    Bgr24,
    Rgba32,
    Bgra32,
    /// Single grayscale channel, replicated to RGB on upload.
    Luminance8,
    /// Block-compressed, stored verbatim.
    Dxt1,
    Dxt3,
    Dxt5,
}

impl SourceFormat {
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed8)
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    /// Bytes one `w` x `h` level occupies as delivered by the decoder.
    pub fn level_bytes(self, w: u32, h: u32) -> usize {
        let (w, h) = (w as usize, h as usize);
        match self {
            Self::Indexed8 | Self::Luminance8 => w * h,
            Self::Rgb24 | Self::Bgr24 => w * h * 3,
            Self::Rgba32 | Self::Bgra32 => w * h * 4,
            Self::Dxt1 => w.div_ceil(4) * h.div_ceil(4) * 8,
            Self::Dxt3 | Self::Dxt5 => w.div_ceil(4) * h.div_ceil(4) * 16,
        }
    }
}

/// A palette delivered alongside indexed pixels: 256 rows of RGB or RGBA.
#[derive(Clone, Copy, Debug)]
pub struct Palette<'a> {
    pub data: &'a [u8],
    /// Rows are 4 bytes (RGBA) when set, 3 bytes (RGB) otherwise.
    pub has_alpha: bool,
}

impl Palette<'_> {
    pub fn entry_bytes(&self) -> usize {
        if self.has_alpha { 4 } else { 3 }
    }

    /// Color of entry `index` as RGBA; missing alpha reads opaque.
    pub fn color(&self, index: usize) -> [u8; 4] {
        let row = &self.data[index * self.entry_bytes()..];
        let a = if self.has_alpha { row[3] } else { 0xff };
        [row[0], row[1], row[2], a]
    }
}

/// A decoded image ready for upload.
///
/// `pixels` may be `None` only for entries whose storage appears later
/// (atlas pages filled by partial updates). `mip_count` counts the levels
/// present in `pixels` including the base; 0 and 1 both mean just the
/// base level.
#[derive(Clone, Copy, Debug)]
pub struct PixelSource<'a> {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
    pub pixels: Option<&'a [u8]>,
    pub palette: Option<Palette<'a>>,
    pub mip_count: u32,
}

impl<'a> PixelSource<'a> {
    /// Plain RGBA base-level source, the common decoder output.
    pub fn rgba(width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format: SourceFormat::Rgba32,
            pixels: Some(pixels),
            palette: None,
            mip_count: 0,
        }
    }

    /// 8-bit indexed source with its palette.
    pub fn indexed(width: u32, height: u32, pixels: &'a [u8], palette: Palette<'a>) -> Self {
        Self {
            width,
            height,
            format: SourceFormat::Indexed8,
            pixels: Some(pixels),
            palette: Some(palette),
            mip_count: 0,
        }
    }

    /// Levels present in `pixels`, never less than 1.
    pub fn levels_present(&self) -> u32 {
        self.mip_count.max(1)
    }

    /// Bytes the descriptor implies `pixels` must hold, the whole
    /// precomputed chain included. Chain levels halve down to 1x1, the
    /// decoder knows nothing of the device's size floor.
    pub fn expected_bytes(&self) -> usize {
        (0..self.levels_present())
            .map(|mip| {
                let w = (self.width >> mip).max(1);
                let h = (self.height >> mip).max(1);
                self.format.level_bytes(w, h)
            })
            .sum()
    }

    /// Own the source for later reprocessing.
    pub fn to_owned_copy(&self) -> OriginalCopy {
        OriginalCopy {
            width: self.width,
            height: self.height,
            format: self.format,
            pixels: self.pixels.map(|p| p.to_vec()).unwrap_or_default(),
            palette: self.palette.map(|p| (p.data.to_vec(), p.has_alpha)),
            mip_count: self.mip_count,
        }
    }
}

/// Retained pre-processing source, kept when the keep-source flag was set
/// at load time; gamma and color-remap reprocessing re-derive from it.
#[derive(Clone, Debug)]
pub struct OriginalCopy {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
    pub pixels: Vec<u8>,
    pub palette: Option<(Vec<u8>, bool)>,
    pub mip_count: u32,
}

impl OriginalCopy {
    /// Borrow as a loadable source.
    pub fn as_source(&self) -> PixelSource<'_> {
        PixelSource {
            width: self.width,
            height: self.height,
            format: self.format,
            pixels: (!self.pixels.is_empty()).then_some(self.pixels.as_slice()),
            palette: self.palette.as_ref().map(|(data, has_alpha)| Palette {
                data,
                has_alpha: *has_alpha,
            }),
            mip_count: self.mip_count,
        }
    }
}
