//! The texture system: one owned value tying the registry, device memory
//! and the transform pipeline into a synchronous load, update, bind and
//! free API.

use std::mem;

use log::{debug, info, trace};

use crate::config::{MIP_LEVELS_MAX, NAME_LEN_MAX, SOURCE_SIZE_MAX, TEXTURE_SIZE_MIN, TextureConfig};
use crate::error::{TextureError, TextureResult};
use crate::flags::TextureFlags;
use crate::format::{NativeFormat, PALETTE_BYTES, PALETTE_ENTRIES};
use crate::memory::{DeviceMemory, FlushStats, MemoryUsage};
use crate::plan::{self, Extent, MipChain};
use crate::registry::{EntryInfo, TextureHandle, TextureRegistry};
use crate::source::{OriginalCopy, PixelSource, SourceFormat};
use crate::transform::mipmap::{self, MipMode};
use crate::transform::pack::{self, Packed16};
use crate::transform::{normalize_rgba, resample, swizzle};

/// Palette rows overwritten by player-color remaps: entries 16..32 take
/// the shirt color, entries 96..112 the pants color.
const SHIRT_ROW: usize = 1;
const PANTS_ROW: usize = 6;

/// Sampler mode derived at bind time from the entry's flags and chain
/// length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplerFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

impl SamplerFilter {
    fn select(nearest: bool, mipmapped: bool) -> Self {
        match (nearest, mipmapped) {
            (false, false) => Self::Linear,
            (false, true) => Self::LinearMipmapLinear,
            (true, false) => Self::Nearest,
            (true, true) => Self::NearestMipmapNearest,
        }
    }
}

/// Operations that re-derive a texture from its retained source copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReprocessOp {
    /// Run every color channel through `255 * (v/255)^(1/gamma)`.
    Gamma(f32),
    /// Player-color remap for indexed sources: palette row `top` is
    /// copied over the shirt range, row `bottom` over the pants range.
    Remap { top: u8, bottom: u8 },
}

/// Reusable CPU-side transform buffers, grown on demand and kept across
/// loads.
#[derive(Default)]
struct Scratch {
    /// Source expanded to tightly packed RGBA.
    norm: Vec<u8>,
    /// Current mip level; swapped with `next` down the chain.
    level: Vec<u8>,
    next: Vec<u8>,
    /// Packed level bytes awaiting the swizzler.
    packed: Vec<u8>,
    /// Resampled palette indices.
    indices: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Default)]
struct BindState {
    current: TextureHandle,
    filter: SamplerFilter,
    palette_loads: u64,
}

/// Owner of every texture resource: registry slots, device memory and
/// the scratch buffers of the upload pipeline.
///
/// All work is synchronous; when a load returns, the texture is resident
/// and flushed. Recoverable errors leave no trace in the registry, and
/// [`TextureError::is_fatal`] marks the exhaustion errors a host cannot
/// continue past.
pub struct TextureSystem {
    config: TextureConfig,
    registry: TextureRegistry,
    memory: DeviceMemory,
    scratch: Scratch,
    bind: BindState,
    default_texture: TextureHandle,
    white_texture: TextureHandle,
    gray_texture: TextureHandle,
    black_texture: TextureHandle,
    particle_texture: TextureHandle,
}

impl TextureSystem {
    /// Bring up an empty system and register the built-in textures.
    /// Fails only when the configuration cannot hold the built-ins.
    pub fn new(config: TextureConfig) -> TextureResult<Self> {
        let mut system = Self {
            registry: TextureRegistry::new(config.max_textures),
            memory: DeviceMemory::new(config.fast_pool_bytes, config.heap_limit_bytes),
            scratch: Scratch::default(),
            bind: BindState::default(),
            default_texture: TextureHandle::NONE,
            white_texture: TextureHandle::NONE,
            gray_texture: TextureHandle::NONE,
            black_texture: TextureHandle::NONE,
            particle_texture: TextureHandle::NONE,
            config,
        };
        system.create_builtins()?;
        info!(
            "texture system ready: {} slots, {} KiB fast pool",
            system.config.max_textures,
            system.config.fast_pool_bytes / 1024
        );
        Ok(system)
    }

    fn create_builtins(&mut self) -> TextureResult<()> {
        let checker = checkerboard_pixels();
        self.default_texture = self.load(
            "*default",
            &PixelSource::rgba(16, 16, &checker),
            TextureFlags::empty(),
        )?;

        self.white_texture = self.load(
            "*white",
            &PixelSource::rgba(4, 4, &solid_pixels([0xff, 0xff, 0xff, 0xff])),
            TextureFlags::empty(),
        )?;
        self.gray_texture = self.load(
            "*gray",
            &PixelSource::rgba(4, 4, &solid_pixels([0x7f, 0x7f, 0x7f, 0xff])),
            TextureFlags::empty(),
        )?;
        self.black_texture = self.load(
            "*black",
            &PixelSource::rgba(4, 4, &solid_pixels([0x00, 0x00, 0x00, 0xff])),
            TextureFlags::empty(),
        )?;

        let particle = particle_pixels();
        self.particle_texture = self.load(
            "*particle",
            &PixelSource::rgba(16, 16, &particle),
            TextureFlags::CLAMP | TextureFlags::HAS_ALPHA,
        )?;
        Ok(())
    }

    /// Load `name` from `source`, or return the existing handle when the
    /// name is already registered.
    pub fn load(
        &mut self,
        name: &str,
        source: &PixelSource,
        flags: TextureFlags,
    ) -> TextureResult<TextureHandle> {
        self.load_or_update(name, source, flags, false)
    }

    /// Load a texture, or with `update` re-upload an existing entry in
    /// place under its registered name. Updating a name that was never
    /// loaded is a fatal usage error.
    pub fn load_or_update(
        &mut self,
        name: &str,
        source: &PixelSource,
        flags: TextureFlags,
        update: bool,
    ) -> TextureResult<TextureHandle> {
        validate_name(name)?;

        if let Some(handle) = self.registry.find(name) {
            if !update {
                trace!("{name}: already registered");
                return Ok(handle);
            }
            validate_source(name, source)?;
            if let Some(entry) = self.registry.get_mut(handle) {
                let state = entry.flags & (TextureFlags::FAST_RESIDENT | TextureFlags::UPLOADED);
                entry.flags = flags.caller_bits() | state;
            }
            self.upload(handle, source)?;
            return Ok(handle);
        }
        if update {
            return Err(TextureError::UpdateTargetMissing {
                name: name.to_owned(),
            });
        }

        validate_source(name, source)?;
        let handle = self.registry.allocate(name, flags.caller_bits())?;
        if let Err(error) = self.upload(handle, source) {
            // No partially initialized entries stay visible.
            if let Some(entry) = self.registry.remove(handle) {
                if let Some(storage) = entry.storage {
                    self.memory.free(storage);
                }
            }
            return Err(error);
        }
        Ok(handle)
    }

    /// One synchronous upload: plan the layout, obtain storage, run the
    /// transform pipeline into it, flush, commit the entry.
    fn upload(&mut self, handle: TextureHandle, source: &PixelSource) -> TextureResult<()> {
        let Some(entry) = self.registry.get_mut(handle) else {
            return Err(TextureError::StaleHandle {
                handle: handle.raw(),
            });
        };
        let extent = plan::plan_extent(source.width, source.height, self.config.max_texture_size);
        if source.format.is_compressed() {
            if extent.width != source.width || extent.height != source.height {
                // Block data cannot be resampled to the planned shape.
                return Err(TextureError::Unsupported {
                    name: entry.name.clone(),
                    reason: "compressed source dimensions are not storable",
                });
            }
            // Block data carries no reprocessable source, and without
            // precomputed levels its chain stays flat for good.
            entry.flags.remove(TextureFlags::KEEP_SOURCE);
            if source.levels_present() == 1 {
                entry.flags.insert(TextureFlags::NO_MIPMAP);
            }
        }
        let flags = entry.flags;

        let mut format = NativeFormat::select(source.format, flags);
        let atlas_direct = flags.contains(TextureFlags::ATLAS_PAGE)
            && source.pixels.is_some()
            && !source.format.is_indexed()
            && !source.format.is_compressed()
            && extent.width == source.width
            && extent.height == source.height;
        if atlas_direct {
            // A page uploaded whole at its stored shape skips the packer.
            format = NativeFormat::Rgba8888;
        }

        let num_mips = plan_mip_count(source, flags, extent);
        let chain = plan::plan_chain(extent, format, num_mips);

        entry.src_width = source.width;
        entry.src_height = source.height;
        entry.width = extent.width;
        entry.height = extent.height;
        entry.format = format;
        entry.num_mips = chain.levels.len() as u32;
        entry.flags.remove(TextureFlags::UPLOADED);

        let Some(pixels) = source.pixels else {
            // Planned only: storage appears on the first partial update.
            if let Some(old) = entry.storage.take() {
                self.memory.free(old);
            }
            entry.flags.remove(TextureFlags::FAST_RESIDENT);
            entry.size_bytes = 0;
            trace!(
                "{}: planned {}x{} {}, storage deferred",
                entry.name,
                extent.width,
                extent.height,
                format.tag()
            );
            return Ok(());
        };

        let palette = match (source.format.is_indexed(), source.palette) {
            (true, Some(palette)) => Some(palette),
            (true, None) => {
                return Err(TextureError::MissingPalette {
                    name: entry.name.clone(),
                });
            }
            (false, _) => None,
        };

        // Reuse storage of the exact size, otherwise release before
        // allocating so the pool can hand the region back.
        let mut storage = match entry.storage.take() {
            Some(existing) if existing.len() == chain.total_bytes => existing,
            Some(mismatched) => {
                self.memory.free(mismatched);
                self.memory.allocate(chain.total_bytes)?
            }
            None => self.memory.allocate(chain.total_bytes)?,
        };

        {
            let dst = self.memory.slice_mut(&mut storage);
            if source.format.is_compressed() {
                dst.copy_from_slice(&pixels[..chain.total_bytes]);
            } else if source.format.is_indexed() {
                upload_indexed(&mut self.scratch, source, pixels, &chain, dst);
            } else {
                upload_full_color(
                    &mut self.scratch,
                    source,
                    pixels,
                    &chain,
                    format,
                    flags,
                    atlas_direct,
                    dst,
                );
            }
        }
        self.memory.flush_range(&storage, 0, chain.total_bytes);

        let fast = storage.in_fast_pool();
        entry.storage = Some(storage);
        entry.size_bytes = chain.total_bytes;
        entry.flags.set(TextureFlags::FAST_RESIDENT, fast);
        entry.flags.insert(TextureFlags::UPLOADED);

        if let Some(palette) = palette {
            let mut packed = vec![0u8; PALETTE_BYTES];
            pack::pack_palette(&palette, &mut packed);
            entry.palette = Some(packed);
        } else {
            entry.palette = None;
        }
        entry.original = flags
            .contains(TextureFlags::KEEP_SOURCE)
            .then(|| source.to_owned_copy());

        debug!(
            "{}: {}x{} -> {}x{} {} x{} ({} bytes, {})",
            entry.name,
            source.width,
            source.height,
            extent.width,
            extent.height,
            format.tag(),
            entry.num_mips,
            chain.total_bytes,
            if fast { "pool" } else { "heap" }
        );
        Ok(())
    }

    /// Write a sub-rectangle of RGBA rows into an atlas page, packing to
    /// 565 in place. The page's storage is created zeroed on the first
    /// write; geometry errors are recoverable and leave it untouched.
    ///
    /// Pages holding a raw full upload are reset to a fresh packed page,
    /// partial writes and whole uploads do not mix.
    pub fn update_partial(
        &mut self,
        handle: TextureHandle,
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
        rgba_rows: &[u8],
    ) -> TextureResult<()> {
        let Some(entry) = self.registry.get_mut(handle) else {
            return Err(TextureError::StaleHandle {
                handle: handle.raw(),
            });
        };
        if !entry.flags.contains(TextureFlags::ATLAS_PAGE) {
            return Err(TextureError::Unsupported {
                name: entry.name.clone(),
                reason: "partial updates apply to atlas pages only",
            });
        }
        let (page_w, page_h) = (entry.width, entry.height);
        // Whole-rectangle containment, checked before any mutation.
        if offset_x as u64 + width as u64 > page_w as u64
            || offset_y as u64 + height as u64 > page_h as u64
        {
            return Err(TextureError::RectOutOfBounds {
                offset_x,
                offset_y,
                width,
                height,
                page_width: page_w,
                page_height: page_h,
            });
        }
        let needed = width as usize * height as usize * 4;
        if rgba_rows.len() < needed {
            return Err(TextureError::ShortSourceBuffer {
                expected: needed,
                actual: rgba_rows.len(),
            });
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        let page_bytes = NativeFormat::Rgb565.level_bytes(page_w, page_h);
        let mut storage = match entry.storage.take() {
            Some(existing)
                if entry.format == NativeFormat::Rgb565 && existing.len() == page_bytes =>
            {
                existing
            }
            other => {
                if let Some(old) = other {
                    self.memory.free(old);
                }
                let fresh = self.memory.allocate(page_bytes)?;
                entry.format = NativeFormat::Rgb565;
                entry.num_mips = 1;
                entry.size_bytes = page_bytes;
                fresh
            }
        };
        entry
            .flags
            .set(TextureFlags::FAST_RESIDENT, storage.in_fast_pool());
        entry.flags.insert(TextureFlags::UPLOADED);

        {
            let dst = self.memory.slice_mut(&mut storage);
            let row_bytes = width as usize * 4;
            for row in 0..height as usize {
                let src = &rgba_rows[row * row_bytes..][..row_bytes];
                let at = ((offset_y as usize + row) * page_w as usize + offset_x as usize) * 2;
                pack::pack_rgba16(
                    Packed16::Rgb565,
                    src,
                    &mut dst[at..at + width as usize * 2],
                    true,
                );
            }
        }
        // Flush the touched span only, first dirty byte to last.
        let start = (offset_y as usize * page_w as usize + offset_x as usize) * 2;
        let end = ((offset_y as usize + height as usize - 1) * page_w as usize
            + offset_x as usize
            + width as usize)
            * 2;
        self.memory.flush_range(&storage, start, end - start);
        entry.storage = Some(storage);
        trace!(
            "{}: wrote {}x{} at ({},{})",
            entry.name, width, height, offset_x, offset_y
        );
        Ok(())
    }

    /// Make `handle` current and derive the sampler filter. Handles that
    /// are stale or hold no content resolve to the default texture;
    /// rebinding the current texture does nothing. Returns the handle
    /// actually bound.
    pub fn bind(&mut self, handle: TextureHandle) -> TextureHandle {
        let live = self
            .registry
            .get(handle)
            .is_some_and(|entry| entry.storage.is_some());
        let resolved = if live {
            handle
        } else {
            if !handle.is_none() {
                debug!(
                    "bind of handle {} without content, using default",
                    handle.raw()
                );
            }
            self.default_texture
        };
        if resolved == self.bind.current {
            return resolved;
        }
        let Some(entry) = self.registry.get(resolved) else {
            return TextureHandle::NONE;
        };
        let nearest = self.config.force_nearest || entry.flags.contains(TextureFlags::NEAREST);
        self.bind.filter = SamplerFilter::select(nearest, entry.num_mips > 1);
        if entry.format.is_indexed() {
            // Palette RAM reloads on every palette switch.
            self.bind.palette_loads += 1;
        }
        self.bind.current = resolved;
        trace!("{}: bound, {:?}", entry.name, self.bind.filter);
        resolved
    }

    /// Release one texture and its storage. Stale handles and the
    /// built-in textures are ignored.
    pub fn free(&mut self, handle: TextureHandle) {
        if self.is_builtin(handle) {
            debug!("refusing to free built-in texture {}", handle.raw());
            return;
        }
        let Some(entry) = self.registry.remove(handle) else {
            return;
        };
        if let Some(storage) = entry.storage {
            self.memory.free(storage);
        }
        if self.bind.current == handle {
            self.bind.current = TextureHandle::NONE;
        }
        debug!("{}: freed", entry.name);
    }

    /// Register a named atlas page at the configured size. Storage is
    /// deferred to the first partial update.
    pub fn create_atlas_page(&mut self, name: &str) -> TextureResult<TextureHandle> {
        let size = self.config.atlas_page_size;
        let page = PixelSource {
            width: size,
            height: size,
            format: SourceFormat::Rgba32,
            pixels: None,
            palette: None,
            mip_count: 0,
        };
        self.load(
            name,
            &page,
            TextureFlags::ATLAS_PAGE | TextureFlags::CLAMP | TextureFlags::NO_MIPMAP,
        )
    }

    /// Re-derive a texture from its retained source copy. The
    /// replacement is built before the old storage is released, so a
    /// failure leaves the resident texture as it was.
    pub fn reprocess(&mut self, handle: TextureHandle, op: ReprocessOp) -> TextureResult<()> {
        let Some(entry) = self.registry.get(handle) else {
            return Err(TextureError::StaleHandle {
                handle: handle.raw(),
            });
        };
        let name = entry.name.clone();
        let Some(original) = entry.original.as_ref() else {
            return Err(TextureError::NoSourceCopy { name });
        };
        if let ReprocessOp::Remap { top, bottom } = op {
            if top >= 16 || bottom >= 16 {
                return Err(TextureError::Unsupported {
                    name,
                    reason: "remap rows index a 16-row palette",
                });
            }
            if original.palette.is_none() {
                return Err(TextureError::MissingPalette { name });
            }
        }
        debug!("{name}: reprocess {op:?}");

        let Some(pristine) = self
            .registry
            .get_mut(handle)
            .and_then(|entry| entry.original.take())
        else {
            return Err(TextureError::NoSourceCopy { name });
        };
        let mut derived = pristine.clone();
        match op {
            ReprocessOp::Gamma(gamma) => apply_gamma(&mut derived, gamma),
            ReprocessOp::Remap { top, bottom } => {
                if let Some((palette, has_alpha)) = derived.palette.as_mut() {
                    let stride = if *has_alpha { 4 } else { 3 };
                    remap_palette_rows(palette, stride, top, bottom);
                }
            }
        }

        let old = self
            .registry
            .get_mut(handle)
            .and_then(|entry| entry.storage.take());
        let result = self.upload(handle, &derived.as_source());
        match result {
            Ok(()) => {
                if let Some(old) = old {
                    self.memory.free(old);
                }
                // The pristine copy stays attached for the next pass.
                if let Some(entry) = self.registry.get_mut(handle) {
                    entry.original = Some(pristine);
                }
                Ok(())
            }
            Err(error) => {
                if let Some(entry) = self.registry.get_mut(handle) {
                    entry.storage = old;
                    let fast = entry.storage.as_ref().is_some_and(|s| s.in_fast_pool());
                    entry.flags.set(TextureFlags::FAST_RESIDENT, fast);
                    if entry.storage.is_some() {
                        entry.flags.insert(TextureFlags::UPLOADED);
                    }
                    entry.original = Some(pristine);
                } else if let Some(old) = old {
                    self.memory.free(old);
                }
                Err(error)
            }
        }
    }

    /// Handle registered under `name`, if any.
    pub fn find(&self, name: &str) -> Option<TextureHandle> {
        self.registry.find(name)
    }

    pub fn is_builtin(&self, handle: TextureHandle) -> bool {
        !handle.is_none()
            && (handle == self.default_texture
                || handle == self.white_texture
                || handle == self.gray_texture
                || handle == self.black_texture
                || handle == self.particle_texture)
    }

    pub fn default_texture(&self) -> TextureHandle {
        self.default_texture
    }

    pub fn white_texture(&self) -> TextureHandle {
        self.white_texture
    }

    pub fn gray_texture(&self) -> TextureHandle {
        self.gray_texture
    }

    pub fn black_texture(&self) -> TextureHandle {
        self.black_texture
    }

    pub fn particle_texture(&self) -> TextureHandle {
        self.particle_texture
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    /// Currently bound texture.
    pub fn bound(&self) -> TextureHandle {
        self.bind.current
    }

    /// Filter chosen by the last bind.
    pub fn bound_filter(&self) -> SamplerFilter {
        self.bind.filter
    }

    /// Palette uploads performed by binds of indexed textures.
    pub fn palette_loads(&self) -> u64 {
        self.bind.palette_loads
    }

    /// Bytes live in each allocator.
    pub fn memory_used(&self) -> MemoryUsage {
        self.memory.usage()
    }

    /// Visibility flush counters.
    pub fn flush_stats(&self) -> FlushStats {
        self.memory.flush_stats()
    }

    /// Diagnostic rows for every live entry, in registry order.
    pub fn entries(&self) -> impl Iterator<Item = EntryInfo> + '_ {
        self.registry.iter().map(|(handle, entry)| EntryInfo {
            handle,
            name: entry.name.clone(),
            width: entry.width,
            height: entry.height,
            size_bytes: entry.size_bytes,
            format: entry.format,
            flags: entry.flags,
            num_mips: entry.num_mips,
        })
    }

    /// Stored bytes of a resident texture: the packed, tiled chain the
    /// sampler reads. `None` when the handle is stale or storage is
    /// still deferred.
    pub fn texture_data(&self, handle: TextureHandle) -> Option<&[u8]> {
        let entry = self.registry.get(handle)?;
        let storage = entry.storage.as_ref()?;
        Some(self.memory.slice(storage))
    }

    /// Packed 4444 palette of an indexed texture.
    pub fn palette_data(&self, handle: TextureHandle) -> Option<&[u8]> {
        self.registry.get(handle)?.palette.as_deref()
    }

    /// Planned level table of a live entry, offsets included.
    pub fn level_layout(&self, handle: TextureHandle) -> Option<MipChain> {
        let entry = self.registry.get(handle)?;
        let base = Extent {
            width: entry.width,
            height: entry.height,
        };
        Some(plan::plan_chain(base, entry.format, entry.num_mips))
    }
}

impl Drop for TextureSystem {
    fn drop(&mut self) {
        let entries = self.registry.drain();
        let released = entries.len();
        for entry in entries {
            if let Some(storage) = entry.storage {
                self.memory.free(storage);
            }
        }
        debug!("texture system shut down, {released} textures released");
    }
}

fn validate_name(name: &str) -> TextureResult<()> {
    if name.is_empty() || name.len() >= NAME_LEN_MAX {
        return Err(TextureError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn validate_source(name: &str, source: &PixelSource) -> TextureResult<()> {
    if source.width == 0
        || source.height == 0
        || source.width > SOURCE_SIZE_MAX
        || source.height > SOURCE_SIZE_MAX
    {
        return Err(TextureError::InvalidDimensions {
            width: source.width,
            height: source.height,
        });
    }
    // Levels below 1x1 cannot exist, whatever the descriptor claims.
    let deepest = source.width.max(source.height).ilog2() + 1;
    if source.mip_count > deepest {
        return Err(TextureError::InvalidMipCount {
            count: source.mip_count,
            width: source.width,
            height: source.height,
        });
    }
    if source.format.is_indexed() {
        let Some(palette) = source.palette else {
            return Err(TextureError::MissingPalette {
                name: name.to_owned(),
            });
        };
        let needed = PALETTE_ENTRIES * palette.entry_bytes();
        if palette.data.len() < needed {
            return Err(TextureError::ShortSourceBuffer {
                expected: needed,
                actual: palette.data.len(),
            });
        }
    }
    if let Some(pixels) = source.pixels {
        let expected = source.expected_bytes();
        if pixels.len() < expected {
            return Err(TextureError::ShortSourceBuffer {
                expected,
                actual: pixels.len(),
            });
        }
    }
    Ok(())
}

/// Level count the upload plans for one source.
fn plan_mip_count(source: &PixelSource, flags: TextureFlags, extent: Extent) -> u32 {
    if flags.intersects(TextureFlags::NO_MIPMAP | TextureFlags::ATLAS_PAGE)
        || source.pixels.is_none()
    {
        return 1;
    }
    if source.format.is_compressed() {
        // Precomputed levels are copied verbatim, and only while true
        // halving stays above the size floor.
        let available = source.levels_present().min(MIP_LEVELS_MAX);
        let mut count = 1;
        while count < available {
            let w = extent.width >> count;
            let h = extent.height >> count;
            if w < TEXTURE_SIZE_MIN || h < TEXTURE_SIZE_MIN {
                break;
            }
            count += 1;
        }
        return count;
    }
    plan::plan_level_count(extent)
}

/// Indexed chain: every level resamples from the base indices, then
/// tiles. No filtering, palette indices do not average.
fn upload_indexed(
    scratch: &mut Scratch,
    source: &PixelSource,
    pixels: &[u8],
    chain: &MipChain,
    dst: &mut [u8],
) {
    for level in &chain.levels {
        let texels = level.width as usize * level.height as usize;
        let out = &mut dst[level.offset..level.offset + level.bytes];
        if level.width == source.width && level.height == source.height {
            swizzle::swizzle(
                &pixels[..texels],
                out,
                level.width as usize,
                level.height as usize,
            );
        } else {
            scratch.indices.resize(texels, 0);
            resample::resample_indexed(
                pixels,
                source.width,
                source.height,
                &mut scratch.indices,
                level.width,
                level.height,
            );
            swizzle::swizzle(
                &scratch.indices,
                out,
                level.width as usize,
                level.height as usize,
            );
        }
    }
}

/// Full-color chain: normalize to RGBA, resample the base, synthesize
/// each further level from the one above, pack and tile per level.
#[allow(clippy::too_many_arguments)]
fn upload_full_color(
    scratch: &mut Scratch,
    source: &PixelSource,
    pixels: &[u8],
    chain: &MipChain,
    format: NativeFormat,
    flags: TextureFlags,
    atlas_direct: bool,
    dst: &mut [u8],
) {
    let has_alpha = flags.contains(TextureFlags::HAS_ALPHA);
    let src_texels = source.width as usize * source.height as usize;
    normalize_rgba(source.format, pixels, &mut scratch.norm, src_texels);

    if atlas_direct {
        // Raw row-major page; partial updates rely on this layout.
        pack::copy_rgba32(&scratch.norm, dst, has_alpha);
        return;
    }

    let mode = if flags.contains(TextureFlags::ALPHA_CONTRAST) {
        MipMode::AlphaContrast
    } else if flags.contains(TextureFlags::NORMAL_MAP) {
        MipMode::NormalMap
    } else {
        MipMode::Color
    };
    let tiled = !flags.contains(TextureFlags::ATLAS_PAGE);
    let packed16 = format.packed16();

    let base = chain.levels[0];
    let base_texels = base.width as usize * base.height as usize;
    scratch.level.resize(base_texels * 4, 0);
    if base.width == source.width && base.height == source.height {
        scratch.level.copy_from_slice(&scratch.norm[..base_texels * 4]);
    } else {
        resample::resample_rgba(
            &scratch.norm,
            source.width,
            source.height,
            &mut scratch.level,
            base.width,
            base.height,
            mode == MipMode::NormalMap,
        );
    }

    let mut prev = (base.width, base.height);
    for (index, level) in chain.levels.iter().enumerate() {
        let texels = level.width as usize * level.height as usize;
        if index > 0 {
            scratch.next.resize(texels * 4, 0);
            mipmap::shrink_level(
                mode,
                &scratch.level,
                prev.0,
                prev.1,
                &mut scratch.next,
                level.width,
                level.height,
            );
            mem::swap(&mut scratch.level, &mut scratch.next);
        }
        prev = (level.width, level.height);

        let out = &mut dst[level.offset..level.offset + level.bytes];
        match packed16 {
            Some(p16) => {
                if tiled {
                    scratch.packed.resize(level.bytes, 0);
                    pack::pack_rgba16(
                        p16,
                        &scratch.level[..texels * 4],
                        &mut scratch.packed,
                        has_alpha,
                    );
                    swizzle::swizzle(
                        &scratch.packed,
                        out,
                        level.width as usize * 2,
                        level.height as usize,
                    );
                } else {
                    pack::pack_rgba16(p16, &scratch.level[..texels * 4], out, has_alpha);
                }
            }
            None => {
                if tiled {
                    scratch.packed.resize(level.bytes, 0);
                    pack::copy_rgba32(&scratch.level[..texels * 4], &mut scratch.packed, has_alpha);
                    swizzle::swizzle(
                        &scratch.packed,
                        out,
                        level.width as usize * 4,
                        level.height as usize,
                    );
                } else {
                    pack::copy_rgba32(&scratch.level[..texels * 4], out, has_alpha);
                }
            }
        }
    }
}

/// 256-entry gamma curve over the color channels; alpha and index data
/// never change.
fn apply_gamma(copy: &mut OriginalCopy, gamma: f32) {
    let gamma = gamma.max(0.1);
    let mut curve = [0u8; 256];
    for (value, out) in curve.iter_mut().enumerate() {
        let level = (value as f32 / 255.0).powf(1.0 / gamma);
        *out = (level * 255.0 + 0.5).min(255.0) as u8;
    }
    match copy.format {
        SourceFormat::Indexed8 => {
            if let Some((palette, has_alpha)) = copy.palette.as_mut() {
                let stride = if *has_alpha { 4 } else { 3 };
                for row in palette.chunks_exact_mut(stride) {
                    for channel in &mut row[..3] {
                        *channel = curve[*channel as usize];
                    }
                }
            }
        }
        SourceFormat::Rgb24 | SourceFormat::Bgr24 | SourceFormat::Luminance8 => {
            for channel in copy.pixels.iter_mut() {
                *channel = curve[*channel as usize];
            }
        }
        SourceFormat::Rgba32 | SourceFormat::Bgra32 => {
            for texel in copy.pixels.chunks_exact_mut(4) {
                for channel in &mut texel[..3] {
                    *channel = curve[*channel as usize];
                }
            }
        }
        SourceFormat::Dxt1 | SourceFormat::Dxt3 | SourceFormat::Dxt5 => {}
    }
}

/// Copy palette row `top` over the shirt range and row `bottom` over the
/// pants range. Rows are 16 entries each.
fn remap_palette_rows(palette: &mut [u8], stride: usize, top: u8, bottom: u8) {
    let row = 16 * stride;
    let shirt = top as usize * row;
    palette.copy_within(shirt..shirt + row, SHIRT_ROW * row);
    let pants = bottom as usize * row;
    palette.copy_within(pants..pants + row, PANTS_ROW * row);
}

/// 16x16 magenta and black checkerboard, black in the top-left quadrant,
/// the classic missing-texture look.
fn checkerboard_pixels() -> Vec<u8> {
    const MAGENTA: [u8; 4] = [0xff, 0x00, 0xff, 0xff];
    const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xff];
    let mut texels = Vec::with_capacity(16 * 16);
    for y in 0..16u32 {
        for x in 0..16u32 {
            let texel = if ((x >> 3) ^ (y >> 3)) & 1 == 1 {
                MAGENTA
            } else {
                BLACK
            };
            texels.push(texel);
        }
    }
    bytemuck::cast_slice(&texels).to_vec()
}

/// 4x4 solid fill.
fn solid_pixels(color: [u8; 4]) -> Vec<u8> {
    bytemuck::cast_slice(&[color; 16]).to_vec()
}

/// 16x16 white dot with radial alpha falloff.
fn particle_pixels() -> Vec<u8> {
    let mut texels = Vec::with_capacity(16 * 16);
    for y in 0..16i32 {
        for x in 0..16i32 {
            let (dx, dy) = (x - 8, y - 8);
            let falloff = 255.0 - 35.0 * (((dx * dx + dy * dy) as f32).sqrt());
            texels.push([0xff, 0xff, 0xff, falloff.clamp(0.0, 255.0) as u8]);
        }
    }
    bytemuck::cast_slice(&texels).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Palette;

    fn system() -> TextureSystem {
        TextureSystem::new(TextureConfig::default()).unwrap()
    }

    fn gradient_rgba(width: u32, height: u32) -> Vec<u8> {
        (0..width as usize * height as usize)
            .flat_map(|i| [(i % 251) as u8, (i % 127) as u8, 33, 0xff])
            .collect()
    }

    #[test]
    fn builtins_register_at_startup() {
        let sys = system();
        for name in ["*default", "*white", "*gray", "*black", "*particle"] {
            let handle = sys.find(name).unwrap();
            assert!(sys.texture_data(handle).is_some(), "{name}");
        }
    }

    #[test]
    fn default_checkerboard_packs_black_then_magenta_565() {
        let sys = system();
        let data = sys.texture_data(sys.default_texture()).unwrap();
        // Tiled order: the black top-left quadrant fills the first tile,
        // then the magenta quadrant beside it, 0xf81f little-endian.
        assert_eq!(&data[..4], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&data[128..132], &[0x1f, 0xf8, 0x1f, 0xf8]);
    }

    #[test]
    fn stale_binds_fall_back_to_the_default() {
        let mut sys = system();
        assert_eq!(sys.bind(TextureHandle::NONE), sys.default_texture());

        let pixels = gradient_rgba(16, 16);
        let handle = sys
            .load("brick", &PixelSource::rgba(16, 16, &pixels), TextureFlags::empty())
            .unwrap();
        sys.free(handle);
        assert_eq!(sys.bind(handle), sys.default_texture());
    }

    #[test]
    fn filters_follow_flags_and_chain_length() {
        let mut sys = system();
        let pixels = gradient_rgba(64, 64);
        let mipped = sys
            .load("floor", &PixelSource::rgba(64, 64, &pixels), TextureFlags::empty())
            .unwrap();
        sys.bind(mipped);
        assert_eq!(sys.bound_filter(), SamplerFilter::LinearMipmapLinear);

        let flat = sys
            .load(
                "hud",
                &PixelSource::rgba(64, 64, &pixels),
                TextureFlags::NO_MIPMAP | TextureFlags::NEAREST,
            )
            .unwrap();
        sys.bind(flat);
        assert_eq!(sys.bound_filter(), SamplerFilter::Nearest);
    }

    #[test]
    fn indexed_binds_count_palette_loads_once() {
        let mut sys = system();
        let indices = vec![0u8; 32 * 32];
        let rows: Vec<u8> = (0..256u32).flat_map(|i| [i as u8, 0, 0]).collect();
        let palette = Palette { data: &rows, has_alpha: false };
        let handle = sys
            .load(
                "wall",
                &PixelSource::indexed(32, 32, &indices, palette),
                TextureFlags::empty(),
            )
            .unwrap();
        sys.bind(handle);
        sys.bind(handle);
        assert_eq!(sys.palette_loads(), 1);
        assert_eq!(sys.palette_data(handle).unwrap().len(), PALETTE_BYTES);
    }

    #[test]
    fn atlas_pages_materialize_on_first_write() {
        let mut sys = system();
        let page = sys.create_atlas_page("*lightmap0").unwrap();
        assert!(sys.texture_data(page).is_none());

        let rows = vec![0xffu8; 4 * 4 * 4];
        sys.update_partial(page, 0, 0, 4, 4, &rows).unwrap();
        let size = sys.config().atlas_page_size as usize;
        assert_eq!(sys.texture_data(page).unwrap().len(), size * size * 2);
    }

    #[test]
    fn builtin_textures_refuse_to_free() {
        let mut sys = system();
        sys.free(sys.default_texture());
        assert!(sys.find("*default").is_some());
    }

    #[test]
    fn loading_a_registered_name_returns_the_same_handle() {
        let mut sys = system();
        let pixels = gradient_rgba(32, 32);
        let source = PixelSource::rgba(32, 32, &pixels);
        let first = sys.load("decal", &source, TextureFlags::empty()).unwrap();
        let used = sys.memory_used();
        let second = sys.load("decal", &source, TextureFlags::empty()).unwrap();
        assert_eq!(first, second);
        assert_eq!(sys.memory_used().fast_pool_bytes, used.fast_pool_bytes);
    }

    #[test]
    fn update_of_unknown_name_is_fatal() {
        let mut sys = system();
        let pixels = gradient_rgba(16, 16);
        let err = sys
            .load_or_update(
                "ghost",
                &PixelSource::rgba(16, 16, &pixels),
                TextureFlags::empty(),
                true,
            )
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn gamma_reprocess_brightens_kept_sources() {
        let mut sys = system();
        let pixels = vec![64u8; 16 * 16 * 4];
        let handle = sys
            .load(
                "lamp",
                &PixelSource::rgba(16, 16, &pixels),
                TextureFlags::KEEP_SOURCE,
            )
            .unwrap();
        let before = sys.texture_data(handle).unwrap().to_vec();
        sys.reprocess(handle, ReprocessOp::Gamma(2.2)).unwrap();
        let after = sys.texture_data(handle).unwrap().to_vec();
        assert_ne!(before, after);
        // 64 lifts to 255 * (64/255)^(1/2.2) = 136; the 565 red field
        // keeps its top five bits.
        let word = u16::from_le_bytes([after[0], after[1]]);
        assert_eq!(word & 0x1f, 136 >> 3);
    }

    #[test]
    fn remap_recolors_the_shirt_range() {
        let mut sys = system();
        let indices: Vec<u8> = (0..32usize * 32).map(|i| (i % 256) as u8).collect();
        let rows: Vec<u8> = (0..=255u8).flat_map(|i| [i, i, i]).collect();
        let palette = Palette { data: &rows, has_alpha: false };
        let handle = sys
            .load(
                "player",
                &PixelSource::indexed(32, 32, &indices, palette),
                TextureFlags::KEEP_SOURCE,
            )
            .unwrap();
        sys.reprocess(handle, ReprocessOp::Remap { top: 4, bottom: 9 })
            .unwrap();
        // Entry 16 now holds row 4's first color, gray 64.
        let packed = sys.palette_data(handle).unwrap();
        let word = u16::from_le_bytes([packed[32], packed[33]]);
        let expected = (0xfu16 << 12) | ((64u16 >> 4) << 8) | ((64u16 >> 4) << 4) | (64u16 >> 4);
        assert_eq!(word, expected);
    }

    #[test]
    fn reprocess_without_kept_source_is_recoverable() {
        let mut sys = system();
        let pixels = gradient_rgba(16, 16);
        let handle = sys
            .load("crate", &PixelSource::rgba(16, 16, &pixels), TextureFlags::empty())
            .unwrap();
        let err = sys.reprocess(handle, ReprocessOp::Gamma(1.8)).unwrap_err();
        assert!(!err.is_fatal());
        assert!(sys.texture_data(handle).is_some());
    }
}
