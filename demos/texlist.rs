//! Prints the texture listing of a freshly populated system, the way the
//! legacy `texlist` console command did. Image paths given on the command
//! line are decoded and loaded; without arguments a synthetic demo set is
//! used.

use color_eyre::Result;
use vexel::{Palette, PixelSource, ReprocessOp, TextureConfig, TextureFlags, TextureSystem};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let mut system = TextureSystem::new(TextureConfig::default())?;

    let mut loaded_any = false;
    for path in std::env::args().skip(1) {
        let decoded = image::open(&path)?.to_rgba8();
        let source = PixelSource::rgba(decoded.width(), decoded.height(), decoded.as_raw());
        system.load(&path, &source, TextureFlags::HAS_ALPHA)?;
        loaded_any = true;
    }
    if !loaded_any {
        load_demo_set(&mut system)?;
    }

    println!(
        "{:>4}  {:<20} {:>9}  {:<4} {:>4} {:>9}  flags",
        "id", "name", "size", "fmt", "mips", "bytes"
    );
    for entry in system.entries() {
        println!(
            "{:>4}  {:<20} {:>4}x{:<4}  {:<4} {:>4} {:>9}  {:?}",
            entry.handle.raw(),
            entry.name,
            entry.width,
            entry.height,
            entry.format.tag(),
            entry.num_mips,
            entry.size_bytes,
            entry.flags,
        );
    }

    let usage = system.memory_used();
    let flush = system.flush_stats();
    println!();
    println!(
        "{} textures, {} KiB fast pool, {} KiB heap, {} flushes ({} KiB)",
        system.entries().count(),
        usage.fast_pool_bytes / 1024,
        usage.heap_bytes / 1024,
        flush.calls,
        flush.bytes / 1024,
    );
    Ok(())
}

/// A few textures that exercise each pipeline path.
fn load_demo_set(system: &mut TextureSystem) -> Result<()> {
    let bricks = checkered(256, 256, [174, 74, 52, 255], [118, 48, 32, 255]);
    let handle = system.load(
        "demo/bricks",
        &PixelSource::rgba(256, 256, &bricks),
        TextureFlags::KEEP_SOURCE,
    )?;
    system.reprocess(handle, ReprocessOp::Gamma(1.4))?;

    let glass = checkered(64, 64, [200, 220, 255, 96], [160, 190, 235, 140]);
    system.load(
        "demo/glass",
        &PixelSource::rgba(64, 64, &glass),
        TextureFlags::HAS_ALPHA,
    )?;

    let indices: Vec<u8> = (0..128usize * 128).map(|i| (i % 256) as u8).collect();
    let rows: Vec<u8> = (0..=255u8).flat_map(|i| [i, i / 2, 0]).collect();
    let palette = Palette { data: &rows, has_alpha: false };
    system.load(
        "demo/fire",
        &PixelSource::indexed(128, 128, &indices, palette),
        TextureFlags::empty(),
    )?;

    let page = system.create_atlas_page("*lightmap0")?;
    let glow: Vec<u8> = (0..16usize * 16)
        .flat_map(|i| {
            let v = (i * 255 / (16 * 16)) as u8;
            [v, v, v, 255]
        })
        .collect();
    system.update_partial(page, 8, 8, 16, 16, &glow)?;
    Ok(())
}

fn checkered(width: u32, height: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            out.extend_from_slice(if (x / 8 + y / 8) % 2 == 0 { &a } else { &b });
        }
    }
    out
}
