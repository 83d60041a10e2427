//! Headless world generator.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Load a JSON world config (defaults are used otherwise)
//!   --max-chunks <N>      Chunks per grid axis
//!   --chunk-size <WxHxD>  Chunk dimensions in voxels, e.g. 16x32x16
//!   --seed <SEED>         Terrain noise seed offset
//!   --parallel            Build chunk profiles on the rayon pool
//!   --jobs <N>            Rayon worker threads (with --parallel)
//!   --save <PATH>         Write the effective config as JSON

use std::path::PathBuf;
use std::time::Instant;

use glam::UVec3;
use voxfield::core::{logging, Result};
use voxfield::generation::{VoxelTerrain, WorldConfig};
use voxfield::voxel::{Material, Voxel};

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("World generation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => WorldConfig::load_sync(&PathBuf::from(path))?,
        None => WorldConfig::default(),
    };
    if let Some(m) = parse_u32_arg(&args, "--max-chunks") {
        config.max_chunks = m;
    }
    if let Some(size) = parse_str_arg(&args, "--chunk-size").and_then(|s| parse_size(&s)) {
        config.chunk_size = size;
    }
    if let Some(seed) = parse_f64_arg(&args, "--seed") {
        config.generation.terrain_params.seed = seed;
    }
    if args.iter().any(|a| a == "--parallel") {
        config.generation.parallel = true;
    }
    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            log::warn!("Could not configure thread pool: {}", e);
        }
    }
    config.validate()?;

    if let Some(path) = parse_str_arg(&args, "--save") {
        config.save_sync(&PathBuf::from(&path))?;
        log::info!("Saved config to {}", path);
    }

    println!("=== voxfield World Generator ===");
    println!("World:  {}", config.world_id);
    println!("Grid:   {} x {} chunks", config.max_chunks, config.max_chunks);
    println!("Chunk:  {}", config.chunk_size);
    println!("Seed:   {}", config.generation.terrain_params.seed);
    println!("Origin: {}", config.origin);
    println!();

    let start = Instant::now();
    let mut ecs = hecs::World::new();
    let (mut terrain, stats) = VoxelTerrain::from_config(&mut ecs, &config)?;
    let elapsed = start.elapsed().as_secs_f64();

    // One host tick after initialization, as the update loop would run it
    let tick = terrain.update(&mut ecs)?;
    debug_assert_eq!(tick.voxels, 0);

    let mut grass = 0usize;
    let mut earth = 0usize;
    for (_, (_, material)) in ecs.query::<(&Voxel, &Material)>().iter() {
        match material {
            Material::Grass => grass += 1,
            Material::Earth => earth += 1,
            Material::Empty => {}
        }
    }

    println!("Chunks: {} positioned, {} populated", stats.positioned, stats.populated);
    println!("Voxels: {} ({} grass, {} earth)", stats.voxels, grass, earth);
    println!("Indexed: {}", terrain.voxel_count());
    println!(
        "Time:   {:.3}s ({:.0} chunks/sec)",
        elapsed,
        stats.populated as f64 / elapsed.max(1e-9)
    );
    Ok(())
}

fn parse_size(s: &str) -> Option<UVec3> {
    let parts: Vec<u32> = s.split('x').map(|p| p.trim().parse().ok()).collect::<Option<_>>()?;
    match parts.as_slice() {
        [w, h, d] => Some(UVec3::new(*w, *h, *d)),
        [n] => Some(UVec3::splat(*n)),
        _ => None,
    }
}

fn parse_f64_arg(args: &[String], flag: &str) -> Option<f64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
