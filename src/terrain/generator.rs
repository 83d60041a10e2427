//! Noise-based height field terrain with two material layers

use glam::{UVec3, Vec3};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::math::Grid3;
use crate::voxel::chunk::MAX_CHUNK_HEIGHT;
use crate::voxel::voxel::Material;

/// Fixed vertical span of a generated material profile
pub const MAX_HEIGHT_SPAN: u32 = MAX_CHUNK_HEIGHT;

/// Per-chunk material profile, dims `(size.x, MAX_HEIGHT_SPAN, size.z)`
pub type MaterialGrid = Grid3<Material>;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: f64,             // Added to Z before sampling
    pub permutation_seed: u32, // Perlin permutation table seed
    pub bias: f64,             // Keeps samples away from negative coordinates
    pub frequency: f64,        // Horizontal scale (larger = smoother)
    pub amplitude: f64,        // Height variation in voxels
    pub surface_depth: i32,    // Headroom below the chunk top, also min earth level
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 99.0,
            permutation_seed: 0,
            bias: 1_000_000.0,
            frequency: 10.0,
            amplitude: 5.0,
            surface_depth: 5,
        }
    }
}

/// Procedural height field generator
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Perlin,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given parameters
    pub fn new(params: TerrainParams) -> Self {
        let noise = Perlin::new(params.permutation_seed);
        Self { params, noise }
    }

    /// Get terrain parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Noise value in `[0, 1]` for the world-space column `(x, z)`
    pub fn noise_at(&self, x: f64, z: f64) -> f64 {
        let p = &self.params;
        let nx = (p.bias + x) / p.frequency;
        let nz = (p.seed + p.bias + z) / p.frequency;

        // Perlin output is roughly [-1, 1]
        ((self.noise.get([nx, nz]) + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Base level the noise is added to: `clamp(chunk_height - surface_depth, 1, chunk_height)`
    pub fn base_offset(&self, chunk_height: u32) -> i32 {
        let h = chunk_height as i32;
        (h - self.params.surface_depth).min(h).max(1)
    }

    /// Level below which non-surface cells are earth
    pub fn earth_level(&self, chunk_height: u32) -> i32 {
        self.params.surface_depth.max(self.base_offset(chunk_height))
    }

    /// Number of filled cells in the column at world `(x, z)`
    pub fn column_height(&self, x: f64, z: f64, chunk_height: u32) -> u32 {
        let offset = self.base_offset(chunk_height) as f64;
        let h = (self.noise_at(x, z) * self.params.amplitude + offset).floor();
        h.max(0.0) as u32
    }

    /// Generate the material profile for a chunk whose origin is `origin`.
    ///
    /// Columns are filled from y = 0 up to their height: earth below the
    /// earth level, grass above it, and the topmost cell is always grass.
    pub fn generate(&self, origin: Vec3, chunk_size: UVec3) -> MaterialGrid {
        let mut grid = Grid3::new(
            UVec3::new(chunk_size.x, MAX_HEIGHT_SPAN, chunk_size.z),
            Material::Empty,
        );
        let level = self.earth_level(chunk_size.y);

        for x in 0..chunk_size.x {
            for z in 0..chunk_size.z {
                let wx = origin.x as f64 + x as f64;
                let wz = origin.z as f64 + z as f64;
                let height = self.column_height(wx, wz, chunk_size.y);

                for y in 0..height.min(MAX_HEIGHT_SPAN) {
                    grid.set(UVec3::new(x, y, z), material_at(y, height, level));
                }
            }
        }

        grid
    }
}

/// Material of cell `y` in a column of `height` filled cells
fn material_at(y: u32, height: u32, earth_level: i32) -> Material {
    let y = y as i64;
    if y < earth_level as i64 && y < height as i64 - 1 {
        Material::Earth
    } else {
        Material::Grass
    }
}
