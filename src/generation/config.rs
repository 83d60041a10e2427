//! World and generation configuration.

use std::path::Path;

use glam::{UVec3, Vec3};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::terrain::generator::TerrainParams;
use crate::voxel::prefab::{spawn_chunk_prefab, spawn_voxel_prefab};
use crate::voxel::voxel::Material;
use crate::voxel::world::{validate_dimensions, VoxelWorld};

/// Configuration for the chunk population pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Terrain noise parameters.
    pub terrain_params: TerrainParams,
    /// Compute chunk material profiles on the rayon pool. Voxel spawning
    /// stays on the calling thread either way.
    pub parallel: bool,
}

/// Names of the prefab entities spawned for a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabNames {
    pub chunk: String,
    pub grass: String,
    pub earth: String,
}

impl Default for PrefabNames {
    fn default() -> Self {
        Self {
            chunk: "chunk".to_string(),
            grass: "voxel_grass".to_string(),
            earth: "voxel_earth".to_string(),
        }
    }
}

/// Authoring-time description of a voxel world. Read-only once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Stable identifier of the world.
    pub world_id: i32,
    /// View radius in chunks. Stored for streaming, not consulted by generation.
    pub render_distance: i32,
    /// Chunks per grid axis.
    pub max_chunks: u32,
    /// Chunk dimensions in voxels (width, height, depth).
    pub chunk_size: UVec3,
    /// World-space position the chunk grid is centered on.
    pub origin: Vec3,
    pub prefabs: PrefabNames,
    pub generation: GenerationConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_id: 0,
            render_distance: 5,
            max_chunks: 3,
            chunk_size: UVec3::splat(3),
            origin: Vec3::ZERO,
            prefabs: PrefabNames::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Check the invariants the generation pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        validate_dimensions(self.max_chunks, self.chunk_size)?;
        let frequency = self.generation.terrain_params.frequency;
        if !frequency.is_finite() || frequency == 0.0 {
            return Err(Error::InvalidConfig(format!("invalid noise frequency {}", frequency)));
        }
        if !self.origin.is_finite() {
            return Err(Error::InvalidConfig("origin must be finite".into()));
        }
        Ok(())
    }

    /// Validate this config and spawn its prefabs and world entity into `ecs`.
    ///
    /// Returns the world entity, which carries `VoxelWorld` and `Position`.
    /// Nothing is spawned when validation fails.
    pub fn spawn_world(&self, ecs: &mut World) -> Result<Entity> {
        self.validate()?;

        let grass = spawn_voxel_prefab(ecs, &self.prefabs.grass, Material::Grass);
        let earth = spawn_voxel_prefab(ecs, &self.prefabs.earth, Material::Earth);
        let record = VoxelWorld {
            entity: Entity::DANGLING,
            chunk_prefab: spawn_chunk_prefab(ecs, &self.prefabs.chunk, grass, earth),
            render_distance: self.render_distance,
            max_chunks: self.max_chunks,
            chunk_size: self.chunk_size,
            world_id: self.world_id,
        };
        record.spawn(ecs, self.origin)
    }

    /// Load and validate a JSON config file.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: WorldConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config as pretty JSON.
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
