//! World generation pipeline.
//!
//! Generation runs in two phases:
//! 1. World bootstrap: every chunk of the grid is spawned in `Placed` state
//!    and recorded in the chunk map ([`WorldSystem`]).
//! 2. Chunk pass: chunks get their world position, then are populated with
//!    voxel entities indexed in the voxel map ([`ChunkSystem`]).
//!
//! [`VoxelTerrain`] runs both phases as one explicit initialization step and
//! exposes a per-tick `update` for the host loop.

pub mod config;
pub mod chunk_system;

pub use config::{GenerationConfig, PrefabNames, WorldConfig};
pub use chunk_system::{ChunkSystem, PassStats};

use glam::Vec3;
use hecs::{Entity, World};

use crate::core::Result;
use crate::voxel::chunk::ChunkCoord;
use crate::voxel::world::WorldSystem;

/// Bootstrapped terrain: owns the chunk map (via [`WorldSystem`]) and the
/// voxel map (via [`ChunkSystem`]).
pub struct VoxelTerrain {
    world: WorldSystem,
    chunks: ChunkSystem,
}

impl VoxelTerrain {
    /// Spawn a world from `config` into `ecs` and initialize it.
    pub fn from_config(ecs: &mut World, config: &WorldConfig) -> Result<(Self, PassStats)> {
        config.spawn_world(ecs)?;
        Self::initialize(ecs, &config.generation)
    }

    /// Bootstrap the world already present in `ecs` and run the first chunk
    /// pass.
    ///
    /// Fails if `ecs` holds no world record, more than one, a record whose
    /// backing entity is gone, or a record with invalid dimensions. A world
    /// that was already initialized spawns nothing: both maps are rebuilt
    /// from its existing chunks and voxels.
    pub fn initialize(ecs: &mut World, config: &GenerationConfig) -> Result<(Self, PassStats)> {
        let world = WorldSystem::bootstrap(ecs)?;
        let mut chunks = ChunkSystem::new(world.world(), config.terrain_params.clone())?
            .with_parallel(config.parallel);
        chunks.reindex(ecs, &world)?;
        let stats = chunks.run(ecs, &world)?;

        Ok((Self { world, chunks }, stats))
    }

    /// Per-tick entry point. Advances any chunk that is not yet populated;
    /// a no-op once the whole grid is populated.
    pub fn update(&mut self, ecs: &mut World) -> Result<PassStats> {
        self.chunks.run(ecs, &self.world)
    }

    pub fn world(&self) -> &WorldSystem {
        &self.world
    }

    pub fn chunk_system(&self) -> &ChunkSystem {
        &self.chunks
    }

    /// Chunk entity at grid coordinate `coord`
    pub fn chunk_at(&self, coord: ChunkCoord) -> Option<Entity> {
        self.world.chunk_at(coord)
    }

    /// Voxel entity occupying the world-space position `pos`
    pub fn voxel_at(&self, pos: Vec3) -> Option<Entity> {
        let slot = self.world.world().voxel_slot_at(pos, self.world.origin())?;
        self.chunks.voxel_at_slot(slot)
    }

    /// Number of voxels indexed in the voxel map
    pub fn voxel_count(&self) -> usize {
        self.chunks
            .voxel_map()
            .iter()
            .filter(|(_, v)| v.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::voxel::chunk::{ChunkState, VoxelChunk};
    use crate::voxel::voxel::{Material, Position, Voxel};
    use crate::voxel::world::VoxelWorld;
    use glam::UVec3;
    use std::collections::HashSet;

    fn config(max_chunks: u32, size: UVec3) -> WorldConfig {
        WorldConfig {
            max_chunks,
            chunk_size: size,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_builds_complete_world() {
        let mut ecs = World::new();
        let (terrain, stats) = VoxelTerrain::from_config(&mut ecs, &config(3, UVec3::splat(3))).unwrap();

        assert_eq!(stats.positioned, 9);
        assert_eq!(stats.populated, 9);
        assert_eq!(terrain.world().chunk_count(), 9);
        assert_eq!(terrain.voxel_count(), stats.voxels);
        assert_eq!(ecs.query::<&Voxel>().iter().count(), stats.voxels);

        let coords: HashSet<_> = ecs
            .query::<&VoxelChunk>()
            .iter()
            .map(|(_, c)| {
                assert_eq!(c.state, ChunkState::Populated);
                c.coord
            })
            .collect();
        assert_eq!(coords.len(), 9);
    }

    #[test]
    fn test_update_after_initialize_is_noop() {
        let mut ecs = World::new();
        let (mut terrain, _) = VoxelTerrain::from_config(&mut ecs, &config(2, UVec3::new(4, 8, 4))).unwrap();
        let entities = ecs.len();

        for _ in 0..3 {
            assert_eq!(terrain.update(&mut ecs).unwrap(), PassStats::default());
        }
        assert_eq!(ecs.len(), entities);
    }

    #[test]
    fn test_initialize_without_world_fails() {
        let mut ecs = World::new();
        let result = VoxelTerrain::initialize(&mut ecs, &GenerationConfig::default());
        assert!(matches!(result, Err(Error::MissingWorld)));
        assert_eq!(ecs.len(), 0);
    }

    #[test]
    fn test_second_initialize_spawns_nothing() {
        let mut ecs = World::new();
        let (first, _) = VoxelTerrain::from_config(&mut ecs, &config(3, UVec3::splat(3))).unwrap();
        let entities = ecs.len();

        let (second, stats) = VoxelTerrain::initialize(&mut ecs, &GenerationConfig::default()).unwrap();
        assert_eq!(stats, PassStats::default());
        assert_eq!(ecs.len(), entities);
        assert_eq!(ecs.query::<&VoxelChunk>().iter().count(), 9);
        assert_eq!(second.voxel_count(), first.voxel_count());

        let pos = Vec3::new(-0.5, 0.5, -0.5);
        assert!(second.voxel_at(pos).is_some());
        assert_eq!(second.voxel_at(pos), first.voxel_at(pos));
        assert_eq!(second.chunk_at(ChunkCoord::new(2, 2)), first.chunk_at(ChunkCoord::new(2, 2)));
    }

    #[test]
    fn test_initialize_rejects_invalid_world_record() {
        let mut ecs = World::new();
        let entity = config(3, UVec3::splat(3)).spawn_world(&mut ecs).unwrap();
        ecs.get::<&mut VoxelWorld>(entity).unwrap().max_chunks = 0;

        let result = VoxelTerrain::initialize(&mut ecs, &GenerationConfig::default());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert_eq!(ecs.query::<&VoxelChunk>().iter().count(), 0);
    }

    #[test]
    fn test_voxel_at_world_position() {
        let mut ecs = World::new();
        let (terrain, _) = VoxelTerrain::from_config(&mut ecs, &config(3, UVec3::splat(3))).unwrap();

        // Center chunk (1, 1) sits at (-1, 0, -1); its bottom cell is always filled
        let entity = terrain.voxel_at(Vec3::new(-0.5, 0.5, -0.5)).unwrap();
        let voxel = *ecs.get::<&Voxel>(entity).unwrap();
        assert_eq!(voxel.chunk, terrain.chunk_at(ChunkCoord::new(1, 1)).unwrap());
        assert_eq!(voxel.local, UVec3::ZERO);
        assert_eq!(ecs.get::<&Position>(entity).unwrap().0, Vec3::new(-1.0, 0.0, -1.0));

        assert_eq!(terrain.voxel_at(Vec3::new(100.0, 0.0, 0.0)), None);
        assert_eq!(terrain.voxel_at(Vec3::new(0.0, -1.0, 0.0)), None);
    }

    #[test]
    fn test_every_voxel_is_reachable_by_position() {
        let mut ecs = World::new();
        let cfg = WorldConfig {
            origin: Vec3::new(7.0, 3.0, -12.0),
            ..config(2, UVec3::new(4, 10, 4))
        };
        let (terrain, _) = VoxelTerrain::from_config(&mut ecs, &cfg).unwrap();

        for (entity, (_, position)) in ecs.query::<(&Voxel, &Position)>().iter() {
            let center = position.0 + Vec3::splat(0.5);
            assert_eq!(terrain.voxel_at(center), Some(entity));
        }
    }

    #[test]
    fn test_small_chunks_cap_with_grass() {
        // Chunk height 3 => offset 1, earth level 5: each column is earth
        // except for its top cell, clipped to the chunk height
        let mut ecs = World::new();
        let (terrain, _) = VoxelTerrain::from_config(&mut ecs, &config(3, UVec3::splat(3))).unwrap();
        let generator = terrain.chunk_system().generator();

        for (_, (voxel, material, position)) in ecs.query::<(&Voxel, &Material, &Position)>().iter() {
            let height = generator.column_height(position.0.x as f64, position.0.z as f64, 3);
            let expected = if voxel.local.y + 1 == height { Material::Grass } else { Material::Earth };
            assert_eq!(*material, expected);
        }
    }

    #[test]
    fn test_generation_is_deterministic_across_worlds() {
        let collect = || {
            let mut ecs = World::new();
            let cfg = config(2, UVec3::new(6, 12, 6));
            VoxelTerrain::from_config(&mut ecs, &cfg).unwrap();
            let mut cells: Vec<_> = ecs
                .query::<(&Material, &Position)>()
                .iter()
                .map(|(_, (m, p))| (p.0.to_array().map(|v| v as i32), m.code()))
                .collect();
            cells.sort();
            cells
        };

        assert_eq!(collect(), collect());
    }
}
