//! Chunk lifecycle: commits chunk positions and populates chunks with voxels.

use glam::{UVec3, Vec3};
use hecs::{Entity, World};
use rayon::prelude::*;

use crate::core::{Error, Result};
use crate::math::Grid3;
use crate::terrain::generator::{MaterialGrid, TerrainGenerator, TerrainParams};
use crate::voxel::chunk::{ChunkCoord, ChunkState, VoxelChunk};
use crate::voxel::prefab;
use crate::voxel::voxel::{Material, Position, Voxel};
use crate::voxel::world::{VoxelWorld, WorldSystem};

/// Counters for one chunk pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Chunks moved from `Placed` to `Positioned`
    pub positioned: usize,
    /// Chunks moved from `Positioned` to `Populated`
    pub populated: usize,
    /// Voxel entities spawned
    pub voxels: usize,
}

/// Staged copy of a chunk, mutated during a pass and committed afterwards
struct StagedChunk {
    entity: Entity,
    chunk: VoxelChunk,
    position: Position,
}

/// Drives chunks through `Placed -> Positioned -> Populated` and owns the
/// voxel map.
///
/// The voxel map is indexed by grid-relative voxel coordinates:
/// `(chunk.x * size.x + x, y, chunk.z * size.z + z)`. Chunks cover disjoint
/// slot ranges, so each slot is written at most once.
pub struct ChunkSystem {
    generator: TerrainGenerator,
    voxel_map: Grid3<Option<Entity>>,
    parallel: bool,
}

impl ChunkSystem {
    /// Allocate the voxel map for `world`.
    ///
    /// Fails with `InvalidConfig` if the record's dimensions cannot back a
    /// voxel map.
    pub fn new(world: &VoxelWorld, params: TerrainParams) -> Result<Self> {
        world.validate()?;
        Ok(Self {
            generator: TerrainGenerator::new(params),
            voxel_map: Grid3::new(world.voxel_map_dims(), None),
            parallel: false,
        })
    }

    /// Compute chunk material profiles on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn voxel_map(&self) -> &Grid3<Option<Entity>> {
        &self.voxel_map
    }

    /// Voxel entity at a grid-relative voxel slot, `None` if empty or outside
    pub fn voxel_at_slot(&self, slot: UVec3) -> Option<Entity> {
        self.voxel_map.try_get(slot).copied().flatten()
    }

    /// Index every voxel already spawned for `world`. Returns the number of
    /// voxels indexed.
    pub fn reindex(&mut self, ecs: &World, world: &WorldSystem) -> Result<usize> {
        let size = world.world().chunk_size;
        let mut count = 0;
        let mut query = ecs.query::<&Voxel>();
        for (entity, voxel) in query.iter().filter(|(_, v)| v.world == world.world().entity) {
            let coord = ecs.get::<&VoxelChunk>(voxel.chunk)?.coord;
            if !voxel.local.cmplt(size).all() || !world.chunk_map().contains(coord.as_uvec2()) {
                return Err(Error::InconsistentChunk(coord));
            }
            let slot = voxel_slot(coord, size, voxel.local);
            self.voxel_map.set(slot, Some(entity));
            count += 1;
        }
        if count > 0 {
            log::debug!("Reindexed {} existing voxels", count);
        }
        Ok(count)
    }

    /// Run one pass over every chunk in the world.
    ///
    /// Chunks are snapshotted first, advanced on the copies, then written
    /// back. Chunks already populated are left untouched, so repeated passes
    /// are no-ops once the world is complete.
    pub fn run(&mut self, ecs: &mut World, world: &WorldSystem) -> Result<PassStats> {
        let mut stats = PassStats::default();
        let mut staged: Vec<StagedChunk> = ecs
            .query::<(&VoxelChunk, &Position)>()
            .iter()
            .filter(|(_, (chunk, _))| chunk.world == world.world().entity)
            .map(|(entity, (chunk, position))| StagedChunk {
                entity,
                chunk: *chunk,
                position: *position,
            })
            .collect();
        staged.sort_by_key(|s| s.chunk.coord);

        for s in staged.iter_mut().filter(|s| s.chunk.state.needs_position_update()) {
            let origin = world.world().chunk_origin(s.chunk.coord, world.origin());
            s.position = Position(origin);
            s.chunk.state.advance(ChunkState::Positioned)?;
            commit(ecs, s)?;
            stats.positioned += 1;
        }

        let pending: Vec<&mut StagedChunk> = staged
            .iter_mut()
            .filter(|s| s.chunk.state.is_initialized() && !s.chunk.state.is_populated())
            .collect();
        let profiles = self.profiles(world.world(), &pending);

        for (s, profile) in pending.into_iter().zip(profiles) {
            stats.voxels += self.spawn_voxels(ecs, world.world(), s, &profile)?;
            s.chunk.state.advance(ChunkState::Populated)?;
            commit(ecs, s)?;
            stats.populated += 1;
        }

        if stats != PassStats::default() {
            log::info!(
                "Chunk pass: {} positioned, {} populated, {} voxels",
                stats.positioned, stats.populated, stats.voxels
            );
        }
        Ok(stats)
    }

    /// Populate a single chunk. Returns the number of voxels spawned.
    ///
    /// No-op (returns 0) unless the chunk is `Positioned`.
    pub fn populate_chunk(
        &mut self,
        ecs: &mut World,
        world: &WorldSystem,
        entity: Entity,
    ) -> Result<usize> {
        let mut staged = StagedChunk {
            entity,
            chunk: *ecs.get::<&VoxelChunk>(entity)?,
            position: *ecs.get::<&Position>(entity)?,
        };
        if staged.chunk.state != ChunkState::Positioned {
            return Ok(0);
        }

        let profile = self.generator.generate(staged.position.0, world.world().chunk_size);
        let count = self.spawn_voxels(ecs, world.world(), &staged, &profile)?;
        staged.chunk.state.advance(ChunkState::Populated)?;
        commit(ecs, &staged)?;
        Ok(count)
    }

    /// Material profiles for `pending`, in order
    fn profiles(&self, world: &VoxelWorld, pending: &[&mut StagedChunk]) -> Vec<MaterialGrid> {
        let size = world.chunk_size;
        let origins: Vec<Vec3> = pending.iter().map(|s| s.position.0).collect();
        if self.parallel {
            origins
                .par_iter()
                .map(|&origin| self.generator.generate(origin, size))
                .collect()
        } else {
            origins
                .iter()
                .map(|&origin| self.generator.generate(origin, size))
                .collect()
        }
    }

    /// Spawn one voxel per non-empty cell in the chunk's height range and
    /// index it in the voxel map.
    ///
    /// Both voxel templates are resolved before the first spawn, so a missing
    /// template leaves the ECS and the voxel map untouched.
    fn spawn_voxels(
        &mut self,
        ecs: &mut World,
        world: &VoxelWorld,
        staged: &StagedChunk,
        profile: &MaterialGrid,
    ) -> Result<usize> {
        let size = world.chunk_size;
        let chunk = &staged.chunk;
        let grass = prefab::voxel_template(ecs, chunk.grass_prefab)?;
        let earth = prefab::voxel_template(ecs, chunk.earth_prefab)?;
        let mut count = 0;

        for x in 0..size.x {
            for y in 0..size.y {
                for z in 0..size.z {
                    let local = UVec3::new(x, y, z);
                    let template = match profile[local] {
                        Material::Grass => grass,
                        Material::Earth => earth,
                        Material::Empty => continue,
                    };

                    let voxel = Voxel::new(chunk.world, staged.entity, local);
                    let position = Position(staged.position.0 + local.as_vec3());
                    let entity = prefab::instantiate_voxel(ecs, template, voxel, position);

                    self.voxel_map.set(voxel_slot(chunk.coord, size, local), Some(entity));
                    count += 1;
                }
            }
        }

        log::debug!(
            "Populated chunk {:?} at {}: {} voxels",
            chunk.coord, staged.position.0, count
        );
        Ok(count)
    }
}

/// Grid-relative voxel map slot of `local` inside the chunk at `coord`
fn voxel_slot(coord: ChunkCoord, size: UVec3, local: UVec3) -> UVec3 {
    UVec3::new(coord.x * size.x + local.x, local.y, coord.z * size.z + local.z)
}

/// Write a staged chunk back to its entity
fn commit(ecs: &mut World, staged: &StagedChunk) -> Result<()> {
    *ecs.get::<&mut Position>(staged.entity)? = staged.position;
    *ecs.get::<&mut VoxelChunk>(staged.entity)? = staged.chunk;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::config::WorldConfig;
    use crate::voxel::prefab::VoxelPrefab;

    fn setup(max_chunks: u32, size: UVec3) -> (World, WorldSystem, ChunkSystem) {
        let mut ecs = World::new();
        let config = WorldConfig {
            max_chunks,
            chunk_size: size,
            ..Default::default()
        };
        config.spawn_world(&mut ecs).unwrap();
        let world = WorldSystem::bootstrap(&mut ecs).unwrap();
        let chunks = ChunkSystem::new(world.world(), TerrainParams::default()).unwrap();
        (ecs, world, chunks)
    }

    fn voxel_count(ecs: &World) -> usize {
        ecs.query::<&Voxel>().iter().count()
    }

    fn mapped(chunks: &ChunkSystem) -> usize {
        chunks.voxel_map().iter().filter(|(_, v)| v.is_some()).count()
    }

    #[test]
    fn test_new_rejects_invalid_world() {
        let (_, world, _) = setup(2, UVec3::splat(2));
        let mut record = world.world().clone();

        record.max_chunks = 0;
        let result = ChunkSystem::new(&record, TerrainParams::default());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        record.max_chunks = 2;
        record.chunk_size.x = 0;
        let result = ChunkSystem::new(&record, TerrainParams::default());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_voxel_map_dims() {
        let (_, _, chunks) = setup(3, UVec3::new(4, 6, 5));
        assert_eq!(chunks.voxel_map().dims(), UVec3::new(12, 6, 15));
        assert!(chunks.voxel_map().iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_pass_positions_and_populates_all_chunks() {
        let (mut ecs, world, mut chunks) = setup(3, UVec3::splat(3));

        let stats = chunks.run(&mut ecs, &world).unwrap();
        assert_eq!(stats.positioned, 9);
        assert_eq!(stats.populated, 9);
        assert_eq!(stats.voxels, voxel_count(&ecs));
        assert!(stats.voxels >= 81, "every column has at least one cell");

        for (_, chunk) in ecs.query::<&VoxelChunk>().iter() {
            assert_eq!(chunk.state, ChunkState::Populated);
        }
    }

    #[test]
    fn test_positions_follow_grid_offset() {
        let (mut ecs, world, mut chunks) = setup(3, UVec3::splat(3));
        chunks.run(&mut ecs, &world).unwrap();

        // (1, 1) * 3 - (3 * 3) / 2 = -1 on X/Z
        let center = world.chunk_at(ChunkCoord::new(1, 1)).unwrap();
        assert_eq!(ecs.get::<&Position>(center).unwrap().0, Vec3::new(-1.0, 0.0, -1.0));

        let corner = world.chunk_at(ChunkCoord::new(0, 2)).unwrap();
        assert_eq!(ecs.get::<&Position>(corner).unwrap().0, Vec3::new(-4.0, 0.0, 2.0));
    }

    #[test]
    fn test_voxels_match_profile_and_map() {
        let (mut ecs, world, mut chunks) = setup(2, UVec3::new(4, 8, 4));
        chunks.run(&mut ecs, &world).unwrap();
        let size = world.world().chunk_size;

        for (entity, (voxel, material, position)) in
            ecs.query::<(&Voxel, &Material, &Position)>().iter()
        {
            let chunk = *ecs.get::<&VoxelChunk>(voxel.chunk).unwrap();
            let origin = ecs.get::<&Position>(voxel.chunk).unwrap().0;
            assert!(voxel.initialized);
            assert_eq!(voxel.world, world.world().entity);
            assert!(voxel.local.cmplt(size).all());
            assert_eq!(position.0, origin + voxel.local.as_vec3());

            let profile = chunks.generator().generate(origin, size);
            assert_eq!(profile[voxel.local], *material);

            let slot = UVec3::new(
                chunk.coord.x * size.x + voxel.local.x,
                voxel.local.y,
                chunk.coord.z * size.z + voxel.local.z,
            );
            assert_eq!(chunks.voxel_at_slot(slot), Some(entity));
        }

        assert_eq!(mapped(&chunks), voxel_count(&ecs));
    }

    #[test]
    fn test_missing_template_spawns_nothing() {
        let (mut ecs, world, mut chunks) = setup(1, UVec3::new(2, 8, 2));
        let entity = world.chunk_at(ChunkCoord::new(0, 0)).unwrap();
        let grass = ecs.get::<&VoxelChunk>(entity).unwrap().grass_prefab;
        let template = ecs.remove_one::<VoxelPrefab>(grass).unwrap();

        for _ in 0..3 {
            assert!(matches!(chunks.run(&mut ecs, &world), Err(Error::Component(_))));
            assert_eq!(voxel_count(&ecs), 0);
            assert_eq!(mapped(&chunks), 0);
            assert_eq!(ecs.get::<&VoxelChunk>(entity).unwrap().state, ChunkState::Positioned);
        }

        // Restoring the template lets the next pass finish the chunk
        ecs.insert_one(grass, template).unwrap();
        let stats = chunks.run(&mut ecs, &world).unwrap();
        assert_eq!(stats.positioned, 0);
        assert_eq!(stats.populated, 1);
        assert_eq!(stats.voxels, voxel_count(&ecs));
        assert_eq!(mapped(&chunks), stats.voxels);
    }

    #[test]
    fn test_reindex_rebuilds_voxel_map() {
        let (mut ecs, world, mut chunks) = setup(2, UVec3::new(3, 6, 3));
        chunks.run(&mut ecs, &world).unwrap();

        let mut fresh = ChunkSystem::new(world.world(), TerrainParams::default()).unwrap();
        assert_eq!(mapped(&fresh), 0);
        assert_eq!(fresh.reindex(&ecs, &world).unwrap(), voxel_count(&ecs));

        let slots = |c: &ChunkSystem| -> Vec<Option<Entity>> {
            c.voxel_map().iter().map(|(_, v)| *v).collect()
        };
        assert_eq!(slots(&fresh), slots(&chunks));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let (mut ecs, world, mut chunks) = setup(2, UVec3::new(4, 8, 4));
        let first = chunks.run(&mut ecs, &world).unwrap();
        let map_before: Vec<_> = chunks.voxel_map().iter().map(|(_, v)| *v).collect();
        let entities_before = ecs.len();

        let second = chunks.run(&mut ecs, &world).unwrap();
        assert_eq!(second, PassStats::default());
        assert!(first.voxels > 0);
        assert_eq!(ecs.len(), entities_before);

        let map_after: Vec<_> = chunks.voxel_map().iter().map(|(_, v)| *v).collect();
        assert_eq!(map_before, map_after);
    }

    #[test]
    fn test_populate_chunk_is_idempotent() {
        let (mut ecs, world, mut chunks) = setup(2, UVec3::new(3, 6, 3));
        let entity = world.chunk_at(ChunkCoord::new(1, 0)).unwrap();

        // Placed chunks are not populated
        assert_eq!(chunks.populate_chunk(&mut ecs, &world, entity).unwrap(), 0);
        assert_eq!(voxel_count(&ecs), 0);

        // Position only this chunk, as the pass would
        {
            let mut chunk = ecs.get::<&mut VoxelChunk>(entity).unwrap();
            chunk.state.advance(ChunkState::Positioned).unwrap();
        }
        let spawned = chunks.populate_chunk(&mut ecs, &world, entity).unwrap();
        assert!(spawned >= 9);
        assert_eq!(voxel_count(&ecs), spawned);
        assert_eq!(ecs.get::<&VoxelChunk>(entity).unwrap().state, ChunkState::Populated);

        let map_before: Vec<_> = chunks.voxel_map().iter().map(|(_, v)| *v).collect();
        assert_eq!(chunks.populate_chunk(&mut ecs, &world, entity).unwrap(), 0);
        assert_eq!(voxel_count(&ecs), spawned);
        let map_after: Vec<_> = chunks.voxel_map().iter().map(|(_, v)| *v).collect();
        assert_eq!(map_before, map_after);
    }

    #[test]
    fn test_states_never_move_backward() {
        let (mut ecs, world, mut chunks) = setup(2, UVec3::splat(4));
        let states = |ecs: &World| -> Vec<(ChunkCoord, ChunkState)> {
            let mut v: Vec<_> = ecs
                .query::<&VoxelChunk>()
                .iter()
                .map(|(_, c)| (c.coord, c.state))
                .collect();
            v.sort();
            v
        };

        let before = states(&ecs);
        chunks.run(&mut ecs, &world).unwrap();
        let mid = states(&ecs);
        chunks.run(&mut ecs, &world).unwrap();
        let after = states(&ecs);

        for ((b, m), a) in before.iter().zip(&mid).zip(&after) {
            assert_eq!(b.0, m.0);
            assert!(b.1 <= m.1 && m.1 <= a.1);
            assert!(!m.1.needs_position_update());
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (mut ecs_a, world_a, chunks_a) = setup(3, UVec3::new(5, 10, 5));
        let (mut ecs_b, world_b, chunks_b) = setup(3, UVec3::new(5, 10, 5));
        let mut seq = chunks_a;
        let mut par = chunks_b.with_parallel(true);

        let stats_a = seq.run(&mut ecs_a, &world_a).unwrap();
        let stats_b = par.run(&mut ecs_b, &world_b).unwrap();
        assert_eq!(stats_a, stats_b);

        let filled = |c: &ChunkSystem| -> Vec<UVec3> {
            c.voxel_map().iter().filter(|(_, v)| v.is_some()).map(|(s, _)| s).collect()
        };
        assert_eq!(filled(&seq), filled(&par));
    }
}
