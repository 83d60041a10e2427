//! World record and the one-time world bootstrap

use glam::{UVec2, UVec3, Vec3};
use hecs::{Component, Entity, World};

use crate::core::{Error, Result};
use crate::math::Grid2;
use crate::voxel::chunk::{chunk_origin, ChunkCoord, VoxelChunk, MAX_CHUNK_HEIGHT};
use crate::voxel::prefab;
use crate::voxel::voxel::Position;

/// Marks a world entity whose chunks have been spawned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldInitialized;

/// Check that a `max_chunks` grid of `chunk_size` chunks can be allocated.
///
/// Rejects empty dimensions, chunks taller than [`MAX_CHUNK_HEIGHT`] and
/// voxel maps whose size overflows on this platform.
pub fn validate_dimensions(max_chunks: u32, chunk_size: UVec3) -> Result<()> {
    if max_chunks == 0 {
        return Err(Error::InvalidConfig("max_chunks must be positive".into()));
    }
    if chunk_size.min_element() == 0 {
        return Err(Error::InvalidConfig(format!(
            "chunk_size must be positive on every axis, got {}",
            chunk_size
        )));
    }
    if chunk_size.y > MAX_CHUNK_HEIGHT {
        return Err(Error::InvalidConfig(format!(
            "chunk height {} exceeds {}",
            chunk_size.y, MAX_CHUNK_HEIGHT
        )));
    }
    let bytes = max_chunks
        .checked_mul(chunk_size.x)
        .zip(max_chunks.checked_mul(chunk_size.z))
        .and_then(|(w, d)| (w as usize).checked_mul(d as usize))
        .and_then(|n| n.checked_mul(chunk_size.y as usize))
        .and_then(|n| n.checked_mul(std::mem::size_of::<Option<Entity>>()))
        .filter(|&n| n <= isize::MAX as usize);
    if bytes.is_none() {
        return Err(Error::InvalidConfig(format!(
            "{} chunks of {} overflow the voxel map",
            max_chunks, chunk_size
        )));
    }
    Ok(())
}

/// Singleton world record. Dimensions are fixed once spawned.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelWorld {
    /// Entity carrying this record and the world `Position`
    pub entity: Entity,
    /// Prefab every chunk is instantiated from
    pub chunk_prefab: Entity,
    /// Reserved for chunk streaming; generation ignores it
    pub render_distance: i32,
    /// Chunks per grid axis
    pub max_chunks: u32,
    /// Chunk dimensions in voxels
    pub chunk_size: UVec3,
    pub world_id: i32,
}

impl VoxelWorld {
    /// Spawn the world entity at `origin` carrying this record.
    ///
    /// `entity` is overwritten with the new entity, which is returned.
    pub fn spawn(mut self, ecs: &mut World, origin: Vec3) -> Result<Entity> {
        self.validate()?;
        let entity = ecs.spawn((Position(origin),));
        self.entity = entity;
        ecs.insert_one(entity, self)
            .map_err(|_| Error::MissingEntity(entity))?;
        Ok(entity)
    }

    /// Check the grid dimensions of this record
    pub fn validate(&self) -> Result<()> {
        validate_dimensions(self.max_chunks, self.chunk_size)
    }

    /// Dimensions of the voxel map covering every chunk of this world
    pub fn voxel_map_dims(&self) -> UVec3 {
        UVec3::new(
            self.max_chunks * self.chunk_size.x,
            self.chunk_size.y,
            self.max_chunks * self.chunk_size.z,
        )
    }

    /// World-space origin of the chunk at `coord`
    pub fn chunk_origin(&self, coord: ChunkCoord, world_origin: Vec3) -> Vec3 {
        chunk_origin(world_origin, coord, self.chunk_size, self.max_chunks)
    }

    /// Minimum corner of the whole chunk grid
    fn grid_min(&self, world_origin: Vec3) -> Vec3 {
        self.chunk_origin(ChunkCoord::new(0, 0), world_origin)
    }

    /// Grid-relative voxel slot containing `pos`, `None` outside the world
    pub fn voxel_slot_at(&self, pos: Vec3, world_origin: Vec3) -> Option<UVec3> {
        let rel = (pos - self.grid_min(world_origin)).floor();
        if rel.min_element() < 0.0 {
            return None;
        }
        let dims = self.voxel_map_dims();
        let slot = rel.as_uvec3();
        // Guard against float-to-int saturation on huge positions
        (rel.cmplt(dims.as_vec3()).all() && slot.cmplt(dims).all()).then_some(slot)
    }

    /// Chunk containing the world-space position `pos`, ignoring height
    pub fn chunk_coord_at(&self, pos: Vec3, world_origin: Vec3) -> Option<ChunkCoord> {
        let probe = Vec3::new(pos.x, world_origin.y, pos.z);
        let slot = self.voxel_slot_at(probe, world_origin)?;
        Some(ChunkCoord::new(
            slot.x / self.chunk_size.x,
            slot.z / self.chunk_size.z,
        ))
    }
}

/// Look up the single entity carrying `T`.
pub fn singleton<T: Component + Clone>(ecs: &World) -> Result<(Entity, T)> {
    let mut query = ecs.query::<&T>();
    let mut iter = query.iter();
    let Some((entity, value)) = iter.next() else {
        return Err(Error::MissingWorld);
    };
    let found = (entity, value.clone());
    let extra = iter.count();
    if extra > 0 {
        return Err(Error::DuplicateWorld(extra + 1));
    }
    Ok(found)
}

/// Owns the world record and the chunk map built at bootstrap.
pub struct WorldSystem {
    world: VoxelWorld,
    origin: Vec3,
    chunk_map: Grid2<Entity>,
}

impl WorldSystem {
    /// Spawn every chunk of the world and record it in the chunk map.
    ///
    /// A missing or duplicated world record, a despawned backing entity, or
    /// invalid grid dimensions abort before any chunk is spawned. Once a world
    /// carries [`WorldInitialized`], later calls spawn nothing and rebuild the
    /// chunk map from the existing chunk records.
    pub fn bootstrap(ecs: &mut World) -> Result<Self> {
        let (_, world) = singleton::<VoxelWorld>(ecs)?;
        if !ecs.contains(world.entity) {
            return Err(Error::MissingWorld);
        }
        world.validate()?;
        let origin = ecs.get::<&Position>(world.entity)?.0;

        if ecs.get::<&WorldInitialized>(world.entity).is_ok() {
            log::debug!("World {} already bootstrapped", world.world_id);
            return Self::restore(ecs, world, origin);
        }

        let m = world.max_chunks;
        let mut chunk_map = Grid2::new(UVec2::splat(m), Entity::DANGLING);
        for x in 0..m {
            for z in 0..m {
                let coord = ChunkCoord::new(x, z);
                let chunk = prefab::instantiate_chunk(ecs, world.chunk_prefab, world.entity, coord)?;
                chunk_map.set(coord.as_uvec2(), chunk);
            }
        }
        ecs.insert_one(world.entity, WorldInitialized)
            .map_err(|_| Error::MissingEntity(world.entity))?;

        log::info!(
            "World {} bootstrapped: {}x{} chunks of {}",
            world.world_id, m, m, world.chunk_size
        );

        Ok(Self {
            world,
            origin,
            chunk_map,
        })
    }

    /// Chunk map of an already bootstrapped world, read back from its chunks
    fn restore(ecs: &World, world: VoxelWorld, origin: Vec3) -> Result<Self> {
        let mut chunk_map = Grid2::new(UVec2::splat(world.max_chunks), Entity::DANGLING);
        let mut query = ecs.query::<&VoxelChunk>();
        for (entity, chunk) in query.iter().filter(|(_, c)| c.world == world.entity) {
            let slot = chunk.coord.as_uvec2();
            if chunk_map.try_get(slot) != Some(&Entity::DANGLING) {
                return Err(Error::InconsistentChunk(chunk.coord));
            }
            chunk_map.set(slot, entity);
        }
        if let Some((slot, _)) = chunk_map.iter().find(|(_, e)| **e == Entity::DANGLING) {
            return Err(Error::InconsistentChunk(ChunkCoord::from(slot)));
        }

        Ok(Self {
            world,
            origin,
            chunk_map,
        })
    }

    /// The world record captured at bootstrap
    pub fn world(&self) -> &VoxelWorld {
        &self.world
    }

    /// World-space position the grid is centered on
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn chunk_map(&self) -> &Grid2<Entity> {
        &self.chunk_map
    }

    /// Chunk entity at `coord`, `None` outside the grid
    pub fn chunk_at(&self, coord: ChunkCoord) -> Option<Entity> {
        self.chunk_map.try_get(coord.as_uvec2()).copied()
    }

    /// Chunk entity containing the world-space position `pos`
    pub fn chunk_at_position(&self, pos: Vec3) -> Option<Entity> {
        self.chunk_at(self.world.chunk_coord_at(pos, self.origin)?)
    }

    /// Total number of chunks in the grid
    pub fn chunk_count(&self) -> usize {
        self.chunk_map.len()
    }
}
