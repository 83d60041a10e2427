//! Chunk component and lifecycle state

use glam::{UVec2, UVec3, Vec3};
use hecs::Entity;

use crate::core::{Error, Result};

/// Tallest chunk a world may declare, in voxels
pub const MAX_CHUNK_HEIGHT: u32 = 256;

/// Integer coordinate identifying a chunk in the world's 2D grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: u32,
    pub z: u32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Coordinate as a `Grid2` slot
    pub fn as_uvec2(self) -> UVec2 {
        UVec2::new(self.x, self.z)
    }
}

impl From<UVec2> for ChunkCoord {
    fn from(v: UVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Lifecycle of a chunk. Transitions only move one step forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChunkState {
    /// Spawned into the grid, world position not yet committed
    #[default]
    Placed,
    /// World position committed, no voxels yet
    Positioned,
    /// Voxels generated and indexed
    Populated,
}

impl ChunkState {
    /// The state that follows this one, if any
    pub fn next(self) -> Option<ChunkState> {
        match self {
            ChunkState::Placed => Some(ChunkState::Positioned),
            ChunkState::Positioned => Some(ChunkState::Populated),
            ChunkState::Populated => None,
        }
    }

    /// Move to `to`, which must be the immediate successor of `self`
    pub fn advance(&mut self, to: ChunkState) -> Result<()> {
        if self.next() != Some(to) {
            return Err(Error::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    /// True until the first position commit
    pub fn needs_position_update(self) -> bool {
        self == ChunkState::Placed
    }

    /// True once the world position has been committed
    pub fn is_initialized(self) -> bool {
        self >= ChunkState::Positioned
    }

    pub fn is_populated(self) -> bool {
        self == ChunkState::Populated
    }
}

/// Chunk record stored on each chunk entity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelChunk {
    /// World this chunk belongs to
    pub world: Entity,
    /// Grid coordinate, unique per chunk and fixed at creation
    pub coord: ChunkCoord,
    /// Prefab instantiated for grass cells
    pub grass_prefab: Entity,
    /// Prefab instantiated for earth cells
    pub earth_prefab: Entity,
    pub state: ChunkState,
}

/// World-space origin of the chunk at `coord`, centering the whole grid on
/// `world_origin`.
///
/// `offset = world_origin + coord * size - (max_chunks * size) / 2` on X/Z,
/// using integer division for the centering term. Y is the world origin's Y.
pub fn chunk_origin(
    world_origin: Vec3,
    coord: ChunkCoord,
    chunk_size: UVec3,
    max_chunks: u32,
) -> Vec3 {
    let half_x = (max_chunks * chunk_size.x / 2) as f32;
    let half_z = (max_chunks * chunk_size.z / 2) as f32;
    Vec3::new(
        world_origin.x + (coord.x * chunk_size.x) as f32 - half_x,
        world_origin.y,
        world_origin.z + (coord.z * chunk_size.z) as f32 - half_z,
    )
}
