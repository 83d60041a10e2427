//! Voxel data structures and the world record

pub mod voxel;
pub mod chunk;
pub mod prefab;
pub mod world;

pub use chunk::{ChunkCoord, ChunkState, VoxelChunk};
pub use prefab::{ChunkPrefab, Prefab, VoxelPrefab};
pub use voxel::{Material, Position, Voxel};
pub use world::{validate_dimensions, VoxelWorld, WorldInitialized, WorldSystem};
