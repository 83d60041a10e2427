//! Error types for voxfield

use thiserror::Error;

use crate::voxel::chunk::{ChunkCoord, ChunkState};

/// Main error type for terrain generation
#[derive(Debug, Error)]
pub enum Error {
    /// No `VoxelWorld` record was found in the host world, or its backing
    /// entity has been despawned.
    #[error("voxel world record is missing")]
    MissingWorld,

    #[error("expected exactly one voxel world, found {0}")]
    DuplicateWorld(usize),

    #[error("entity {0:?} does not exist")]
    MissingEntity(hecs::Entity),

    #[error("component error: {0}")]
    Component(#[from] hecs::ComponentError),

    #[error("invalid chunk transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ChunkState, to: ChunkState },

    /// A bootstrapped world's chunk records no longer cover its grid
    #[error("chunk grid is inconsistent at {0:?}")]
    InconsistentChunk(ChunkCoord),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
