//! Prefab entities and instantiation.
//!
//! A prefab is an ordinary entity carrying a [`Prefab`] marker plus the
//! template component for what it spawns. Prefabs never carry the live
//! record types (`VoxelChunk`, `Voxel`), so queries over live records skip
//! them.

use glam::Vec3;
use hecs::{Entity, World};

use crate::core::Result;
use crate::voxel::chunk::{ChunkCoord, ChunkState, VoxelChunk};
use crate::voxel::voxel::{Material, Position, Voxel};

/// Marks an entity as a template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefab {
    pub name: String,
}

/// Template for chunk entities
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPrefab {
    /// Voxel prefab for grass cells
    pub grass: Entity,
    /// Voxel prefab for earth cells
    pub earth: Entity,
}

/// Template for voxel entities
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelPrefab {
    pub material: Material,
}

/// Spawn a voxel prefab for `material`.
pub fn spawn_voxel_prefab(ecs: &mut World, name: &str, material: Material) -> Entity {
    ecs.spawn((Prefab { name: name.to_string() }, VoxelPrefab { material }))
}

/// Spawn a chunk prefab referencing two voxel prefabs.
pub fn spawn_chunk_prefab(ecs: &mut World, name: &str, grass: Entity, earth: Entity) -> Entity {
    ecs.spawn((Prefab { name: name.to_string() }, ChunkPrefab { grass, earth }))
}

/// Instantiate a chunk from `prefab` at grid coordinate `coord`.
///
/// The new chunk starts in [`ChunkState::Placed`] at the world origin; its
/// real position is committed by the chunk pass.
pub fn instantiate_chunk(
    ecs: &mut World,
    prefab: Entity,
    world: Entity,
    coord: ChunkCoord,
) -> Result<Entity> {
    let template = *ecs.get::<&ChunkPrefab>(prefab)?;
    let chunk = VoxelChunk {
        world,
        coord,
        grass_prefab: template.grass,
        earth_prefab: template.earth,
        state: ChunkState::Placed,
    };
    Ok(ecs.spawn((chunk, Position(Vec3::ZERO))))
}

/// Read the voxel template stored on `prefab`.
pub fn voxel_template(ecs: &World, prefab: Entity) -> Result<VoxelPrefab> {
    Ok(*ecs.get::<&VoxelPrefab>(prefab)?)
}

/// Instantiate a voxel from a resolved template, stamping its record and
/// position.
pub fn instantiate_voxel(
    ecs: &mut World,
    template: VoxelPrefab,
    voxel: Voxel,
    position: Position,
) -> Entity {
    ecs.spawn((voxel, template.material, position))
}
