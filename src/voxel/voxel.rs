//! Voxel record and material codes

use glam::{UVec3, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Material code of a single voxel cell.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    /// Air, never spawned
    #[default]
    Empty = 0,
    /// Thin surface layer capping every column
    Grass = 1,
    /// Subsurface fill below the grass layer
    Earth = 2,
}

impl Material {
    /// Numeric material code (0 = empty, 1 = grass, 2 = earth)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a material code, `None` for unknown codes
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Material::Empty),
            1 => Some(Material::Grass),
            2 => Some(Material::Earth),
            _ => None,
        }
    }

    /// Check if this cell is air
    pub fn is_empty(self) -> bool {
        self == Material::Empty
    }
}

/// World-space position of a world, chunk or voxel entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec3);

/// Generated voxel record, one per non-empty cell of a chunk.
///
/// Written once during chunk population and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voxel {
    /// World the voxel belongs to
    pub world: Entity,
    /// Chunk the voxel was generated by
    pub chunk: Entity,
    /// Local coordinate inside the owning chunk
    pub local: UVec3,
    pub initialized: bool,
}

impl Voxel {
    pub fn new(world: Entity, chunk: Entity, local: UVec3) -> Self {
        Self {
            world,
            chunk,
            local,
            initialized: true,
        }
    }
}
