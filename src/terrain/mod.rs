//! Procedural terrain generation

pub mod generator;
pub use generator::{MaterialGrid, TerrainGenerator, TerrainParams, MAX_HEIGHT_SPAN};
