//! voxfield - chunked voxel terrain generation on top of a hecs world

pub mod core;
pub mod math;
pub mod voxel;
pub mod terrain;
pub mod generation;
