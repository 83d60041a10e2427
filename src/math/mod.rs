//! Mathematical utilities and data structures

pub mod grid;

pub use grid::{Grid2, Grid3};
