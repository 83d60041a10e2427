//! Dense fixed-size grids backed by a single flat allocation.
//!
//! Both grids are row-major: X varies fastest, then Y (3D only), then Z.
//! Accessing a coordinate outside the grid's dimensions panics. Callers are
//! expected to drive access from loop bounds derived from `dims()`, so an
//! out-of-range coordinate is always a bug at the call site.

use std::ops::{Index, IndexMut};

use glam::{UVec2, UVec3};

fn cell_count(dims: &[u32]) -> usize {
    assert!(
        dims.iter().all(|&d| d > 0),
        "grid dimensions must be positive, got {:?}",
        dims
    );
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
        .expect("grid cell count overflows usize")
}

/// Dense 2D grid over `[0, dims.x) x [0, dims.y)`.
#[derive(Clone, Debug)]
pub struct Grid2<T> {
    dims: UVec2,
    cells: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// Allocate a grid with every cell set to `fill`.
    pub fn new(dims: UVec2, fill: T) -> Self {
        let len = cell_count(&[dims.x, dims.y]);
        Self {
            dims,
            cells: vec![fill; len],
        }
    }
}

impl<T> Grid2<T> {
    pub fn dims(&self) -> UVec2 {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `coord` lies inside the grid.
    pub fn contains(&self, coord: UVec2) -> bool {
        coord.cmplt(self.dims).all()
    }

    #[inline]
    fn index_of(&self, coord: UVec2) -> usize {
        assert!(
            self.contains(coord),
            "grid coordinate {} out of bounds {}",
            coord,
            self.dims
        );
        coord.x as usize + coord.y as usize * self.dims.x as usize
    }

    pub fn get(&self, coord: UVec2) -> &T {
        &self.cells[self.index_of(coord)]
    }

    pub fn get_mut(&mut self, coord: UVec2) -> &mut T {
        let idx = self.index_of(coord);
        &mut self.cells[idx]
    }

    pub fn set(&mut self, coord: UVec2, value: T) {
        let idx = self.index_of(coord);
        self.cells[idx] = value;
    }

    /// Checked lookup, `None` outside the grid.
    pub fn try_get(&self, coord: UVec2) -> Option<&T> {
        self.contains(coord).then(|| self.get(coord))
    }

    /// Iterate all cells with their coordinates in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (UVec2, &T)> {
        let w = self.dims.x as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (UVec2::new((i % w) as u32, (i / w) as u32), cell)
        })
    }
}

impl<T> Index<UVec2> for Grid2<T> {
    type Output = T;

    fn index(&self, coord: UVec2) -> &T {
        self.get(coord)
    }
}

impl<T> IndexMut<UVec2> for Grid2<T> {
    fn index_mut(&mut self, coord: UVec2) -> &mut T {
        self.get_mut(coord)
    }
}

/// Dense 3D grid over `[0, dims.x) x [0, dims.y) x [0, dims.z)`.
#[derive(Clone, Debug)]
pub struct Grid3<T> {
    dims: UVec3,
    cells: Vec<T>,
}

impl<T: Clone> Grid3<T> {
    /// Allocate a grid with every cell set to `fill`.
    pub fn new(dims: UVec3, fill: T) -> Self {
        let len = cell_count(&[dims.x, dims.y, dims.z]);
        Self {
            dims,
            cells: vec![fill; len],
        }
    }
}

impl<T> Grid3<T> {
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `coord` lies inside the grid.
    pub fn contains(&self, coord: UVec3) -> bool {
        coord.cmplt(self.dims).all()
    }

    #[inline]
    fn index_of(&self, coord: UVec3) -> usize {
        assert!(
            self.contains(coord),
            "grid coordinate {} out of bounds {}",
            coord,
            self.dims
        );
        let (dx, dy) = (self.dims.x as usize, self.dims.y as usize);
        coord.x as usize + coord.y as usize * dx + coord.z as usize * dx * dy
    }

    pub fn get(&self, coord: UVec3) -> &T {
        &self.cells[self.index_of(coord)]
    }

    pub fn get_mut(&mut self, coord: UVec3) -> &mut T {
        let idx = self.index_of(coord);
        &mut self.cells[idx]
    }

    pub fn set(&mut self, coord: UVec3, value: T) {
        let idx = self.index_of(coord);
        self.cells[idx] = value;
    }

    /// Checked lookup, `None` outside the grid.
    pub fn try_get(&self, coord: UVec3) -> Option<&T> {
        self.contains(coord).then(|| self.get(coord))
    }

    /// Iterate all cells with their coordinates in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (UVec3, &T)> {
        let (w, h) = (self.dims.x as usize, self.dims.y as usize);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let (x, y, z) = (i % w, (i / w) % h, i / (w * h));
            (UVec3::new(x as u32, y as u32, z as u32), cell)
        })
    }
}

impl<T> Index<UVec3> for Grid3<T> {
    type Output = T;

    fn index(&self, coord: UVec3) -> &T {
        self.get(coord)
    }
}

impl<T> IndexMut<UVec3> for Grid3<T> {
    fn index_mut(&mut self, coord: UVec3) -> &mut T {
        self.get_mut(coord)
    }
}
