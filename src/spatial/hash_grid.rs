//! Multi-resolution hashed 3D grid of bounding boxes.
//!
//! Each level is an independent sparse map from integer cell coordinates to a
//! bucket of item indices. An item inserted with a box occupies every cell
//! that box spans at the chosen level; removal recomputes that exact cell
//! set from the bounds the caller passes in, so callers must remove with the
//! same bounds they inserted with.
//!
//! Point queries are **broad phase**: they return every item listed in the
//! point's cell, whether or not the item's box actually covers the point.
//!
//! ## Cell range
//! Coordinates are `floor(x / cell_size)` per axis. A box whose max corner
//! lies exactly on a cell edge does not claim the next cell: when
//! `max % cell_size == 0` and the box is not degenerate on that axis, the max
//! coordinate is pulled back by one.

use std::collections::HashMap;

use glam::{IVec3, Vec3};
use log::{trace, warn};

use crate::spatial::aabb::Aabb;


/// Bucket of item indices stored in one cell.
#[derive(Clone, Debug, Default)]
pub struct GridCell {
    item_indices: Vec<usize>,
}

impl GridCell {
    /// Item indices in this cell. Order carries no meaning.
    #[inline]
    pub fn item_indices(&self) -> &[usize] {
        &self.item_indices
    }

    /// Number of items listed in this cell.
    #[inline]
    pub fn len(&self) -> usize {
        self.item_indices.len()
    }

    /// Returns `true` if the cell lists no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item_indices.is_empty()
    }
}

/// Inclusive range of cell coordinates covered by a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    /// Lowest cell coordinate on each axis.
    pub min: IVec3,
    /// Highest cell coordinate on each axis (inclusive).
    pub max: IVec3,
}

impl CellRange {
    fn for_each(self, mut f: impl FnMut(IVec3)) {
        for z in self.min.z..=self.max.z {
            for y in self.min.y..=self.max.y {
                for x in self.min.x..=self.max.x {
                    f(IVec3::new(x, y, z));
                }
            }
        }
    }
}

/// Hierarchical hash grid mapping boxes to cells at several resolutions.
#[derive(Clone, Debug)]
pub struct HierarchicalHashGrid<T> {
    cells_by_level: Vec<HashMap<IVec3, GridCell>>,
    cell_sizes: Vec<f32>,
    items: Vec<Option<T>>,
    free_indices: Vec<usize>,
    live: usize,
    initialized: bool,
}

impl<T> Default for HierarchicalHashGrid<T> {
    fn default() -> Self {
        Self {
            cells_by_level: Vec::new(),
            cell_sizes: Vec::new(),
            items: Vec::new(),
            free_indices: Vec::new(),
            live: 0,
            initialized: false,
        }
    }
}

impl<T: Clone> HierarchicalHashGrid<T> {
    /// Creates an uninitialized grid; call [`init`](Self::init) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes `num_levels` levels with the given cell sizes.
    ///
    /// Returns `false` (and leaves the grid untouched) if the grid was
    /// already initialized, if `cell_sizes` does not hold exactly one size
    /// per level, or if any size is not a positive finite number.
    pub fn init(&mut self, num_levels: usize, cell_sizes: &[f32]) -> bool {
        if self.initialized {
            warn!("hash grid already initialized; ignoring re-init");
            return false;
        }
        if num_levels == 0 || cell_sizes.len() != num_levels {
            warn!("hash grid init: {num_levels} levels but {} cell sizes", cell_sizes.len());
            return false;
        }
        if let Some(bad) = cell_sizes.iter().find(|size| !(size.is_finite() && **size > 0.0)) {
            warn!("hash grid init: invalid cell size {bad}");
            return false;
        }
        self.cell_sizes = cell_sizes.to_vec();
        self.cells_by_level = vec![HashMap::new(); num_levels];
        self.initialized = true;
        true
    }

    /// Returns `true` once [`init`](Self::init) has succeeded.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of levels.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.cell_sizes.len()
    }

    /// Cell edge length at `level`.
    #[inline]
    pub fn cell_size(&self, level: usize) -> Option<f32> {
        self.cell_sizes.get(level).copied()
    }

    /// Number of live items.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no item is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of non-empty cells at `level`.
    pub fn cell_count(&self, level: usize) -> usize {
        self.cells_by_level.get(level).map_or(0, HashMap::len)
    }

    /// The item stored at `index`, if allocated.
    #[inline]
    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Option::as_ref)
    }

    /// Returns `true` if `index` refers to a live item.
    #[inline]
    pub fn is_allocated(&self, index: usize) -> bool {
        self.item(index).is_some()
    }

    /// Cell coordinates of `point` at `level`.
    pub fn cell_coords(&self, point: Vec3, level: usize) -> Option<IVec3> {
        let size = self.cell_size(level)?;
        Some(Self::coords_with(point, size))
    }

    fn coords_with(point: Vec3, size: f32) -> IVec3 {
        (point / size).floor().as_ivec3()
    }

    /// Inclusive cell range spanned by `bounds` at `level`.
    pub fn cell_range(&self, bounds: &Aabb, level: usize) -> Option<CellRange> {
        let size = self.cell_size(level)?;
        let min = Self::coords_with(bounds.min, size);
        let mut max = Self::coords_with(bounds.max, size);

        // A max corner sitting exactly on an edge belongs to the lower cell.
        for axis in 0..3 {
            if bounds.max[axis] % size == 0.0 && bounds.max[axis] != bounds.min[axis] {
                max[axis] -= 1;
            }
        }
        Some(CellRange { min, max })
    }

    /// Inserts `item` into every cell its `bounds` span at `level`.
    ///
    /// Returns the item's index, stable until removal, or `None` if `level`
    /// does not exist.
    pub fn add(&mut self, item: T, bounds: &Aabb, level: usize) -> Option<usize> {
        let range = self.cell_range(bounds, level)?;

        let index = match self.free_indices.pop() {
            Some(index) => {
                self.items[index] = Some(item);
                index
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };
        self.live += 1;

        self.insert_cells(index, range, level);
        trace!("grid add item {index} at level {level}: {range:?}");
        Some(index)
    }

    /// Removes the item at `index` from every cell `bounds` spans at `level`
    /// and frees the index. Unallocated indices are ignored.
    pub fn remove(&mut self, index: usize, bounds: &Aabb, level: usize) -> bool {
        if !self.is_allocated(index) {
            return false;
        }
        let Some(range) = self.cell_range(bounds, level) else { return false };

        self.remove_cells(index, range, level);
        self.items[index] = None;
        self.free_indices.push(index);
        self.live -= 1;
        true
    }

    /// Moves an item from `old_bounds` to `new_bounds`, keeping its index.
    pub fn move_item(&mut self, index: usize, old_bounds: &Aabb, new_bounds: &Aabb, level: usize) -> bool {
        if !self.is_allocated(index) {
            return false;
        }
        let (Some(old_range), Some(new_range)) =
            (self.cell_range(old_bounds, level), self.cell_range(new_bounds, level))
        else {
            return false;
        };
        self.remove_cells(index, old_range, level);
        self.insert_cells(index, new_range, level);
        true
    }

    /// Replaces the contents of `out` with every item listed in the cell
    /// containing `point` at `level`.
    pub fn find_overlapping(&self, point: Vec3, level: usize, out: &mut Vec<T>) {
        out.clear();
        let Some(coords) = self.cell_coords(point, level) else { return };
        if let Some(cell) = self.cells_by_level[level].get(&coords) {
            out.extend(cell.item_indices.iter().filter_map(|&index| self.item(index).cloned()));
        }
    }

    /// Read-only bucket lookup.
    pub fn find_cell(&self, x: i32, y: i32, z: i32, level: usize) -> Option<&GridCell> {
        self.cells_by_level.get(level)?.get(&IVec3::new(x, y, z))
    }

    fn insert_cells(&mut self, index: usize, range: CellRange, level: usize) {
        let cells = &mut self.cells_by_level[level];
        range.for_each(|coords| cells.entry(coords).or_default().item_indices.push(index));
    }

    fn remove_cells(&mut self, index: usize, range: CellRange, level: usize) {
        let cells = &mut self.cells_by_level[level];
        range.for_each(|coords| {
            if let Some(cell) = cells.get_mut(&coords) {
                if let Some(position) = cell.item_indices.iter().position(|&i| i == index) {
                    cell.item_indices.swap_remove(position);
                }
                if cell.item_indices.is_empty() {
                    cells.remove(&coords);
                }
            }
        });
    }
}
