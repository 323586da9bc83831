//! Spatial indexing.
//!
//! [`HierarchicalHashGrid`] maps boxes to hashed cells at several
//! resolutions and answers broad-phase point queries. The zone subsystem uses
//! it to find candidate volumes around an entity's position.

pub mod aabb;
pub mod hash_grid;

pub use aabb::Aabb;
pub use hash_grid::{CellRange, GridCell, HierarchicalHashGrid};
