//! Zone volume registry, broad-phase index and per-entity assignment.
//!
//! Volumes are indexed in a [`HierarchicalHashGrid`] at a single query level.
//! Point queries take the broad-phase candidates from the grid cell
//! containing the point and then test each candidate's bounds exactly, so a
//! volume sharing a cell with the point but not containing it never wins.
//!
//! Bounds are closed. The grid files a box whose max face lies on a cell
//! edge under the lower cell only, so a point sitting on a cell edge also
//! draws candidates from the lower neighbour on that axis.

use std::collections::{BTreeMap, HashMap};

use glam::{IVec3, Vec3};
use log::{debug, info, warn};

use crate::engine::entity::Entity;
use crate::spatial::{Aabb, HierarchicalHashGrid};
use crate::zones::volume::{ZoneVolume, ZoneVolumeId};

#[derive(Debug)]
struct RegisteredVolume {
    volume: ZoneVolume,
    grid_index: usize,
}

/// Owns zone volumes and tracks which volume each entity is in.
#[derive(Debug)]
pub struct ZoneTriggerSubsystem {
    grid: HierarchicalHashGrid<ZoneVolumeId>,
    cell_sizes: Vec<f32>,
    query_level: usize,
    volumes: BTreeMap<ZoneVolumeId, RegisteredVolume>,
    next_id: u64,
    entity_volumes: HashMap<Entity, ZoneVolumeId>,
    scratch: Vec<ZoneVolumeId>,
}

impl ZoneTriggerSubsystem {
    /// Creates an uninitialized subsystem. Volumes are indexed at
    /// `query_level` of a grid with one level per entry of `cell_sizes`.
    pub fn new(cell_sizes: Vec<f32>, query_level: usize) -> Self {
        Self {
            grid: HierarchicalHashGrid::new(),
            cell_sizes,
            query_level,
            volumes: BTreeMap::new(),
            next_id: 0,
            entity_volumes: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    /// Builds the grid. Returns `false` if the cell sizes or query level are
    /// unusable; the subsystem then stays uninitialized.
    pub fn initialize(&mut self) -> bool {
        if self.query_level >= self.cell_sizes.len() {
            warn!("zone query level {} outside {} grid levels", self.query_level, self.cell_sizes.len());
            return false;
        }
        let ok = self.grid.init(self.cell_sizes.len(), &self.cell_sizes);
        if ok {
            info!("zone subsystem initialized with cell sizes {:?}", self.cell_sizes);
        } else {
            warn!("zone grid rejected cell sizes {:?}", self.cell_sizes);
        }
        ok
    }

    /// Drops every volume and entity assignment.
    pub fn deinitialize(&mut self) {
        self.grid = HierarchicalHashGrid::new();
        self.volumes.clear();
        self.entity_volumes.clear();
    }

    /// Whether the grid is built.
    pub fn is_initialized(&self) -> bool {
        self.grid.is_initialized()
    }

    /// Grid level volumes are indexed and queried at.
    pub fn query_level(&self) -> usize {
        self.query_level
    }

    /// Registers a volume. Returns `None` if the subsystem is not initialized.
    pub fn register_volume(&mut self, volume: ZoneVolume) -> Option<ZoneVolumeId> {
        let id = ZoneVolumeId(self.next_id);
        let grid_index = self.grid.add(id, &volume.bounds, self.query_level)?;
        self.next_id += 1;
        debug!("registered {id} `{}` priority {}", volume.name, volume.priority);
        self.volumes.insert(id, RegisteredVolume { volume, grid_index });
        Some(id)
    }

    /// Removes a volume. Entities assigned to it keep the stale id until the
    /// zone processor next sees them, which then skips the exit tasks.
    pub fn unregister_volume(&mut self, id: ZoneVolumeId) -> Option<ZoneVolume> {
        let registered = self.volumes.remove(&id)?;
        self.grid.remove(registered.grid_index, &registered.volume.bounds, self.query_level);
        debug!("unregistered {id}");
        Some(registered.volume)
    }

    /// Moves a volume to `bounds`. Returns `false` for unknown ids.
    pub fn update_volume_bounds(&mut self, id: ZoneVolumeId, bounds: Aabb) -> bool {
        let Some(registered) = self.volumes.get_mut(&id) else {
            return false;
        };
        if !self.grid.move_item(registered.grid_index, &registered.volume.bounds, &bounds, self.query_level) {
            return false;
        }
        registered.volume.bounds = bounds;
        true
    }

    /// The volume registered under `id`.
    pub fn volume(&self, id: ZoneVolumeId) -> Option<&ZoneVolume> {
        self.volumes.get(&id).map(|r| &r.volume)
    }

    /// Number of registered volumes.
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Ids of every volume containing `point`, ascending.
    pub fn find_overlapping_volumes_at(&mut self, point: Vec3) -> Vec<ZoneVolumeId> {
        self.collect_candidates(point);
        self.scratch
            .iter()
            .copied()
            .filter(|id| self.volumes.get(id).is_some_and(|r| r.volume.bounds.contains_inclusive(point)))
            .collect()
    }

    /// The highest-priority volume containing `point`. Equal priorities go to
    /// the lowest id.
    pub fn find_best_volume_at(&mut self, point: Vec3) -> Option<ZoneVolumeId> {
        self.collect_candidates(point);
        let mut best: Option<(i32, ZoneVolumeId)> = None;
        for &id in &self.scratch {
            let Some(registered) = self.volumes.get(&id) else { continue };
            if !registered.volume.bounds.contains_inclusive(point) {
                continue;
            }
            let priority = registered.volume.priority;
            best = match best {
                Some((p, b)) if p > priority || (p == priority && b <= id) => Some((p, b)),
                _ => Some((priority, id)),
            };
        }
        best.map(|(_, id)| id)
    }

    /// Fills `scratch` with the sorted, deduplicated broad-phase candidates
    /// for `point`.
    fn collect_candidates(&mut self, point: Vec3) {
        let level = self.query_level;
        self.grid.find_overlapping(point, level, &mut self.scratch);
        let (Some(size), Some(cell)) = (self.grid.cell_size(level), self.grid.cell_coords(point, level)) else {
            return;
        };
        let on_edge = IVec3::from_array(std::array::from_fn(|axis| i32::from(point[axis] % size == 0.0)));
        if on_edge != IVec3::ZERO {
            for dz in 0..=on_edge.z {
                for dy in 0..=on_edge.y {
                    for dx in 0..=on_edge.x {
                        if (dx, dy, dz) == (0, 0, 0) {
                            continue;
                        }
                        let lower = cell - IVec3::new(dx, dy, dz);
                        if let Some(bucket) = self.grid.find_cell(lower.x, lower.y, lower.z, level) {
                            self.scratch.extend(bucket.item_indices().iter().filter_map(|&i| self.grid.item(i).copied()));
                        }
                    }
                }
            }
        }
        self.scratch.sort_unstable();
        self.scratch.dedup();
    }

    /// The volume `entity` was last assigned to.
    pub fn volume_for_entity(&self, entity: Entity) -> Option<ZoneVolumeId> {
        self.entity_volumes.get(&entity).copied()
    }

    /// Assigns `entity` to `volume`, or clears the assignment on `None`.
    pub fn update_entity_current_volume(&mut self, entity: Entity, volume: Option<ZoneVolumeId>) {
        match volume {
            Some(id) => {
                self.entity_volumes.insert(entity, id);
            }
            None => {
                self.entity_volumes.remove(&entity);
            }
        }
    }

    /// Drops `entity`'s assignment. Returns whether it had one.
    pub fn forget_entity(&mut self, entity: Entity) -> bool {
        self.entity_volumes.remove(&entity).is_some()
    }

    /// Number of entities currently assigned to a volume.
    pub fn tracked_entity_count(&self) -> usize {
        self.entity_volumes.len()
    }

    /// Drops assignments of entities for which `alive` is false. Returns how
    /// many were dropped.
    pub fn retain_entities(&mut self, mut alive: impl FnMut(Entity) -> bool) -> usize {
        let before = self.entity_volumes.len();
        self.entity_volumes.retain(|&entity, _| alive(entity));
        before - self.entity_volumes.len()
    }
}

impl Default for ZoneTriggerSubsystem {
    fn default() -> Self {
        Self::new(vec![100.0, 1000.0, 10000.0], 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center_extent(center, Vec3::splat(half))
    }

    fn subsystem() -> ZoneTriggerSubsystem {
        let mut zones = ZoneTriggerSubsystem::default();
        assert!(zones.initialize());
        zones
    }

    #[test]
    fn register_requires_initialization() {
        let mut zones = ZoneTriggerSubsystem::default();
        assert_eq!(zones.register_volume(ZoneVolume::new("a", cube(Vec3::ZERO, 5.0))), None);
        assert!(zones.initialize());
        assert_eq!(zones.register_volume(ZoneVolume::new("a", cube(Vec3::ZERO, 5.0))), Some(ZoneVolumeId(0)));
    }

    #[test]
    fn bad_query_level_fails_initialization() {
        let mut zones = ZoneTriggerSubsystem::new(vec![100.0], 3);
        assert!(!zones.initialize());
        assert!(!zones.is_initialized());
    }

    #[test]
    fn highest_priority_wins_and_ties_go_to_lowest_id() {
        let mut zones = subsystem();
        let low = zones.register_volume(ZoneVolume::new("low", cube(Vec3::ZERO, 50.0)).with_priority(1)).unwrap();
        let high = zones.register_volume(ZoneVolume::new("high", cube(Vec3::ZERO, 10.0)).with_priority(5)).unwrap();
        let tie = zones.register_volume(ZoneVolume::new("tie", cube(Vec3::ZERO, 10.0)).with_priority(5)).unwrap();

        assert_eq!(zones.find_best_volume_at(Vec3::ZERO), Some(high));
        assert_eq!(zones.find_best_volume_at(Vec3::new(30.0, 0.0, 0.0)), Some(low));
        assert_eq!(zones.find_overlapping_volumes_at(Vec3::ZERO), vec![low, high, tie]);

        zones.unregister_volume(high).unwrap();
        assert_eq!(zones.find_best_volume_at(Vec3::ZERO), Some(tie));
    }

    #[test]
    fn same_cell_but_outside_bounds_is_not_a_hit() {
        let mut zones = subsystem();
        zones.register_volume(ZoneVolume::new("corner", Aabb::new(Vec3::ZERO, Vec3::splat(5.0)))).unwrap();
        assert_eq!(zones.find_best_volume_at(Vec3::splat(50.0)), None);
        assert!(zones.find_overlapping_volumes_at(Vec3::splat(50.0)).is_empty());
    }

    #[test]
    fn points_on_the_max_face_are_inside() {
        let mut zones = subsystem();
        let id = zones.register_volume(ZoneVolume::new("box", Aabb::new(Vec3::ZERO, Vec3::splat(100.0)))).unwrap();

        assert_eq!(zones.find_best_volume_at(Vec3::new(100.0, 50.0, 50.0)), Some(id));
        assert_eq!(zones.find_best_volume_at(Vec3::splat(100.0)), Some(id));
        assert_eq!(zones.find_best_volume_at(Vec3::ZERO), Some(id));
        assert_eq!(zones.find_overlapping_volumes_at(Vec3::new(50.0, 100.0, 0.0)), vec![id]);
        assert_eq!(zones.find_best_volume_at(Vec3::new(100.5, 50.0, 50.0)), None);
    }

    #[test]
    fn negative_max_face_is_inside() {
        let mut zones = subsystem();
        let id = zones.register_volume(ZoneVolume::new("west", Aabb::new(Vec3::splat(-200.0), Vec3::splat(-100.0)))).unwrap();
        assert_eq!(zones.find_best_volume_at(Vec3::new(-100.0, -150.0, -150.0)), Some(id));
        assert_eq!(zones.find_best_volume_at(Vec3::new(-99.0, -150.0, -150.0)), None);
    }

    #[test]
    fn moved_volume_is_found_at_its_new_bounds() {
        let mut zones = subsystem();
        let id = zones.register_volume(ZoneVolume::new("mover", cube(Vec3::ZERO, 5.0))).unwrap();
        assert!(zones.update_volume_bounds(id, cube(Vec3::new(500.0, 0.0, 0.0), 5.0)));
        assert_eq!(zones.find_best_volume_at(Vec3::ZERO), None);
        assert_eq!(zones.find_best_volume_at(Vec3::new(500.0, 0.0, 0.0)), Some(id));
        assert!(!zones.update_volume_bounds(ZoneVolumeId(99), cube(Vec3::ZERO, 1.0)));
    }

    #[test]
    fn entity_assignment_tracks_and_forgets() {
        let mut zones = subsystem();
        let entity = Entity(3);
        assert_eq!(zones.volume_for_entity(entity), None);
        zones.update_entity_current_volume(entity, Some(ZoneVolumeId(7)));
        assert_eq!(zones.volume_for_entity(entity), Some(ZoneVolumeId(7)));
        zones.update_entity_current_volume(entity, None);
        assert_eq!(zones.volume_for_entity(entity), None);
        zones.update_entity_current_volume(entity, Some(ZoneVolumeId(1)));
        assert!(zones.forget_entity(entity));
        assert!(!zones.forget_entity(entity));
    }
}
