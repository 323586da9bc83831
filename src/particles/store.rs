//! Per-emitter particle table and spawn/death mailboxes.
//!
//! The particle kernel owns this store: it adds, updates and removes records
//! from its own per-particle loop, and posts particle IDs into the
//! pending-spawn and pending-death mailboxes. The bridge drains both
//! mailboxes once per step and writes synced entity state back into records.
//!
//! Every operation reports failure through a `bool` or a sentinel value. A
//! single bad particle ID must never abort the kernel's batch.

use std::collections::{HashMap, HashSet};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};


/// Identifier of a particle, unique within one emitter instance.
pub type ParticleId = i32;

/// Sentinel animation state meaning "none".
pub const INVALID_ANIM_STATE: i32 = -1;

/// Sentinel spline index meaning "not on a spline".
pub const INVALID_SPLINE_INDEX: i32 = -1;

/// State of one simulated particle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    /// World-space position.
    pub position: Vec3,
    /// World-space velocity.
    pub velocity: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
    /// Animation state index, or [`INVALID_ANIM_STATE`].
    pub anim_state: i32,
    /// Spline index, or [`INVALID_SPLINE_INDEX`].
    pub spline_index: i32,
    /// Progress along the spline.
    pub spline_progress: f32,
}

impl Default for ParticleRecord {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            anim_state: INVALID_ANIM_STATE,
            spline_index: INVALID_SPLINE_INDEX,
            spline_progress: 0.0,
        }
    }
}

impl ParticleRecord {
    /// A record at `position` moving with `velocity`; other fields default.
    pub fn at(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity, ..Self::default() }
    }
}

/// Ordered, duplicate-free list of particle IDs.
#[derive(Clone, Debug, Default)]
struct Mailbox {
    ids: Vec<ParticleId>,
    seen: HashSet<ParticleId>,
}

impl Mailbox {
    fn push(&mut self, id: ParticleId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.seen.clear();
    }

    fn drain(&mut self) -> Vec<ParticleId> {
        self.seen.clear();
        std::mem::take(&mut self.ids)
    }
}

/// Live particle records of one emitter instance.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    records: HashMap<ParticleId, ParticleRecord>,
    pending: Mailbox,
    dead: Mailbox,
}

impl ParticleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` iff a record with `id` exists.
    #[inline]
    pub fn is_valid_index(&self, id: ParticleId) -> bool {
        self.records.contains_key(&id)
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// IDs of every live record, in ascending order.
    pub fn particle_ids(&self) -> Vec<ParticleId> {
        let mut ids: Vec<ParticleId> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // ── record table ────────────────────────────────────────────────────────

    /// Inserts a record. Fails if `id` already exists.
    pub fn add_particle_data(&mut self, id: ParticleId, record: ParticleRecord) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        self.records.insert(id, record);
        true
    }

    /// Overwrites a record. Fails if `id` does not exist.
    pub fn set_particle_data(&mut self, id: ParticleId, record: ParticleRecord) -> bool {
        self.update(id, |r| *r = record)
    }

    /// Overwrites a record's animation state. Fails if `id` does not exist.
    pub fn set_particle_animation_state(&mut self, id: ParticleId, anim_state: i32) -> bool {
        self.update(id, |r| r.anim_state = anim_state)
    }

    /// Overwrites a record's position. Fails if `id` does not exist.
    pub fn set_particle_position(&mut self, id: ParticleId, position: Vec3) -> bool {
        self.update(id, |r| r.position = position)
    }

    /// Overwrites a record's velocity. Fails if `id` does not exist.
    pub fn set_particle_velocity(&mut self, id: ParticleId, velocity: Vec3) -> bool {
        self.update(id, |r| r.velocity = velocity)
    }

    /// Overwrites a record's orientation. Fails if `id` does not exist.
    pub fn set_particle_orientation(&mut self, id: ParticleId, orientation: Quat) -> bool {
        self.update(id, |r| r.orientation = orientation)
    }

    fn update(&mut self, id: ParticleId, f: impl FnOnce(&mut ParticleRecord)) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Deletes a record. Fails if `id` does not exist.
    pub fn remove_particle_data(&mut self, id: ParticleId) -> bool {
        self.records.remove(&id).is_some()
    }

    /// A copy of the record, or the default record if `id` is invalid.
    pub fn particle_data(&self, id: ParticleId) -> ParticleRecord {
        self.records.get(&id).copied().unwrap_or_default()
    }

    /// Position, or `Vec3::ZERO` if `id` is invalid.
    pub fn particle_position(&self, id: ParticleId) -> Vec3 {
        self.records.get(&id).map_or(Vec3::ZERO, |r| r.position)
    }

    /// Velocity, or `Vec3::ZERO` if `id` is invalid.
    pub fn particle_velocity(&self, id: ParticleId) -> Vec3 {
        self.records.get(&id).map_or(Vec3::ZERO, |r| r.velocity)
    }

    /// Orientation, or `Quat::IDENTITY` if `id` is invalid.
    pub fn particle_orientation(&self, id: ParticleId) -> Quat {
        self.records.get(&id).map_or(Quat::IDENTITY, |r| r.orientation)
    }

    /// Animation state, or [`INVALID_ANIM_STATE`] if `id` is invalid.
    pub fn particle_anim_state(&self, id: ParticleId) -> i32 {
        self.records.get(&id).map_or(INVALID_ANIM_STATE, |r| r.anim_state)
    }

    /// Spline index, or [`INVALID_SPLINE_INDEX`] if `id` is invalid.
    pub fn particle_spline_index(&self, id: ParticleId) -> i32 {
        self.records.get(&id).map_or(INVALID_SPLINE_INDEX, |r| r.spline_index)
    }

    /// Spline progress, or `0.0` if `id` is invalid.
    pub fn particle_spline_progress(&self, id: ParticleId) -> f32 {
        self.records.get(&id).map_or(0.0, |r| r.spline_progress)
    }

    // ── mailboxes ───────────────────────────────────────────────────────────

    /// Queues `id` for entity creation. Returns `false` if already queued.
    pub fn add_pending_particle(&mut self, id: ParticleId) -> bool {
        self.pending.push(id)
    }

    /// IDs awaiting entity creation, in insertion order.
    #[inline]
    pub fn pending_particles(&self) -> &[ParticleId] {
        &self.pending.ids
    }

    /// Empties the pending-spawn list.
    pub fn clear_pending_particles(&mut self) {
        self.pending.clear();
    }

    /// Reads and clears the pending-spawn list in one call.
    pub fn drain_pending_particles(&mut self) -> Vec<ParticleId> {
        self.pending.drain()
    }

    /// Reports `id` as dead. Returns `false` if already reported.
    pub fn add_dead_particle(&mut self, id: ParticleId) -> bool {
        self.dead.push(id)
    }

    /// IDs reported dead, in insertion order.
    #[inline]
    pub fn dead_particles(&self) -> &[ParticleId] {
        &self.dead.ids
    }

    /// Empties the pending-death list.
    pub fn clear_dead_particles(&mut self) {
        self.dead.clear();
    }

    /// Reads and clears the pending-death list in one call.
    pub fn drain_dead_particles(&mut self) -> Vec<ParticleId> {
        self.dead.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_duplicates_and_set_requires_existing() {
        let mut store = ParticleStore::new();
        let record = ParticleRecord::at(Vec3::X, Vec3::Y);
        assert!(!store.set_particle_data(1, record));
        assert!(store.add_particle_data(1, record));
        assert!(!store.add_particle_data(1, ParticleRecord::default()));
        assert_eq!(store.particle_position(1), Vec3::X);

        assert!(store.set_particle_animation_state(1, 4));
        assert!(!store.set_particle_animation_state(2, 4));
        assert_eq!(store.particle_anim_state(1), 4);
    }

    #[test]
    fn invalid_ids_return_sentinels() {
        let store = ParticleStore::new();
        assert!(!store.is_valid_index(9));
        assert_eq!(store.particle_position(9), Vec3::ZERO);
        assert_eq!(store.particle_velocity(9), Vec3::ZERO);
        assert_eq!(store.particle_orientation(9), Quat::IDENTITY);
        assert_eq!(store.particle_anim_state(9), INVALID_ANIM_STATE);
        assert_eq!(store.particle_spline_index(9), INVALID_SPLINE_INDEX);
        assert_eq!(store.particle_spline_progress(9), 0.0);
        assert_eq!(store.particle_data(9), ParticleRecord::default());
    }

    #[test]
    fn remove_fails_for_missing_record() {
        let mut store = ParticleStore::new();
        store.add_particle_data(3, ParticleRecord::default());
        assert!(store.remove_particle_data(3));
        assert!(!store.remove_particle_data(3));
        assert!(store.is_empty());
    }

    #[test]
    fn pending_ids_are_deduplicated_until_drained() {
        let mut store = ParticleStore::new();
        assert!(store.add_pending_particle(5));
        assert!(!store.add_pending_particle(5));
        assert!(store.add_pending_particle(6));
        assert_eq!(store.pending_particles(), &[5, 6]);

        store.clear_pending_particles();
        assert!(store.pending_particles().is_empty());
        assert!(store.add_pending_particle(5));
        assert_eq!(store.drain_pending_particles(), vec![5]);
        assert!(store.pending_particles().is_empty());
    }

    #[test]
    fn dead_list_follows_the_same_drain_pattern() {
        let mut store = ParticleStore::new();
        store.add_dead_particle(1);
        store.add_dead_particle(1);
        assert_eq!(store.dead_particles(), &[1]);
        store.clear_dead_particles();
        assert!(store.dead_particles().is_empty());
        assert!(store.add_dead_particle(1));
    }

    #[test]
    fn per_field_setters_leave_other_fields_alone() {
        let mut store = ParticleStore::new();
        let mut record = ParticleRecord::default();
        record.spline_index = 2;
        record.spline_progress = 0.5;
        store.add_particle_data(1, record);
        assert!(store.set_particle_position(1, Vec3::ONE));
        assert!(store.set_particle_velocity(1, Vec3::Z));
        assert!(store.set_particle_orientation(1, Quat::from_rotation_z(1.0)));
        let stored = store.particle_data(1);
        assert_eq!(stored.position, Vec3::ONE);
        assert_eq!(stored.velocity, Vec3::Z);
        assert_eq!(stored.spline_index, 2);
        assert_eq!(stored.spline_progress, 0.5);
        assert_eq!(store.particle_ids(), vec![1]);
    }
}
