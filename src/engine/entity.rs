//! Generational entity handles and the sharded slot allocator.
//!
//! An [`Entity`] is an opaque, copyable handle. Destroying an entity bumps the
//! version stored in its slot, so every handle that still carries the old
//! version is detectably stale: `is_alive` returns `false` and lookups return
//! `None`. This is what lets the bridge keep `(emitter, particle) -> entity`
//! mappings and zone assignments without ever dereferencing a dangling entity.
//!
//! Slots are partitioned into shards. Each shard owns its own free list behind
//! a `Mutex`. New entities go to the less loaded of two randomly sampled
//! shards.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::random::tl_rand_u64;
use crate::engine::types::{
    EntityID, ShardID, IndexID, VersionID, EntityCount,
    SHARD_BITS, INDEX_BITS, INDEX_MASK, SHARD_MASK, INDEX_CAP, SHARD_CAP,
    ArchetypeID, RowID,
};
use crate::engine::error::{
    AttributeError, BridgeResult, CapacityError, ShardBoundsError, SpawnError,
};


/// Opaque generational handle to an entity.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Entity(pub EntityID);

#[inline]
const fn make_id(shard: ShardID, index: IndexID, version: VersionID) -> EntityID {
    ((version as EntityID) << (SHARD_BITS + INDEX_BITS)) |
    ((shard as EntityID) << INDEX_BITS) |
    (index as EntityID)
}

#[inline]
fn make_entity(shard: ShardID, index: IndexID, version: VersionID) -> Entity {
    debug_assert!((index as EntityID) <= INDEX_MASK);
    debug_assert!((shard as EntityID) <= SHARD_MASK);
    Entity(make_id(shard, index, version))
}

impl Entity {
    /// Shard the entity was allocated on.
    #[inline] pub fn shard(self) -> ShardID { ((self.0 >> INDEX_BITS) & SHARD_MASK) as ShardID }
    /// Slot index within its shard.
    #[inline] pub fn index(self) -> IndexID { (self.0 & INDEX_MASK) as IndexID }
    /// Generation of the slot when the handle was issued.
    #[inline] pub fn version(self) -> VersionID { (self.0 >> (INDEX_BITS + SHARD_BITS)) as VersionID }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity[{}:{}:{}]", self.shard(), self.index(), self.version())
    }
}

/// Where an entity's fragments live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityLocation {
    /// Archetype table holding the entity.
    pub archetype: ArchetypeID,
    /// Row inside that archetype's columns.
    pub row: RowID,
}

#[derive(Default)]
struct Entities {
    versions: Vec<VersionID>,
    free_store: Vec<IndexID>,
    alive: Vec<bool>,
    locations: Vec<EntityLocation>,
}

impl Entities {
    fn ensure_capacity(&mut self, additional_entities: EntityCount) -> Result<(), CapacityError> {
        if additional_entities == 0 { return Ok(()); }

        let current_entity_count = self.versions.len() as EntityID;
        let entities_needed = current_entity_count + (additional_entities as EntityID);
        let capacity = INDEX_CAP as EntityID + 1;
        if entities_needed > capacity {
            return Err(CapacityError { entities_needed, capacity });
        }

        self.versions.resize(entities_needed as usize, 0);
        self.alive.resize(entities_needed as usize, false);
        self.locations.resize(entities_needed as usize, EntityLocation::default());

        // Reverse so that pop() hands out ascending indices.
        for index in (current_entity_count..entities_needed).rev() {
            self.free_store.push(index as IndexID);
        }
        Ok(())
    }

    fn spawn(&mut self, shard_id: ShardID, location: EntityLocation) -> Result<Entity, CapacityError> {
        let index = match self.free_store.pop() {
            Some(index) => index,
            None => {
                self.ensure_capacity(1024)?;
                self.free_store.pop().ok_or(CapacityError {
                    entities_needed: self.versions.len() as u64 + 1,
                    capacity: self.versions.len() as u64,
                })?
            }
        };

        let version = self.versions[index as usize];
        self.alive[index as usize] = true;
        self.locations[index as usize] = location;

        Ok(make_entity(shard_id, index, version))
    }

    fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) { return false; }
        let index = entity.index() as usize;
        self.versions[index] = self.versions[index].wrapping_add(1);
        self.alive[index] = false;
        self.locations[index] = EntityLocation::default();
        self.free_store.push(entity.index());
        true
    }

    fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        index < self.versions.len()
            && self.alive[index]
            && self.versions[index] == entity.version()
    }

    fn location(&self, entity: Entity) -> Option<EntityLocation> {
        if self.is_alive(entity) {
            Some(self.locations[entity.index() as usize])
        } else {
            None
        }
    }

    fn set_location(&mut self, entity: Entity, location: EntityLocation) -> bool {
        if !self.is_alive(entity) { return false; }
        self.locations[entity.index() as usize] = location;
        true
    }
}

struct Shard {
    entities: Mutex<Entities>,
    live_entity_count: AtomicU32,
}

impl Shard {
    fn new() -> Self {
        Self {
            entities: Mutex::new(Entities::default()),
            live_entity_count: AtomicU32::new(0),
        }
    }

    fn lock(&self) -> BridgeResult<std::sync::MutexGuard<'_, Entities>> {
        self.entities
            .lock()
            .map_err(|_| AttributeError::InternalInvariant("entity shard lock poisoned").into())
    }
}

/// Sharded allocator for entity slots.
pub struct EntityShards {
    shards: Vec<Shard>,
}

impl EntityShards {
    /// Creates an allocator with `n_shards` shards.
    pub fn new(n_shards: usize) -> Result<Self, ShardBoundsError> {
        if n_shards == 0 || n_shards > SHARD_CAP {
            return Err(ShardBoundsError {
                index: n_shards.min(u16::MAX as usize) as ShardID,
                max_index: SHARD_CAP as u32,
            });
        }
        Ok(Self { shards: (0..n_shards).map(|_| Shard::new()).collect() })
    }

    /// Number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize { self.shards.len() }

    /// Total number of live entities across shards.
    pub fn live_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.live_entity_count.load(Ordering::Relaxed) as usize)
            .sum()
    }

    fn pick_shard_p2c(&self) -> ShardID {
        let n = self.shard_count() as u64;
        let shard_id_a = (tl_rand_u64() % n) as ShardID;
        let shard_id_b = (tl_rand_u64() % n) as ShardID;
        if shard_id_a == shard_id_b { return shard_id_a; }

        let load_a = self.shards[shard_id_a as usize].live_entity_count.load(Ordering::Relaxed);
        let load_b = self.shards[shard_id_b as usize].live_entity_count.load(Ordering::Relaxed);
        if load_a <= load_b { shard_id_a } else { shard_id_b }
    }

    /// Allocates an entity on the less loaded of two sampled shards.
    pub fn spawn(&self, location: EntityLocation) -> BridgeResult<Entity> {
        self.spawn_on(self.pick_shard_p2c(), location)
    }

    /// Allocates an entity on a specific shard.
    pub fn spawn_on(&self, shard_id: ShardID, location: EntityLocation) -> BridgeResult<Entity> {
        let shard = self.shards.get(shard_id as usize).ok_or(SpawnError::ShardBounds(ShardBoundsError {
            index: shard_id,
            max_index: (self.shard_count() - 1) as u32,
        }))?;

        let entity = shard.lock()?.spawn(shard_id, location).map_err(SpawnError::from)?;
        shard.live_entity_count.fetch_add(1, Ordering::Relaxed);
        Ok(entity)
    }

    /// Returns `true` if `entity` refers to a live slot with a matching version.
    pub fn is_alive(&self, entity: Entity) -> bool {
        match self.shards.get(entity.shard() as usize) {
            Some(shard) => shard.lock().map(|e| e.is_alive(entity)).unwrap_or(false),
            None => false,
        }
    }

    /// Returns where a live entity's fragments are stored.
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        let shard = self.shards.get(entity.shard() as usize)?;
        shard.lock().ok()?.location(entity)
    }

    /// Updates the stored location of a live entity.
    pub fn set_location(&self, entity: Entity, location: EntityLocation) -> BridgeResult<bool> {
        match self.shards.get(entity.shard() as usize) {
            Some(shard) => Ok(shard.lock()?.set_location(entity, location)),
            None => Ok(false),
        }
    }

    /// Releases the slot of a live entity. Returns `false` for stale handles.
    pub fn despawn(&self, entity: Entity) -> BridgeResult<bool> {
        let Some(shard) = self.shards.get(entity.shard() as usize) else { return Ok(false) };
        if shard.lock()?.despawn(entity) {
            shard.live_entity_count.fetch_sub(1, Ordering::Relaxed);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn despawn_invalidates_old_handle() {
        let shards = EntityShards::new(2).unwrap();
        let entity = shards.spawn(EntityLocation::default()).unwrap();
        assert!(shards.is_alive(entity));
        assert!(shards.despawn(entity).unwrap());
        assert!(!shards.is_alive(entity));
        assert!(!shards.despawn(entity).unwrap());
        assert_eq!(shards.live_count(), 0);
    }

    #[test]
    fn reused_slot_gets_new_version() {
        let shards = EntityShards::new(1).unwrap();
        let first = shards.spawn_on(0, EntityLocation::default()).unwrap();
        shards.despawn(first).unwrap();
        let second = shards.spawn_on(0, EntityLocation::default()).unwrap();
        assert_eq!(first.index(), second.index());
        assert_ne!(first.version(), second.version());
        assert!(!shards.is_alive(first));
        assert!(shards.is_alive(second));
    }

    #[test]
    fn out_of_range_shard_is_rejected() {
        let shards = EntityShards::new(1).unwrap();
        assert!(shards.spawn_on(3, EntityLocation::default()).is_err());
        assert!(EntityShards::new(0).is_err());
    }

    #[test]
    fn locations_follow_live_entities_only() {
        let shards = EntityShards::new(1).unwrap();
        let entity = shards.spawn(EntityLocation::default()).unwrap();
        let moved = EntityLocation { archetype: 3, row: 7 };
        assert!(shards.set_location(entity, moved).unwrap());
        assert_eq!(shards.location(entity), Some(moved));
        shards.despawn(entity).unwrap();
        assert_eq!(shards.location(entity), None);
    }
}
