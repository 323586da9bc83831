//! The entity store.
//!
//! [`EntityStore`] owns every archetype table, the sharded entity allocator
//! and the deferred command buffer. It is the single place where entities are
//! created and destroyed and where fragments and tags migrate rows between
//! archetypes.
//!
//! ## Access model
//!
//! * Structural changes (`spawn`, `despawn`, `insert_component`,
//!   `remove_component`, `apply_deferred_commands`) take `&mut self`. They can
//!   only happen at a synchronization point, never while a processor holds a
//!   view into an archetype.
//! * Processors receive `&EntityStore`. They read and write fragment values
//!   through locked column views, and record structural intents into
//!   [`EntityStore::commands`].
//!
//! This split is what keeps one processor's "tag for deletion" from
//! corrupting another processor's in-flight iteration.

use std::collections::HashMap;

use log::{trace, warn};
use rayon::prelude::*;

use crate::engine::archetype::Archetype;
use crate::engine::commands::{Command, CommandBuffer};
use crate::engine::component::{component_id_of, Bundle};
use crate::engine::entity::{Entity, EntityLocation, EntityShards};
use crate::engine::error::{AttributeError, BridgeError, BridgeResult, SpawnError, StaleEntityError};
use crate::engine::query::{ArchetypeView, Query, QueryBuilder};
use crate::engine::storage::{downcast_attribute, downcast_attribute_mut};
use crate::engine::types::{ArchetypeID, ComponentID, RowID, Signature};


/// Owner of all entity data.
pub struct EntityStore {
    archetypes: Vec<Archetype>,
    signature_map: HashMap<Signature, ArchetypeID>,
    shards: EntityShards,
    deferred: CommandBuffer,
}

impl EntityStore {
    /// Creates an empty store whose allocator uses `shard_count` shards.
    pub fn new(shard_count: usize) -> BridgeResult<Self> {
        let shards = EntityShards::new(shard_count).map_err(SpawnError::from)?;
        Ok(Self {
            archetypes: Vec::new(),
            signature_map: HashMap::new(),
            shards,
            deferred: CommandBuffer::new(),
        })
    }

    fn get_or_create_archetype(&mut self, signature: &Signature) -> BridgeResult<ArchetypeID> {
        if let Some(&archetype_id) = self.signature_map.get(signature) {
            return Ok(archetype_id);
        }
        let archetype_id = ArchetypeID::try_from(self.archetypes.len())
            .map_err(|_| BridgeError::Internal("archetype capacity exceeded".into()))?;
        self.archetypes.push(Archetype::new(archetype_id, *signature)?);
        self.signature_map.insert(*signature, archetype_id);
        trace!("created archetype {archetype_id}");
        Ok(archetype_id)
    }

    fn get_archetype_pair_mut(
        &mut self,
        a: ArchetypeID,
        b: ArchetypeID,
    ) -> BridgeResult<(&mut Archetype, &mut Archetype)> {
        let (a, b) = (a as usize, b as usize);
        if a == b || a >= self.archetypes.len() || b >= self.archetypes.len() {
            return Err(BridgeError::Internal(format!("invalid archetype pair ({a}, {b})")));
        }
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            Ok((&mut left[a], &mut right[0]))
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            Ok((&mut right[0], &mut left[b]))
        }
    }

    fn location_of(&self, entity: Entity) -> BridgeResult<EntityLocation> {
        self.shards.location(entity).ok_or_else(|| StaleEntityError.into())
    }

    fn patch_location(&self, moved: Option<Entity>, archetype: ArchetypeID, row: RowID) -> BridgeResult<()> {
        if let Some(moved) = moved {
            self.shards.set_location(moved, EntityLocation { archetype, row })?;
        }
        Ok(())
    }

    /// Creates an entity immediately.
    pub fn spawn(&mut self, mut bundle: Bundle) -> BridgeResult<Entity> {
        let signature = bundle.signature();
        if signature.is_empty() {
            return Err(SpawnError::EmptyBundle.into());
        }
        let archetype_id = self.get_or_create_archetype(&signature)?;
        let entity = self.shards.spawn(EntityLocation { archetype: archetype_id, row: 0 })?;
        let row = match self.archetypes[archetype_id as usize].push_from_bundle(entity, &mut bundle) {
            Ok(row) => row,
            Err(error) => {
                self.shards.despawn(entity)?;
                return Err(error);
            }
        };
        self.shards.set_location(entity, EntityLocation { archetype: archetype_id, row })?;
        Ok(entity)
    }

    /// Creates one entity per bundle, in order.
    pub fn spawn_batch<I>(&mut self, bundles: I) -> BridgeResult<Vec<Entity>>
    where
        I: IntoIterator<Item = Bundle>,
    {
        bundles.into_iter().map(|bundle| self.spawn(bundle)).collect()
    }

    /// Destroys an entity immediately. Returns `false` for stale handles.
    pub fn despawn(&mut self, entity: Entity) -> BridgeResult<bool> {
        let Some(location) = self.shards.location(entity) else { return Ok(false) };
        let archetype = &mut self.archetypes[location.archetype as usize];
        let moved = archetype.swap_remove_row(location.row)?;
        self.patch_location(moved, location.archetype, location.row)?;
        self.shards.despawn(entity)
    }

    /// Adds a component, or overwrites it if already present.
    pub fn insert_component(
        &mut self,
        entity: Entity,
        component_id: ComponentID,
        value: Box<dyn std::any::Any + Send>,
    ) -> BridgeResult<()> {
        let location = self.location_of(entity)?;
        let source_id = location.archetype;
        let source_signature = *self.archetypes[source_id as usize].signature();

        if source_signature.has(component_id) {
            let archetype = &self.archetypes[source_id as usize];
            let locked = archetype
                .component_locked(component_id)
                .ok_or(AttributeError::MissingComponent(component_id))?;
            locked.write()?.replace_dyn(location.row as usize, value)?;
            return Ok(());
        }

        let mut destination_signature = source_signature;
        destination_signature.set(component_id);
        let destination_id = self.get_or_create_archetype(&destination_signature)?;

        let (source, destination) = self.get_archetype_pair_mut(source_id, destination_id)?;
        let (new_row, moved) = source.move_row_to_archetype(location.row, destination)?;
        destination.push_component_value(component_id, value)?;

        self.patch_location(moved, source_id, location.row)?;
        self.shards.set_location(entity, EntityLocation { archetype: destination_id, row: new_row })?;
        Ok(())
    }

    /// Removes a component. Returns `false` if the entity did not carry it.
    pub fn remove_component(&mut self, entity: Entity, component_id: ComponentID) -> BridgeResult<bool> {
        let location = self.location_of(entity)?;
        let source_id = location.archetype;
        let source_signature = *self.archetypes[source_id as usize].signature();
        if !source_signature.has(component_id) {
            return Ok(false);
        }

        let mut destination_signature = source_signature;
        destination_signature.clear(component_id);
        let destination_id = self.get_or_create_archetype(&destination_signature)?;

        let (source, destination) = self.get_archetype_pair_mut(source_id, destination_id)?;
        let (new_row, moved) = source.move_row_to_archetype(location.row, destination)?;

        self.patch_location(moved, source_id, location.row)?;
        self.shards.set_location(entity, EntityLocation { archetype: destination_id, row: new_row })?;
        Ok(true)
    }

    /// Records a structural change for the next synchronization point.
    pub fn defer(&self, command: Command) -> BridgeResult<()> {
        self.deferred.push(command)
    }

    /// The deferred command buffer.
    #[inline]
    pub fn commands(&self) -> &CommandBuffer {
        &self.deferred
    }

    /// Applies all queued commands in FIFO order.
    ///
    /// Commands that target entities destroyed earlier in the same batch are
    /// skipped. Any other failure is logged and the remaining commands are
    /// still applied. Returns the number of commands that took effect.
    pub fn apply_deferred_commands(&mut self) -> BridgeResult<usize> {
        let commands = self.deferred.drain()?;
        let mut applied = 0usize;
        for command in commands {
            let result = match command {
                Command::Spawn { bundle } => self.spawn(bundle).map(|_| true),
                Command::Despawn { entity } => self.despawn(entity),
                Command::Add { entity, component_id, value } => {
                    if self.is_alive(entity) {
                        self.insert_component(entity, component_id, value).map(|_| true)
                    } else {
                        Ok(false)
                    }
                }
                Command::Remove { entity, component_id } => {
                    if self.is_alive(entity) {
                        self.remove_component(entity, component_id)
                    } else {
                        Ok(false)
                    }
                }
            };
            match result {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(error) => warn!("deferred command failed: {error}"),
            }
        }
        Ok(applied)
    }

    /// Returns `true` if `entity` is live.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.shards.is_alive(entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.shards.live_count()
    }

    /// Returns `true` if no entity is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a live `entity` carries `T`.
    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        let Ok(component_id) = component_id_of::<T>() else { return false };
        self.shards
            .location(entity)
            .map(|location| self.archetypes[location.archetype as usize].has(component_id))
            .unwrap_or(false)
    }

    /// Runs `f` with a shared reference to the entity's `T`.
    pub fn with_fragment<T: 'static, R>(&self, entity: Entity, f: impl FnOnce(&T) -> R) -> Option<R> {
        let component_id = component_id_of::<T>().ok()?;
        let location = self.shards.location(entity)?;
        let locked = self.archetypes[location.archetype as usize].component_locked(component_id)?;
        let guard = locked.read().ok()?;
        let attribute = downcast_attribute::<T>(&**guard).ok()?;
        attribute.get(location.row as usize).map(f)
    }

    /// Runs `f` with a mutable reference to the entity's `T`.
    ///
    /// Takes the column write lock; callers must not hold a view of the same
    /// column.
    pub fn with_fragment_mut<T: 'static, R>(&self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let component_id = component_id_of::<T>().ok()?;
        let location = self.shards.location(entity)?;
        let locked = self.archetypes[location.archetype as usize].component_locked(component_id)?;
        let mut guard = locked.write().ok()?;
        let attribute = downcast_attribute_mut::<T>(&mut **guard).ok()?;
        attribute.get_mut(location.row as usize).map(f)
    }

    /// Returns a copy of the entity's `T`.
    pub fn get<T: 'static + Clone>(&self, entity: Entity) -> Option<T> {
        self.with_fragment(entity, T::clone)
    }

    /// Starts a query.
    #[inline]
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Calls `f` for every non-empty archetype matching `query`.
    pub fn for_each_archetype<F>(&self, query: &Query, mut f: F) -> BridgeResult<()>
    where
        F: FnMut(ArchetypeView<'_>) -> BridgeResult<()>,
    {
        for archetype in self.archetypes.iter().filter(|a| !a.is_empty() && query.matches(a)) {
            f(ArchetypeView::new(archetype))?;
        }
        Ok(())
    }

    /// Parallel counterpart of [`EntityStore::for_each_archetype`]; archetypes
    /// are visited concurrently.
    pub fn par_for_each_archetype<F>(&self, query: &Query, f: F) -> BridgeResult<()>
    where
        F: Fn(ArchetypeView<'_>) -> BridgeResult<()> + Send + Sync,
    {
        self.archetypes
            .par_iter()
            .filter(|a| !a.is_empty() && query.matches(a))
            .try_for_each(|archetype| f(ArchetypeView::new(archetype)))
    }

    /// Collects every entity matching `query`.
    pub fn matching_entities(&self, query: &Query) -> Vec<Entity> {
        self.archetypes
            .iter()
            .filter(|a| query.matches(a))
            .flat_map(|a| a.entities().iter().copied())
            .collect()
    }
}
