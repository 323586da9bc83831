//! Archetype tables.
//!
//! An [`Archetype`] stores every entity that carries exactly the same set of
//! fragments and tags. It is a table: one [`LockedAttribute`] column per
//! component in its [`Signature`], plus the list of entities whose row `i`
//! lives at index `i` of every column.
//!
//! ## Invariants
//! - `entities.len()` equals the length of every column.
//! - Signature bits exactly reflect allocated columns.
//! - Rows are only added or removed through `&mut self`, i.e. at a
//!   structural sync point, never while a processor is iterating.
//! - Removal is swap-remove. The caller must patch the location of the entity
//!   that was swapped into the vacated row, which is returned.

use crate::engine::types::{ArchetypeID, ComponentID, RowID, Signature, COMPONENT_CAP, DynamicBundle};
use crate::engine::storage::LockedAttribute;
use crate::engine::entity::Entity;
use crate::engine::component::make_empty_component;
use crate::engine::error::{AttributeError, BridgeResult};


/// Table of entities sharing one signature.
pub struct Archetype {
    archetype_id: ArchetypeID,
    components: Vec<Option<LockedAttribute>>,
    signature: Signature,
    entities: Vec<Entity>,
}

impl Archetype {
    /// Creates an empty archetype with one column per component in `signature`.
    pub fn new(archetype_id: ArchetypeID, signature: Signature) -> BridgeResult<Self> {
        let mut components: Vec<Option<LockedAttribute>> = (0..COMPONENT_CAP).map(|_| None).collect();
        for component_id in signature.iterate_over_components() {
            components[component_id as usize] = Some(LockedAttribute::new(make_empty_component(component_id)?));
        }
        Ok(Self { archetype_id, components, signature, entities: Vec::new() })
    }

    /// Identifier of this archetype.
    #[inline]
    pub fn archetype_id(&self) -> ArchetypeID { self.archetype_id }

    /// Signature of the components stored.
    #[inline]
    pub fn signature(&self) -> &Signature { &self.signature }

    /// Number of entities stored.
    #[inline]
    pub fn len(&self) -> usize { self.entities.len() }

    /// Returns `true` if no entity is stored.
    #[inline]
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Entities in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] { &self.entities }

    /// Returns `true` if the archetype stores `component_id`.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        self.signature.has(component_id)
    }

    /// Returns the column for `component_id`.
    #[inline]
    pub fn component_locked(&self, component_id: ComponentID) -> Option<&LockedAttribute> {
        self.components.get(component_id as usize).and_then(|c| c.as_ref())
    }

    fn column_mut(&mut self, component_id: ComponentID) -> BridgeResult<&mut LockedAttribute> {
        self.components
            .get_mut(component_id as usize)
            .and_then(|c| c.as_mut())
            .ok_or_else(|| AttributeError::MissingComponent(component_id).into())
    }

    /// Appends `entity` with values taken from `bundle`.
    ///
    /// Every component of the signature must be present in the bundle.
    pub fn push_from_bundle(&mut self, entity: Entity, bundle: &mut dyn DynamicBundle) -> BridgeResult<RowID> {
        let component_ids: Vec<ComponentID> = self.signature.iterate_over_components().collect();
        let mut values = Vec::with_capacity(component_ids.len());
        for component_id in &component_ids {
            let value = bundle
                .take(*component_id)
                .ok_or(AttributeError::MissingComponent(*component_id))?;
            values.push((*component_id, value));
        }
        for (component_id, value) in values {
            self.column_mut(component_id)?.get_mut()?.push_dyn(value)?;
        }
        self.entities.push(entity);
        Ok((self.entities.len() - 1) as RowID)
    }

    /// Removes `row` from every column. Returns the entity now occupying `row`,
    /// if one was swapped in.
    pub fn swap_remove_row(&mut self, row: RowID) -> BridgeResult<Option<Entity>> {
        let row = row as usize;
        if row >= self.entities.len() {
            return Err(AttributeError::RowOutOfBounds { row, length: self.entities.len() }.into());
        }
        for component in self.components.iter_mut().flatten() {
            component.get_mut()?.swap_remove_dyn(row)?;
        }
        self.entities.swap_remove(row);
        Ok(self.entities.get(row).copied())
    }

    /// Moves `row` into `destination`.
    ///
    /// Columns present in both archetypes are moved; columns only in `self`
    /// are dropped. Columns only in `destination` must be filled by the
    /// caller via [`Archetype::push_component_value`] before the next
    /// structural operation.
    ///
    /// Returns the new row in `destination` and the entity swapped into `row`
    /// in `self`, if any.
    pub fn move_row_to_archetype(
        &mut self,
        row: RowID,
        destination: &mut Archetype,
    ) -> BridgeResult<(RowID, Option<Entity>)> {
        let row_index = row as usize;
        if row_index >= self.entities.len() {
            return Err(AttributeError::RowOutOfBounds { row: row_index, length: self.entities.len() }.into());
        }

        let source_ids: Vec<ComponentID> = self.signature.iterate_over_components().collect();
        for component_id in source_ids {
            let source = self.column_mut(component_id)?.get_mut()?;
            if destination.has(component_id) {
                let target = destination.column_mut(component_id)?.get_mut()?;
                source.move_row_to(row_index, target.as_mut())?;
            } else {
                source.swap_remove_dyn(row_index)?;
            }
        }

        let entity = self.entities.swap_remove(row_index);
        destination.entities.push(entity);
        let new_row = (destination.entities.len() - 1) as RowID;
        Ok((new_row, self.entities.get(row_index).copied()))
    }

    /// Appends one value to a single column. Used to complete a row move.
    pub fn push_component_value(
        &mut self,
        component_id: ComponentID,
        value: Box<dyn std::any::Any + Send>,
    ) -> BridgeResult<()> {
        self.column_mut(component_id)?.get_mut()?.push_dyn(value)?;
        Ok(())
    }
}
