//! Query construction and archetype views.
//!
//! A [`QueryBuilder`] declares which fragments a processor reads, writes,
//! requires or excludes, and produces a [`Query`]. Executing a query with
//! [`EntityStore::for_each_archetype`](crate::engine::manager::EntityStore::for_each_archetype)
//! yields one [`ArchetypeView`] per matching, non-empty archetype. The view hands
//! out locked, typed column slices whose row `i` belongs to
//! `view.entities()[i]`.
//!
//! ## Example
//! ```ignore
//! let query = store.query()
//!     .read::<VelocityFragment>()?
//!     .write::<TransformFragment>()?
//!     .without::<NeedsInitializationTag>()?
//!     .build();
//!
//! store.for_each_archetype(&query, |view| {
//!     let velocities = view.read::<VelocityFragment>()?;
//!     let mut transforms = view.write::<TransformFragment>()?;
//!     for (transform, velocity) in transforms.iter_mut().zip(velocities.iter()) {
//!         transform.position += velocity.value * dt;
//!     }
//!     Ok(())
//! })?;
//! ```
//!
//! ## Concurrency
//! Column guards are `RwLock` guards. Two processors whose declared access
//! sets do not conflict never contend on the same write lock, which is what
//! makes running them in one parallel stage sound.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::engine::archetype::Archetype;
use crate::engine::component::component_id_of;
use crate::engine::entity::Entity;
use crate::engine::error::{AttributeError, BridgeResult};
use crate::engine::storage::{downcast_attribute, downcast_attribute_mut, TypeErasedAttribute};
use crate::engine::types::{AccessSets, QuerySignature, set_read, set_write, set_without};


/// Builder for fragment queries.
#[derive(Default)]
pub struct QueryBuilder {
    signature: QuerySignature,
}

impl QueryBuilder {
    /// Creates a new, empty query builder.
    pub fn new() -> Self { Self::default() }

    /// Declares a read-only dependency on `T`. `T` must be present.
    pub fn read<T: 'static + Send + Sync>(mut self) -> BridgeResult<Self> {
        set_read::<T>(&mut self.signature)?;
        Ok(self)
    }

    /// Declares a mutable dependency on `T`. `T` must be present.
    pub fn write<T: 'static + Send + Sync>(mut self) -> BridgeResult<Self> {
        set_write::<T>(&mut self.signature)?;
        Ok(self)
    }

    /// Excludes archetypes carrying `T`.
    pub fn without<T: 'static + Send + Sync>(mut self) -> BridgeResult<Self> {
        set_without::<T>(&mut self.signature)?;
        Ok(self)
    }

    /// Returns the read/write access sets declared so far.
    pub fn access_sets(&self) -> AccessSets {
        AccessSets { read: self.signature.read, write: self.signature.write }
    }

    /// Finishes the query.
    pub fn build(self) -> Query {
        Query { signature: self.signature }
    }
}

/// A built query.
#[derive(Clone, Copy, Debug, Default)]
pub struct Query {
    signature: QuerySignature,
}

impl Query {
    /// The underlying signature.
    #[inline]
    pub fn signature(&self) -> &QuerySignature { &self.signature }

    /// Returns `true` if `archetype` satisfies the query.
    #[inline]
    pub fn matches(&self, archetype: &Archetype) -> bool {
        self.signature.requires_all(archetype.signature())
    }
}

/// Shared view over one archetype matched by a query.
pub struct ArchetypeView<'a> {
    archetype: &'a Archetype,
}

impl<'a> ArchetypeView<'a> {
    pub(crate) fn new(archetype: &'a Archetype) -> Self {
        Self { archetype }
    }

    /// Entities in row order.
    #[inline]
    pub fn entities(&self) -> &'a [Entity] { self.archetype.entities() }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize { self.archetype.len() }

    /// Returns `true` if the archetype is empty.
    #[inline]
    pub fn is_empty(&self) -> bool { self.archetype.is_empty() }

    /// Returns `true` if the archetype carries `T`.
    pub fn has<T: 'static>(&self) -> bool {
        component_id_of::<T>().map(|id| self.archetype.has(id)).unwrap_or(false)
    }

    /// Locks the `T` column for reading.
    pub fn read<T: 'static + Send + Sync>(&self) -> BridgeResult<ReadColumn<'a, T>> {
        let component_id = component_id_of::<T>()?;
        let locked = self
            .archetype
            .component_locked(component_id)
            .ok_or(AttributeError::MissingComponent(component_id))?;
        let guard = locked.read()?;
        downcast_attribute::<T>(&**guard)?;
        Ok(ReadColumn { guard, _marker: PhantomData })
    }

    /// Locks the `T` column for writing.
    pub fn write<T: 'static + Send + Sync>(&self) -> BridgeResult<WriteColumn<'a, T>> {
        let component_id = component_id_of::<T>()?;
        let locked = self
            .archetype
            .component_locked(component_id)
            .ok_or(AttributeError::MissingComponent(component_id))?;
        let mut guard = locked.write()?;
        downcast_attribute_mut::<T>(&mut **guard)?;
        Ok(WriteColumn { guard, _marker: PhantomData })
    }
}

/// Read-locked typed column. Dereferences to `[T]`.
pub struct ReadColumn<'a, T> {
    guard: RwLockReadGuard<'a, Box<dyn TypeErasedAttribute>>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Deref for ReadColumn<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // Element type was checked when the guard was taken.
        downcast_attribute::<T>(&**self.guard)
            .map(|attribute| attribute.as_slice())
            .unwrap_or(&[])
    }
}

/// Write-locked typed column. Dereferences to `[T]`.
pub struct WriteColumn<'a, T> {
    guard: RwLockWriteGuard<'a, Box<dyn TypeErasedAttribute>>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Deref for WriteColumn<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        downcast_attribute::<T>(&**self.guard)
            .map(|attribute| attribute.as_slice())
            .unwrap_or(&[])
    }
}

impl<T: 'static> DerefMut for WriteColumn<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match downcast_attribute_mut::<T>(&mut **self.guard) {
            Ok(attribute) => attribute.as_mut_slice(),
            Err(_) => &mut [],
        }
    }
}
