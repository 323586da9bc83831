//! Type-erased fragment columns.
//!
//! Every archetype stores one column per fragment or tag in its signature.
//! A column is an [`Attribute<T>`], a dense `Vec<T>` whose row `i` belongs to
//! the archetype's `i`-th entity. Archetypes hold columns behind the
//! [`TypeErasedAttribute`] trait so that rows can be moved between archetypes
//! without knowing their concrete types.
//!
//! ## Invariants
//! - All columns of one archetype have the same length.
//! - Removal is always swap-remove; the archetype mirrors the swap in its
//!   entity list.
//! - Tags are zero-sized types, so their columns never allocate.
//!
//! ## Concurrency
//! Columns are wrapped in [`LockedAttribute`] (an `RwLock`), which lets
//! processors that touch disjoint fragments iterate the same archetype in
//! parallel while the store itself is only shared (`&`).

use std::any::{Any, TypeId, type_name};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::error::{AttributeError, TypeMismatchError};


/// Object-safe interface over a typed column.
pub trait TypeErasedAttribute: Any + Send + Sync {
    /// Returns the number of stored rows.
    fn length(&self) -> usize;

    /// Returns an immutable type-erased reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the `TypeId` of the element type.
    fn element_type_id(&self) -> TypeId;

    /// Returns the human-readable name of the element type.
    fn element_type_name(&self) -> &'static str;

    /// Appends a boxed value of the element type.
    fn push_dyn(&mut self, value: Box<dyn Any + Send>) -> Result<(), AttributeError>;

    /// Overwrites the value at `row`.
    fn replace_dyn(&mut self, row: usize, value: Box<dyn Any + Send>) -> Result<(), AttributeError>;

    /// Swap-removes `row` and drops the value.
    fn swap_remove_dyn(&mut self, row: usize) -> Result<(), AttributeError>;

    /// Swap-removes `row` from `self` and appends it to `destination`.
    fn move_row_to(
        &mut self,
        row: usize,
        destination: &mut dyn TypeErasedAttribute,
    ) -> Result<(), AttributeError>;

    /// Creates an empty column of the same element type.
    fn empty_like(&self) -> Box<dyn TypeErasedAttribute>;
}

/// Dense column of fragment values.
#[derive(Debug)]
pub struct Attribute<T> {
    values: Vec<T>,
}

impl<T> Default for Attribute<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T> Attribute<T> {
    /// Appends a value.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.values.push(value);
    }

    /// Returns the value at `row`.
    #[inline]
    pub fn get(&self, row: usize) -> Option<&T> {
        self.values.get(row)
    }

    /// Returns the value at `row` mutably.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        self.values.get_mut(row)
    }

    /// Returns all values as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Returns all values as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterates over the stored values.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    fn check_row(&self, row: usize) -> Result<(), AttributeError> {
        if row >= self.values.len() {
            return Err(AttributeError::RowOutOfBounds { row, length: self.values.len() });
        }
        Ok(())
    }
}

impl<T: 'static + Send + Sync> TypeErasedAttribute for Attribute<T> {
    fn length(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn push_dyn(&mut self, value: Box<dyn Any + Send>) -> Result<(), AttributeError> {
        let value = value.downcast::<T>().map_err(|_| TypeMismatchError {
            expected: type_name::<T>(),
            actual: "<boxed value>",
        })?;
        self.values.push(*value);
        Ok(())
    }

    fn replace_dyn(&mut self, row: usize, value: Box<dyn Any + Send>) -> Result<(), AttributeError> {
        self.check_row(row)?;
        let value = value.downcast::<T>().map_err(|_| TypeMismatchError {
            expected: type_name::<T>(),
            actual: "<boxed value>",
        })?;
        self.values[row] = *value;
        Ok(())
    }

    fn swap_remove_dyn(&mut self, row: usize) -> Result<(), AttributeError> {
        self.check_row(row)?;
        self.values.swap_remove(row);
        Ok(())
    }

    fn move_row_to(
        &mut self,
        row: usize,
        destination: &mut dyn TypeErasedAttribute,
    ) -> Result<(), AttributeError> {
        self.check_row(row)?;
        let actual = destination.element_type_name();
        let destination = destination
            .as_any_mut()
            .downcast_mut::<Attribute<T>>()
            .ok_or(TypeMismatchError { expected: type_name::<T>(), actual })?;
        destination.values.push(self.values.swap_remove(row));
        Ok(())
    }

    fn empty_like(&self) -> Box<dyn TypeErasedAttribute> {
        Box::new(Attribute::<T>::default())
    }
}

/// A thread-safe wrapper around a type-erased column.
pub struct LockedAttribute {
    inner: RwLock<Box<dyn TypeErasedAttribute>>,
}

impl LockedAttribute {
    /// Wraps a column.
    pub fn new(attribute: Box<dyn TypeErasedAttribute>) -> Self {
        Self { inner: RwLock::new(attribute) }
    }

    /// Returns a read guard to the inner column.
    #[inline]
    pub fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, Box<dyn TypeErasedAttribute>>, AttributeError> {
        self.inner
            .read()
            .map_err(|_| AttributeError::InternalInvariant("LockedAttribute read lock poisoned"))
    }

    /// Returns a write guard to the inner column.
    #[inline]
    pub fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Box<dyn TypeErasedAttribute>>, AttributeError> {
        self.inner
            .write()
            .map_err(|_| AttributeError::InternalInvariant("LockedAttribute write lock poisoned"))
    }

    /// Exclusive access without locking, for structural changes.
    #[inline]
    pub fn get_mut(&mut self) -> Result<&mut Box<dyn TypeErasedAttribute>, AttributeError> {
        self.inner
            .get_mut()
            .map_err(|_| AttributeError::InternalInvariant("LockedAttribute poisoned"))
    }
}

/// Downcasts a type-erased column to its concrete type.
#[inline]
pub fn downcast_attribute<T: 'static>(
    attribute: &dyn TypeErasedAttribute,
) -> Result<&Attribute<T>, AttributeError> {
    let actual = attribute.element_type_name();
    attribute
        .as_any()
        .downcast_ref::<Attribute<T>>()
        .ok_or_else(|| TypeMismatchError { expected: type_name::<T>(), actual }.into())
}

/// Mutable counterpart of [`downcast_attribute`].
#[inline]
pub fn downcast_attribute_mut<T: 'static>(
    attribute: &mut dyn TypeErasedAttribute,
) -> Result<&mut Attribute<T>, AttributeError> {
    let actual = attribute.element_type_name();
    attribute
        .as_any_mut()
        .downcast_mut::<Attribute<T>>()
        .ok_or_else(|| TypeMismatchError { expected: type_name::<T>(), actual }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_row_swaps_and_appends() {
        let mut source = Attribute::<u32>::default();
        source.push(1);
        source.push(2);
        source.push(3);
        let mut destination: Box<dyn TypeErasedAttribute> = source.empty_like();

        source.move_row_to(0, destination.as_mut()).unwrap();

        assert_eq!(source.as_slice(), &[3, 2]);
        assert_eq!(downcast_attribute::<u32>(destination.as_ref()).unwrap().as_slice(), &[1]);
    }

    #[test]
    fn push_dyn_rejects_wrong_type() {
        let mut column = Attribute::<f32>::default();
        assert!(column.push_dyn(Box::new(1u8)).is_err());
        assert!(column.push_dyn(Box::new(1.5f32)).is_ok());
        assert_eq!(column.length(), 1);
    }

    #[test]
    fn out_of_bounds_row_is_an_error() {
        let mut column = Attribute::<f32>::default();
        assert_eq!(
            column.swap_remove_dyn(0),
            Err(AttributeError::RowOutOfBounds { row: 0, length: 0 })
        );
    }
}
