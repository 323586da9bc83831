//! # Fragment Registry
//!
//! A process-wide registry that assigns stable `ComponentID` values to the
//! Rust types used as fragments and tags, and keeps the factory used to
//! allocate an empty column of each type.
//!
//! ## Design
//! - Types are registered once and receive a compact ID in `[0, COMPONENT_CAP)`.
//! - Registration is idempotent; registering the same type again returns the
//!   existing ID. This lets every [`EntityStore`](crate::engine::manager::EntityStore)
//!   register the built-in fragments on construction without coordination.
//! - A per-type factory builds empty [`Attribute`] columns for archetypes.
//!
//! ## Concurrency
//! The registry sits behind an `RwLock`: lookups are concurrent, registration
//! is serialized.

use std::{
    any::{TypeId, type_name},
    mem::{size_of, align_of},
    sync::{OnceLock, RwLock},
    collections::HashMap,
};

use crate::engine::storage::{Attribute, TypeErasedAttribute};
use crate::engine::types::{ComponentID, COMPONENT_CAP};
use crate::engine::error::{AttributeError, BridgeError, BridgeResult, UnregisteredComponentError};

pub use crate::engine::types::Bundle;


/// Factory function for constructing an empty type-erased column.
type FactoryFn = fn() -> Box<dyn TypeErasedAttribute>;

fn new_attribute_storage<T: 'static + Send + Sync>() -> Box<dyn TypeErasedAttribute> {
    Box::new(Attribute::<T>::default())
}

/// Global mapping between Rust types and compact `ComponentID` values.
///
/// ## Invariants
/// - Every entry in `by_type` has a matching `by_id[id]` and `factories[id]`.
/// - IDs are always in bounds of `COMPONENT_CAP`.
pub struct ComponentRegistry {
    next_id: ComponentID,
    by_type: HashMap<TypeId, ComponentID>,
    by_id: Vec<Option<ComponentDesc>>,
    factories: Vec<Option<FactoryFn>>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn component_registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            next_id: 0,
            by_type: HashMap::new(),
            by_id: vec![None; COMPONENT_CAP],
            factories: vec![None; COMPONENT_CAP],
        })
    })
}

fn poisoned() -> BridgeError {
    AttributeError::InternalInvariant("component registry lock poisoned").into()
}

impl ComponentRegistry {
    /// Registers `T` and returns its ID, or the existing ID if already known.
    pub fn register<T: 'static + Send + Sync>(&mut self) -> BridgeResult<ComponentID> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        let id = self.next_id;
        if (id as usize) >= COMPONENT_CAP {
            return Err(BridgeError::Internal(format!(
                "component capacity {COMPONENT_CAP} exceeded registering `{}`",
                type_name::<T>()
            )));
        }
        self.next_id += 1;
        self.by_type.insert(type_id, id);
        self.by_id[id as usize] = Some(ComponentDesc::of::<T>().with_id(id));
        self.factories[id as usize] = Some(new_attribute_storage::<T>);
        Ok(id)
    }

    /// Returns the `ComponentID` for a runtime `TypeId`, if registered.
    pub fn component_id_of_type_id(&self, type_id: TypeId) -> Option<ComponentID> {
        self.by_type.get(&type_id).copied()
    }

    /// Returns the descriptor for `component_id`, if registered.
    pub fn description_by_component_id(&self, component_id: ComponentID) -> Option<&ComponentDesc> {
        self.by_id.get(component_id as usize).and_then(|d| d.as_ref())
    }
}

/// Registers `T` in the global registry and returns its `ComponentID`.
pub fn register_component<T: 'static + Send + Sync>() -> BridgeResult<ComponentID> {
    component_registry().write().map_err(|_| poisoned())?.register::<T>()
}

/// Returns the registered `ComponentID` for `T`.
pub fn component_id_of<T: 'static>() -> BridgeResult<ComponentID> {
    component_registry()
        .read()
        .map_err(|_| poisoned())?
        .component_id_of_type_id(TypeId::of::<T>())
        .ok_or_else(|| UnregisteredComponentError { type_name: type_name::<T>() }.into())
}

/// Returns a copy of the descriptor for `component_id`, if registered.
pub fn component_description_by_component_id(component_id: ComponentID) -> Option<ComponentDesc> {
    let registry = component_registry().read().ok()?;
    registry.description_by_component_id(component_id).copied()
}

/// Creates an empty column for `component_id`.
pub fn make_empty_component(component_id: ComponentID) -> BridgeResult<Box<dyn TypeErasedAttribute>> {
    let registry = component_registry().read().map_err(|_| poisoned())?;
    let factory = registry
        .factories
        .get(component_id as usize)
        .copied()
        .flatten()
        .ok_or(AttributeError::MissingComponent(component_id))?;
    Ok(factory())
}

/// Describes a registered fragment or tag type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    /// Runtime identifier assigned to this type.
    pub component_id: ComponentID,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the type.
    pub type_id: TypeId,

    /// Size in bytes; zero for tags.
    pub size: usize,

    /// Alignment in bytes.
    pub align: usize,
}

impl ComponentDesc {
    /// Descriptor for `T` with `component_id = 0`; finalize with [`ComponentDesc::with_id`].
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            component_id: 0,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    /// Returns `true` if this type carries no data.
    #[inline]
    pub fn is_tag(&self) -> bool {
        self.size == 0
    }

    /// Returns a copy with `component_id` set.
    #[inline]
    pub fn with_id(mut self, component_id: ComponentID) -> Self {
        self.component_id = component_id;
        self
    }
}

impl std::fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentDesc {{ id: {}, name: {}, size: {} }}", self.component_id, self.name, self.size)
    }
}
