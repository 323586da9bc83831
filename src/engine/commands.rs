//! # Commands
//!
//! Deferred structural mutations of the entity store.
//!
//! ## Purpose
//! Processors iterate the store through shared references. Any change that
//! would move rows between archetypes (creating or destroying entities,
//! adding or removing fragments and tags) is recorded as a [`Command`] in
//! the store's [`CommandBuffer`] and applied at the next synchronization
//! point, after every iteration of the current phase has finished.
//!
//! ## Invariants
//! - Commands are applied in the order they were recorded.
//! - A command targeting an entity that has died in the meantime is skipped.
//! - Adding a tag an entity already carries, or removing one it does not
//!   carry, is a no-op. This makes "tag for deletion" safe to issue from
//!   several processors in one step.

use std::any::Any;
use std::sync::Mutex;

use crate::engine::entity::Entity;
use crate::engine::types::ComponentID;
use crate::engine::component::{Bundle, component_id_of};
use crate::engine::error::{BridgeResult, ExecutionError};


/// A deferred structural mutation.
pub enum Command {
    /// Creates a new entity from a bundle.
    Spawn {
        /// Data bundle for the new entity.
        bundle: Bundle,
    },

    /// Destroys an existing entity.
    Despawn {
        /// Entity to be removed.
        entity: Entity,
    },

    /// Adds (or overwrites) a fragment on an existing entity.
    Add {
        /// Target entity.
        entity: Entity,
        /// Identifier of the fragment type to add.
        component_id: ComponentID,
        /// Fragment value; must match the registered type for `component_id`.
        value: Box<dyn Any + Send>,
    },

    /// Removes a fragment or tag from an existing entity.
    Remove {
        /// Target entity.
        entity: Entity,
        /// Identifier of the component to remove.
        component_id: ComponentID,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn { bundle } => write!(f, "Spawn({} values)", bundle.len()),
            Command::Despawn { entity } => write!(f, "Despawn({entity})"),
            Command::Add { entity, component_id, .. } => write!(f, "Add({entity}, {component_id})"),
            Command::Remove { entity, component_id } => write!(f, "Remove({entity}, {component_id})"),
        }
    }
}

/// Thread-safe FIFO of deferred commands.
#[derive(Default)]
pub struct CommandBuffer {
    queue: Mutex<Vec<Command>>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self { Self::default() }

    /// Records a command.
    pub fn push(&self, command: Command) -> BridgeResult<()> {
        self.queue
            .lock()
            .map_err(|_| ExecutionError::CommandBufferPoisoned)?
            .push(command);
        Ok(())
    }

    /// Records a tag or fragment insertion.
    pub fn add<T: 'static + Send + Sync>(&self, entity: Entity, value: T) -> BridgeResult<()> {
        self.push(Command::Add {
            entity,
            component_id: component_id_of::<T>()?,
            value: Box::new(value),
        })
    }

    /// Records a tag or fragment removal.
    pub fn remove<T: 'static + Send + Sync>(&self, entity: Entity) -> BridgeResult<()> {
        self.push(Command::Remove { entity, component_id: component_id_of::<T>()? })
    }

    /// Records an entity destruction.
    pub fn despawn(&self, entity: Entity) -> BridgeResult<()> {
        self.push(Command::Despawn { entity })
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every queued command in FIFO order.
    pub fn drain(&self) -> BridgeResult<Vec<Command>> {
        let mut queue = self.queue.lock().map_err(|_| ExecutionError::CommandBufferPoisoned)?;
        Ok(std::mem::take(&mut *queue))
    }
}
