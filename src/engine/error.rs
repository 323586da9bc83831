//! Error types for the entity store and the bridge runtime.
//!
//! This module declares focused, composable error types used across entity
//! allocation, fragment storage, command application and configuration. Each
//! error carries enough context to make a failure actionable while remaining
//! small and cheap to pass around or convert into the aggregate
//! [`BridgeError`].
//!
//! ## Where errors appear
//!
//! The particle-facing APIs (particle store, spatial grid, bridge queueing)
//! never return these types: they keep boolean or sentinel contracts because
//! they sit in per-particle loops where one bad record must not abort a batch.
//! The error types below cover the entity store itself, where a failure means
//! an internal invariant has been broken (stale handle, unregistered fragment,
//! poisoned lock) rather than an ordinary runtime condition.
//!
//! ## Typical flow
//! Low-level storage operations return [`AttributeError`]; spawning returns
//! [`SpawnError`]; processors surface everything as [`BridgeError`] through
//! `?`. The world step logs a processor error and continues with the next
//! phase, so a single failure never aborts a step.

use thiserror::Error;

use crate::engine::types::{ShardID, ComponentID};


/// Returned when a shard cannot allocate more entity slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity limit reached ({entities_needed} needed; capacity {capacity})")]
pub struct CapacityError {
    /// Total entities the operation attempted to allocate.
    pub entities_needed: u64,

    /// Current capacity limiting the operation.
    pub capacity: u64,
}

/// Returned when a shard index is outside the allocator's configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("shard index {index} out of bounds (max index {max_index})")]
pub struct ShardBoundsError {
    /// Offending shard index that was requested.
    pub index: ShardID,

    /// Maximum valid shard index (inclusive).
    pub max_index: u32,
}

/// Returned when an `Entity` handle is no longer valid, typically because it
/// was destroyed and its slot reused with a newer version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stale or dead entity reference")]
pub struct StaleEntityError;

/// Returned when a fragment or tag type is used before it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("component type `{type_name}` is not registered")]
pub struct UnregisteredComponentError {
    /// Rust type name of the offending component.
    pub type_name: &'static str,
}

/// Returned when a type-erased value or column does not hold the expected
/// element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("type mismatch: expected `{expected}`, found `{actual}`")]
pub struct TypeMismatchError {
    /// Type expected by the caller.
    pub expected: &'static str,
    /// Type held by the storage.
    pub actual: &'static str,
}

/// Errors raised by fragment column storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// A value of the wrong type was pushed or requested.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),

    /// A row index was outside the column.
    #[error("row {row} out of bounds (length {length})")]
    RowOutOfBounds {
        /// Requested row.
        row: usize,
        /// Column length at the time of the request.
        length: usize,
    },

    /// An archetype does not carry the requested column.
    #[error("component {0} is not stored in this archetype")]
    MissingComponent(ComponentID),

    /// A lock guarding a column was poisoned by a panicking reader or writer.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),
}

/// Errors raised while creating entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The allocator ran out of slots.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// A shard outside the configured range was requested.
    #[error(transparent)]
    ShardBounds(#[from] ShardBoundsError),

    /// Pushing a fragment value into storage failed.
    #[error("fragment storage failed: {0}")]
    StoragePushFailedWith(#[from] AttributeError),

    /// The bundle contained no fragments or tags.
    #[error("cannot spawn an entity with an empty bundle")]
    EmptyBundle,
}

/// Errors raised while applying deferred commands or running processors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// A command targeted an entity that no longer exists.
    #[error(transparent)]
    StaleEntity(#[from] StaleEntityError),

    /// The deferred command buffer lock was poisoned.
    #[error("command buffer lock poisoned")]
    CommandBufferPoisoned,

    /// A processor reported a failure.
    #[error("processor `{name}` failed: {reason}")]
    ProcessorFailed {
        /// Name of the failing processor.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Aggregate error type of the crate.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Entity creation failed.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Column storage failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Command application or processor execution failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A component type was used before registration.
    #[error(transparent)]
    Unregistered(#[from] UnregisteredComponentError),

    /// A stale entity handle was used.
    #[error(transparent)]
    StaleEntity(#[from] StaleEntityError),

    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Any other internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeMismatchError> for BridgeError {
    fn from(error: TypeMismatchError) -> Self {
        BridgeError::Attribute(AttributeError::TypeMismatch(error))
    }
}

impl From<CapacityError> for BridgeError {
    fn from(error: CapacityError) -> Self {
        BridgeError::Spawn(SpawnError::Capacity(error))
    }
}

/// Result alias used throughout the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;
