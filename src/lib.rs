//! # Particle Entity Bridge
//!
//! Lifecycle bridge between a particle simulation and an archetype entity
//! store. Particles stay cheap and kernel-simulated; the entities linked to
//! them carry behavior, zone membership and state-machine hand-off.
//!
//! ## Design Goals
//! - Budgeted spawn/destroy reconciliation, destroys first
//! - Deferred structural changes, flushed between fixed phases
//! - Weak, generation-checked references to emitters
//! - Parallel behavior stages on an archetype store
//!
//! The entry point is [`BridgeWorld`]; the subsystems it owns are usable on
//! their own for hosts that run their own step.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;
pub mod spatial;
pub mod particles;
pub mod bridge;
pub mod zones;
pub mod config;
pub mod logging;
pub mod world;
pub mod profiling;

pub use profiling::profiler;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Entity store

pub use engine::manager::EntityStore;

pub use engine::entity::Entity;

pub use engine::component::{
    Bundle,
    register_component,
    component_id_of,
};

pub use engine::query::QueryBuilder;

pub use engine::systems::{Processor, ProcessorContext, FnProcessor};
pub use engine::scheduler::Scheduler;

pub use engine::commands::{Command, CommandBuffer};

pub use engine::error::{
    BridgeResult,
    BridgeError,
    SpawnError,
    AttributeError,
    ExecutionError,
};

pub use engine::types::{
    EntityID,
    ComponentID,
    ProcessorID,
};

// Domain

pub use spatial::{Aabb, HierarchicalHashGrid};
pub use particles::{Emitter, EmitterConfig, EmitterHandle, EmitterRegistry, ParticleId, ParticleRecord, ParticleStore};
pub use bridge::{BridgeSubsystem, EntityTemplate, EntityTrait, PlacementGenerator};
pub use zones::{StateMachineEngine, StateMachineEvent, ZoneTask, ZoneTriggerSubsystem, ZoneVolume, ZoneVolumeId};
pub use config::{BridgeConfig, ConfigError, GroundFollowingConfig};
pub use world::{BridgeWorld, WorldStepStats};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use particle_entity_bridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BridgeConfig,
        BridgeWorld,
        Bundle,
        EmitterConfig,
        EmitterHandle,
        Entity,
        EntityStore,
        EntityTemplate,
        Processor,
        ProcessorContext,
        QueryBuilder,
        StateMachineEvent,
        ZoneVolume,
    };
    pub use crate::bridge::{
        AnimStateFragment, NeedsInitializationTag, ParticleLinkFragment, PendingDeletionTag, PendingEventsFragment,
        TransformFragment, VelocityFragment,
    };
}
