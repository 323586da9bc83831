//! The particle/entity bridge.
//!
//! * [`fragments`]: the fragments and tags bridged entities carry.
//! * [`template`]: trait-style composition of entity templates.
//! * [`placement`]: spawn placement strategies and their completion channel.
//! * [`lifecycle`]: [`BridgeSubsystem`], the budgeted spawn/destroy queues.
//! * [`sync`]: the three synchronization processors.
//! * [`deletion`]: budgeted destruction of tagged entities.
//! * [`ground`]: optional ground following behavior.

pub mod fragments;
pub mod template;
pub mod placement;
pub mod lifecycle;
pub mod sync;
pub mod deletion;
pub mod ground;

pub use deletion::DeletionProcessor;
pub use fragments::{
    register_bridge_fragments, AnimStateFragment, GroundTraceFragment, NeedsInitializationTag, ParticleLinkFragment,
    PendingDeletionTag, PendingEventsFragment, TransformFragment, VelocityFragment,
};
pub use ground::{FlatGround, GroundFollowingProcessor, GroundHeightProvider};
pub use lifecycle::{BridgeStepStats, BridgeSubsystem, SpawnOutcome};
pub use placement::{
    LimitedPlacementGenerator, ParticlePlacementGenerator, PlacementCompletion, PlacementGenerator,
    PlacementRequest, PlacementSink, RingPlacementGenerator, SpawnPlacement,
};
pub use sync::{AnimStateSyncProcessor, EntityToParticleProcessor, ParticleToEntityProcessor, SyncStats};
pub use template::{
    EntityTemplate, EntityTrait, GroundFollowingTrait, ParticleLinkTrait, TemplateBuilder, ZoneTriggerTrait,
};
