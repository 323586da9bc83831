//! Fragments and tags attached to bridged entities.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::component::register_component;
use crate::engine::error::BridgeResult;
use crate::particles::{EmitterHandle, ParticleId, INVALID_ANIM_STATE};
use crate::zones::state_machine::StateMachineEvent;


/// Links an entity to the particle it represents.
///
/// The emitter reference is weak: if it stops resolving, the link is broken
/// and the entity is eligible for cleanup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleLinkFragment {
    /// Linked particle.
    pub particle_id: ParticleId,
    /// Emitter owning the particle.
    pub emitter: Option<EmitterHandle>,
}

impl Default for ParticleLinkFragment {
    fn default() -> Self {
        Self { particle_id: -1, emitter: None }
    }
}

/// World-space position and orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformFragment {
    /// Position.
    pub position: Vec3,
    /// Orientation.
    pub orientation: Quat,
}

impl Default for TransformFragment {
    fn default() -> Self {
        Self { position: Vec3::ZERO, orientation: Quat::IDENTITY }
    }
}

/// World-space velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityFragment {
    /// Velocity.
    pub value: Vec3,
}

/// Animation state shared with the linked particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimStateFragment {
    /// Animation state index, `-1` for none.
    pub anim_state: i32,
}

impl Default for AnimStateFragment {
    fn default() -> Self {
        Self { anim_state: INVALID_ANIM_STATE }
    }
}

/// State-machine events waiting to be delivered for this entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingEventsFragment {
    /// Events in the order they were raised.
    pub events: Vec<StateMachineEvent>,
}

/// Vertical trace window used to snap an entity onto the ground.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTraceFragment {
    /// Distance above the entity where the trace starts.
    pub trace_start_up_offset: f32,
    /// Distance below the entity where the trace ends.
    pub trace_end_down_offset: f32,
    /// Height kept between the ground and the entity.
    pub ground_height_offset: f32,
}

impl Default for GroundTraceFragment {
    fn default() -> Self {
        Self { trace_start_up_offset: 100.0, trace_end_down_offset: 1000.0, ground_height_offset: 0.0 }
    }
}

/// Present from creation until the first Particle→Entity sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeedsInitializationTag;

/// Marks an entity for destruction by the deletion processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingDeletionTag;

/// Registers every fragment and tag the bridge uses. Idempotent.
pub fn register_bridge_fragments() -> BridgeResult<()> {
    register_component::<ParticleLinkFragment>()?;
    register_component::<TransformFragment>()?;
    register_component::<VelocityFragment>()?;
    register_component::<AnimStateFragment>()?;
    register_component::<PendingEventsFragment>()?;
    register_component::<GroundTraceFragment>()?;
    register_component::<NeedsInitializationTag>()?;
    register_component::<PendingDeletionTag>()?;
    Ok(())
}
