//! Enter and exit tasks run on zone transitions.

use log::{info, trace};

use crate::bridge::fragments::{AnimStateFragment, PendingEventsFragment};
use crate::engine::entity::Entity;
use crate::engine::manager::EntityStore;
use crate::zones::state_machine::StateMachineEvent;
use crate::zones::volume::ZoneVolumeId;


/// Which side of a transition a task runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoneTransition {
    /// The entity entered the volume.
    Enter,
    /// The entity left the volume.
    Exit,
}

/// What a task sees while it runs.
pub struct ZoneTaskContext<'a> {
    /// The entity store. No column is locked while tasks run, so tasks may
    /// read and write fragments directly.
    pub store: &'a EntityStore,
    /// Volume whose task list is running.
    pub volume: ZoneVolumeId,
    /// Enter or exit.
    pub transition: ZoneTransition,
}

impl ZoneTaskContext<'_> {
    /// Appends `event` to the entity's [`PendingEventsFragment`]. Returns
    /// `false` if the entity has none.
    pub fn request_event(&self, entity: Entity, event: StateMachineEvent) -> bool {
        self.store
            .with_fragment_mut::<PendingEventsFragment, _>(entity, |pending| pending.events.push(event))
            .is_some()
    }
}

/// One step of an enter or exit task list.
pub trait ZoneTask: Send + Sync {
    /// Runs the task against `entity`.
    fn execute(&self, ctx: &mut ZoneTaskContext<'_>, entity: Entity);
}

/// Queues a named event for the state-machine engine.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEventTask {
    /// Event to queue. An empty name disables the task.
    pub event: StateMachineEvent,
}

impl RequestEventTask {
    /// Queues `event`.
    pub fn new(event: StateMachineEvent) -> Self {
        Self { event }
    }
}

impl ZoneTask for RequestEventTask {
    fn execute(&self, ctx: &mut ZoneTaskContext<'_>, entity: Entity) {
        if self.event.name.is_empty() {
            return;
        }
        if !ctx.request_event(entity, self.event.clone()) {
            trace!("{entity}: no pending-events fragment; `{}` not queued", self.event.name);
        }
    }
}

/// Writes the entity's animation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetAnimStateTask {
    /// State to set.
    pub anim_state: i32,
}

impl ZoneTask for SetAnimStateTask {
    fn execute(&self, ctx: &mut ZoneTaskContext<'_>, entity: Entity) {
        let anim_state = self.anim_state;
        if ctx.store.with_fragment_mut::<AnimStateFragment, _>(entity, |a| a.anim_state = anim_state).is_none() {
            trace!("{entity}: no anim state fragment");
        }
    }
}

/// Logs a message tagged with the entity and volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugLogTask {
    /// Message to log.
    pub message: String,
}

impl ZoneTask for DebugLogTask {
    fn execute(&self, ctx: &mut ZoneTaskContext<'_>, entity: Entity) {
        info!("{entity} {:?} {}: {}", ctx.transition, ctx.volume, self.message);
    }
}
