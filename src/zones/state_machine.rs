//! The seam to an external state-machine engine.
//!
//! The zone subsystem does not interpret events. It forwards them by name
//! with an opaque JSON payload and asks the engine to wake the entity.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::entity::Entity;


/// A named event with an opaque payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateMachineEvent {
    /// Event tag.
    pub name: String,
    /// Payload, passed through untouched.
    #[serde(default)]
    pub payload: Value,
}

impl StateMachineEvent {
    /// An event without payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), payload: Value::Null }
    }

    /// An event carrying `payload`.
    pub fn with_payload(name: impl Into<String>, payload: Value) -> Self {
        Self { name: name.into(), payload }
    }
}

/// External engine running per-entity state machines.
pub trait StateMachineEngine: Send {
    /// Returns `true` if the engine holds a state-machine instance for
    /// `entity`. Events for entities without one are retained and retried.
    fn has_instance(&self, entity: Entity) -> bool;

    /// Asks the engine to re-evaluate `entity`.
    fn wake(&mut self, entity: Entity);

    /// Queues `event` for `entity`.
    fn send_event(&mut self, entity: Entity, event: &StateMachineEvent);
}

/// Engine that accepts nothing; every event stays pending.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStateMachine;

impl StateMachineEngine for NullStateMachine {
    fn has_instance(&self, _entity: Entity) -> bool {
        false
    }

    fn wake(&mut self, _entity: Entity) {}

    fn send_event(&mut self, _entity: Entity, _event: &StateMachineEvent) {}
}

#[derive(Debug, Default)]
struct Recording {
    accept_all: bool,
    instances: HashSet<Entity>,
    wakes: Vec<Entity>,
    events: Vec<(Entity, StateMachineEvent)>,
}

/// Engine that records every wake and event.
///
/// Clones share one log, so a test can hand one clone to the world and
/// inspect another.
#[derive(Clone, Debug, Default)]
pub struct RecordingStateMachine {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingStateMachine {
    /// A recorder with an instance for every entity.
    pub fn accepting_all() -> Self {
        let machine = Self::default();
        machine.lock().accept_all = true;
        machine
    }

    /// A recorder with no instances until [`add_instance`](Self::add_instance).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gives `entity` a state-machine instance.
    pub fn add_instance(&self, entity: Entity) {
        self.lock().instances.insert(entity);
    }

    /// Entities woken so far, in order.
    pub fn wakes(&self) -> Vec<Entity> {
        self.lock().wakes.clone()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<(Entity, StateMachineEvent)> {
        self.lock().events.clone()
    }

    /// Names of the events received for `entity`, in order.
    pub fn event_names_for(&self, entity: Entity) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter(|(e, _)| *e == entity)
            .map(|(_, event)| event.name.clone())
            .collect()
    }
}

impl StateMachineEngine for RecordingStateMachine {
    fn has_instance(&self, entity: Entity) -> bool {
        let recording = self.lock();
        recording.accept_all || recording.instances.contains(&entity)
    }

    fn wake(&mut self, entity: Entity) {
        self.lock().wakes.push(entity);
    }

    fn send_event(&mut self, entity: Entity, event: &StateMachineEvent) {
        self.lock().events.push((entity, event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_the_recording() {
        let machine = RecordingStateMachine::new();
        let mut handle = machine.clone();
        let entity = Entity(5);
        assert!(!handle.has_instance(entity));
        machine.add_instance(entity);
        assert!(handle.has_instance(entity));

        handle.wake(entity);
        handle.send_event(entity, &StateMachineEvent::with_payload("open", json!({ "door": 2 })));
        assert_eq!(machine.wakes(), vec![entity]);
        assert_eq!(machine.event_names_for(entity), vec!["open".to_owned()]);
        assert_eq!(machine.events()[0].1.payload["door"], 2);
    }

    #[test]
    fn events_round_trip_through_json_without_payload() {
        let event: StateMachineEvent = serde_json::from_str(r#"{ "name": "enter" }"#).unwrap();
        assert_eq!(event, StateMachineEvent::named("enter"));
    }
}
