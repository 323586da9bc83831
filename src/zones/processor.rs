//! Per-step zone transition detection and event hand-off.

use std::sync::Arc;

use glam::Vec3;
use log::{trace, warn};

use crate::bridge::fragments::{NeedsInitializationTag, PendingDeletionTag, PendingEventsFragment, TransformFragment};
use crate::engine::entity::Entity;
use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::engine::query::{Query, QueryBuilder};
use crate::zones::state_machine::StateMachineEngine;
use crate::zones::subsystem::ZoneTriggerSubsystem;
use crate::zones::tasks::{ZoneTask, ZoneTaskContext, ZoneTransition};
use crate::zones::volume::ZoneVolumeId;


/// Counters of one zone pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneStats {
    /// Entities examined.
    pub visited: usize,
    /// Entities whose volume changed.
    pub transitions: usize,
    /// Enter and exit tasks executed.
    pub tasks_run: usize,
    /// Events handed to the state-machine engine.
    pub events_delivered: usize,
    /// Events kept because the entity has no state-machine instance yet.
    pub events_retained: usize,
    /// Assignments dropped because their entity no longer exists.
    pub stale_assignments: usize,
}

/// Moves entities between zone volumes and forwards their queued events.
///
/// For each initialized entity not pending deletion: on a volume change the
/// previous volume's exit tasks run, then the new volume's enter tasks, and
/// the assignment is updated. Afterwards any events on the entity's
/// [`PendingEventsFragment`] are delivered (wake first, then each event in
/// order) and cleared. When the engine has no instance for the entity the
/// events stay queued and delivery is retried on every later pass.
pub struct ZoneTriggerProcessor {
    query: Query,
}

impl ZoneTriggerProcessor {
    /// Builds the processor's query.
    pub fn new() -> BridgeResult<Self> {
        let query = QueryBuilder::new()
            .read::<TransformFragment>()?
            .without::<NeedsInitializationTag>()?
            .without::<PendingDeletionTag>()?
            .build();
        Ok(Self { query })
    }

    /// Runs one pass.
    pub fn execute(
        &self,
        store: &EntityStore,
        zones: &mut ZoneTriggerSubsystem,
        machine: &mut dyn StateMachineEngine,
    ) -> BridgeResult<ZoneStats> {
        let mut stats = ZoneStats {
            stale_assignments: zones.retain_entities(|entity| store.is_alive(entity)),
            ..ZoneStats::default()
        };

        // Tasks write fragments, so positions are gathered before any runs.
        let mut tracked: Vec<(Entity, Vec3)> = Vec::new();
        store.for_each_archetype(&self.query, |view| {
            let transforms = view.read::<TransformFragment>()?;
            tracked.extend(view.entities().iter().zip(transforms.iter()).map(|(&e, t)| (e, t.position)));
            Ok(())
        })?;

        for (entity, position) in tracked {
            stats.visited += 1;
            let current = zones.find_best_volume_at(position);
            let previous = zones.volume_for_entity(entity);
            if current != previous {
                stats.transitions += 1;
                trace!("{entity}: zone {previous:?} -> {current:?}");
                if let Some(id) = previous {
                    let tasks = zones.volume(id).map(|v| v.exit_tasks.clone()).unwrap_or_default();
                    stats.tasks_run += run_tasks(store, entity, id, ZoneTransition::Exit, &tasks);
                }
                if let Some(id) = current {
                    let tasks = zones.volume(id).map(|v| v.enter_tasks.clone()).unwrap_or_default();
                    stats.tasks_run += run_tasks(store, entity, id, ZoneTransition::Enter, &tasks);
                }
                zones.update_entity_current_volume(entity, current);
            }
            deliver_pending_events(store, machine, entity, &mut stats);
        }
        Ok(stats)
    }
}

fn run_tasks(
    store: &EntityStore,
    entity: Entity,
    volume: ZoneVolumeId,
    transition: ZoneTransition,
    tasks: &[Arc<dyn ZoneTask>],
) -> usize {
    let mut ctx = ZoneTaskContext { store, volume, transition };
    for task in tasks {
        task.execute(&mut ctx, entity);
    }
    tasks.len()
}

fn deliver_pending_events(
    store: &EntityStore,
    machine: &mut dyn StateMachineEngine,
    entity: Entity,
    stats: &mut ZoneStats,
) {
    let queued = store
        .with_fragment::<PendingEventsFragment, _>(entity, |pending| pending.events.len())
        .unwrap_or(0);
    if queued == 0 {
        return;
    }
    if !machine.has_instance(entity) {
        warn!("{entity}: no state-machine instance; retaining {queued} event(s)");
        stats.events_retained += queued;
        return;
    }
    let events = store
        .with_fragment_mut::<PendingEventsFragment, _>(entity, |pending| std::mem::take(&mut pending.events))
        .unwrap_or_default();
    machine.wake(entity);
    for event in &events {
        machine.send_event(entity, event);
    }
    stats.events_delivered += events.len();
}
