//! Budgeted destruction of entities tagged [`PendingDeletionTag`].

use log::debug;

use crate::bridge::fragments::{ParticleLinkFragment, PendingDeletionTag};
use crate::bridge::lifecycle::BridgeSubsystem;
use crate::engine::entity::Entity;
use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::engine::query::{Query, QueryBuilder};
use crate::zones::ZoneTriggerSubsystem;

/// Destroys up to a fixed number of tagged entities per step.
///
/// Destruction is deferred; the entities disappear at the next flush. Their
/// zone assignment and bridge mapping are dropped immediately so nothing
/// resolves to a handle that is about to die.
pub struct DeletionProcessor {
    query: Query,
    max_entities_to_destroy_per_frame: usize,
}

impl DeletionProcessor {
    /// Creates the processor with the given per-step cap.
    pub fn new(max_entities_to_destroy_per_frame: usize) -> BridgeResult<Self> {
        let query = QueryBuilder::new().read::<PendingDeletionTag>()?.build();
        Ok(Self { query, max_entities_to_destroy_per_frame })
    }

    /// Per-step cap.
    pub fn max_entities_to_destroy_per_frame(&self) -> usize {
        self.max_entities_to_destroy_per_frame
    }

    /// Queues destruction of up to the cap of tagged entities. Returns how
    /// many were queued.
    pub fn execute(
        &self,
        store: &EntityStore,
        bridge: &mut BridgeSubsystem,
        zones: &mut ZoneTriggerSubsystem,
    ) -> BridgeResult<usize> {
        let cap = self.max_entities_to_destroy_per_frame;
        let mut doomed: Vec<(Entity, Option<ParticleLinkFragment>)> = Vec::new();

        store.for_each_archetype(&self.query, |view| {
            let remaining = cap.saturating_sub(doomed.len());
            if remaining == 0 {
                return Ok(());
            }
            let take = remaining.min(view.len());
            if view.has::<ParticleLinkFragment>() {
                let links = view.read::<ParticleLinkFragment>()?;
                doomed.extend(view.entities()[..take].iter().zip(links.iter()).map(|(&e, &l)| (e, Some(l))));
            } else {
                doomed.extend(view.entities()[..take].iter().map(|&e| (e, None)));
            }
            Ok(())
        })?;

        for (entity, link) in &doomed {
            if let Some(link) = link {
                bridge.forget_entity(*entity, link);
            }
            zones.forget_entity(*entity);
            store.commands().despawn(*entity)?;
        }
        if !doomed.is_empty() {
            debug!("deletion: destroying {} entities (cap {cap})", doomed.len());
        }
        Ok(doomed.len())
    }
}
