//! The bridge subsystem: particle births and deaths become entity spawns and
//! deletions under a per-step work budget.
//!
//! ## Step phases
//!
//! 1. **Collect**: drain every registered emitter's pending-spawn and
//!    pending-death mailboxes. Spawn IDs become one queued
//!    [`PlacementRequest`] per emitter. Dead IDs are resolved through the
//!    `(emitter, particle) → entity` map; unknown IDs are dropped.
//! 2. **Prune**: forget emitters whose handle no longer resolves, along with
//!    their particle map.
//! 3. **Destroy budget**: tag queued entities with [`PendingDeletionTag`]
//!    (deferred) until the queue is empty or the budget is spent.
//! 4. **Spawn budget**: while budget remains, dispatch queued requests to
//!    the emitter's placement generator. The budget is charged with the
//!    whole batch before generation, so the last batch may overshoot.
//! 5. **Completions**: drain finished placement batches and create entities.
//!
//! Destroys are drained before spawns, so under load the population shrinks
//! before it grows.
//!
//! ## Partial fulfilment
//! A completion with fewer placements than particle IDs links the first
//! `placements.len()` particles and re-queues the rest at the back of the
//! spawn queue.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace, warn};

use crate::bridge::fragments::{register_bridge_fragments, ParticleLinkFragment, PendingDeletionTag, TransformFragment};
use crate::bridge::placement::{
    ParticlePlacementGenerator, PlacementCompletion, PlacementGenerator, PlacementRequest, PlacementSink,
};
use crate::engine::component::component_id_of;
use crate::engine::entity::Entity;
use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::particles::{EmitterHandle, EmitterRegistry, ParticleId};
use crate::profiler::{self, Arg};

/// Completions in a row that may place nothing before a batch is dropped.
pub const MAX_STALLED_PLACEMENTS: u32 = 3;

/// Counters describing one bridge step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStepStats {
    /// Particle IDs collected from pending-spawn mailboxes.
    pub collected_spawn_ids: usize,
    /// Dead particle IDs that resolved to a linked entity.
    pub resolved_dead_ids: usize,
    /// Emitters pruned because their handle expired.
    pub pruned_emitters: usize,
    /// Entities tagged for deletion.
    pub destroys_tagged: usize,
    /// Budget consumed by destroys and dispatched spawn batches.
    pub budget_used: usize,
    /// Spawn batches handed to a placement generator.
    pub batches_dispatched: usize,
    /// Entities created from completed placement batches.
    pub entities_spawned: usize,
    /// Particle IDs re-queued after partial fulfilment.
    pub requeued_ids: usize,
    /// Leftover particle IDs dropped instead of re-queued.
    pub dropped_ids: usize,
    /// Mappings dropped because their entity was despawned elsewhere.
    pub stale_links_pruned: usize,
}

/// Reconciles emitters with the entity store once per step.
pub struct BridgeSubsystem {
    initialized: bool,
    max_entities_to_process_per_frame: usize,
    registered: BTreeSet<EmitterHandle>,
    spawn_queue: VecDeque<PlacementRequest>,
    destroy_queue: VecDeque<Entity>,
    particle_entities: HashMap<EmitterHandle, HashMap<ParticleId, Entity>>,
    completion_tx: Sender<PlacementCompletion>,
    completion_rx: Receiver<PlacementCompletion>,
    fallback: ParticlePlacementGenerator,
    in_flight: usize,
}

impl BridgeSubsystem {
    /// Creates an uninitialized subsystem with the given per-step budget.
    pub fn new(max_entities_to_process_per_frame: usize) -> Self {
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        Self {
            initialized: false,
            max_entities_to_process_per_frame,
            registered: BTreeSet::new(),
            spawn_queue: VecDeque::new(),
            destroy_queue: VecDeque::new(),
            particle_entities: HashMap::new(),
            completion_tx,
            completion_rx,
            fallback: ParticlePlacementGenerator,
            in_flight: 0,
        }
    }

    /// Registers the bridge fragments and enables stepping.
    pub fn initialize(&mut self) -> BridgeResult<()> {
        register_bridge_fragments()?;
        self.initialized = true;
        info!("bridge subsystem initialized (budget {})", self.max_entities_to_process_per_frame);
        Ok(())
    }

    /// Drops all registrations, queues and mappings and disables stepping.
    /// Placement batches still in flight complete into the void.
    pub fn deinitialize(&mut self) {
        self.initialized = false;
        self.registered.clear();
        self.spawn_queue.clear();
        self.destroy_queue.clear();
        self.particle_entities.clear();
        while self.completion_rx.try_recv().is_ok() {}
        self.in_flight = 0;
        info!("bridge subsystem deinitialized");
    }

    /// Returns `true` between `initialize` and `deinitialize`.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Per-step budget shared by destroys and spawns.
    #[inline]
    pub fn max_entities_to_process_per_frame(&self) -> usize {
        self.max_entities_to_process_per_frame
    }

    /// Changes the per-step budget.
    pub fn set_max_entities_to_process_per_frame(&mut self, max: usize) {
        self.max_entities_to_process_per_frame = max;
    }

    // ── registration ────────────────────────────────────────────────────────

    /// Adds an emitter to the live set. Returns `false` if already present.
    pub fn register_emitter(&mut self, emitter: EmitterHandle) -> bool {
        let added = self.registered.insert(emitter);
        if added {
            info!("bridge: registering {emitter}");
        }
        added
    }

    /// Removes an emitter and discards its particle→entity map.
    pub fn unregister_emitter(&mut self, emitter: EmitterHandle) -> bool {
        let removed = self.registered.remove(&emitter);
        if removed {
            info!("bridge: unregistering {emitter}");
        }
        self.particle_entities.remove(&emitter);
        removed
    }

    /// Returns `true` if `emitter` is in the live set.
    pub fn is_registered(&self, emitter: EmitterHandle) -> bool {
        self.registered.contains(&emitter)
    }

    /// Registered emitters, ordered by handle.
    pub fn registered_emitters(&self) -> Vec<EmitterHandle> {
        self.registered.iter().copied().collect()
    }

    // ── introspection ───────────────────────────────────────────────────────

    /// Number of queued spawn batches.
    pub fn pending_spawn_requests(&self) -> usize {
        self.spawn_queue.len()
    }

    /// Number of particle IDs across all queued spawn batches.
    pub fn pending_spawn_ids(&self) -> usize {
        self.spawn_queue.iter().map(PlacementRequest::count).sum()
    }

    /// Number of entities waiting to be tagged for deletion.
    pub fn pending_destroy_requests(&self) -> usize {
        self.destroy_queue.len()
    }

    /// Placement batches dispatched but not yet completed.
    pub fn in_flight_placements(&self) -> usize {
        self.in_flight
    }

    /// The entity linked to `particle_id` of `emitter`, if any.
    pub fn entity_for_particle(&self, emitter: EmitterHandle, particle_id: ParticleId) -> Option<Entity> {
        self.particle_entities.get(&emitter)?.get(&particle_id).copied()
    }

    /// Number of recorded particle→entity links.
    pub fn linked_entity_count(&self) -> usize {
        self.particle_entities.values().map(HashMap::len).sum()
    }

    /// Drops the mapping for a destroyed entity. Returns `true` if the
    /// mapping pointed at `entity`.
    pub fn forget_entity(&mut self, entity: Entity, link: &ParticleLinkFragment) -> bool {
        let Some(emitter) = link.emitter else { return false };
        let Some(map) = self.particle_entities.get_mut(&emitter) else { return false };
        if map.get(&link.particle_id) == Some(&entity) {
            map.remove(&link.particle_id);
            return true;
        }
        false
    }

    // ── step ────────────────────────────────────────────────────────────────

    /// Runs collect, prune, destroy-budget, spawn-budget and completion
    /// processing.
    ///
    /// Deletion tags are deferred; spawned entities are created immediately.
    pub fn step(&mut self, store: &mut EntityStore, emitters: &EmitterRegistry) -> BridgeResult<BridgeStepStats> {
        let mut stats = BridgeStepStats::default();
        if !self.initialized {
            return Ok(stats);
        }

        let expired = {
            let _span = profiler::span("bridge::collect");
            self.collect(emitters, &mut stats)
        };
        {
            let _span = profiler::span("bridge::prune");
            for emitter in expired {
                self.registered.remove(&emitter);
                self.particle_entities.remove(&emitter);
                stats.pruned_emitters += 1;
                info!("bridge: pruned expired {emitter}");
            }
            for map in self.particle_entities.values_mut() {
                let before = map.len();
                map.retain(|_, entity| store.is_alive(*entity));
                stats.stale_links_pruned += before - map.len();
            }
        }

        let mut processed = 0usize;
        {
            let _span = profiler::span("bridge::destroy_budget");
            while processed < self.max_entities_to_process_per_frame {
                let Some(entity) = self.destroy_queue.pop_front() else { break };
                if store.is_alive(entity) {
                    store.commands().add(entity, PendingDeletionTag)?;
                    stats.destroys_tagged += 1;
                }
                processed += 1;
            }
        }
        {
            let _span = profiler::span("bridge::spawn_budget");
            while processed < self.max_entities_to_process_per_frame {
                let Some(request) = self.spawn_queue.pop_front() else { break };
                if request.particle_ids.is_empty() || !self.registered.contains(&request.emitter) {
                    continue;
                }
                let Some(emitter) = emitters.get(request.emitter) else {
                    trace!("bridge: dropping spawn batch for expired {}", request.emitter);
                    continue;
                };

                processed += request.count();
                stats.batches_dispatched += 1;
                self.in_flight += 1;

                let sink = PlacementSink::new(request, self.completion_tx.clone());
                match &emitter.config().placement {
                    Some(generator) => generator.generate(&emitter, sink),
                    None => self.fallback.generate(&emitter, sink),
                }
            }
        }
        stats.budget_used = processed;

        let _span = profiler::span("bridge::completions").arg("in_flight", Arg::U64(self.in_flight as u64));
        self.process_completions(store, emitters, &mut stats)?;

        if stats != BridgeStepStats::default() {
            debug!(
                "bridge step: {stats:?}; queued spawn batches {}, queued destroys {}",
                self.spawn_queue.len(),
                self.destroy_queue.len()
            );
        }
        Ok(stats)
    }

    fn collect(&mut self, emitters: &EmitterRegistry, stats: &mut BridgeStepStats) -> Vec<EmitterHandle> {
        let mut expired = Vec::new();
        for &handle in &self.registered {
            let Some(emitter) = emitters.get(handle) else {
                expired.push(handle);
                continue;
            };
            let (pending, dead) = emitter.with_store(|store| (store.drain_pending_particles(), store.drain_dead_particles()));

            if !pending.is_empty() {
                stats.collected_spawn_ids += pending.len();
                self.spawn_queue.push_back(PlacementRequest::new(handle, pending));
            }
            if let Some(map) = self.particle_entities.get_mut(&handle) {
                for particle_id in dead {
                    if let Some(entity) = map.remove(&particle_id) {
                        self.destroy_queue.push_back(entity);
                        stats.resolved_dead_ids += 1;
                    }
                }
            }
        }
        expired
    }

    /// Drains every finished placement batch without blocking.
    pub fn process_completions(
        &mut self,
        store: &mut EntityStore,
        emitters: &EmitterRegistry,
        stats: &mut BridgeStepStats,
    ) -> BridgeResult<()> {
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let request_len = completion.request.count();
            let spawned = self.on_spawn_data_generated(store, emitters, completion)?;
            stats.entities_spawned += spawned.spawned;
            stats.requeued_ids += spawned.requeued;
            stats.dropped_ids += spawned.dropped;
            trace!("bridge: completion of {request_len} ids spawned {}", spawned.spawned);
        }
        Ok(())
    }

    /// Creates entities for a completed placement batch.
    ///
    /// No-op if the emitter was unregistered or removed in the meantime.
    /// Creates `min(ids, placements)` entities in one batch, writes each
    /// one's link and transform, and records the particle→entity mapping.
    /// Particles already linked to a live entity are skipped.
    pub fn on_spawn_data_generated(
        &mut self,
        store: &mut EntityStore,
        emitters: &EmitterRegistry,
        completion: PlacementCompletion,
    ) -> BridgeResult<SpawnOutcome> {
        let PlacementCompletion { request, placements } = completion;
        let handle = request.emitter;
        if !self.registered.contains(&handle) {
            trace!("bridge: completion for unregistered {handle} ignored");
            return Ok(SpawnOutcome::default());
        }
        let Some(emitter) = emitters.get(handle) else {
            trace!("bridge: completion for expired {handle} ignored");
            return Ok(SpawnOutcome::default());
        };

        let count = request.count().min(placements.len());
        let mut outcome = SpawnOutcome::default();
        if count < request.count() {
            let mut leftover = request.particle_ids[count..].to_vec();
            let short = leftover.len();
            emitter.with_store(|particles| leftover.retain(|&id| particles.is_valid_index(id)));
            outcome.dropped = short - leftover.len();
            let stalled = if count == 0 { request.stalled + 1 } else { 0 };

            if leftover.is_empty() {
                debug!("bridge: {short} unplaced particles of {handle} died in flight");
            } else if stalled >= MAX_STALLED_PLACEMENTS {
                warn!("bridge: placement for {handle} stalled {stalled} times; dropping {} particles", leftover.len());
                outcome.dropped += leftover.len();
            } else {
                warn!(
                    "bridge: {} of {} placements generated for {handle}; re-queueing {} particles",
                    count,
                    request.count(),
                    leftover.len()
                );
                outcome.requeued = leftover.len();
                self.spawn_queue.push_back(PlacementRequest { emitter: handle, particle_ids: leftover, stalled });
            }
        }

        let link_id = component_id_of::<ParticleLinkFragment>()?;
        let transform_id = component_id_of::<TransformFragment>()?;
        let template = &emitter.config().template;
        let map = self.particle_entities.entry(handle).or_default();

        let mut particle_ids = Vec::with_capacity(count);
        let mut bundles = Vec::with_capacity(count);
        for (&particle_id, placement) in request.particle_ids[..count].iter().zip(&placements) {
            if map.get(&particle_id).is_some_and(|&entity| store.is_alive(entity)) {
                trace!("bridge: particle {particle_id} of {handle} already linked");
                continue;
            }
            let mut bundle = template.bundle();
            bundle.insert(link_id, ParticleLinkFragment { particle_id, emitter: Some(handle) });
            bundle.insert(
                transform_id,
                TransformFragment { position: placement.position, orientation: placement.orientation },
            );
            particle_ids.push(particle_id);
            bundles.push(bundle);
        }

        let entities = store.spawn_batch(bundles)?;
        outcome.spawned = entities.len();
        for (particle_id, entity) in particle_ids.into_iter().zip(entities) {
            trace!("bridge: {entity} linked to particle {particle_id} of {handle}");
            map.insert(particle_id, entity);
        }
        Ok(outcome)
    }
}

/// Result of handling one placement completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnOutcome {
    /// Entities created.
    pub spawned: usize,
    /// Particle IDs re-queued because placements ran short.
    pub requeued: usize,
    /// Leftover particle IDs dropped: dead in flight, or the batch stalled.
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fragments::NeedsInitializationTag;
    use crate::bridge::template::EntityTemplate;
    use crate::particles::{Emitter, EmitterConfig, ParticleRecord};
    use glam::Vec3;

    fn setup(budget: usize) -> (BridgeSubsystem, EntityStore, EmitterRegistry, EmitterHandle) {
        let mut bridge = BridgeSubsystem::new(budget);
        bridge.initialize().unwrap();
        let store = EntityStore::new(2).unwrap();
        let mut emitters = EmitterRegistry::new();
        let config = EmitterConfig::new(EntityTemplate::particle_default().unwrap());
        let handle = emitters.insert(Emitter::new("test", config));
        bridge.register_emitter(handle);
        (bridge, store, emitters, handle)
    }

    fn add_particles(emitters: &EmitterRegistry, handle: EmitterHandle, ids: std::ops::Range<i32>) {
        emitters.with_store(handle, |store| {
            for id in ids {
                store.add_particle_data(id, ParticleRecord::at(Vec3::splat(id as f32), Vec3::ZERO));
                store.add_pending_particle(id);
            }
        });
    }

    #[test]
    fn registration_has_set_semantics() {
        let (mut bridge, _, _, handle) = setup(10);
        assert!(!bridge.register_emitter(handle));
        assert_eq!(bridge.registered_emitters(), vec![handle]);
        assert!(bridge.unregister_emitter(handle));
        assert!(!bridge.unregister_emitter(handle));
    }

    #[test]
    fn pending_particles_become_linked_entities() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..3);

        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.collected_spawn_ids, 3);
        assert_eq!(stats.entities_spawned, 3);
        assert_eq!(bridge.linked_entity_count(), 3);

        let entity = bridge.entity_for_particle(handle, 2).unwrap();
        let link = store.get::<ParticleLinkFragment>(entity).unwrap();
        assert_eq!(link, ParticleLinkFragment { particle_id: 2, emitter: Some(handle) });
        assert_eq!(store.get::<TransformFragment>(entity).unwrap().position, Vec3::splat(2.0));
        assert!(store.has::<NeedsInitializationTag>(entity));
        assert!(emitters.with_store(handle, |s| s.pending_particles().is_empty()).unwrap());
    }

    #[test]
    fn dead_particles_tag_their_entities_and_unknown_ids_are_dropped() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..2);
        bridge.step(&mut store, &emitters).unwrap();
        let entity = bridge.entity_for_particle(handle, 0).unwrap();

        emitters.with_store(handle, |s| {
            s.add_dead_particle(0);
            s.add_dead_particle(77);
        });
        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.resolved_dead_ids, 1);
        assert_eq!(stats.destroys_tagged, 1);
        assert_eq!(bridge.entity_for_particle(handle, 0), None);

        store.apply_deferred_commands().unwrap();
        assert!(store.has::<PendingDeletionTag>(entity));
    }

    #[test]
    fn budget_is_charged_per_batch_with_bounded_overshoot() {
        let (mut bridge, mut store, mut emitters, first) = setup(4);
        let second = emitters.insert(Emitter::new(
            "second",
            EmitterConfig::new(EntityTemplate::particle_default().unwrap()),
        ));
        bridge.register_emitter(second);
        add_particles(&emitters, first, 0..3);
        add_particles(&emitters, second, 0..3);

        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.batches_dispatched, 2);
        assert_eq!(stats.budget_used, 6);
        assert_eq!(store.len(), 6);

        add_particles(&emitters, first, 10..16);
        add_particles(&emitters, second, 10..12);
        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.batches_dispatched, 1);
        assert_eq!(bridge.pending_spawn_requests(), 1);
        assert_eq!(bridge.pending_spawn_ids(), 2);
    }

    #[test]
    fn removed_emitters_are_pruned_and_their_batches_dropped() {
        let (mut bridge, mut store, mut emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..2);
        bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(bridge.linked_entity_count(), 2);

        emitters.remove(handle);
        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.pruned_emitters, 1);
        assert!(!bridge.is_registered(handle));
        assert_eq!(bridge.linked_entity_count(), 0);
    }

    fn short_completion(handle: EmitterHandle, ids: Vec<ParticleId>, stalled: u32, placed: usize) -> PlacementCompletion {
        PlacementCompletion {
            request: PlacementRequest { emitter: handle, particle_ids: ids, stalled },
            placements: vec![crate::bridge::placement::SpawnPlacement::at(Vec3::ZERO); placed],
        }
    }

    #[test]
    fn leftovers_removed_in_flight_are_not_requeued() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..4);
        emitters.with_store(handle, |s| {
            s.drain_pending_particles();
            s.remove_particle_data(2);
        });

        let completion = short_completion(handle, vec![0, 1, 2, 3], 0, 1);
        let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, completion).unwrap();
        assert_eq!(outcome, SpawnOutcome { spawned: 1, requeued: 2, dropped: 1 });
        assert_eq!(bridge.pending_spawn_ids(), 2);

        emitters.with_store(handle, |s| {
            s.remove_particle_data(1);
            s.remove_particle_data(3);
        });
        let completion = short_completion(handle, vec![1, 3], 0, 0);
        let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, completion).unwrap();
        assert_eq!(outcome, SpawnOutcome { spawned: 0, requeued: 0, dropped: 2 });
    }

    #[test]
    fn stalled_batches_are_dropped_after_repeated_empty_completions() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..2);
        emitters.with_store(handle, |s| s.drain_pending_particles());

        let mut stalled = 0;
        while stalled + 1 < MAX_STALLED_PLACEMENTS {
            let completion = short_completion(handle, vec![0, 1], stalled, 0);
            let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, completion).unwrap();
            assert_eq!(outcome.requeued, 2);
            stalled += 1;
        }
        let queued = bridge.spawn_queue.back().cloned().unwrap();
        assert_eq!(queued.stalled, MAX_STALLED_PLACEMENTS - 1);

        bridge.spawn_queue.clear();
        let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, PlacementCompletion {
            request: queued,
            placements: Vec::new(),
        });
        assert_eq!(outcome.unwrap(), SpawnOutcome { spawned: 0, requeued: 0, dropped: 2 });
        assert_eq!(bridge.pending_spawn_requests(), 0);
    }

    #[test]
    fn partial_progress_resets_the_stall_count() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..3);
        emitters.with_store(handle, |s| s.drain_pending_particles());

        let completion = short_completion(handle, vec![0, 1, 2], MAX_STALLED_PLACEMENTS - 1, 1);
        let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, completion).unwrap();
        assert_eq!(outcome, SpawnOutcome { spawned: 1, requeued: 2, dropped: 0 });
        assert_eq!(bridge.spawn_queue.back().map(|r| r.stalled), Some(0));
    }

    #[test]
    fn mappings_of_entities_despawned_elsewhere_are_pruned() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        add_particles(&emitters, handle, 0..3);
        bridge.step(&mut store, &emitters).unwrap();
        let entity = bridge.entity_for_particle(handle, 1).unwrap();

        store.despawn(entity).unwrap();
        let stats = bridge.step(&mut store, &emitters).unwrap();
        assert_eq!(stats.stale_links_pruned, 1);
        assert_eq!(bridge.linked_entity_count(), 2);
        assert_eq!(bridge.entity_for_particle(handle, 1), None);
    }

    #[test]
    fn completion_for_unregistered_emitter_is_a_no_op() {
        let (mut bridge, mut store, emitters, handle) = setup(10);
        bridge.unregister_emitter(handle);
        let completion = PlacementCompletion {
            request: PlacementRequest::new(handle, vec![1]),
            placements: vec![crate::bridge::placement::SpawnPlacement::at(Vec3::ZERO)],
        };
        let outcome = bridge.on_spawn_data_generated(&mut store, &emitters, completion).unwrap();
        assert_eq!(outcome, SpawnOutcome::default());
        assert!(store.is_empty());
    }

    #[test]
    fn uninitialized_bridge_does_nothing() {
        let mut bridge = BridgeSubsystem::new(10);
        let mut store = EntityStore::new(1).unwrap();
        let emitters = EmitterRegistry::new();
        assert_eq!(bridge.step(&mut store, &emitters).unwrap(), BridgeStepStats::default());
    }
}
