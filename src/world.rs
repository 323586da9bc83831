//! World orchestration: owns every subsystem and runs the fixed step.
//!
//! ## Step order
//!
//! ```text
//! bridge (collect, prune, destroy budget, spawn budget, completions)
//!   -> flush -> particle→entity -> flush
//!   -> behavior stages (parallel within a stage, flush after each)
//!   -> anim state sync -> flush -> entity→particle -> flush
//!   -> zone trigger -> flush -> deletion -> flush
//! ```
//!
//! Every phase sees the structural changes of the phases before it. A phase
//! that fails is logged and the step carries on with the next one.

use log::{debug, info, warn};

use crate::bridge::deletion::DeletionProcessor;
use crate::bridge::lifecycle::{BridgeStepStats, BridgeSubsystem};
use crate::bridge::sync::{AnimStateSyncProcessor, EntityToParticleProcessor, ParticleToEntityProcessor, SyncStats};
use crate::bridge::template::{EntityTemplate, ParticleLinkTrait, ZoneTriggerTrait};
use crate::config::BridgeConfig;
use crate::engine::error::{BridgeError, BridgeResult};
use crate::engine::manager::EntityStore;
use crate::engine::scheduler::Scheduler;
use crate::engine::systems::Processor;
use crate::engine::types::Tick;
use crate::particles::{Emitter, EmitterConfig, EmitterHandle, EmitterRegistry};
use crate::profiler::{self, Arg};
use crate::zones::processor::{ZoneStats, ZoneTriggerProcessor};
use crate::zones::state_machine::{NullStateMachine, StateMachineEngine};
use crate::zones::subsystem::ZoneTriggerSubsystem;
use crate::zones::volume::{ZoneVolume, ZoneVolumeId};


/// Counters of one [`BridgeWorld::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStepStats {
    /// Bridge queue work.
    pub bridge: BridgeStepStats,
    /// Particle→entity initialization pass.
    pub particle_to_entity: SyncStats,
    /// Animation state push.
    pub anim_state: SyncStats,
    /// Entity→particle write-back.
    pub entity_to_particle: SyncStats,
    /// Zone transitions and event hand-off.
    pub zones: ZoneStats,
    /// Entities queued for destruction by the deletion processor.
    pub destroyed: usize,
    /// Phases that returned an error.
    pub failed_phases: usize,
}

/// Owns the entity store, the emitters and every subsystem.
pub struct BridgeWorld {
    config: BridgeConfig,
    store: EntityStore,
    emitters: EmitterRegistry,
    bridge: BridgeSubsystem,
    zones: ZoneTriggerSubsystem,
    state_machine: Box<dyn StateMachineEngine>,
    behaviors: Scheduler,
    particle_to_entity: ParticleToEntityProcessor,
    anim_state_sync: AnimStateSyncProcessor,
    entity_to_particle: EntityToParticleProcessor,
    zone_trigger: ZoneTriggerProcessor,
    deletion: DeletionProcessor,
    tick: Tick,
}

impl BridgeWorld {
    /// Builds a world without a state-machine engine; zone events stay
    /// pending until one is installed with [`with_state_machine`](Self::with_state_machine).
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        Self::with_state_machine(config, Box::new(NullStateMachine))
    }

    /// Builds a world forwarding zone events to `state_machine`.
    pub fn with_state_machine(config: BridgeConfig, state_machine: Box<dyn StateMachineEngine>) -> BridgeResult<Self> {
        config.validate()?;

        let mut bridge = BridgeSubsystem::new(config.max_entities_to_process_per_frame);
        bridge.initialize()?;

        let mut zones = ZoneTriggerSubsystem::new(config.grid_cell_sizes.clone(), config.zone_query_level);
        if !zones.initialize() {
            return Err(BridgeError::Internal("zone grid rejected the configured cell sizes".into()));
        }

        let world = Self {
            store: EntityStore::new(config.entity_shards)?,
            emitters: EmitterRegistry::new(),
            bridge,
            zones,
            state_machine,
            behaviors: Scheduler::new(),
            particle_to_entity: ParticleToEntityProcessor::new()?,
            anim_state_sync: AnimStateSyncProcessor::new()?,
            entity_to_particle: EntityToParticleProcessor::new()?,
            zone_trigger: ZoneTriggerProcessor::new()?,
            deletion: DeletionProcessor::new(config.max_entities_to_destroy_per_frame)?,
            tick: 0,
            config,
        };
        info!(
            "bridge world ready: {} shards, budget {}/{}",
            world.config.entity_shards,
            world.config.max_entities_to_process_per_frame,
            world.config.max_entities_to_destroy_per_frame
        );
        Ok(world)
    }

    /// Replaces the state-machine engine.
    pub fn set_state_machine(&mut self, state_machine: Box<dyn StateMachineEngine>) {
        self.state_machine = state_machine;
    }

    /// A particle-linked, zone-tracked template using the configured
    /// default animation state.
    pub fn default_template(&self) -> BridgeResult<EntityTemplate> {
        EntityTemplate::from_traits(&[
            &ParticleLinkTrait { default_anim_state: self.config.default_anim_state },
            &ZoneTriggerTrait,
        ])
    }

    // ── emitters ────────────────────────────────────────────────────────────

    /// Inserts an emitter and registers it with the bridge.
    pub fn add_emitter(&mut self, name: impl Into<String>, config: EmitterConfig) -> EmitterHandle {
        let handle = self.emitters.insert(Emitter::new(name, config));
        self.bridge.register_emitter(handle);
        handle
    }

    /// Unregisters and removes an emitter. Its handle stops resolving, so
    /// entities linked to it are reclaimed by the broken-link path.
    pub fn remove_emitter(&mut self, handle: EmitterHandle) -> bool {
        self.bridge.unregister_emitter(handle);
        self.emitters.remove(handle).is_some()
    }

    // ── behaviors and zones ─────────────────────────────────────────────────

    /// Adds a behavior processor to the parallel stages.
    pub fn add_behavior(&mut self, processor: Box<dyn Processor>) {
        self.behaviors.add_processor(processor);
    }

    /// Registers a zone volume.
    pub fn register_zone(&mut self, volume: ZoneVolume) -> Option<ZoneVolumeId> {
        self.zones.register_volume(volume)
    }

    /// Removes a zone volume.
    pub fn unregister_zone(&mut self, id: ZoneVolumeId) -> bool {
        self.zones.unregister_volume(id).is_some()
    }

    // ── step ────────────────────────────────────────────────────────────────

    /// Runs one full step.
    pub fn step(&mut self, delta_seconds: f32) -> WorldStepStats {
        let _span = profiler::span("world::step").arg("tick", Arg::U64(self.tick));
        let mut stats = WorldStepStats::default();

        {
            let _span = profiler::span("world::bridge");
            match self.bridge.step(&mut self.store, &self.emitters) {
                Ok(bridge) => stats.bridge = bridge,
                Err(error) => phase_failed(&mut stats, "bridge", &error),
            }
            self.flush(&mut stats);
        }
        {
            let _span = profiler::span("world::particle_to_entity");
            match self.particle_to_entity.execute(&self.store, &self.emitters) {
                Ok(sync) => stats.particle_to_entity = sync,
                Err(error) => phase_failed(&mut stats, "particle_to_entity", &error),
            }
            self.flush(&mut stats);
        }
        {
            let _span = profiler::span("world::behaviors");
            if let Err(error) = self.behaviors.run(&mut self.store, self.tick, delta_seconds) {
                phase_failed(&mut stats, "behaviors", &error);
            }
        }
        {
            let _span = profiler::span("world::anim_state");
            match self.anim_state_sync.execute(&self.store, &self.emitters) {
                Ok(sync) => stats.anim_state = sync,
                Err(error) => phase_failed(&mut stats, "anim_state", &error),
            }
            self.flush(&mut stats);
        }
        {
            let _span = profiler::span("world::entity_to_particle");
            match self.entity_to_particle.execute(&self.store, &self.emitters) {
                Ok(sync) => stats.entity_to_particle = sync,
                Err(error) => phase_failed(&mut stats, "entity_to_particle", &error),
            }
            self.flush(&mut stats);
        }
        {
            let _span = profiler::span("world::zones");
            match self.zone_trigger.execute(&self.store, &mut self.zones, self.state_machine.as_mut()) {
                Ok(zones) => stats.zones = zones,
                Err(error) => phase_failed(&mut stats, "zones", &error),
            }
            self.flush(&mut stats);
        }
        {
            let _span = profiler::span("world::deletion");
            match self.deletion.execute(&self.store, &mut self.bridge, &mut self.zones) {
                Ok(destroyed) => stats.destroyed = destroyed,
                Err(error) => phase_failed(&mut stats, "deletion", &error),
            }
            self.flush(&mut stats);
        }

        debug!("step {}: {} entities live", self.tick, self.store.len());
        self.tick += 1;
        stats
    }

    fn flush(&mut self, stats: &mut WorldStepStats) {
        if let Err(error) = self.store.apply_deferred_commands() {
            phase_failed(stats, "flush", &error);
        }
    }

    // ── accessors ───────────────────────────────────────────────────────────

    /// Completed steps.
    pub fn step_count(&self) -> Tick {
        self.tick
    }

    /// Configuration the world was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The entity store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The entity store, mutably.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// The emitter registry.
    pub fn emitters(&self) -> &EmitterRegistry {
        &self.emitters
    }

    /// The bridge subsystem.
    pub fn bridge(&self) -> &BridgeSubsystem {
        &self.bridge
    }

    /// The zone subsystem.
    pub fn zones(&self) -> &ZoneTriggerSubsystem {
        &self.zones
    }

    /// The zone subsystem, mutably.
    pub fn zones_mut(&mut self) -> &mut ZoneTriggerSubsystem {
        &mut self.zones
    }
}

fn phase_failed(stats: &mut WorldStepStats, phase: &str, error: &BridgeError) {
    warn!("step phase `{phase}` failed: {error}");
    stats.failed_phases += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected() {
        let config = BridgeConfig { entity_shards: 0, ..BridgeConfig::default() };
        assert!(matches!(BridgeWorld::new(config), Err(BridgeError::Config(_))));
    }
}
