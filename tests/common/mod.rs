#![allow(dead_code)]

use glam::Vec3;

use particle_entity_bridge::config::BridgeConfig;
use particle_entity_bridge::engine::entity::Entity;
use particle_entity_bridge::logging;
use particle_entity_bridge::particles::{EmitterConfig, EmitterHandle, ParticleId, ParticleRecord};
use particle_entity_bridge::world::BridgeWorld;

pub fn config(budget: usize) -> BridgeConfig {
    BridgeConfig {
        max_entities_to_process_per_frame: budget,
        max_entities_to_destroy_per_frame: budget,
        entity_shards: 2,
        ..BridgeConfig::default()
    }
}

/// A world with one emitter using the default template.
pub fn world_with_emitter(budget: usize) -> (BridgeWorld, EmitterHandle) {
    logging::init_for_tests();
    let mut world = BridgeWorld::new(config(budget)).unwrap();
    let template = world.default_template().unwrap();
    let emitter = world.add_emitter("test", EmitterConfig::new(template));
    (world, emitter)
}

/// Adds a particle record and announces it as pending.
pub fn emit(world: &BridgeWorld, emitter: EmitterHandle, id: ParticleId, position: Vec3, velocity: Vec3) {
    world
        .emitters()
        .with_store(emitter, |particles| {
            assert!(particles.add_particle_data(id, ParticleRecord::at(position, velocity)));
            particles.add_pending_particle(id);
        })
        .unwrap();
}

/// Removes a particle record and announces its death.
pub fn kill(world: &BridgeWorld, emitter: EmitterHandle, id: ParticleId) {
    world
        .emitters()
        .with_store(emitter, |particles| {
            particles.remove_particle_data(id);
            particles.add_dead_particle(id);
        })
        .unwrap();
}

/// Announces a death but leaves the record in place.
pub fn report_death(world: &BridgeWorld, emitter: EmitterHandle, id: ParticleId) {
    world.emitters().with_store(emitter, |particles| particles.add_dead_particle(id)).unwrap();
}

pub fn particle_position(world: &BridgeWorld, emitter: EmitterHandle, id: ParticleId) -> Vec3 {
    world.emitters().with_store(emitter, |particles| particles.particle_position(id)).unwrap()
}

pub fn linked(world: &BridgeWorld, emitter: EmitterHandle, id: ParticleId) -> Entity {
    world.bridge().entity_for_particle(emitter, id).unwrap()
}
