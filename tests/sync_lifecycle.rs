mod common;

use std::sync::Arc;

use glam::Vec3;

use particle_entity_bridge::bridge::{
    AnimStateFragment, EntityTemplate, FlatGround, GroundFollowingProcessor, GroundFollowingTrait,
    NeedsInitializationTag, ParticleLinkTrait, PendingDeletionTag, TransformFragment, VelocityFragment,
};
use particle_entity_bridge::particles::EmitterConfig;
use particle_entity_bridge::world::BridgeWorld;
use particle_entity_bridge::engine::error::BridgeResult;
use particle_entity_bridge::engine::query::QueryBuilder;
use particle_entity_bridge::engine::systems::FnProcessor;

use common::*;

#[test]
fn first_step_copies_the_particle_transform_into_the_entity() -> BridgeResult<()> {
    let (mut world, emitter) = world_with_emitter(16);
    emit(&world, emitter, 42, Vec3::new(5.0, -2.0, 9.0), Vec3::new(1.0, 0.0, 0.0));

    world.step(0.1);
    let entity = linked(&world, emitter, 42);
    assert!(!world.store().has::<NeedsInitializationTag>(entity));
    assert_eq!(world.store().get::<TransformFragment>(entity).unwrap().position, Vec3::new(5.0, -2.0, 9.0));
    assert_eq!(world.store().get::<VelocityFragment>(entity).unwrap().value, Vec3::X);
    Ok(())
}

#[test]
fn behavior_changes_flow_back_to_the_particle() -> BridgeResult<()> {
    let (mut world, emitter) = world_with_emitter(16);
    let integrate = QueryBuilder::new()
        .read::<VelocityFragment>()?
        .write::<TransformFragment>()?
        .write::<AnimStateFragment>()?
        .without::<NeedsInitializationTag>()?;
    let access = integrate.access_sets();
    let integrate = integrate.build();
    world.add_behavior(Box::new(FnProcessor::new(1, "integrate", access, move |ctx| {
        let dt = ctx.delta_seconds;
        ctx.store.for_each_archetype(&integrate, |view| {
            let velocities = view.read::<VelocityFragment>()?;
            let mut transforms = view.write::<TransformFragment>()?;
            let mut anims = view.write::<AnimStateFragment>()?;
            for ((transform, velocity), anim) in transforms.iter_mut().zip(velocities.iter()).zip(anims.iter_mut()) {
                transform.position += velocity.value * dt;
                anim.anim_state = 3;
            }
            Ok(())
        })
    })));

    emit(&world, emitter, 42, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
    world.step(0.5);
    assert_eq!(particle_position(&world, emitter, 42), Vec3::new(0.5, 0.0, 0.0));

    world.step(0.5);
    assert_eq!(particle_position(&world, emitter, 42), Vec3::new(1.0, 0.0, 0.0));
    let anim = world.emitters().with_store(emitter, |p| p.particle_anim_state(42)).unwrap();
    assert_eq!(anim, 3);
    Ok(())
}

#[test]
fn removed_particle_record_gets_its_entity_destroyed() {
    let (mut world, emitter) = world_with_emitter(16);
    emit(&world, emitter, 42, Vec3::ZERO, Vec3::ZERO);
    world.step(0.1);
    let entity = linked(&world, emitter, 42);

    world.emitters().with_store(emitter, |p| p.remove_particle_data(42)).unwrap();
    let stats = world.step(0.1);

    assert_eq!(stats.entity_to_particle.broken_links, 1);
    assert_eq!(stats.destroyed, 1);
    assert!(!world.store().is_alive(entity));
    assert_eq!(world.bridge().entity_for_particle(emitter, 42), None);
}

#[test]
fn broken_links_drain_within_the_destroy_cap() {
    let mut config = config(16);
    config.max_entities_to_destroy_per_frame = 2;
    let mut world = BridgeWorld::new(config).unwrap();
    let template = world.default_template().unwrap();
    let emitter = world.add_emitter("e", EmitterConfig::new(template));
    for id in 0..5 {
        emit(&world, emitter, id, Vec3::ZERO, Vec3::ZERO);
    }
    world.step(0.1);
    assert_eq!(world.store().len(), 5);

    world.emitters().with_store(emitter, |p| (0..5).for_each(|id| { p.remove_particle_data(id); })).unwrap();
    let destroyed: Vec<usize> = (0..3).map(|_| world.step(0.1).destroyed).collect();
    assert_eq!(destroyed, vec![2, 2, 1]);
    assert!(world.store().is_empty());
}

#[test]
fn removing_the_emitter_reclaims_its_entities() {
    let (mut world, emitter) = world_with_emitter(16);
    emit(&world, emitter, 1, Vec3::ZERO, Vec3::ZERO);
    emit(&world, emitter, 2, Vec3::ZERO, Vec3::ZERO);
    world.step(0.1);
    assert_eq!(world.store().len(), 2);

    assert!(world.remove_emitter(emitter));
    let stats = world.step(0.1);
    assert_eq!(stats.entity_to_particle.broken_links, 2);
    assert!(world.store().is_empty());
    assert!(!world.bridge().is_registered(emitter));
}

#[test]
fn killed_particle_is_tagged_then_destroyed() {
    let (mut world, emitter) = world_with_emitter(16);
    emit(&world, emitter, 9, Vec3::ZERO, Vec3::ZERO);
    world.step(0.1);
    let entity = linked(&world, emitter, 9);

    kill(&world, emitter, 9);
    let stats = world.step(0.1);
    assert_eq!(stats.bridge.resolved_dead_ids, 1);
    assert_eq!(stats.bridge.destroys_tagged, 1);
    assert!(!world.store().is_alive(entity));
    assert!(!world.store().has::<PendingDeletionTag>(entity));
}

#[test]
fn ground_followers_land_and_push_the_height_back() -> BridgeResult<()> {
    let mut world = BridgeWorld::new(config(16))?;
    let ground = world.config().ground;
    let template = EntityTemplate::from_traits(&[&ParticleLinkTrait::default(), &GroundFollowingTrait::new(ground)])?;
    let emitter = world.add_emitter("walkers", EmitterConfig::new(template));
    world.add_behavior(Box::new(GroundFollowingProcessor::new(7, Arc::new(FlatGround { height: 2.0 }))?));

    emit(&world, emitter, 1, Vec3::new(3.0, 4.0, 30.0), Vec3::ZERO);
    world.step(0.1);

    let entity = linked(&world, emitter, 1);
    assert_eq!(world.store().get::<TransformFragment>(entity).unwrap().position, Vec3::new(3.0, 4.0, 2.0));
    assert_eq!(particle_position(&world, emitter, 1), Vec3::new(3.0, 4.0, 2.0));
    Ok(())
}

#[test]
fn animation_only_entities_are_reclaimed_when_their_particle_goes() -> BridgeResult<()> {
    let mut world = BridgeWorld::new(config(16))?;
    let mut builder = EntityTemplate::builder();
    builder.add_fragment(AnimStateFragment { anim_state: 0 })?;
    let emitter = world.add_emitter("puppets", EmitterConfig::new(builder.build()));
    emit(&world, emitter, 1, Vec3::ZERO, Vec3::ZERO);
    world.step(0.1);
    let entity = linked(&world, emitter, 1);
    assert!(!world.store().has::<VelocityFragment>(entity));

    world.emitters().with_store(emitter, |p| p.remove_particle_data(1)).unwrap();
    let stats = world.step(0.1);
    assert_eq!(stats.anim_state.broken_links, 1);
    assert_eq!(stats.destroyed, 1);
    assert!(!world.store().is_alive(entity));
    Ok(())
}
