mod common;

use glam::Vec3;

use particle_entity_bridge::bridge::{NeedsInitializationTag, TransformFragment};
use particle_entity_bridge::spatial::Aabb;
use particle_entity_bridge::zones::ZoneVolume;

use common::*;

#[test]
fn a_pending_particle_becomes_an_initialized_entity_in_one_step() {
    let (mut world, emitter) = world_with_emitter(16);
    emit(&world, emitter, 7, Vec3::new(3.0, 2.0, 1.0), Vec3::X);

    let stats = world.step(1.0 / 60.0);
    assert_eq!(stats.bridge.entities_spawned, 1);
    assert_eq!(stats.particle_to_entity.synced, 1);
    assert_eq!(world.step_count(), 1);

    let entity = linked(&world, emitter, 7);
    assert!(!world.store().has::<NeedsInitializationTag>(entity));
    assert_eq!(world.store().get::<TransformFragment>(entity).unwrap().position, Vec3::new(3.0, 2.0, 1.0));
}

#[test]
fn entities_despawned_by_the_host_leave_no_stale_tracking() {
    let (mut world, emitter) = world_with_emitter(16);
    world.register_zone(ZoneVolume::new("field", Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))));
    emit(&world, emitter, 1, Vec3::ZERO, Vec3::ZERO);
    emit(&world, emitter, 2, Vec3::ONE, Vec3::ZERO);
    world.step(0.1);
    world.step(0.1);
    assert_eq!(world.bridge().linked_entity_count(), 2);
    assert_eq!(world.zones().tracked_entity_count(), 2);

    let gone = linked(&world, emitter, 2);
    world.store().commands().despawn(gone).unwrap();
    world.store_mut().apply_deferred_commands().unwrap();

    let stats = world.step(0.1);
    assert_eq!(stats.bridge.stale_links_pruned, 1);
    assert_eq!(stats.zones.stale_assignments, 1);
    assert_eq!(world.bridge().linked_entity_count(), 1);
    assert_eq!(world.bridge().entity_for_particle(emitter, 2), None);
    assert_eq!(world.zones().tracked_entity_count(), 1);
    assert_eq!(world.zones().volume_for_entity(gone), None);
}
