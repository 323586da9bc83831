use glam::{Quat, Vec3};

use particle_entity_bridge::particles::{ParticleRecord, ParticleStore, INVALID_ANIM_STATE, INVALID_SPLINE_INDEX};

#[test]
fn pending_ids_are_listed_once_per_drain() {
    let mut store = ParticleStore::new();
    assert!(store.add_pending_particle(42));
    assert!(!store.add_pending_particle(42));
    assert!(store.add_pending_particle(7));
    assert_eq!(store.pending_particles(), &[42, 7]);

    store.clear_pending_particles();
    assert!(store.pending_particles().is_empty());
    assert!(store.pending_particles().is_empty());

    assert!(store.add_pending_particle(42));
    assert_eq!(store.pending_particles(), &[42]);
}

#[test]
fn dead_list_drains_exactly_once() {
    let mut store = ParticleStore::new();
    store.add_dead_particle(3);
    store.add_dead_particle(3);
    assert_eq!(store.drain_dead_particles(), vec![3]);
    assert!(store.dead_particles().is_empty());
    assert!(store.drain_dead_particles().is_empty());
}

#[test]
fn invalid_ids_read_as_sentinels() {
    let mut store = ParticleStore::new();
    assert!(!store.is_valid_index(5));
    assert_eq!(store.particle_position(5), Vec3::ZERO);
    assert_eq!(store.particle_orientation(5), Quat::IDENTITY);
    assert_eq!(store.particle_anim_state(5), INVALID_ANIM_STATE);
    assert_eq!(store.particle_spline_index(5), INVALID_SPLINE_INDEX);
    assert_eq!(store.particle_spline_progress(5), 0.0);
    assert!(!store.set_particle_animation_state(5, 2));
    assert!(!store.remove_particle_data(5));

    assert!(store.add_particle_data(5, ParticleRecord::at(Vec3::X, Vec3::Y)));
    assert!(!store.add_particle_data(5, ParticleRecord::default()));
    assert!(store.set_particle_animation_state(5, 2));
    assert_eq!(store.particle_data(5).anim_state, 2);
    assert_eq!(store.particle_velocity(5), Vec3::Y);
}
