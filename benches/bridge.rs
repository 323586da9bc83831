use std::hint::black_box;

use criterion::*;
use glam::Vec3;
use particle_entity_bridge::config::BridgeConfig;
use particle_entity_bridge::particles::{EmitterConfig, EmitterHandle, ParticleRecord};
use particle_entity_bridge::spatial::Aabb;
use particle_entity_bridge::world::BridgeWorld;
use particle_entity_bridge::zones::ZoneVolume;

const PARTICLES: i32 = 10_000;

fn world_with_particles(count: i32) -> (BridgeWorld, EmitterHandle) {
    let config = BridgeConfig {
        max_entities_to_process_per_frame: count as usize,
        max_entities_to_destroy_per_frame: count as usize,
        ..BridgeConfig::default()
    };
    let mut world = BridgeWorld::new(config).expect("bench config is valid");
    let template = world.default_template().expect("default template");
    let emitter = world.add_emitter("bench", EmitterConfig::new(template));
    world
        .emitters()
        .with_store(emitter, |particles| {
            for id in 0..count {
                let position = Vec3::new((id % 100) as f32 * 10.0, 0.0, (id / 100) as f32 * 10.0);
                particles.add_particle_data(id, ParticleRecord::at(position, Vec3::X));
                particles.add_pending_particle(id);
            }
        })
        .expect("emitter just added");
    (world, emitter)
}

fn bridge_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge");
    group.sample_size(20);

    group.bench_function("spawn_10k_linked_entities", |b| {
        b.iter_batched(
            || world_with_particles(PARTICLES),
            |(mut world, _)| black_box(world.step(1.0 / 60.0)),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("steady_state_step_10k", |b| {
        let (mut world, _) = world_with_particles(PARTICLES);
        world.step(1.0 / 60.0);
        b.iter(|| black_box(world.step(1.0 / 60.0)))
    });

    group.bench_function("steady_state_step_10k_with_zones", |b| {
        let (mut world, _) = world_with_particles(PARTICLES);
        for i in 0..100 {
            let center = Vec3::new((i % 10) as f32 * 100.0, 0.0, (i / 10) as f32 * 100.0);
            world.register_zone(ZoneVolume::new(format!("zone-{i}"), Aabb::from_center_extent(center, Vec3::splat(40.0))));
        }
        world.step(1.0 / 60.0);
        b.iter(|| black_box(world.step(1.0 / 60.0)))
    });

    group.bench_function("destroy_10k_linked_entities", |b| {
        b.iter_batched(
            || {
                let (mut world, emitter) = world_with_particles(PARTICLES);
                world.step(1.0 / 60.0);
                world
                    .emitters()
                    .with_store(emitter, |particles| {
                        for id in 0..PARTICLES {
                            particles.add_dead_particle(id);
                        }
                    })
                    .expect("emitter still registered");
                world
            },
            |mut world| black_box(world.step(1.0 / 60.0)),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bridge_benchmark);
criterion_main!(benches);
