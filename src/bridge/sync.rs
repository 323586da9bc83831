//! Batch synchronization between linked entities and particle records.
//!
//! Three processors, each a single pass over the entities matching its
//! query:
//!
//! | processor                     | matches                                              | direction |
//! |-------------------------------|------------------------------------------------------|-----------|
//! | [`ParticleToEntityProcessor`] | link, transform, velocity, anim state, **with** init tag    | particle → entity, once |
//! | [`AnimStateSyncProcessor`]    | link, anim state, **without** init tag               | entity → particle anim state |
//! | [`EntityToParticleProcessor`] | link, transform, velocity, **without** init tag      | entity → particle transform |
//!
//! The opposite polarity of [`NeedsInitializationTag`] is what guarantees a
//! new entity reads its particle before it ever writes back to it.
//!
//! Fragment values are written in place through column locks. Tag changes
//! are recorded as deferred commands and land at the next flush.

use log::trace;

use crate::bridge::fragments::{
    AnimStateFragment, NeedsInitializationTag, ParticleLinkFragment, PendingDeletionTag, TransformFragment,
    VelocityFragment,
};
use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::engine::query::{Query, QueryBuilder};
use crate::particles::{EmitterRegistry, ParticleRecord, ParticleStore};

/// Counters from one sync pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Entities visited.
    pub visited: usize,
    /// Entities whose values were copied.
    pub synced: usize,
    /// Entities whose particle link did not resolve.
    pub broken_links: usize,
}

fn with_linked_store<R>(
    emitters: &EmitterRegistry,
    link: &ParticleLinkFragment,
    f: impl FnOnce(&mut ParticleStore) -> R,
) -> Option<R> {
    let particle_id = link.particle_id;
    emitters
        .with_store(link.emitter?, |store| store.is_valid_index(particle_id).then(|| f(store)))
        .flatten()
}

/// Copies initial particle state into newly spawned entities.
///
/// Every matched entity loses its [`NeedsInitializationTag`], whether or not
/// its particle resolved, so each entity is processed exactly once.
pub struct ParticleToEntityProcessor {
    query: Query,
}

impl ParticleToEntityProcessor {
    /// Builds the processor's query.
    pub fn new() -> BridgeResult<Self> {
        let query = QueryBuilder::new()
            .read::<ParticleLinkFragment>()?
            .read::<NeedsInitializationTag>()?
            .write::<TransformFragment>()?
            .write::<VelocityFragment>()?
            .write::<AnimStateFragment>()?
            .build();
        Ok(Self { query })
    }

    /// Runs one pass.
    pub fn execute(&self, store: &EntityStore, emitters: &EmitterRegistry) -> BridgeResult<SyncStats> {
        let mut stats = SyncStats::default();
        store.for_each_archetype(&self.query, |view| {
            let entities = view.entities();
            let links = view.read::<ParticleLinkFragment>()?;
            let mut transforms = view.write::<TransformFragment>()?;
            let mut velocities = view.write::<VelocityFragment>()?;
            let mut anim_states = view.write::<AnimStateFragment>()?;

            for (row, &entity) in entities.iter().enumerate() {
                stats.visited += 1;
                let record: Option<ParticleRecord> =
                    with_linked_store(emitters, &links[row], |particles| particles.particle_data(links[row].particle_id));

                match record {
                    Some(record) => {
                        transforms[row].position = record.position;
                        velocities[row].value = record.velocity;
                        anim_states[row].anim_state = record.anim_state;
                        stats.synced += 1;
                    }
                    None => {
                        trace!("{entity}: particle {} missing at initialization", links[row].particle_id);
                        stats.broken_links += 1;
                    }
                }
                store.commands().remove::<NeedsInitializationTag>(entity)?;
            }
            Ok(())
        })?;
        Ok(stats)
    }
}

/// Pushes changed entity animation states onto their particles, and tags
/// entities whose link is broken for deletion.
pub struct AnimStateSyncProcessor {
    query: Query,
}

impl AnimStateSyncProcessor {
    /// Builds the processor's query.
    pub fn new() -> BridgeResult<Self> {
        let query = QueryBuilder::new()
            .read::<ParticleLinkFragment>()?
            .read::<AnimStateFragment>()?
            .without::<NeedsInitializationTag>()?
            .build();
        Ok(Self { query })
    }

    /// Runs one pass.
    pub fn execute(&self, store: &EntityStore, emitters: &EmitterRegistry) -> BridgeResult<SyncStats> {
        let mut stats = SyncStats::default();
        store.for_each_archetype(&self.query, |view| {
            let entities = view.entities();
            let links = view.read::<ParticleLinkFragment>()?;
            let anim_states = view.read::<AnimStateFragment>()?;

            for ((&entity, link), anim) in entities.iter().zip(links.iter()).zip(anim_states.iter()) {
                stats.visited += 1;
                let pushed = with_linked_store(emitters, link, |particles| {
                    if particles.particle_anim_state(link.particle_id) != anim.anim_state {
                        particles.set_particle_animation_state(link.particle_id, anim.anim_state)
                    } else {
                        false
                    }
                });
                match pushed {
                    Some(true) => stats.synced += 1,
                    Some(false) => {}
                    None => {
                        trace!("{entity}: link to particle {} broken; tagging for deletion", link.particle_id);
                        store.commands().add(entity, PendingDeletionTag)?;
                        stats.broken_links += 1;
                    }
                }
            }
            Ok(())
        })?;
        Ok(stats)
    }
}

/// Writes entity transforms and velocities back onto their particles, and
/// tags entities whose link is broken for deletion.
pub struct EntityToParticleProcessor {
    query: Query,
}

impl EntityToParticleProcessor {
    /// Builds the processor's query.
    pub fn new() -> BridgeResult<Self> {
        let query = QueryBuilder::new()
            .read::<ParticleLinkFragment>()?
            .read::<TransformFragment>()?
            .read::<VelocityFragment>()?
            .without::<NeedsInitializationTag>()?
            .build();
        Ok(Self { query })
    }

    /// Runs one pass.
    pub fn execute(&self, store: &EntityStore, emitters: &EmitterRegistry) -> BridgeResult<SyncStats> {
        let mut stats = SyncStats::default();
        store.for_each_archetype(&self.query, |view| {
            let entities = view.entities();
            let links = view.read::<ParticleLinkFragment>()?;
            let transforms = view.read::<TransformFragment>()?;
            let velocities = view.read::<VelocityFragment>()?;

            for (row, &entity) in entities.iter().enumerate() {
                stats.visited += 1;
                let (transform, velocity) = (transforms[row], velocities[row]);
                let link = &links[row];
                let written = with_linked_store(emitters, link, |particles| {
                    particles.set_particle_position(link.particle_id, transform.position);
                    particles.set_particle_orientation(link.particle_id, transform.orientation);
                    particles.set_particle_velocity(link.particle_id, velocity.value);
                });
                if written.is_some() {
                    stats.synced += 1;
                } else {
                    trace!("{entity}: link to particle {} broken; tagging for deletion", link.particle_id);
                    store.commands().add(entity, PendingDeletionTag)?;
                    stats.broken_links += 1;
                }
            }
            Ok(())
        })?;
        Ok(stats)
    }
}
