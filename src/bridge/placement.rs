//! Spawn placement generation.
//!
//! When the bridge spawns a batch of entities for an emitter, it first asks
//! a [`PlacementGenerator`] where to put them. Generators complete through a
//! [`PlacementSink`], either inline or later from another thread; the bridge
//! drains finished batches once per step and never blocks on one.
//!
//! The sink owns the `(emitter, particle IDs)` pair the request was made for,
//! so the completion carries exactly what the bridge needs to re-resolve the
//! emitter after resumption. A sink dropped without completing cancels
//! nothing and spawns nothing.

use std::sync::Arc;

use crossbeam_channel::Sender;
use glam::{Quat, Vec3};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::particles::{Emitter, EmitterHandle, ParticleId};


/// Where one new entity is placed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPlacement {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
}

impl SpawnPlacement {
    /// A placement at `position` with identity orientation.
    pub fn at(position: Vec3) -> Self {
        Self { position, orientation: Quat::IDENTITY }
    }
}

/// A batch of particles waiting for placements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Emitter the particles belong to.
    pub emitter: EmitterHandle,
    /// Particles to create entities for, in order.
    pub particle_ids: Vec<ParticleId>,
    /// Consecutive completions of this batch that placed nothing.
    pub stalled: u32,
}

impl PlacementRequest {
    /// A fresh request for `particle_ids`.
    pub fn new(emitter: EmitterHandle, particle_ids: Vec<ParticleId>) -> Self {
        Self { emitter, particle_ids, stalled: 0 }
    }

    /// Number of entities requested.
    #[inline]
    pub fn count(&self) -> usize {
        self.particle_ids.len()
    }
}

/// A finished placement batch, delivered back to the bridge.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementCompletion {
    /// The request this completes.
    pub request: PlacementRequest,
    /// Generated placements; may be shorter than the request.
    pub placements: Vec<SpawnPlacement>,
}

/// One-shot completion handle for a [`PlacementRequest`].
#[derive(Debug)]
pub struct PlacementSink {
    request: PlacementRequest,
    tx: Sender<PlacementCompletion>,
}

impl PlacementSink {
    pub(crate) fn new(request: PlacementRequest, tx: Sender<PlacementCompletion>) -> Self {
        Self { request, tx }
    }

    /// The request being served.
    #[inline]
    pub fn request(&self) -> &PlacementRequest {
        &self.request
    }

    /// Delivers the generated placements.
    pub fn complete(self, placements: Vec<SpawnPlacement>) {
        let emitter = self.request.emitter;
        if self.tx.send(PlacementCompletion { request: self.request, placements }).is_err() {
            warn!("placement for {emitter} completed after the bridge shut down");
        }
    }
}

/// Strategy producing spawn placements.
///
/// `generate` must not block. It may call [`PlacementSink::complete`] before
/// returning, or hand the sink to another thread and complete later.
pub trait PlacementGenerator: Send + Sync {
    /// Generates `sink.request().count()` placements for `emitter`.
    fn generate(&self, emitter: &Emitter, sink: PlacementSink);
}

/// Places each entity on its particle's current transform and completes
/// inline. Used for emitters without a custom generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParticlePlacementGenerator;

impl PlacementGenerator for ParticlePlacementGenerator {
    fn generate(&self, emitter: &Emitter, sink: PlacementSink) {
        let placements = emitter.with_store(|store| {
            sink.request()
                .particle_ids
                .iter()
                .map(|&id| SpawnPlacement { position: store.particle_position(id), orientation: store.particle_orientation(id) })
                .collect::<Vec<_>>()
        });
        trace!("placed {} entities on particle transforms of `{}`", placements.len(), emitter.name());
        sink.complete(placements);
    }
}

/// Places entities evenly on a horizontal ring, completing on the rayon
/// pool.
#[derive(Clone, Copy, Debug)]
pub struct RingPlacementGenerator {
    /// Ring centre.
    pub center: Vec3,
    /// Ring radius.
    pub radius: f32,
}

impl PlacementGenerator for RingPlacementGenerator {
    fn generate(&self, _emitter: &Emitter, sink: PlacementSink) {
        let ring = *self;
        rayon::spawn(move || {
            let count = sink.request().count();
            let step = std::f32::consts::TAU / count.max(1) as f32;
            let placements = (0..count)
                .map(|i| {
                    let angle = step * i as f32;
                    SpawnPlacement {
                        position: ring.center + Vec3::new(angle.cos(), angle.sin(), 0.0) * ring.radius,
                        orientation: Quat::from_rotation_z(angle),
                    }
                })
                .collect();
            sink.complete(placements);
        });
    }
}

/// Completes every request with at most `limit` placements taken from an
/// inner generator that completes inline. Useful for exercising partial
/// fulfilment.
pub struct LimitedPlacementGenerator {
    inner: Arc<dyn PlacementGenerator>,
    limit: usize,
}

impl LimitedPlacementGenerator {
    /// Wraps `inner`, truncating each batch to `limit`.
    pub fn new(inner: Arc<dyn PlacementGenerator>, limit: usize) -> Self {
        Self { inner, limit }
    }
}

impl PlacementGenerator for LimitedPlacementGenerator {
    fn generate(&self, emitter: &Emitter, sink: PlacementSink) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.inner.generate(emitter, PlacementSink::new(sink.request().clone(), tx));
        let mut placements = rx.try_recv().map(|c| c.placements).unwrap_or_default();
        placements.truncate(self.limit);
        sink.complete(placements);
    }
}
