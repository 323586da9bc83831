//! Ground following: keeps entities at a fixed height above the ground.

use std::sync::Arc;

use crate::bridge::fragments::{GroundTraceFragment, NeedsInitializationTag, TransformFragment};
use crate::engine::error::BridgeResult;
use crate::engine::query::{Query, QueryBuilder};
use crate::engine::systems::{Processor, ProcessorContext};
use crate::engine::types::{AccessSets, ProcessorID};


/// Answers vertical ground traces.
pub trait GroundHeightProvider: Send + Sync {
    /// Height of the first ground hit tracing down from `start_z` to `end_z`
    /// at `(x, y)`, or `None` if nothing was hit.
    fn ground_height(&self, x: f32, y: f32, start_z: f32, end_z: f32) -> Option<f32>;
}

/// An infinite horizontal plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGround {
    /// Plane height.
    pub height: f32,
}

impl GroundHeightProvider for FlatGround {
    fn ground_height(&self, _x: f32, _y: f32, start_z: f32, end_z: f32) -> Option<f32> {
        (end_z <= self.height && self.height <= start_z).then_some(self.height)
    }
}

/// Snaps initialized entities carrying [`GroundTraceFragment`] onto the
/// ground. Runs with the behavior processors.
pub struct GroundFollowingProcessor {
    id: ProcessorID,
    query: Query,
    access: AccessSets,
    ground: Arc<dyn GroundHeightProvider>,
}

impl GroundFollowingProcessor {
    /// Creates the processor over `ground`.
    pub fn new(id: ProcessorID, ground: Arc<dyn GroundHeightProvider>) -> BridgeResult<Self> {
        let builder = QueryBuilder::new()
            .read::<GroundTraceFragment>()?
            .write::<TransformFragment>()?
            .without::<NeedsInitializationTag>()?;
        let access = builder.access_sets();
        Ok(Self { id, query: builder.build(), access, ground })
    }
}

impl Processor for GroundFollowingProcessor {
    fn id(&self) -> ProcessorID {
        self.id
    }

    fn name(&self) -> &'static str {
        "ground_following"
    }

    fn access(&self) -> AccessSets {
        self.access.clone()
    }

    fn run(&self, ctx: &ProcessorContext<'_>) -> BridgeResult<()> {
        ctx.store.par_for_each_archetype(&self.query, |view| {
            let traces = view.read::<GroundTraceFragment>()?;
            let mut transforms = view.write::<TransformFragment>()?;
            for (transform, trace) in transforms.iter_mut().zip(traces.iter()) {
                let p = transform.position;
                let start = p.z + trace.trace_start_up_offset;
                let end = p.z - trace.trace_end_down_offset;
                if let Some(hit) = self.ground.ground_height(p.x, p.y, start, end) {
                    transform.position.z = hit + trace.ground_height_offset;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fragments::register_bridge_fragments;
    use crate::engine::component::Bundle;
    use crate::engine::manager::EntityStore;
    use glam::Vec3;

    #[test]
    fn flat_ground_only_hits_inside_the_trace_window() {
        let ground = FlatGround { height: 5.0 };
        assert_eq!(ground.ground_height(0.0, 0.0, 10.0, 0.0), Some(5.0));
        assert_eq!(ground.ground_height(0.0, 0.0, 4.0, 0.0), None);
        assert_eq!(ground.ground_height(0.0, 0.0, 20.0, 6.0), None);
    }

    #[test]
    fn entities_snap_to_ground_plus_offset() {
        register_bridge_fragments().unwrap();
        let mut store = EntityStore::new(1).unwrap();
        let trace = GroundTraceFragment { trace_start_up_offset: 10.0, trace_end_down_offset: 50.0, ground_height_offset: 2.0 };
        let transform = TransformFragment { position: Vec3::new(1.0, 1.0, 30.0), ..Default::default() };
        let walker = store.spawn(Bundle::new().with(transform).unwrap().with(trace).unwrap()).unwrap();
        let flyer = store
            .spawn(Bundle::new().with(TransformFragment { position: Vec3::new(0.0, 0.0, 500.0), ..Default::default() }).unwrap().with(trace).unwrap())
            .unwrap();
        let fresh = store
            .spawn(Bundle::new().with(transform).unwrap().with(trace).unwrap().with(NeedsInitializationTag).unwrap())
            .unwrap();

        let processor = GroundFollowingProcessor::new(1, Arc::new(FlatGround { height: 0.0 })).unwrap();
        processor.run(&ProcessorContext { store: &store, tick: 0, delta_seconds: 0.016 }).unwrap();

        assert_eq!(store.get::<TransformFragment>(walker).unwrap().position.z, 2.0);
        assert_eq!(store.get::<TransformFragment>(flyer).unwrap().position.z, 500.0);
        assert_eq!(store.get::<TransformFragment>(fresh).unwrap().position.z, 30.0);
    }
}
