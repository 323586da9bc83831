//! Stage construction and execution for behavior processors.
//!
//! Processors are assigned to **stages** such that:
//! * processors within the same stage do **not** conflict on fragment access,
//! * all processors in a stage may run in parallel,
//! * stages are executed sequentially.
//!
//! Deferred commands are applied after each stage completes, so a later
//! stage observes every structural change recorded by an earlier one.

use log::warn;
use rayon::prelude::*;

use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::engine::systems::{Processor, ProcessorContext};
use crate::engine::types::Tick;
use crate::profiler;


/// A group of processors that can be executed in parallel.
///
/// ## Invariants
/// * All processors within a `Stage` have non-conflicting access sets.
pub struct Stage {
    /// Processors scheduled to run in this stage.
    pub processors: Vec<Box<dyn Processor>>,
}

/// Partitions processors into parallel execution stages.
///
/// Processors are sorted by ID and placed greedily into the first stage where
/// they do not conflict with any processor already there; otherwise a new
/// stage is opened. Sorting makes stage construction reproducible.
pub fn make_stages(mut processors: Vec<Box<dyn Processor>>) -> Vec<Stage> {
    let mut stages: Vec<Stage> = Vec::new();

    processors.sort_by_key(|p| p.id());

    'next_processor: for processor in processors.into_iter() {
        for stage in stages.iter_mut() {
            let conflict = stage.processors.iter()
                .any(|other| processor.access().conflicts_with(&other.access()));
            if !conflict {
                stage.processors.push(processor);
                continue 'next_processor;
            }
        }
        stages.push(Stage { processors: vec![processor] });
    }
    stages
}

/// Runs every stage in order, flushing deferred commands after each.
///
/// A failing processor is logged; the remaining processors and stages still
/// run.
pub fn run_stages(
    store: &mut EntityStore,
    stages: &[Stage],
    tick: Tick,
    delta_seconds: f32,
) -> BridgeResult<()> {
    for stage in stages {
        {
            let ctx = ProcessorContext { store: &*store, tick, delta_seconds };
            stage.processors.par_iter().for_each(|processor| {
                let _span = profiler::span(processor.name());
                if let Err(error) = processor.run(&ctx) {
                    warn!("processor `{}` failed: {error}", processor.name());
                }
            });
        }
        store.apply_deferred_commands()?;
    }
    Ok(())
}

/// Owns the behavior stages.
#[derive(Default)]
pub struct Scheduler {
    pending: Vec<Box<dyn Processor>>,
    stages: Vec<Stage>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self { Self::default() }

    /// Adds a processor; stages are rebuilt on the next run.
    pub fn add_processor(&mut self, processor: Box<dyn Processor>) {
        self.pending.push(processor);
    }

    /// Number of registered processors.
    pub fn processor_count(&self) -> usize {
        self.pending.len() + self.stages.iter().map(|s| s.processors.len()).sum::<usize>()
    }

    /// Number of stages after the last rebuild.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn rebuild(&mut self) {
        if self.pending.is_empty() { return; }
        let mut all: Vec<Box<dyn Processor>> = std::mem::take(&mut self.pending);
        for stage in self.stages.drain(..) {
            all.extend(stage.processors);
        }
        self.stages = make_stages(all);
    }

    /// Runs all stages.
    pub fn run(&mut self, store: &mut EntityStore, tick: Tick, delta_seconds: f32) -> BridgeResult<()> {
        self.rebuild();
        run_stages(store, &self.stages, tick, delta_seconds)
    }
}
