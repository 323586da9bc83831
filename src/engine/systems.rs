//! Behavior processors.
//!
//! A **processor** is a unit of behavior logic run once per step between the
//! Particle→Entity and AnimState sync phases. Processors:
//! - declare which fragments they read and write ([`AccessSets`]),
//! - are grouped by the scheduler into conflict-free stages,
//! - may run in parallel with other processors of the same stage,
//! - see the store only through `&EntityStore`, so structural changes must be
//!   recorded as deferred commands.
//!
//! [`FnProcessor`] wraps a closure so that simple behaviors do not need a
//! dedicated type.

use crate::engine::error::BridgeResult;
use crate::engine::manager::EntityStore;
use crate::engine::types::{AccessSets, ProcessorID, Tick};


/// Per-step data handed to a processor.
pub struct ProcessorContext<'a> {
    /// The entity store, shared.
    pub store: &'a EntityStore,
    /// Index of the current step.
    pub tick: Tick,
    /// Simulated time covered by this step, in seconds.
    pub delta_seconds: f32,
}

/// A unit of behavior logic operating on the entity store.
pub trait Processor: Send + Sync {
    /// Stable identifier; orders processors deterministically.
    fn id(&self) -> ProcessorID;

    /// Name used in logs and profiles.
    fn name(&self) -> &'static str { "processor" }

    /// Fragment access used for conflict detection.
    fn access(&self) -> AccessSets;

    /// Executes the processor.
    fn run(&self, ctx: &ProcessorContext<'_>) -> BridgeResult<()>;
}

/// A [`Processor`] backed by a closure.
pub struct FnProcessor<F>
where
    F: Fn(&ProcessorContext<'_>) -> BridgeResult<()> + Send + Sync + 'static,
{
    id: ProcessorID,
    name: &'static str,
    access: AccessSets,
    f: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&ProcessorContext<'_>) -> BridgeResult<()> + Send + Sync + 'static,
{
    /// Creates a closure-backed processor.
    pub fn new(id: ProcessorID, name: &'static str, access: AccessSets, f: F) -> Self {
        Self { id, name, access, f }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&ProcessorContext<'_>) -> BridgeResult<()> + Send + Sync + 'static,
{
    fn id(&self) -> ProcessorID {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn access(&self) -> AccessSets {
        self.access.clone()
    }

    fn run(&self, ctx: &ProcessorContext<'_>) -> BridgeResult<()> {
        (self.f)(ctx)
    }
}
