//! Emitters and the generational emitter registry.
//!
//! An [`Emitter`] is one particle-simulation instance: it owns a
//! [`ParticleStore`] and the declarative configuration the bridge reads when
//! it creates entities for new particles.
//!
//! Everything outside the registry refers to an emitter through an
//! [`EmitterHandle`] (slot index + generation). A handle never keeps an
//! emitter alive; once the emitter is removed, the slot's generation moves
//! on and every outstanding handle stops resolving. Callers re-validate a
//! handle on every use, in particular after an asynchronous placement
//! callback resumes.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::bridge::placement::PlacementGenerator;
use crate::bridge::template::EntityTemplate;
use crate::particles::store::ParticleStore;


/// Weak reference to an emitter in an [`EmitterRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmitterHandle {
    /// Slot index in the registry.
    pub index: u32,
    /// Generation of the slot when the handle was issued.
    pub generation: u32,
}

impl fmt::Display for EmitterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Emitter[{}:{}]", self.index, self.generation)
    }
}

/// Declarative per-emitter configuration.
#[derive(Clone)]
pub struct EmitterConfig {
    /// Fragments and tags every entity spawned for this emitter starts with.
    pub template: EntityTemplate,
    /// Custom spawn-location strategy; `None` places entities at their
    /// particle's current transform.
    pub placement: Option<Arc<dyn PlacementGenerator>>,
    /// Particle lifetime in seconds, consumed by the particle kernel only.
    pub lifetime: Option<f32>,
    /// Whether the kernel loops the emitter, consumed by the kernel only.
    pub looping: bool,
}

impl EmitterConfig {
    /// Configuration spawning entities from `template` with default placement.
    pub fn new(template: EntityTemplate) -> Self {
        Self { template, placement: None, lifetime: None, looping: false }
    }

    /// Uses `generator` to place new entities.
    pub fn with_placement(mut self, generator: Arc<dyn PlacementGenerator>) -> Self {
        self.placement = Some(generator);
        self
    }

    /// Sets the kernel-side particle lifetime.
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    /// Sets the kernel-side looping flag.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl fmt::Debug for EmitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterConfig")
            .field("template", &self.template)
            .field("custom_placement", &self.placement.is_some())
            .field("lifetime", &self.lifetime)
            .field("looping", &self.looping)
            .finish()
    }
}

/// One particle-simulation instance.
pub struct Emitter {
    name: String,
    store: Mutex<ParticleStore>,
    config: EmitterConfig,
}

impl Emitter {
    /// Creates an emitter with an empty particle store.
    pub fn new(name: impl Into<String>, config: EmitterConfig) -> Self {
        Self { name: name.into(), store: Mutex::new(ParticleStore::new()), config }
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration.
    #[inline]
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Runs `f` with exclusive access to the particle store.
    ///
    /// A poisoned lock is recovered: the store holds plain data, and a
    /// panicking kernel callback cannot leave a record half-written.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut ParticleStore) -> R) -> R {
        let mut guard = self.store.lock().unwrap_or_else(|poisoned| {
            warn!("particle store of `{}` was poisoned; recovering", self.name);
            PoisonError::into_inner(poisoned)
        });
        f(&mut guard)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").field("name", &self.name).field("config", &self.config).finish()
    }
}

struct Slot {
    generation: u32,
    emitter: Option<Arc<Emitter>>,
}

/// Owner of all emitters.
#[derive(Default)]
pub struct EmitterRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EmitterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an emitter and returns its handle.
    pub fn insert(&mut self, emitter: Emitter) -> EmitterHandle {
        let emitter = Arc::new(emitter);
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.emitter = Some(emitter);
                EmitterHandle { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, emitter: Some(emitter) });
                EmitterHandle { index, generation: 0 }
            }
        };
        info!("emitter {handle} registered");
        handle
    }

    /// Removes an emitter. Every handle to it stops resolving.
    pub fn remove(&mut self, handle: EmitterHandle) -> Option<Arc<Emitter>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let emitter = slot.emitter.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        info!("emitter {handle} (`{}`) removed", emitter.name());
        Some(emitter)
    }

    /// Resolves a handle.
    pub fn get(&self, handle: EmitterHandle) -> Option<Arc<Emitter>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.emitter.clone()
    }

    /// Returns `true` if `handle` still resolves.
    pub fn is_valid(&self, handle: EmitterHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.emitter.is_some())
    }

    /// Runs `f` with the emitter's particle store, if the handle resolves.
    pub fn with_store<R>(&self, handle: EmitterHandle, f: impl FnOnce(&mut ParticleStore) -> R) -> Option<R> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.emitter.as_ref().map(|emitter| emitter.with_store(f))
    }

    /// Handles of every live emitter, in slot order.
    pub fn handles(&self) -> Vec<EmitterHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.emitter.is_some())
            .map(|(index, slot)| EmitterHandle { index: index as u32, generation: slot.generation })
            .collect()
    }

    /// Number of live emitters.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no emitter is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::store::ParticleRecord;

    fn emitter(name: &str) -> Emitter {
        Emitter::new(name, EmitterConfig::new(EntityTemplate::empty()))
    }

    #[test]
    fn removed_handles_stop_resolving_and_slots_are_reused() {
        let mut registry = EmitterRegistry::new();
        let a = registry.insert(emitter("a"));
        assert!(registry.is_valid(a));

        assert!(registry.remove(a).is_some());
        assert!(!registry.is_valid(a));
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none());

        let b = registry.insert(emitter("b"));
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert!(!registry.is_valid(a));
        assert_eq!(registry.get(b).map(|e| e.name().to_owned()), Some("b".into()));
        assert_eq!(registry.handles(), vec![b]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn with_store_reaches_the_particle_table() {
        let mut registry = EmitterRegistry::new();
        let handle = registry.insert(emitter("a"));
        let added = registry.with_store(handle, |store| store.add_particle_data(1, ParticleRecord::default()));
        assert_eq!(added, Some(true));
        assert_eq!(registry.with_store(handle, |store| store.len()), Some(1));

        registry.remove(handle);
        assert_eq!(registry.with_store(handle, |store| store.len()), None);
    }
}
