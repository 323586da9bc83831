//! Identifier types and bitsets shared by the entity store.
//!
//! An [`Entity`](crate::engine::entity::Entity) packs three fields into a
//! `u64`:
//!
//! ```text
//! | version (32) | shard (10) | index (22) |
//! ```
//!
//! Fragments and tags share the [`ComponentID`] space. Archetypes are keyed
//! by the [`Signature`] of what their rows carry; [`QuerySignature`] selects
//! archetypes and [`AccessSets`] lets the scheduler place processors in
//! stages.

use std::any::Any;

use crate::engine::component::component_id_of;
use crate::engine::error::BridgeResult;


/// Packed entity identifier.
pub type EntityID = u64;
/// Allocation shard of an entity.
pub type ShardID = u16;
/// Slot within a shard.
pub type IndexID = u32;
/// Generation of a slot; bumps on every free.
pub type VersionID = u32;
/// Number of live entities.
pub type EntityCount = u32;

/// Processor identifier, unique within a scheduler.
pub type ProcessorID = u16;
/// Step counter of a [`BridgeWorld`](crate::world::BridgeWorld).
pub type Tick = u64;

/// Width of an [`EntityID`] in bits.
pub const ENTITY_BITS: u32 = EntityID::BITS;
/// Shard bits of an [`EntityID`].
pub const SHARD_BITS: u32 = 10;
/// Version bits of an [`EntityID`].
pub const VERSION_BITS: u32 = 32;
/// Index bits of an [`EntityID`]; whatever shard and version leave over.
pub const INDEX_BITS: u32 = ENTITY_BITS - SHARD_BITS - VERSION_BITS;

const _: () = assert!(INDEX_BITS > 0 && SHARD_BITS + VERSION_BITS < ENTITY_BITS);

const fn low_bits(width: u32) -> EntityID {
    if width == 0 { 0 } else { EntityID::MAX >> (ENTITY_BITS - width) }
}

/// Index field of a packed id.
pub const INDEX_MASK: EntityID = low_bits(INDEX_BITS);
/// Shard field of a packed id, after shifting.
pub const SHARD_MASK: EntityID = low_bits(SHARD_BITS);
/// Slots available per shard.
pub const INDEX_CAP: IndexID = INDEX_MASK as IndexID;
/// Upper bound on the configured shard count.
pub const SHARD_CAP: usize = 1usize << SHARD_BITS;

/// Archetype table identifier.
pub type ArchetypeID = u16;
/// Row within an archetype table.
pub type RowID = u32;

/// Fragment or tag identifier.
pub type ComponentID = u16;

/// Fragment and tag types a process may register.
pub const COMPONENT_CAP: usize = 256;
/// Words in a [`Signature`].
pub const SIGNATURE_SIZE: usize = COMPONENT_CAP.div_ceil(64);

/// Set of fragment and tag ids; one bit per [`ComponentID`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Bit words, lowest ids first.
    pub components: [u64; SIGNATURE_SIZE],
}

#[inline]
fn word_and_bit(component_id: ComponentID) -> (usize, u64) {
    let id = component_id as usize;
    (id / 64, 1u64 << (id % 64))
}

impl Signature {
    /// Adds `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentID) {
        let (word, bit) = word_and_bit(component_id);
        self.components[word] |= bit;
    }

    /// Removes `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentID) {
        let (word, bit) = word_and_bit(component_id);
        self.components[word] &= !bit;
    }

    /// Whether `component_id` is in the set.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        let (word, bit) = word_and_bit(component_id);
        self.components[word] & bit != 0
    }

    /// Superset test.
    #[inline]
    pub fn contains_all(&self, other: &Signature) -> bool {
        self.components.iter().zip(&other.components).all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// Whether the two sets share any id.
    #[inline]
    pub fn intersects(&self, other: &Signature) -> bool {
        self.components.iter().zip(&other.components).any(|(mine, theirs)| mine & theirs != 0)
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|word| *word == 0)
    }

    /// Ids in ascending order.
    pub fn iterate_over_components(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components.iter().enumerate().flat_map(|(word_index, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let offset = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some((word_index * 64 + offset) as ComponentID)
            })
        })
    }
}

/// Archetype filter of a query.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuerySignature {
    /// Required, shared access.
    pub read: Signature,
    /// Required, exclusive access.
    pub write: Signature,
    /// Must be absent.
    pub without: Signature,
}

impl QuerySignature {
    /// Whether an archetype with `archetype` passes the filter.
    pub fn requires_all(&self, archetype: &Signature) -> bool {
        archetype.contains_all(&self.read) && archetype.contains_all(&self.write) && !archetype.intersects(&self.without)
    }
}

/// Adds `T` to the read set.
pub fn set_read<T: 'static + Send + Sync>(signature: &mut QuerySignature) -> BridgeResult<()> {
    signature.read.set(component_id_of::<T>()?);
    Ok(())
}

/// Adds `T` to the write set.
pub fn set_write<T: 'static + Send + Sync>(signature: &mut QuerySignature) -> BridgeResult<()> {
    signature.write.set(component_id_of::<T>()?);
    Ok(())
}

/// Adds `T` to the excluded set.
pub fn set_without<T: 'static + Send + Sync>(signature: &mut QuerySignature) -> BridgeResult<()> {
    signature.without.set(component_id_of::<T>()?);
    Ok(())
}

/// Fragments a processor touches; drives stage packing.
#[derive(Clone, Debug, Default)]
pub struct AccessSets {
    /// Shared access.
    pub read: Signature,
    /// Exclusive access.
    pub write: Signature,
}

impl AccessSets {
    /// Two processors conflict unless both only read what they share.
    #[inline]
    pub fn conflicts_with(&self, other: &AccessSets) -> bool {
        self.write.intersects(&other.write) || self.write.intersects(&other.read) || self.read.intersects(&other.write)
    }
}

/// Source of boxed values keyed by [`ComponentID`].
pub trait DynamicBundle {
    /// Moves the value for `component_id` out, if any.
    fn take(&mut self, component_id: ComponentID) -> Option<Box<dyn Any + Send>>;
}

/// Fragment and tag values of one entity-to-be.
#[derive(Default)]
pub struct Bundle {
    signature: Signature,
    values: Vec<(ComponentID, Box<dyn Any + Send>)>,
}

impl Bundle {
    /// Empty bundle.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `component_id`; a second insert replaces the first.
    #[inline]
    pub fn insert<T: Any + Send>(&mut self, component_id: ComponentID, value: T) {
        self.insert_boxed(component_id, Box::new(value));
    }

    /// Boxed variant of [`Bundle::insert`].
    pub fn insert_boxed(&mut self, component_id: ComponentID, value: Box<dyn Any + Send>) {
        if self.signature.has(component_id) {
            self.values.retain(|(id, _)| *id != component_id);
        }
        self.signature.set(component_id);
        self.values.push((component_id, value));
    }

    /// Builder-style insert keyed by the registered id of `T`.
    pub fn with<T: 'static + Send + Sync>(mut self, value: T) -> BridgeResult<Self> {
        self.insert(component_id_of::<T>()?, value);
        Ok(self)
    }

    /// Ids currently held.
    #[inline]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Number of values held.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DynamicBundle for Bundle {
    #[inline]
    fn take(&mut self, component_id: ComponentID) -> Option<Box<dyn Any + Send>> {
        let index = self.values.iter().position(|(id, _)| *id == component_id)?;
        let (_, value) = self.values.swap_remove(index);
        self.signature.clear(component_id);
        Some(value)
    }
}
