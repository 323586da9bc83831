//! Entity templates built from composable traits.
//!
//! An [`EntityTemplate`] is the list of fragments and tags (with their
//! initial values) that every entity spawned for one emitter starts with.
//! Templates are assembled from [`EntityTrait`]s: each trait contributes the
//! fragments it needs to a [`TemplateBuilder`], and a fragment contributed
//! twice keeps the last value.
//!
//! ```ignore
//! let template = EntityTemplate::from_traits(&[
//!     &ParticleLinkTrait::default(),
//!     &ZoneTriggerTrait,
//!     &GroundFollowingTrait::new(GroundFollowingConfig::default()),
//! ])?;
//! let bundle = template.bundle();
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::bridge::fragments::{
    register_bridge_fragments, AnimStateFragment, GroundTraceFragment, NeedsInitializationTag,
    ParticleLinkFragment, PendingEventsFragment, TransformFragment, VelocityFragment,
};
use crate::config::GroundFollowingConfig;
use crate::engine::component::{register_component, Bundle};
use crate::engine::error::BridgeResult;
use crate::engine::types::ComponentID;
use crate::particles::INVALID_ANIM_STATE;


type ValueFactory = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

/// Initial fragment and tag values for spawned entities.
#[derive(Clone, Default)]
pub struct EntityTemplate {
    entries: Vec<(ComponentID, ValueFactory)>,
}

impl EntityTemplate {
    /// A template with no fragments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts a template.
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    /// Builds a template from `traits`, applied in order.
    pub fn from_traits(traits: &[&dyn EntityTrait]) -> BridgeResult<Self> {
        let mut builder = Self::builder();
        for entity_trait in traits {
            entity_trait.build_template(&mut builder)?;
        }
        Ok(builder.build())
    }

    /// The template bridged particles get when nothing else is configured.
    pub fn particle_default() -> BridgeResult<Self> {
        Self::from_traits(&[&ParticleLinkTrait::default()])
    }

    /// Component IDs in the template, in insertion order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Returns `true` if the template carries `component_id`.
    pub fn contains(&self, component_id: ComponentID) -> bool {
        self.entries.iter().any(|(id, _)| *id == component_id)
    }

    /// Number of fragments and tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the template carries nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiates a fresh bundle of the template's initial values.
    pub fn bundle(&self) -> Bundle {
        let mut bundle = Bundle::new();
        for (component_id, factory) in &self.entries {
            bundle.insert_boxed(*component_id, factory());
        }
        bundle
    }
}

impl fmt::Debug for EntityTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.component_ids()).finish()
    }
}

/// Collects fragments while an [`EntityTemplate`] is assembled.
#[derive(Default)]
pub struct TemplateBuilder {
    entries: Vec<(ComponentID, ValueFactory)>,
}

impl TemplateBuilder {
    /// Adds a fragment initialised to `value`, replacing any earlier value.
    pub fn add_fragment<T>(&mut self, value: T) -> BridgeResult<&mut Self>
    where
        T: Clone + Send + Sync + 'static,
    {
        let component_id = register_component::<T>()?;
        let factory: ValueFactory = Arc::new(move || -> Box<dyn Any + Send> { Box::new(value.clone()) });
        self.entries.retain(|(id, _)| *id != component_id);
        self.entries.push((component_id, factory));
        Ok(self)
    }

    /// Adds a zero-sized tag.
    pub fn add_tag<T>(&mut self) -> BridgeResult<&mut Self>
    where
        T: Default + Clone + Send + Sync + 'static,
    {
        self.add_fragment(T::default())
    }

    /// Finishes the template.
    pub fn build(self) -> EntityTemplate {
        EntityTemplate { entries: self.entries }
    }
}

/// A reusable bundle of fragments contributed to a template.
pub trait EntityTrait {
    /// Adds this trait's fragments and tags to `builder`.
    fn build_template(&self, builder: &mut TemplateBuilder) -> BridgeResult<()>;
}

/// Fragments needed to mirror a particle: link, transform, velocity, animation
/// state and the initialization tag.
#[derive(Clone, Copy, Debug)]
pub struct ParticleLinkTrait {
    /// Animation state new entities start with.
    pub default_anim_state: i32,
}

impl Default for ParticleLinkTrait {
    fn default() -> Self {
        Self { default_anim_state: INVALID_ANIM_STATE }
    }
}

impl EntityTrait for ParticleLinkTrait {
    fn build_template(&self, builder: &mut TemplateBuilder) -> BridgeResult<()> {
        register_bridge_fragments()?;
        builder
            .add_fragment(ParticleLinkFragment::default())?
            .add_fragment(TransformFragment::default())?
            .add_fragment(VelocityFragment::default())?
            .add_fragment(AnimStateFragment { anim_state: self.default_anim_state })?
            .add_tag::<NeedsInitializationTag>()?;
        Ok(())
    }
}

/// Lets zone tasks queue state-machine events on the entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZoneTriggerTrait;

impl EntityTrait for ZoneTriggerTrait {
    fn build_template(&self, builder: &mut TemplateBuilder) -> BridgeResult<()> {
        builder.add_fragment(PendingEventsFragment::default())?;
        Ok(())
    }
}

/// Keeps the entity snapped to the ground.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroundFollowingTrait {
    /// Trace window and height offset.
    pub config: GroundFollowingConfig,
}

impl GroundFollowingTrait {
    /// Ground following with the given trace window.
    pub fn new(config: GroundFollowingConfig) -> Self {
        Self { config }
    }
}

impl EntityTrait for GroundFollowingTrait {
    fn build_template(&self, builder: &mut TemplateBuilder) -> BridgeResult<()> {
        builder.add_fragment(GroundTraceFragment {
            trace_start_up_offset: self.config.trace_start_up_offset,
            trace_end_down_offset: self.config.trace_end_down_offset,
            ground_height_offset: self.config.ground_height_offset,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::component_id_of;
    use crate::engine::types::DynamicBundle;

    #[test]
    fn traits_compose_into_one_bundle() {
        let template = EntityTemplate::from_traits(&[
            &ParticleLinkTrait { default_anim_state: 3 },
            &ZoneTriggerTrait,
            &GroundFollowingTrait::default(),
        ])
        .unwrap();
        assert_eq!(template.len(), 7);
        assert!(template.contains(component_id_of::<PendingEventsFragment>().unwrap()));

        let mut bundle = template.bundle();
        let anim = bundle.take(component_id_of::<AnimStateFragment>().unwrap()).unwrap();
        assert_eq!(anim.downcast_ref::<AnimStateFragment>(), Some(&AnimStateFragment { anim_state: 3 }));
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let mut builder = EntityTemplate::builder();
        builder
            .add_fragment(VelocityFragment::default())
            .unwrap()
            .add_fragment(VelocityFragment { value: glam::Vec3::X })
            .unwrap();
        let template = builder.build();
        assert_eq!(template.len(), 1);

        let mut bundle = template.bundle();
        let velocity = bundle.take(component_id_of::<VelocityFragment>().unwrap()).unwrap();
        assert_eq!(velocity.downcast_ref::<VelocityFragment>().map(|v| v.value), Some(glam::Vec3::X));
    }

    #[test]
    fn each_bundle_is_a_fresh_copy() {
        let template = EntityTemplate::particle_default().unwrap();
        assert_eq!(template.bundle().len(), template.len());
        assert_eq!(template.bundle().signature(), template.bundle().signature());
    }
}
