//! The particle side of the bridge.
//!
//! * [`store`]: per-emitter particle table plus spawn/death mailboxes.
//! * [`emitter`]: emitters, their configuration, and the generational
//!   registry that hands out weak [`EmitterHandle`]s.

pub mod store;
pub mod emitter;

pub use emitter::{Emitter, EmitterConfig, EmitterHandle, EmitterRegistry};
pub use store::{ParticleId, ParticleRecord, ParticleStore, INVALID_ANIM_STATE, INVALID_SPLINE_INDEX};
