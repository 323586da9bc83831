//! Zone volumes and the trigger machinery around them.
//!
//! * [`volume`]: prioritized regions with enter/exit task lists.
//! * [`tasks`]: the task trait and the built-in tasks.
//! * [`state_machine`]: the seam to the external state-machine engine.
//! * [`subsystem`]: [`ZoneTriggerSubsystem`], the volume index and entity assignments.
//! * [`processor`]: [`ZoneTriggerProcessor`], the per-step transition pass.

pub mod volume;
pub mod tasks;
pub mod state_machine;
pub mod subsystem;
pub mod processor;

pub use processor::{ZoneStats, ZoneTriggerProcessor};
pub use state_machine::{NullStateMachine, RecordingStateMachine, StateMachineEngine, StateMachineEvent};
pub use subsystem::ZoneTriggerSubsystem;
pub use tasks::{DebugLogTask, RequestEventTask, SetAnimStateTask, ZoneTask, ZoneTaskContext, ZoneTransition};
pub use volume::{ZoneVolume, ZoneVolumeId};
