//! Zone volumes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::spatial::Aabb;
use crate::zones::tasks::ZoneTask;


/// Stable identifier of a registered zone volume. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneVolumeId(pub u64);

impl fmt::Display for ZoneVolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Zone[{}]", self.0)
    }
}

/// A prioritized region with ordered enter and exit task lists.
#[derive(Clone)]
pub struct ZoneVolume {
    /// Display name.
    pub name: String,
    /// World-space bounds.
    pub bounds: Aabb,
    /// Higher wins where volumes overlap.
    pub priority: i32,
    /// Run in order when an entity enters.
    pub enter_tasks: Vec<Arc<dyn ZoneTask>>,
    /// Run in order when an entity leaves.
    pub exit_tasks: Vec<Arc<dyn ZoneTask>>,
}

impl ZoneVolume {
    /// A priority-0 volume without tasks.
    pub fn new(name: impl Into<String>, bounds: Aabb) -> Self {
        Self { name: name.into(), bounds, priority: 0, enter_tasks: Vec::new(), exit_tasks: Vec::new() }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Appends an enter task.
    pub fn on_enter(mut self, task: Arc<dyn ZoneTask>) -> Self {
        self.enter_tasks.push(task);
        self
    }

    /// Appends an exit task.
    pub fn on_exit(mut self, task: Arc<dyn ZoneTask>) -> Self {
        self.exit_tasks.push(task);
        self
    }
}

impl fmt::Debug for ZoneVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneVolume")
            .field("name", &self.name)
            .field("bounds", &self.bounds)
            .field("priority", &self.priority)
            .field("enter_tasks", &self.enter_tasks.len())
            .field("exit_tasks", &self.exit_tasks.len())
            .finish()
    }
}
