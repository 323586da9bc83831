//! Runtime configuration.
//!
//! [`BridgeConfig`] is plain serde data. Every field has a default, so a
//! JSON document only needs to name what it overrides:
//!
//! ```json
//! { "max_entities_to_process_per_frame": 64, "ground": { "ground_height_offset": 1.5 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::SHARD_CAP;
use crate::particles::INVALID_ANIM_STATE;


/// Errors raised while loading or validating a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("config i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid configuration JSON.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Vertical trace window for ground following.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundFollowingConfig {
    /// Distance above the entity where the trace starts.
    pub trace_start_up_offset: f32,
    /// Distance below the entity where the trace ends.
    pub trace_end_down_offset: f32,
    /// Height kept above the ground.
    pub ground_height_offset: f32,
}

impl Default for GroundFollowingConfig {
    fn default() -> Self {
        Self { trace_start_up_offset: 100.0, trace_end_down_offset: 1000.0, ground_height_offset: 0.0 }
    }
}

/// Everything [`BridgeWorld`](crate::world::BridgeWorld) needs to start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Spawn/destroy budget of the bridge step.
    pub max_entities_to_process_per_frame: usize,
    /// Entities the deletion processor destroys per step.
    pub max_entities_to_destroy_per_frame: usize,
    /// Zone grid cell size per level, finest first.
    pub grid_cell_sizes: Vec<f32>,
    /// Grid level zone volumes are indexed at.
    pub zone_query_level: usize,
    /// Animation state given to freshly linked entities.
    pub default_anim_state: i32,
    /// Shards of the entity allocator.
    pub entity_shards: usize,
    /// Trace window used by [`GroundFollowingTrait`](crate::bridge::GroundFollowingTrait).
    pub ground: GroundFollowingConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_entities_to_process_per_frame: 500,
            max_entities_to_destroy_per_frame: 500,
            grid_cell_sizes: vec![100.0, 1000.0, 10000.0],
            zone_query_level: 0,
            default_anim_state: INVALID_ANIM_STATE,
            entity_shards: 4,
            ground: GroundFollowingConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Writes the configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Checks budgets, grid levels and the shard count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities_to_process_per_frame == 0 {
            return Err(invalid("max_entities_to_process_per_frame", "must be non-zero"));
        }
        if self.max_entities_to_destroy_per_frame == 0 {
            return Err(invalid("max_entities_to_destroy_per_frame", "must be non-zero"));
        }
        if self.grid_cell_sizes.is_empty() {
            return Err(invalid("grid_cell_sizes", "needs at least one level"));
        }
        if let Some(bad) = self.grid_cell_sizes.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(invalid("grid_cell_sizes", format!("{bad} is not a positive cell size")));
        }
        if self.zone_query_level >= self.grid_cell_sizes.len() {
            return Err(invalid(
                "zone_query_level",
                format!("level {} but only {} grid levels", self.zone_query_level, self.grid_cell_sizes.len()),
            ));
        }
        if self.entity_shards == 0 || self.entity_shards > SHARD_CAP {
            return Err(invalid("entity_shards", format!("must be in 1..={SHARD_CAP}")));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = BridgeConfig::from_json_str(r#"{ "max_entities_to_process_per_frame": 8 }"#).unwrap();
        assert_eq!(config.max_entities_to_process_per_frame, 8);
        assert_eq!(config.grid_cell_sizes, vec![100.0, 1000.0, 10000.0]);
        assert_eq!(config.ground, GroundFollowingConfig::default());
        assert_eq!(config.default_anim_state, -1);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let err = BridgeConfig::from_json_str(r#"{ "grid_cell_sizes": [100.0, -1.0] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "grid_cell_sizes", .. }));

        let err = BridgeConfig::from_json_str(r#"{ "zone_query_level": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "zone_query_level", .. }));

        let err = BridgeConfig::from_json_str(r#"{ "entity_shards": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "entity_shards", .. }));

        assert!(matches!(BridgeConfig::from_json_str("{ not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn parse_errors_keep_their_source() {
        let err = BridgeConfig::from_json_str(r#"{ "entity_shards": "four" }"#).unwrap_err();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some_and(|e| e.is_data()));
        assert!(err.to_string().starts_with("config parse failed"));
    }
}
