//! Machine configuration and its validation.

use crate::core::MAX_CAPACITY;
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Default retroactive horizon in seconds.
pub const DEFAULT_RETROACTIVE_HORIZON: f64 = 7.0;

/// How the machine shares its state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationMode {
    /// One process writes and reads; the authority oracle is ignored.
    #[default]
    Local,
    /// One authority writes, every other replica only reconciles.
    Replicated,
}

/// Problems found in a [`MachineConfig`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Buffer capacity {capacity} outside 1..={max}")]
    CapacityOutOfRange { capacity: usize, max: usize },

    #[error("Retroactive horizon must be finite and non-negative, got {horizon}")]
    InvalidHorizon { horizon: f64 },

    #[error("Configuration could not be parsed: {0}")]
    Parse(String),
}

/// Tunables of one machine.
///
/// # Example
///
/// ```rust
/// use retrostate::{MachineConfig, ReplicationMode};
///
/// let config = MachineConfig::from_json(
///     r#"{ "capacity": 3, "retroactive_horizon": 2.5, "mode": "Replicated" }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.capacity, 3);
/// assert_eq!(config.mode, ReplicationMode::Replicated);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of recent states kept for catch-up, `1..=4`.
    pub capacity: usize,
    /// Intermediate transitions older than this many seconds are not
    /// replayed to observers that catch up late.
    pub retroactive_horizon: f64,
    pub mode: ReplicationMode,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_CAPACITY,
            retroactive_horizon: DEFAULT_RETROACTIVE_HORIZON,
            mode: ReplicationMode::Local,
        }
    }
}

impl MachineConfig {
    pub fn replicated() -> Self {
        Self {
            mode: ReplicationMode::Replicated,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.retroactive_horizon = horizon;
        self
    }

    pub fn with_mode(mut self, mode: ReplicationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, Vec<ConfigError>> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| vec![ConfigError::Parse(e.to_string())])?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        match self.checks() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }

    fn checks(&self) -> Validation<(), NonEmptyVec<ConfigError>> {
        let capacity = if (1..=MAX_CAPACITY).contains(&self.capacity) {
            Validation::success(())
        } else {
            Validation::fail(ConfigError::CapacityOutOfRange {
                capacity: self.capacity,
                max: MAX_CAPACITY,
            })
        };

        let horizon = if self.retroactive_horizon.is_finite() && self.retroactive_horizon >= 0.0 {
            Validation::success(())
        } else {
            Validation::fail(ConfigError::InvalidHorizon {
                horizon: self.retroactive_horizon,
            })
        };

        Validation::all_vec(vec![capacity, horizon]).map(|_| ())
    }
}
