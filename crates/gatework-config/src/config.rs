//! Simulation settings.
//!
//! A [`SimConfig`] is a small TOML document controlling how a compiled
//! circuit is driven. Missing fields fall back to their defaults, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! name = "bench"
//! tick_rate_hz = 120
//! max_settle_rounds = 256
//! force_first_step = true
//! carry_over_state = false
//! ```

use std::path::Path;

use gatework_core::Simulation;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Upper bound accepted for `tick_rate_hz`.
pub const MAX_TICK_RATE_HZ: u32 = 1_000_000;

/// Settings for driving a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Profile name, shown in logs.
    pub name: String,
    /// Rate at which an external driver calls `step()`.
    pub tick_rate_hz: u32,
    /// Cap on steps for one `settle()` call; cyclic circuits may never settle.
    pub max_settle_rounds: u32,
    /// Run the first step after a compile with `force`.
    pub force_first_step: bool,
    /// Keep toggle button levels across recompiles.
    pub carry_over_state: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            tick_rate_hz: 60,
            max_settle_rounds: 64,
            force_first_step: true,
            carry_over_state: true,
        }
    }
}

impl SimConfig {
    /// Create a default configuration with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Set the settle cap.
    pub fn with_max_settle_rounds(mut self, rounds: u32) -> Self {
        self.max_settle_rounds = rounds;
        self
    }

    /// Load and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), name = %config.name, "loaded sim config");
        Ok(config)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(ConfigError::invalid(
                "tick_rate_hz",
                format!("must be between 1 and {MAX_TICK_RATE_HZ}"),
            ));
        }
        if self.max_settle_rounds == 0 {
            return Err(ConfigError::invalid(
                "max_settle_rounds",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Applies the driver flags to a simulation.
    pub fn apply(&self, sim: &mut Simulation) {
        sim.set_carry_over(self.carry_over_state);
        sim.set_force_first_step(self.force_first_step);
    }

    /// Interval between steps at the configured tick rate.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}
