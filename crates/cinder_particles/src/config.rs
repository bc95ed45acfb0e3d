//! # Manager Configuration
//!
//! Budgets and seeds for a [`crate::ParticleSystemManager`]. Loaded from
//! TOML once at startup; every field has a default.
//!
//! ```toml
//! max_particle_count = 2500
//! max_field_particle_count = 60
//! min_dynamic_priority = "DUST_TRAIL"
//! client_seed = 1234
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, ParticleResult};
use crate::priority::ParticlePriority;

/// Default soft cap on live particles.
pub const DEFAULT_MAX_PARTICLE_COUNT: usize = 2500;

/// Default soft cap on field particles.
pub const DEFAULT_MAX_FIELD_PARTICLE_COUNT: usize = 100;

/// Limits and seeds for the particle manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Soft cap on live particles. Creation beyond it evicts lower priorities.
    pub max_particle_count: usize,
    /// Cap on particles of area-effect, ground-aligned systems.
    pub max_field_particle_count: usize,
    /// Particles below this priority are refused outright.
    pub min_dynamic_priority: ParticlePriority,
    /// Hard slot count of the particle pool.
    pub particle_pool_size: usize,
    /// Hard slot count of the system pool.
    pub system_pool_size: usize,
    /// Seed of the client random stream.
    pub client_seed: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_particle_count: DEFAULT_MAX_PARTICLE_COUNT,
            max_field_particle_count: DEFAULT_MAX_FIELD_PARTICLE_COUNT,
            min_dynamic_priority: ParticlePriority::LOWEST,
            particle_pool_size: 4096,
            system_pool_size: 1024,
            client_seed: 0x00C1_DE25,
        }
    }
}

impl ManagerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::InvalidConfig`] for malformed TOML or
    /// inconsistent limits.
    pub fn from_toml_str(text: &str) -> ParticleResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ParticleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ParticleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ParticleError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks that the limits fit inside the pools.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> ParticleResult<()> {
        if self.particle_pool_size == 0 || self.system_pool_size == 0 {
            return Err(ParticleError::InvalidConfig("pool sizes must be non-zero".into()));
        }
        if self.max_particle_count > self.particle_pool_size {
            return Err(ParticleError::InvalidConfig(format!(
                "max_particle_count {} exceeds particle_pool_size {}",
                self.max_particle_count, self.particle_pool_size
            )));
        }
        if self.max_field_particle_count > self.max_particle_count {
            return Err(ParticleError::InvalidConfig(format!(
                "max_field_particle_count {} exceeds max_particle_count {}",
                self.max_field_particle_count, self.max_particle_count
            )));
        }
        Ok(())
    }
}
