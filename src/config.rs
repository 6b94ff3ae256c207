//! TOML configuration for the simulation.
//!
//! One file drives terrain generation, vehicle tuning, the spawner pools
//! and logging. Every section has defaults, so a missing file or a partial
//! file still yields a runnable config. Validation happens at load time;
//! nothing is built from a config that failed it.

use crate::physics::{VehicleConfig, VehicleError};
use crate::procgen::{TerrainConfig, TerrainError};
use crate::spawner::{SpawnError, SpawnerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
    #[error(transparent)]
    Spawner(#[from] SpawnError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub terrain: TerrainConfig,
    pub vehicle: VehicleConfig,
    pub spawners: Vec<SpawnerConfig>,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            vehicle: VehicleConfig::default(),
            spawners: vec![
                SpawnerConfig::trees(),
                SpawnerConfig::frames(),
                SpawnerConfig::mirrors(),
            ],
            logging: LoggingSettings::default(),
        }
    }
}

impl SimConfig {
    /// Read and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but any failure falls back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            Self::default()
        })
    }

    /// Run every section's own validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        self.vehicle.validate()?;
        for spawner in &self.spawners {
            spawner.validate()?;
        }
        Ok(())
    }
}
