//! Core simulation for an endless procedural driving world.
//!
//! A noise-driven heightfield terrain with a clamped valley floor, a
//! raycast-wheel vehicle driving over it, a floating-origin world anchor
//! that keeps render coordinates near zero, and streaming object pools
//! that follow the vehicle across the terrain. Everything is headless:
//! the crate simulates and snapshots, a render layer draws.

pub mod anchor;
pub mod config;
pub mod data;
pub mod physics;
pub mod procgen;
pub mod sim;
pub mod spawner;

pub use anchor::WorldAnchor;
pub use config::{ConfigError, LoggingSettings, SimConfig};
pub use data::{ControlInput, DriveState, SimSnapshot, Throttle, Transform};
pub use physics::{VehicleConfig, VehicleDynamics, VehicleError};
pub use procgen::{HeightGrid, TerrainConfig, TerrainError, TerrainGenerator};
pub use sim::Simulation;
pub use spawner::{PlacementRule, SpawnError, SpawnerConfig, StreamingSpawner};
