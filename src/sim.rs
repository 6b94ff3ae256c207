//! Top-level simulation session.
//!
//! Owns the terrain generator, the vehicle, the world anchor and the
//! spawner pools, and advances them together once per frame. Physics and
//! spawners run in true world coordinates; snapshots carry the anchor
//! offsets so a render layer can draw the floating-origin view.

use crate::anchor::WorldAnchor;
use crate::config::{ConfigError, SimConfig};
use crate::data::{ControlInput, SimSnapshot};
use crate::physics::VehicleDynamics;
use crate::procgen::{spawn_regeneration, RegenJob, TerrainConfig, TerrainError, TerrainGenerator};
use crate::spawner::StreamingSpawner;
use glam::Vec3;
use std::sync::Arc;
use tracing::{info, warn};

/// Height above the valley floor the vehicle spawns at
const SPAWN_CLEARANCE: f32 = 2.0;

pub struct Simulation {
    terrain: TerrainGenerator,
    vehicle: VehicleDynamics,
    anchor: WorldAnchor,
    spawners: Vec<StreamingSpawner>,
    regen: Option<RegenJob>,
}

impl Simulation {
    /// Build a full session from one config: generate terrain, place the
    /// vehicle over the valley floor at the world center and populate every
    /// pool around it.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let terrain = TerrainGenerator::new(config.terrain)?;
        let grid = terrain.height_grid();

        let spawn = Vec3::new(0.0, terrain.floor_height() + SPAWN_CLEARANCE, 0.0);
        let vehicle = VehicleDynamics::new(config.vehicle, Arc::clone(&grid), spawn)?;
        let anchor = WorldAnchor::new(spawn);

        let mut spawners = Vec::with_capacity(config.spawners.len());
        for spawner_config in config.spawners {
            let capacity = spawner_config.capacity;
            let mut spawner = StreamingSpawner::new(spawner_config)?;
            spawner.spawn(capacity, (spawn.x, spawn.z), &grid)?;
            spawners.push(spawner);
        }

        info!(pools = spawners.len(), "simulation ready");
        Ok(Self { terrain, vehicle, anchor, spawners, regen: None })
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    pub fn vehicle(&self) -> &VehicleDynamics {
        &self.vehicle
    }

    pub fn anchor(&self) -> &WorldAnchor {
        &self.anchor
    }

    pub fn spawners(&self) -> &[StreamingSpawner] {
        &self.spawners
    }

    /// Surface height at true world coordinates, `None` off the grid
    pub fn height_at(&self, world_x: f32, world_z: f32) -> Option<f32> {
        self.terrain.height_at(world_x, world_z)
    }

    /// Route driver input to the vehicle. The input persists until replaced.
    pub fn apply_control(&mut self, input: ControlInput) {
        self.vehicle.apply_control(input);
    }

    /// Advance the whole simulation by `elapsed` seconds of real time.
    pub fn tick(&mut self, elapsed: f32) {
        // A finished background regeneration swaps in between physics steps
        if let Some(job) = &self.regen {
            if let Some((config, grid)) = job.poll() {
                self.terrain.install(config, grid);
                self.regen = None;
                self.rebuild_after_swap();
            }
        }

        self.vehicle.step(elapsed);
        self.anchor.update(self.vehicle.chassis().position);

        let grid = self.terrain.height_grid();
        let position = self.vehicle.chassis().position;
        for spawner in &mut self.spawners {
            spawner.update(elapsed, position, &grid);
        }
    }

    /// Regenerate the terrain synchronously from a new config.
    pub fn apply_terrain_config(&mut self, config: TerrainConfig) -> Result<(), TerrainError> {
        self.terrain.regenerate(config)?;
        self.rebuild_after_swap();
        Ok(())
    }

    /// Regenerate with a new seed, or reproduce the current terrain with
    /// `None`.
    pub fn reseed(&mut self, seed: Option<u32>) -> Result<(), TerrainError> {
        self.terrain.reseed(seed)?;
        self.rebuild_after_swap();
        Ok(())
    }

    /// Start a background regeneration; the swap lands in a later tick.
    pub fn request_regeneration(&mut self, config: TerrainConfig) -> Result<(), TerrainError> {
        if self.regen.is_some() {
            warn!("replacing an in-flight terrain regeneration");
        }
        self.regen = Some(spawn_regeneration(config)?);
        Ok(())
    }

    /// True while a background regeneration has not landed yet
    pub fn regeneration_pending(&self) -> bool {
        self.regen.is_some()
    }

    /// The vehicle's collision surface and the pools are stale after a grid
    /// swap: point the suspension rays at the new grid and re-scatter every
    /// pool around the vehicle.
    fn rebuild_after_swap(&mut self) {
        let grid = self.terrain.height_grid();
        self.vehicle.rebuild_collision(Arc::clone(&grid));

        let position = self.vehicle.chassis().position;
        let center = (position.x, position.z);
        for spawner in &mut self.spawners {
            let count = spawner.config().capacity;
            if let Err(e) = spawner.spawn(count, center, &grid) {
                warn!(error = %e, "pool respawn after terrain swap failed");
            }
        }
    }

    /// Read-only view of the whole simulation for renderers and inspectors.
    /// Pool instances come out in render space, chassis and wheels in true
    /// world coordinates alongside the anchor offsets.
    pub fn snapshot(&self) -> SimSnapshot {
        let pools = self
            .spawners
            .iter()
            .map(|spawner| {
                let mut snap = spawner.snapshot();
                for pose in &mut snap.instances {
                    pose.position = self.anchor.to_render(pose.position);
                }
                snap
            })
            .collect();

        SimSnapshot {
            chassis: self.vehicle.chassis_transform(),
            wheels: self.vehicle.wheel_transforms(),
            drive_state: self.vehicle.drive_state(),
            speed: self.vehicle.chassis().linear_velocity.length(),
            true_displacement: self.anchor.true_displacement(),
            environment_offset: self.anchor.environment_offset(),
            terrain_revision: self.terrain.revision(),
            pools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DriveState;
    use crate::spawner::SpawnerConfig;
    use std::thread;
    use std::time::Duration;

    /// Floor above every reachable noise value, so the whole grid clamps to
    /// one flat plane
    fn create_flat_terrain(seed: u32) -> TerrainConfig {
        TerrainConfig {
            grid_width: 33,
            grid_depth: 33,
            floor_elevation: 1.5,
            ..TerrainConfig::with_seed(seed)
        }
    }

    fn create_test_config() -> SimConfig {
        SimConfig {
            terrain: create_flat_terrain(5),
            spawners: vec![SpawnerConfig {
                capacity: 6,
                spawn_radius: 60.0,
                trigger_radius: 150.0,
                ..SpawnerConfig::default()
            }
            .with_seed(9)],
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_new_simulation_snapshot_shape() {
        let sim = Simulation::new(create_test_config()).unwrap();
        let snapshot = sim.snapshot();

        assert_eq!(snapshot.drive_state, DriveState::Idle);
        assert_eq!(snapshot.terrain_revision, 1);
        assert_eq!(snapshot.true_displacement, Vec3::ZERO);
        assert_eq!(snapshot.pools.len(), 1);
        assert_eq!(snapshot.pools[0].instances.len(), 6);

        // Spawned two meters above the clamped floor
        let floor = sim.terrain().floor_height();
        assert!((snapshot.chassis.position.y - (floor + 2.0)).abs() < 1e-4);
    }

    #[test]
    fn test_ticking_with_throttle_displaces_and_anchors() {
        let mut sim = Simulation::new(create_test_config()).unwrap();

        // Let the vehicle settle, then drive
        for _ in 0..180 {
            sim.tick(1.0 / 60.0);
        }
        sim.apply_control(ControlInput::full_throttle());
        for _ in 0..180 {
            sim.tick(1.0 / 60.0);
        }

        let snapshot = sim.snapshot();
        assert!(
            snapshot.true_displacement.z > 0.5,
            "throttle should displace the vehicle, got {:?}",
            snapshot.true_displacement
        );
        assert_eq!(snapshot.environment_offset, -snapshot.true_displacement);
        assert_eq!(snapshot.drive_state, DriveState::Driving);
        assert!(snapshot.speed > 0.5);
    }

    #[test]
    fn test_synchronous_regeneration_swaps_and_repopulates() {
        let mut sim = Simulation::new(create_test_config()).unwrap();
        for _ in 0..60 {
            sim.tick(1.0 / 60.0);
        }

        sim.apply_terrain_config(create_flat_terrain(6)).unwrap();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.terrain_revision, 2);
        assert_eq!(
            snapshot.pools[0].instances.len(),
            6,
            "pools repopulate on the new surface"
        );
    }

    #[test]
    fn test_background_regeneration_lands_in_a_tick() {
        let mut sim = Simulation::new(create_test_config()).unwrap();

        sim.request_regeneration(create_flat_terrain(7)).unwrap();
        assert!(sim.regeneration_pending());

        let mut landed = false;
        for _ in 0..200 {
            sim.tick(1.0 / 60.0);
            if sim.terrain().revision() == 2 {
                landed = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(landed, "background regeneration never landed");
        assert!(!sim.regeneration_pending());
    }

    #[test]
    fn test_invalid_sections_fail_construction() {
        let mut config = create_test_config();
        config.vehicle.chassis_mass = 0.0;
        assert!(Simulation::new(config).is_err());

        let mut config = create_test_config();
        config.terrain.height_multiplier = 0.0;
        assert!(Simulation::new(config).is_err());
    }
}
