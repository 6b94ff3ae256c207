//! Streaming environment-object pools.
//!
//! Each spawner owns a fixed-capacity pool of instances (trees, frames,
//! mirrors) scattered on the terrain around a center point. When the vehicle
//! drives beyond the trigger radius the pool slides below ground, respawns
//! around the vehicle's new position and slides back up, so a small fixed
//! set of objects follows the drive indefinitely.
//!
//! Spawners work entirely in true world coordinates; the render layer
//! applies the world-anchor offset when drawing.

use crate::data::{InstancePose, PoolSnapshot};
use crate::procgen::HeightGrid;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by pool configuration and population
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("requested {requested} instances but pool capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("invalid spawner configuration: {0}")]
    InvalidConfiguration(String),
}

/// Accepts or rejects a candidate surface sample during placement.
///
/// Every spawner carries one; candidates that fail are re-rolled up to the
/// configured attempt budget and then skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PlacementRule {
    /// Any point with ground under it
    Anywhere,
    /// Only within `tolerance` of the valley-floor clamp plane
    FloorOnly { tolerance: f32 },
    /// Only where the surface lies at or below `limit`
    MaxElevation { limit: f32 },
}

impl PlacementRule {
    fn allows(&self, surface: f32, floor: f32) -> bool {
        match *self {
            PlacementRule::Anywhere => true,
            PlacementRule::FloorOnly { tolerance } => (surface - floor).abs() <= tolerance,
            PlacementRule::MaxElevation { limit } => surface <= limit,
        }
    }
}

fn default_seed() -> u64 {
    rand::random()
}

/// Parameters of one streaming pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Pool name, carried through snapshots
    pub name: String,
    /// Fixed pool capacity; spawn requests beyond it are rejected
    pub capacity: usize,
    /// Radius of the placement disk around the spawn center
    pub spawn_radius: f32,
    /// Vehicle distance from the last trigger center that refires the pool
    pub trigger_radius: f32,
    /// Y of the hidden plane instances sink to, relative to the valley floor
    pub slide_out_y: f32,
    /// Y of the resting plane, relative to the valley floor
    pub resting_y: f32,
    /// Length of one slide transition in seconds
    pub transition_duration: f32,
    /// Candidate samples tried per instance before it is skipped
    pub attempts_per_instance: u32,
    /// Seed of the pool's own RNG stream
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Placement predicate applied to every candidate sample; kept last so
    /// the TOML table serializes after the scalar fields
    pub placement: PlacementRule,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            capacity: 16,
            spawn_radius: 100.0,
            trigger_radius: 150.0,
            slide_out_y: -20.0,
            resting_y: 0.0,
            transition_duration: 0.6,
            placement: PlacementRule::Anywhere,
            attempts_per_instance: 16,
            seed: default_seed(),
        }
    }
}

impl SpawnerConfig {
    /// Tree pool: the wide backdrop, scattered well past the trigger
    pub fn trees() -> Self {
        Self {
            name: "trees".to_string(),
            capacity: 42,
            spawn_radius: 300.0,
            trigger_radius: 150.0,
            ..Self::default()
        }
    }

    /// Picture-frame pool: a handful of landmarks close by
    pub fn frames() -> Self {
        Self {
            name: "frames".to_string(),
            capacity: 3,
            spawn_radius: 100.0,
            trigger_radius: 100.0,
            ..Self::default()
        }
    }

    /// Mirror pool: hovers just above the valley floor
    pub fn mirrors() -> Self {
        Self {
            name: "mirrors".to_string(),
            capacity: 12,
            spawn_radius: 100.0,
            trigger_radius: 50.0,
            slide_out_y: -5.0,
            resting_y: 1.0,
            placement: PlacementRule::FloorOnly { tolerance: 1.0 },
            ..Self::default()
        }
    }

    /// Same configuration with a fixed RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), SpawnError> {
        if self.capacity == 0 {
            return Err(SpawnError::InvalidConfiguration(
                "pool capacity must be at least 1".into(),
            ));
        }
        if self.spawn_radius <= 0.0 || self.trigger_radius <= 0.0 {
            return Err(SpawnError::InvalidConfiguration(format!(
                "spawn radius {} and trigger radius {} must be positive",
                self.spawn_radius, self.trigger_radius
            )));
        }
        if self.transition_duration <= 0.0 {
            return Err(SpawnError::InvalidConfiguration(
                "transition duration must be positive".into(),
            ));
        }
        if self.attempts_per_instance == 0 {
            return Err(SpawnError::InvalidConfiguration(
                "placement needs at least one attempt per instance".into(),
            ));
        }
        if let PlacementRule::FloorOnly { tolerance } = self.placement {
            if tolerance < 0.0 {
                return Err(SpawnError::InvalidConfiguration(
                    "floor tolerance must be non-negative".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One placed instance, in true world coordinates
#[derive(Debug, Clone, Copy)]
struct Instance {
    x: f32,
    z: f32,
    /// Animated height, between the slide-out and resting planes
    current_y: f32,
    /// Height captured when the current slide began
    from_y: f32,
    yaw: f32,
}

/// Pool-wide slide animation phase
#[derive(Debug, Clone, Copy, PartialEq)]
enum SlidePhase {
    /// Instances rest on the resting plane
    Settled,
    /// Instances sink toward the slide-out plane; a respawn is pending
    SlidingOut { elapsed: f32 },
    /// Instances rise toward the resting plane
    SlidingIn { elapsed: f32 },
}

/// A fixed-capacity pool of terrain-placed instances that follows the
/// vehicle.
pub struct StreamingSpawner {
    config: SpawnerConfig,
    rng: ChaCha8Rng,
    instances: Vec<Instance>,
    phase: SlidePhase,
    /// Center the trigger distance is measured from; moves the instant the
    /// trigger fires so it cannot refire while a slide plays out
    trigger_center: Option<(f32, f32)>,
    /// Instance count to respawn once the pool is hidden
    pending: Option<usize>,
    last_count: usize,
}

impl StreamingSpawner {
    pub fn new(config: SpawnerConfig) -> Result<Self, SpawnError> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            instances: Vec::new(),
            phase: SlidePhase::Settled,
            trigger_center: None,
            pending: None,
            last_count: 0,
        })
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Instances currently in the pool
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// True when no slide animation is playing
    pub fn is_settled(&self) -> bool {
        self.phase == SlidePhase::Settled
    }

    /// Center the trigger distance is measured from, if the pool has spawned
    pub fn trigger_center(&self) -> Option<(f32, f32)> {
        self.trigger_center
    }

    /// Populate the pool with `count` instances scattered around `center`.
    ///
    /// Replaces any existing instances and slides the new ones up from the
    /// slide-out plane. Requests beyond capacity are rejected and leave the
    /// pool untouched. Returns the number actually placed, which can fall
    /// short of `count` when placement attempts run out.
    pub fn spawn(
        &mut self,
        count: usize,
        center: (f32, f32),
        ground: &HeightGrid,
    ) -> Result<usize, SpawnError> {
        if count > self.config.capacity {
            warn!(
                pool = %self.config.name,
                requested = count,
                capacity = self.config.capacity,
                "spawn request beyond pool capacity rejected"
            );
            return Err(SpawnError::CapacityExceeded {
                requested: count,
                capacity: self.config.capacity,
            });
        }

        self.instances = self.sample_instances(count, center, ground);
        self.last_count = count;
        self.trigger_center = Some(center);
        self.pending = None;
        self.phase = SlidePhase::SlidingIn { elapsed: 0.0 };

        debug!(
            pool = %self.config.name,
            requested = count,
            placed = self.instances.len(),
            "pool spawned"
        );
        Ok(self.instances.len())
    }

    /// Advance animations and fire the respawn trigger.
    ///
    /// `vehicle_position` is the chassis position in true world coordinates;
    /// the trigger distance is planar, ignoring height. A pool that has
    /// never spawned ignores the vehicle entirely.
    pub fn update(&mut self, dt: f32, vehicle_position: Vec3, ground: &HeightGrid) {
        let Some(center) = self.trigger_center else {
            return;
        };

        // The trigger is armed while settled or sliding in; an outgoing
        // slide already has a respawn queued.
        let armed = matches!(
            self.phase,
            SlidePhase::Settled | SlidePhase::SlidingIn { .. }
        );
        if armed {
            let dx = vehicle_position.x - center.0;
            let dz = vehicle_position.z - center.1;
            if dx * dx + dz * dz > self.config.trigger_radius * self.config.trigger_radius {
                self.trigger_center = Some((vehicle_position.x, vehicle_position.z));
                self.pending = Some(self.last_count);
                for instance in &mut self.instances {
                    instance.from_y = instance.current_y;
                }
                self.phase = SlidePhase::SlidingOut { elapsed: 0.0 };
                debug!(pool = %self.config.name, "pool trigger fired");
            }
        }

        let duration = self.config.transition_duration;
        match self.phase {
            SlidePhase::Settled => {}
            SlidePhase::SlidingOut { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed >= duration {
                    // Hidden; the new batch surrounds wherever the vehicle
                    // is now, not where it was when the trigger fired
                    if let Some(count) = self.pending.take() {
                        let center = (vehicle_position.x, vehicle_position.z);
                        self.instances = self.sample_instances(count, center, ground);
                    }
                    self.phase = SlidePhase::SlidingIn { elapsed: 0.0 };
                } else {
                    let p = ease_in_out_cubic(elapsed / duration);
                    let hidden = ground.floor_height() + self.config.slide_out_y;
                    for instance in &mut self.instances {
                        instance.current_y = lerp(instance.from_y, hidden, p);
                    }
                    self.phase = SlidePhase::SlidingOut { elapsed };
                }
            }
            SlidePhase::SlidingIn { elapsed } => {
                let elapsed = elapsed + dt;
                let resting = ground.floor_height() + self.config.resting_y;
                if elapsed >= duration {
                    for instance in &mut self.instances {
                        instance.current_y = resting;
                    }
                    self.phase = SlidePhase::Settled;
                } else {
                    let p = ease_in_out_cubic(elapsed / duration);
                    for instance in &mut self.instances {
                        instance.current_y = lerp(instance.from_y, resting, p);
                    }
                    self.phase = SlidePhase::SlidingIn { elapsed };
                }
            }
        }
    }

    /// Sample up to `count` placements on the surface disk around `center`.
    fn sample_instances(
        &mut self,
        count: usize,
        center: (f32, f32),
        ground: &HeightGrid,
    ) -> Vec<Instance> {
        let floor = ground.floor_height();
        let hidden = floor + self.config.slide_out_y;

        let mut placed = Vec::with_capacity(count);
        for _ in 0..count {
            for _ in 0..self.config.attempts_per_instance {
                // Uniform sample over the disk
                let r = self.config.spawn_radius * self.rng.random::<f32>().sqrt();
                let theta = self.rng.random_range(0.0..std::f32::consts::TAU);
                let x = center.0 + r * theta.cos();
                let z = center.1 + r * theta.sin();

                let Some(surface) = ground.height_at(x, z) else {
                    continue;
                };
                if !self.config.placement.allows(surface, floor) {
                    continue;
                }

                let yaw = self.rng.random_range(0.0..std::f32::consts::TAU);
                placed.push(Instance { x, z, current_y: hidden, from_y: hidden, yaw });
                break;
            }
        }

        if placed.len() < count {
            warn!(
                pool = %self.config.name,
                requested = count,
                placed = placed.len(),
                "placement attempts exhausted, pool spawned short"
            );
        }
        placed
    }

    /// True-world poses of all instances, in placement order
    pub fn instance_transforms(&self) -> Vec<InstancePose> {
        self.instances
            .iter()
            .map(|i| InstancePose {
                position: Vec3::new(i.x, i.current_y, i.z),
                yaw: i.yaw,
            })
            .collect()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            name: self.config.name.clone(),
            instances: self.instance_transforms(),
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Cubic in-out easing on [0, 1]
fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat fully-clamped 1000x1000 grid at the given elevation
    fn create_test_ground(elevation: f32) -> HeightGrid {
        let mut grid = HeightGrid::new(65, 65, 1000.0, 1000.0);
        grid.set_floor(elevation);
        for iz in 0..65 {
            for ix in 0..65 {
                grid.set_cell(ix, iz, elevation);
            }
        }
        grid
    }

    fn create_test_spawner(capacity: usize, trigger_radius: f32) -> StreamingSpawner {
        let config = SpawnerConfig {
            capacity,
            trigger_radius,
            spawn_radius: 100.0,
            ..SpawnerConfig::default()
        }
        .with_seed(7);
        StreamingSpawner::new(config).expect("test config is valid")
    }

    #[test]
    fn test_spawn_places_requested_count() {
        let ground = create_test_ground(20.0);
        let mut spawner = create_test_spawner(16, 150.0);

        let placed = spawner.spawn(12, (0.0, 0.0), &ground).unwrap();
        assert_eq!(placed, 12);
        assert_eq!(spawner.len(), 12);
    }

    #[test]
    fn test_spawn_beyond_capacity_leaves_pool_unchanged() {
        let ground = create_test_ground(20.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        let before = spawner.instance_transforms();

        let result = spawner.spawn(9, (50.0, 50.0), &ground);
        assert!(matches!(
            result,
            Err(SpawnError::CapacityExceeded { requested: 9, capacity: 8 })
        ));

        let after = spawner.instance_transforms();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.position, b.position, "rejected spawn must not move instances");
        }
    }

    #[test]
    fn test_instances_stay_inside_the_spawn_disk() {
        let ground = create_test_ground(5.0);
        let mut spawner = create_test_spawner(42, 300.0);
        spawner.spawn(42, (100.0, -50.0), &ground).unwrap();

        for pose in spawner.instance_transforms() {
            let dx = pose.position.x - 100.0;
            let dz = pose.position.z + 50.0;
            let dist = (dx * dx + dz * dz).sqrt();
            assert!(
                dist <= spawner.config().spawn_radius + 1e-3,
                "instance at distance {} escaped the disk",
                dist
            );
        }
    }

    #[test]
    fn test_trigger_fires_just_beyond_radius_and_not_inside() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();

        // Let the arrival slide finish
        for _ in 0..100 {
            spawner.update(0.01, Vec3::ZERO, &ground);
        }
        assert!(spawner.is_settled());

        // 149 m out: inside the radius, nothing happens
        spawner.update(0.01, Vec3::new(149.0, 0.0, 0.0), &ground);
        assert!(spawner.is_settled(), "no trigger at 149 with radius 150");
        assert_eq!(spawner.trigger_center(), Some((0.0, 0.0)));

        // 151 m out: the pool slides out and the center moves at once
        spawner.update(0.01, Vec3::new(151.0, 0.0, 0.0), &ground);
        assert!(!spawner.is_settled(), "trigger must fire at 151 with radius 150");
        assert_eq!(spawner.trigger_center(), Some((151.0, 0.0)));
    }

    #[test]
    fn test_trigger_distance_ignores_height() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        for _ in 0..100 {
            spawner.update(0.01, Vec3::ZERO, &ground);
        }

        // 500 m straight up is still planar distance zero
        spawner.update(0.01, Vec3::new(0.0, 500.0, 0.0), &ground);
        assert!(spawner.is_settled());
    }

    #[test]
    fn test_slide_cycle_respawns_around_the_vehicle() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        for _ in 0..100 {
            spawner.update(0.01, Vec3::ZERO, &ground);
        }

        let vehicle = Vec3::new(400.0, 12.0, 0.0);
        spawner.update(0.01, vehicle, &ground);
        assert!(!spawner.is_settled());

        // Mid-slide the instances are between their rest height and hidden
        spawner.update(0.3, vehicle, &ground);
        for pose in spawner.instance_transforms() {
            assert!(pose.position.y < 10.0, "instance should be sinking, y {}", pose.position.y);
        }

        // Finish the out-slide, the respawn and the in-slide
        for _ in 0..200 {
            spawner.update(0.01, vehicle, &ground);
        }
        assert!(spawner.is_settled());
        assert_eq!(spawner.len(), 8, "respawn reuses the last requested count");

        for pose in spawner.instance_transforms() {
            let dx = pose.position.x - 400.0;
            let dz = pose.position.z;
            assert!(
                (dx * dx + dz * dz).sqrt() <= spawner.config().spawn_radius + 1e-3,
                "respawned instance should surround the new center"
            );
            assert!(
                (pose.position.y - 10.0).abs() < 1e-4,
                "settled instances rest on the surface, y {}",
                pose.position.y
            );
        }
    }

    #[test]
    fn test_respawn_centers_on_the_vehicle_at_slide_completion() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        for _ in 0..100 {
            spawner.update(0.01, Vec3::ZERO, &ground);
        }

        // Fire the trigger at 160 m out; the center moves to the fire
        // position at once
        spawner.update(0.01, Vec3::new(0.0, 0.0, 160.0), &ground);
        assert!(!spawner.is_settled());
        assert_eq!(spawner.trigger_center(), Some((0.0, 160.0)));

        // Keep driving while the pool slides away; by the time it is hidden
        // the vehicle is at z = 380 and the batch must land there
        let vehicle = Vec3::new(0.0, 0.0, 380.0);
        for _ in 0..70 {
            spawner.update(0.01, vehicle, &ground);
        }

        assert_eq!(spawner.len(), 8);
        for pose in spawner.instance_transforms() {
            let dx = pose.position.x;
            let dz = pose.position.z - 380.0;
            assert!(
                (dx * dx + dz * dz).sqrt() <= spawner.config().spawn_radius + 1e-3,
                "instance at ({}, {}) did not respawn around the vehicle",
                pose.position.x,
                pose.position.z
            );
        }
    }

    #[test]
    fn test_settled_instances_rest_on_the_configured_plane() {
        let ground = create_test_ground(10.0);
        let mut spawner = StreamingSpawner::new(SpawnerConfig::mirrors().with_seed(17)).unwrap();
        spawner.spawn(12, (0.0, 0.0), &ground).unwrap();

        for _ in 0..100 {
            spawner.update(0.01, Vec3::ZERO, &ground);
        }

        assert!(spawner.is_settled());
        for pose in spawner.instance_transforms() {
            assert_eq!(
                pose.position.y, 11.0,
                "mirrors rest exactly one meter over the valley floor"
            );
        }
    }

    #[test]
    fn test_interrupted_arrival_slides_back_from_current_height() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);
        spawner.spawn(8, (0.0, 0.0), &ground).unwrap();

        // Part way through the arrival slide, fire the trigger
        spawner.update(0.3, Vec3::ZERO, &ground);
        let mid_heights: Vec<f32> = spawner.instance_transforms().iter().map(|p| p.position.y).collect();
        spawner.update(0.01, Vec3::new(200.0, 0.0, 0.0), &ground);
        assert!(!spawner.is_settled());

        // The out-slide starts from wherever each instance was, not from rest
        spawner.update(0.05, Vec3::new(200.0, 0.0, 0.0), &ground);
        for (pose, &mid) in spawner.instance_transforms().iter().zip(mid_heights.iter()) {
            assert!(
                pose.position.y <= mid + 1e-3,
                "interrupted instance should sink from its captured height"
            );
        }
    }

    #[test]
    fn test_pool_that_never_spawned_ignores_the_vehicle() {
        let ground = create_test_ground(10.0);
        let mut spawner = create_test_spawner(8, 150.0);

        spawner.update(0.01, Vec3::new(10_000.0, 0.0, 0.0), &ground);
        assert!(spawner.is_settled());
        assert_eq!(spawner.len(), 0);
        assert!(spawner.trigger_center().is_none());
    }

    #[test]
    fn test_max_elevation_rule_rejects_high_ground() {
        let mut ground = create_test_ground(50.0);
        // Carve a low shelf on one side of the grid
        for iz in 0..65 {
            for ix in 0..20 {
                ground.set_cell(ix, iz, 2.0);
            }
        }

        let config = SpawnerConfig {
            capacity: 32,
            spawn_radius: 450.0,
            placement: PlacementRule::MaxElevation { limit: 5.0 },
            ..SpawnerConfig::default()
        }
        .with_seed(11);
        let mut spawner = StreamingSpawner::new(config).unwrap();
        spawner.spawn(32, (0.0, 0.0), &ground).unwrap();

        assert!(!spawner.is_empty(), "the low shelf should accept instances");
        for pose in spawner.instance_transforms() {
            let surface = ground.height_at(pose.position.x, pose.position.z).unwrap();
            assert!(
                surface <= 5.0,
                "instance placed on surface {} above the elevation limit",
                surface
            );
        }
    }

    #[test]
    fn test_placement_failure_everywhere_yields_empty_pool() {
        let ground = create_test_ground(50.0);
        let config = SpawnerConfig {
            capacity: 8,
            placement: PlacementRule::MaxElevation { limit: 5.0 },
            ..SpawnerConfig::default()
        };
        let mut spawner = StreamingSpawner::new(config).unwrap();

        let placed = spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        assert_eq!(placed, 0, "no candidate can pass the rule on uniform high ground");
        assert!(spawner.is_empty());
    }

    #[test]
    fn test_floor_only_rule_accepts_only_the_clamp_plane() {
        // Hills at 30 m with a clamped valley patch at the grid center
        let mut ground = create_test_ground(30.0);
        ground.set_floor(4.0);
        for iz in 30..35 {
            for ix in 30..35 {
                ground.set_cell(ix, iz, 4.0);
            }
        }

        // Disk small enough that the valley patch dominates it
        let config = SpawnerConfig {
            capacity: 16,
            spawn_radius: 30.0,
            placement: PlacementRule::FloorOnly { tolerance: 0.5 },
            ..SpawnerConfig::default()
        }
        .with_seed(3);
        let mut spawner = StreamingSpawner::new(config).unwrap();
        spawner.spawn(16, (0.0, 0.0), &ground).unwrap();

        assert!(!spawner.is_empty(), "the valley patch should accept instances");
        for pose in spawner.instance_transforms() {
            let surface = ground.height_at(pose.position.x, pose.position.z).unwrap();
            assert!(
                (surface - 4.0).abs() <= 0.5,
                "floor-only instance landed on surface {}",
                surface
            );
        }
    }

    #[test]
    fn test_floor_only_rejects_ground_above_the_clamp_plane() {
        // Uniform ground well above the recorded clamp plane: no candidate
        // may pass, even though every cell sits at the grid minimum
        let mut ground = create_test_ground(30.0);
        ground.set_floor(4.0);

        let config = SpawnerConfig {
            capacity: 8,
            placement: PlacementRule::FloorOnly { tolerance: 0.5 },
            ..SpawnerConfig::default()
        }
        .with_seed(13);
        let mut spawner = StreamingSpawner::new(config).unwrap();

        let placed = spawner.spawn(8, (0.0, 0.0), &ground).unwrap();
        assert_eq!(placed, 0);
        assert!(spawner.is_empty());
    }

    #[test]
    fn test_same_seed_reproduces_the_layout() {
        let ground = create_test_ground(10.0);
        let config = SpawnerConfig::trees().with_seed(99);

        let mut a = StreamingSpawner::new(config.clone()).unwrap();
        let mut b = StreamingSpawner::new(config).unwrap();
        a.spawn(42, (0.0, 0.0), &ground).unwrap();
        b.spawn(42, (0.0, 0.0), &ground).unwrap();

        let poses_a = a.instance_transforms();
        let poses_b = b.instance_transforms();
        assert_eq!(poses_a.len(), poses_b.len());
        for (pa, pb) in poses_a.iter().zip(poses_b.iter()) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.yaw, pb.yaw);
        }
    }

    #[test]
    fn test_archetype_presets_match_the_catalog() {
        let trees = SpawnerConfig::trees();
        assert_eq!(trees.capacity, 42);
        assert_eq!(trees.trigger_radius, 150.0);
        assert_eq!(trees.spawn_radius, 300.0);

        let frames = SpawnerConfig::frames();
        assert_eq!(frames.capacity, 3);
        assert_eq!(frames.trigger_radius, 100.0);
        assert_eq!(frames.spawn_radius, 100.0);

        let mirrors = SpawnerConfig::mirrors();
        assert_eq!(mirrors.capacity, 12);
        assert_eq!(mirrors.trigger_radius, 50.0);
        assert_eq!(mirrors.spawn_radius, 100.0);
        assert_eq!(mirrors.slide_out_y, -5.0);
        assert_eq!(mirrors.resting_y, 1.0);
        assert_eq!(mirrors.placement, PlacementRule::FloorOnly { tolerance: 1.0 });

        for config in [trees, frames, mirrors] {
            assert_eq!(config.transition_duration, 0.6);
            assert!(
                config.spawn_radius >= config.trigger_radius,
                "{} must scatter at least as far out as its trigger",
                config.name
            );
        }
    }

    #[test]
    fn test_zero_capacity_config_is_rejected() {
        let config = SpawnerConfig { capacity: 0, ..SpawnerConfig::default() };
        assert!(StreamingSpawner::new(config).is_err());
    }
}
