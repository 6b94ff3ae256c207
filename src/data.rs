use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

// --- Wheel index convention ---
//
// Wheels live in a fixed-size array; the order below is validated once at
// vehicle construction and never re-derived at runtime. The control layer
// depends on it: the first two indices take engine force, the last two take
// steering.

pub const WHEEL_REAR_LEFT: usize = 0;
pub const WHEEL_REAR_RIGHT: usize = 1;
pub const WHEEL_FRONT_LEFT: usize = 2;
pub const WHEEL_FRONT_RIGHT: usize = 3;

/// Number of wheels on the vehicle
pub const WHEEL_COUNT: usize = 4;

/// Wheels that receive engine force
pub const DRIVE_WHEELS: [usize; 2] = [WHEEL_REAR_LEFT, WHEEL_REAR_RIGHT];
/// Wheels that receive steering input
pub const STEER_WHEELS: [usize; 2] = [WHEEL_FRONT_LEFT, WHEEL_FRONT_RIGHT];

// --- Control input ---

/// Discrete throttle demand: reverse, coast or forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Throttle {
    Reverse,
    #[default]
    Neutral,
    Forward,
}

impl Throttle {
    /// Signed engine-force scale: -1, 0 or 1
    pub fn as_scalar(self) -> f32 {
        match self {
            Throttle::Reverse => -1.0,
            Throttle::Neutral => 0.0,
            Throttle::Forward => 1.0,
        }
    }
}

/// One frame of driver input.
///
/// `steer` is normalized to [-1, 1]; positive steers left. Brake overrides
/// throttle while engaged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlInput {
    pub throttle: Throttle,
    pub steer: f32,
    pub brake: bool,
}

impl ControlInput {
    /// Input with everything released
    pub fn released() -> Self {
        Self::default()
    }

    /// Full forward throttle, no steering
    pub fn full_throttle() -> Self {
        Self { throttle: Throttle::Forward, ..Self::default() }
    }
}

// --- Drive state ---

/// Coarse vehicle activity, driven by control-input events rather than by
/// the physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveState {
    /// Zero control input; at rest or drifting under gravity
    #[default]
    Idle,
    /// Nonzero throttle or steering applied
    Driving,
    /// Brake engaged; overrides throttle forces
    Braking,
}

impl DriveState {
    /// State implied by a control input
    pub fn from_input(input: &ControlInput) -> Self {
        if input.brake {
            DriveState::Braking
        } else if input.throttle != Throttle::Neutral || input.steer != 0.0 {
            DriveState::Driving
        } else {
            DriveState::Idle
        }
    }
}

// --- Transforms & snapshots ---

/// Position plus orientation, the shape render collaborators consume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };
}

/// Pose of one streamed instance.
///
/// Spawners hand these out in true world coordinates; inside a
/// [`SimSnapshot`] they are already anchor-relative for render-batch upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstancePose {
    pub position: Vec3,
    /// Heading around +Y in radians
    pub yaw: f32,
}

/// Read-only view of one spawner pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub name: String,
    pub instances: Vec<InstancePose>,
}

/// Read-only view of the whole simulation, taken once per frame.
///
/// Inspectors and renderers bind to this; nothing in it reaches back into
/// live simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Chassis pose in true world coordinates
    pub chassis: Transform,
    /// Per-wheel world transforms, in wheel-index order
    pub wheels: [Transform; WHEEL_COUNT],
    /// Coarse vehicle activity
    pub drive_state: DriveState,
    /// Chassis speed in m/s
    pub speed: f32,
    /// Accumulated world-space offset since spawn
    pub true_displacement: Vec3,
    /// Translation to apply to the environment so the chassis renders at
    /// the anchor point
    pub environment_offset: Vec3,
    /// Terrain generation counter; changes when the grid is swapped
    pub terrain_revision: u64,
    /// Per-pool streamed instances
    pub pools: Vec<PoolSnapshot>,
}
