//! Raycast-wheel vehicle dynamics
//!
//! A rigid chassis body plus four raycast wheels colliding against the
//! terrain heightfield:
//! - Box-inertia chassis with impulse-based velocity updates
//! - Spring/damper suspension along per-wheel downward rays
//! - Bilateral side-friction and rolling/engine longitudinal friction,
//!   clamped to a friction ellipse scaled by suspension load
//! - Wheel spin, steering and free-spin/lock rules
//! - Fixed-substep integration driven by elapsed frame time

use crate::data::{
    ControlInput, DriveState, Transform, DRIVE_WHEELS, STEER_WHEELS, WHEEL_COUNT,
};
use crate::procgen::HeightGrid;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Gravity acceleration (m/s²), along -Y
const GRAVITY: f32 = 9.82;

/// Fixed physics substep length (s)
pub const FIXED_STEP: f32 = 1.0 / 60.0;

/// Most substeps consumed by one `step` call; backlog beyond this is dropped
pub const MAX_SUBSTEPS: u32 = 3;

/// Constraint damping for the bilateral side-contact solve
const SIDE_CONTACT_DAMPING: f32 = 0.2;

/// Forward weighting inside the friction-ellipse test
const FORWARD_SLIP_WEIGHT: f32 = 0.5;

/// Per-step decay of the retained wheel spin delta
const SPIN_DECAY: f32 = 0.99;

/// Ray-vs-normal dot above which the contact counts as near-parallel
const MAX_CONTACT_DOT: f32 = -0.1;

/// Errors raised when a vehicle is configured inconsistently
#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("invalid vehicle configuration: {0}")]
    InvalidConfiguration(String),
}

/// Tunable vehicle parameters.
///
/// Suspension and friction values feed the per-wheel force model; the
/// attachment points fix the wheel array order (rear-left, rear-right,
/// front-left, front-right), which is validated at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Chassis mass in kg
    pub chassis_mass: f32,
    /// Chassis box half extents (x, y, z) in meters
    pub chassis_half_extents: [f32; 3],
    /// Wheel radius in meters
    pub wheel_radius: f32,
    /// Suspension length at rest in meters
    pub suspension_rest_length: f32,
    /// Spring stiffness (per unit chassis mass)
    pub suspension_stiffness: f32,
    /// Damping while the suspension compresses
    pub damping_compression: f32,
    /// Damping while the suspension rebounds
    pub damping_relaxation: f32,
    /// Upper bound on the suspension force in N
    pub max_suspension_force: f32,
    /// Travel allowed around the rest length in meters
    pub max_suspension_travel: f32,
    /// Friction-ellipse scale relating tire grip to suspension load
    pub friction_slip: f32,
    /// 0 applies side impulses at the center-of-mass plane, 1 at the contact
    pub roll_influence: f32,
    /// Engine force at full throttle in N
    pub max_engine_force: f32,
    /// Steering lock in radians
    pub max_steer_angle: f32,
    /// Brake impulse clamp in N
    pub brake_force: f32,
    /// Wheel spin rate while sliding or airborne under engine force (rad/s)
    pub free_spin_speed: f32,
    /// Linear velocity damping per second, in [0, 1)
    pub linear_damping: f32,
    /// Angular velocity damping per second, in [0, 1)
    pub angular_damping: f32,
    /// Chassis-space wheel attachment points, in wheel-index order
    pub wheel_attachments: [[f32; 3]; WHEEL_COUNT],
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            chassis_mass: 1290.0,
            chassis_half_extents: [0.9, 0.5, 2.0],
            wheel_radius: 0.35,
            suspension_rest_length: 0.3,
            suspension_stiffness: 30.0,
            damping_compression: 4.4,
            damping_relaxation: 2.3,
            max_suspension_force: 100_000.0,
            max_suspension_travel: 0.3,
            friction_slip: 1.4,
            roll_influence: 0.01,
            max_engine_force: 1000.0,
            max_steer_angle: 0.5,
            brake_force: 1_000_000.0,
            free_spin_speed: 30.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
            wheel_attachments: [
                [-0.85, -0.25, -1.35],
                [0.85, -0.25, -1.35],
                [-0.85, -0.25, 1.25],
                [0.85, -0.25, 1.25],
            ],
        }
    }
}

impl VehicleConfig {
    /// Reject non-physical parameters and wheel arrays that break the index
    /// convention.
    pub fn validate(&self) -> Result<(), VehicleError> {
        if self.chassis_mass <= 0.0 {
            return Err(VehicleError::InvalidConfiguration(format!(
                "chassis mass {} must be positive",
                self.chassis_mass
            )));
        }
        if self.wheel_radius <= 0.0 {
            return Err(VehicleError::InvalidConfiguration(format!(
                "wheel radius {} must be positive",
                self.wheel_radius
            )));
        }
        if self.suspension_rest_length <= 0.0 {
            return Err(VehicleError::InvalidConfiguration(
                "suspension rest length must be positive".into(),
            ));
        }
        if self.max_suspension_travel < 0.0 || self.friction_slip <= 0.0 {
            return Err(VehicleError::InvalidConfiguration(
                "suspension travel and friction slip must be non-negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.linear_damping) || !(0.0..1.0).contains(&self.angular_damping)
        {
            return Err(VehicleError::InvalidConfiguration(
                "damping factors must lie in [0, 1)".into(),
            ));
        }

        // Wheel order: rear pair behind the front pair, left member of each
        // pair on -X.
        let a = &self.wheel_attachments;
        let rear_behind_front =
            a[0][2] < a[2][2] && a[0][2] < a[3][2] && a[1][2] < a[2][2] && a[1][2] < a[3][2];
        let left_of_right = a[0][0] < a[1][0] && a[2][0] < a[3][0];
        if !rear_behind_front || !left_of_right {
            return Err(VehicleError::InvalidConfiguration(
                "wheel attachments must be ordered rear-left, rear-right, front-left, front-right"
                    .into(),
            ));
        }

        Ok(())
    }
}

/// Rigid chassis state: pose plus velocities, with box inertia.
///
/// Mutated only by the physics step; collaborators read it through
/// [`VehicleDynamics::chassis`].
#[derive(Debug, Clone)]
pub struct ChassisState {
    /// World position of the center of mass
    pub position: Vec3,
    /// World orientation (unit quaternion)
    pub orientation: Quat,
    /// Linear velocity in m/s
    pub linear_velocity: Vec3,
    /// Angular velocity in rad/s
    pub angular_velocity: Vec3,
    mass: f32,
    inv_mass: f32,
    /// Diagonal of the inverse inertia tensor in the body frame
    inv_inertia_local: Vec3,
    linear_damping: f32,
    angular_damping: f32,
}

impl ChassisState {
    fn new(config: &VehicleConfig, position: Vec3) -> Self {
        let half = Vec3::from(config.chassis_half_extents);
        let full = half * 2.0;
        let mass = config.chassis_mass;

        // Solid box inertia about each principal axis
        let ix = mass / 12.0 * (full.y * full.y + full.z * full.z);
        let iy = mass / 12.0 * (full.x * full.x + full.z * full.z);
        let iz = mass / 12.0 * (full.x * full.x + full.y * full.y);

        Self {
            position,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia_local: Vec3::new(1.0 / ix, 1.0 / iy, 1.0 / iz),
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
        }
    }

    /// Chassis mass in kg
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Transform a chassis-space point to world space
    pub fn point_to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Rotate a chassis-space direction into world space
    pub fn direction_to_world(&self, local: Vec3) -> Vec3 {
        self.orientation * local
    }

    /// Velocity of the body at a world-space point
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    fn inv_inertia_world(&self) -> Mat3 {
        let rot = Mat3::from_quat(self.orientation);
        rot * Mat3::from_diagonal(self.inv_inertia_local) * rot.transpose()
    }

    /// Apply an impulse at a point given relative to the center of mass
    pub fn apply_impulse(&mut self, impulse: Vec3, rel_pos: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world() * rel_pos.cross(impulse);
    }

    /// Effective inverse mass seen by an impulse along `normal` at `point`
    fn impulse_denominator(&self, point: Vec3, normal: Vec3) -> f32 {
        let r = point - self.position;
        let c = r.cross(normal);
        let vec = (self.inv_inertia_world() * c).cross(r);
        self.inv_mass + normal.dot(vec)
    }

    fn integrate(&mut self, dt: f32) {
        self.linear_velocity.y -= GRAVITY * dt;

        self.linear_velocity *= (1.0 - self.linear_damping).powf(dt);
        self.angular_velocity *= (1.0 - self.angular_damping).powf(dt);

        self.position += self.linear_velocity * dt;

        // q' = q + (dt/2) * omega * q, renormalized
        let (ax, ay, az) = (
            self.angular_velocity.x,
            self.angular_velocity.y,
            self.angular_velocity.z,
        );
        let q = self.orientation;
        let half_dt = 0.5 * dt;
        self.orientation = Quat::from_xyzw(
            q.x + half_dt * (ax * q.w + ay * q.z - az * q.y),
            q.y + half_dt * (ay * q.w + az * q.x - ax * q.z),
            q.z + half_dt * (az * q.w + ax * q.y - ay * q.x),
            q.w + half_dt * (-ax * q.x - ay * q.y - az * q.z),
        )
        .normalize();
    }
}

/// Per-wheel suspension, contact and spin state.
///
/// Public fields are the stable view consumed by snapshots and tests; the
/// private remainder is per-step solver scratch.
#[derive(Debug, Clone, Copy)]
pub struct WheelState {
    /// Chassis-space attachment point of the suspension
    pub attachment_local: Vec3,
    /// Current suspension length below the attachment, in meters
    pub suspension_length: f32,
    /// True when the suspension ray found ground within reach
    pub in_contact: bool,
    /// Steering angle in radians; nonzero only on steer wheels
    pub steering: f32,
    /// Accumulated spin in radians; grows when rolling forward
    pub rotation: f32,
    /// Engine force routed to this wheel in N; nonzero only on drive wheels
    pub engine_force: f32,
    /// Brake impulse clamp in N; zero while the brake is released
    pub brake: f32,
    /// True when this wheel exceeded the friction ellipse this step
    pub sliding: bool,
    /// Scalar suspension force along the contact normal in N
    pub suspension_force: f32,

    connection_world: Vec3,
    direction_world: Vec3,
    contact_point: Vec3,
    contact_normal: Vec3,
    suspension_relative_velocity: f32,
    clipped_inv_contact_dot: f32,
    side_impulse: f32,
    forward_impulse: f32,
    axle_world: Vec3,
    forward_world: Vec3,
    skid: f32,
    delta_rotation: f32,
    world_transform: Transform,
}

impl WheelState {
    fn new(attachment_local: Vec3, rest_length: f32) -> Self {
        Self {
            attachment_local,
            suspension_length: rest_length,
            in_contact: false,
            steering: 0.0,
            rotation: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            sliding: false,
            suspension_force: 0.0,
            connection_world: Vec3::ZERO,
            direction_world: Vec3::NEG_Y,
            contact_point: Vec3::ZERO,
            contact_normal: Vec3::Y,
            suspension_relative_velocity: 0.0,
            clipped_inv_contact_dot: 1.0,
            side_impulse: 0.0,
            forward_impulse: 0.0,
            axle_world: Vec3::X,
            forward_world: Vec3::Z,
            skid: 1.0,
            delta_rotation: 0.0,
            world_transform: Transform::IDENTITY,
        }
    }

    /// World transform of the wheel hub, for model placement
    pub fn world_transform(&self) -> Transform {
        self.world_transform
    }
}

/// The vehicle simulation: one chassis, four wheels, one ground surface.
pub struct VehicleDynamics {
    config: VehicleConfig,
    chassis: ChassisState,
    wheels: [WheelState; WHEEL_COUNT],
    ground: Arc<HeightGrid>,
    input: ControlInput,
    drive_state: DriveState,
    spawn_position: Vec3,
    accumulator: f32,
}

impl VehicleDynamics {
    /// Build a vehicle resting at `spawn_position` over `ground`.
    pub fn new(
        config: VehicleConfig,
        ground: Arc<HeightGrid>,
        spawn_position: Vec3,
    ) -> Result<Self, VehicleError> {
        config.validate()?;

        let chassis = ChassisState::new(&config, spawn_position);
        let rest = config.suspension_rest_length;
        let wheels = [
            WheelState::new(Vec3::from(config.wheel_attachments[0]), rest),
            WheelState::new(Vec3::from(config.wheel_attachments[1]), rest),
            WheelState::new(Vec3::from(config.wheel_attachments[2]), rest),
            WheelState::new(Vec3::from(config.wheel_attachments[3]), rest),
        ];

        let mut vehicle = Self {
            config,
            chassis,
            wheels,
            ground,
            input: ControlInput::released(),
            drive_state: DriveState::Idle,
            spawn_position,
            accumulator: 0.0,
        };

        for i in 0..WHEEL_COUNT {
            vehicle.refresh_wheel_ray(i);
            vehicle.update_wheel_transform(i);
        }

        Ok(vehicle)
    }

    /// Vehicle parameters
    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    /// Chassis pose and velocities, in true world coordinates
    pub fn chassis(&self) -> &ChassisState {
        &self.chassis
    }

    /// All four wheels, in index order
    pub fn wheels(&self) -> &[WheelState; WHEEL_COUNT] {
        &self.wheels
    }

    /// Coarse activity implied by the last control input
    pub fn drive_state(&self) -> DriveState {
        self.drive_state
    }

    /// Last applied control input
    pub fn input(&self) -> ControlInput {
        self.input
    }

    /// Chassis position and orientation for model placement
    pub fn chassis_transform(&self) -> Transform {
        Transform {
            position: self.chassis.position,
            rotation: self.chassis.orientation,
        }
    }

    /// Per-wheel world transforms, in wheel-index order
    pub fn wheel_transforms(&self) -> [Transform; WHEEL_COUNT] {
        [
            self.wheels[0].world_transform,
            self.wheels[1].world_transform,
            self.wheels[2].world_transform,
            self.wheels[3].world_transform,
        ]
    }

    /// Accumulated world-space offset of the chassis since spawn
    pub fn true_displacement(&self) -> Vec3 {
        self.chassis.position - self.spawn_position
    }

    /// Chassis position at spawn
    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Replace the collision surface after a terrain regeneration.
    ///
    /// The terrain generator deliberately does not do this itself; whoever
    /// swaps the grid calls this in the same breath.
    pub fn rebuild_collision(&mut self, ground: Arc<HeightGrid>) {
        self.ground = ground;
    }

    /// Route a control input to the wheels.
    ///
    /// Engine force reaches drive wheels only and steering reaches steer
    /// wheels only. The brake acts on all four wheels and overrides
    /// throttle while engaged.
    pub fn apply_control(&mut self, input: ControlInput) {
        let steer = input.steer.clamp(-1.0, 1.0);
        let engine = if input.brake {
            0.0
        } else {
            input.throttle.as_scalar() * self.config.max_engine_force
        };
        let brake = if input.brake { self.config.brake_force } else { 0.0 };

        for wheel in &mut self.wheels {
            wheel.engine_force = 0.0;
            wheel.steering = 0.0;
            wheel.brake = brake;
        }
        for &i in DRIVE_WHEELS.iter() {
            self.wheels[i].engine_force = engine;
        }
        for &i in STEER_WHEELS.iter() {
            // Positive input steers left, which is a negative yaw about +Y
            // in this right-handed Z-forward frame
            self.wheels[i].steering = -steer * self.config.max_steer_angle;
        }

        self.input = ControlInput { steer, ..input };
        self.drive_state = DriveState::from_input(&self.input);
    }

    /// Advance the simulation by `elapsed` seconds of real time, consumed in
    /// fixed substeps. Backlog beyond one substep past the cap is dropped.
    pub fn step(&mut self, elapsed: f32) {
        self.accumulator += elapsed.max(0.0);

        let mut substeps = 0;
        while self.accumulator >= FIXED_STEP && substeps < MAX_SUBSTEPS {
            self.substep(FIXED_STEP);
            self.accumulator -= FIXED_STEP;
            substeps += 1;
        }

        if self.accumulator > FIXED_STEP {
            self.accumulator = FIXED_STEP;
        }
    }

    /// One fixed-length physics step.
    fn substep(&mut self, dt: f32) {
        // 1. Cast suspension rays from the current chassis pose
        for i in 0..WHEEL_COUNT {
            self.refresh_wheel_ray(i);
        }

        // 2. Spring/damper suspension forces
        self.update_suspension();

        // 3. Suspension impulses along the contact normals
        for wheel in &mut self.wheels {
            if wheel.in_contact {
                let force = wheel.suspension_force.min(self.config.max_suspension_force);
                let impulse = wheel.contact_normal * force * dt;
                let rel = wheel.contact_point - self.chassis.position;
                self.chassis.apply_impulse(impulse, rel);
            }
        }

        // 4. Tire friction impulses
        self.update_friction(dt);

        // 5. Wheel spin from contact-plane forward velocity
        self.update_wheel_spin(dt);

        // 6. Gravity, damping and pose integration
        self.chassis.integrate(dt);

        // 7. Refresh wheel world transforms for consumers
        for i in 0..WHEEL_COUNT {
            self.update_wheel_transform(i);
        }
    }

    /// Cast one wheel's suspension ray and record the contact.
    ///
    /// A miss is not an error: the wheel hangs at rest length and
    /// contributes no suspension force.
    fn refresh_wheel_ray(&mut self, i: usize) {
        let chassis = &self.chassis;
        let wheel = &mut self.wheels[i];

        wheel.connection_world = chassis.point_to_world(wheel.attachment_local);
        wheel.direction_world = chassis.direction_to_world(Vec3::NEG_Y);

        let rest = self.config.suspension_rest_length;
        let ray_len = rest + self.config.wheel_radius;

        match self
            .ground
            .raycast(wheel.connection_world, wheel.direction_world, ray_len)
        {
            Some(hit) => {
                wheel.in_contact = true;
                wheel.contact_point = hit.point;
                wheel.contact_normal = hit.normal;

                let min_len = rest - self.config.max_suspension_travel;
                let max_len = rest + self.config.max_suspension_travel;
                wheel.suspension_length =
                    (hit.distance - self.config.wheel_radius).clamp(min_len, max_len);

                let denominator = hit.normal.dot(wheel.direction_world);
                let contact_velocity = chassis.velocity_at_point(hit.point);
                let projected = hit.normal.dot(contact_velocity);

                if denominator >= MAX_CONTACT_DOT {
                    // Surface nearly parallel to the ray; avoid blowing up
                    // the spring term
                    wheel.suspension_relative_velocity = 0.0;
                    wheel.clipped_inv_contact_dot = -1.0 / MAX_CONTACT_DOT;
                } else {
                    let inv = -1.0 / denominator;
                    wheel.suspension_relative_velocity = projected * inv;
                    wheel.clipped_inv_contact_dot = inv;
                }
            }
            None => {
                wheel.in_contact = false;
                wheel.suspension_length = rest;
                wheel.suspension_relative_velocity = 0.0;
                wheel.contact_normal = -wheel.direction_world;
                wheel.clipped_inv_contact_dot = 1.0;
            }
        }
    }

    /// Spring/damper law per wheel, scaled by chassis mass and floored at
    /// zero (the suspension can push, never pull).
    fn update_suspension(&mut self) {
        let mass = self.chassis.mass;
        let rest = self.config.suspension_rest_length;

        for wheel in &mut self.wheels {
            if !wheel.in_contact {
                wheel.suspension_force = 0.0;
                continue;
            }

            let length_diff = rest - wheel.suspension_length;
            let mut force =
                self.config.suspension_stiffness * length_diff * wheel.clipped_inv_contact_dot;

            let damping = if wheel.suspension_relative_velocity < 0.0 {
                self.config.damping_compression
            } else {
                self.config.damping_relaxation
            };
            force -= damping * wheel.suspension_relative_velocity;

            wheel.suspension_force = (force * mass).max(0.0);
        }
    }

    /// Side and longitudinal tire impulses, clamped to the friction ellipse.
    fn update_friction(&mut self, dt: f32) {
        let mut any_sliding = false;

        for wheel in &mut self.wheels {
            wheel.side_impulse = 0.0;
            wheel.forward_impulse = 0.0;
            wheel.sliding = false;
            wheel.skid = 1.0;

            if !wheel.in_contact {
                continue;
            }

            // Axle direction with steering applied, projected onto the
            // contact plane; forward completes the right-handed basis
            let steer_rotation = Quat::from_axis_angle(Vec3::Y, wheel.steering);
            let axle_raw = (self.chassis.orientation * steer_rotation) * Vec3::X;
            let normal = wheel.contact_normal;
            let axle = (axle_raw - normal * axle_raw.dot(normal)).normalize_or_zero();
            let forward = axle.cross(normal).normalize_or_zero();
            wheel.axle_world = axle;
            wheel.forward_world = forward;

            // Side: bilateral constraint against the (static) ground
            let side_vel = axle.dot(self.chassis.velocity_at_point(wheel.contact_point));
            wheel.side_impulse = -SIDE_CONTACT_DAMPING * side_vel * self.chassis.mass;

            // Longitudinal: rolling friction clamped by the brake, plus
            // engine force over the step
            wheel.forward_impulse =
                rolling_friction_impulse(&self.chassis, wheel.contact_point, forward, wheel.brake)
                    + wheel.engine_force * dt;

            // Friction ellipse bound by the suspension load
            let max_impulse = wheel.suspension_force * dt * self.config.friction_slip;
            let x = wheel.forward_impulse * FORWARD_SLIP_WEIGHT;
            let y = wheel.side_impulse;
            let combined_sq = x * x + y * y;
            if combined_sq > max_impulse * max_impulse {
                any_sliding = true;
                wheel.sliding = true;
                wheel.skid = max_impulse / combined_sq.sqrt();
            }
        }

        if any_sliding {
            for wheel in &mut self.wheels {
                if wheel.skid < 1.0 {
                    wheel.forward_impulse *= wheel.skid;
                    wheel.side_impulse *= wheel.skid;
                }
            }
        }

        for i in 0..WHEEL_COUNT {
            let wheel = self.wheels[i];
            if !wheel.in_contact {
                continue;
            }

            let rel = wheel.contact_point - self.chassis.position;

            if wheel.forward_impulse != 0.0 {
                self.chassis
                    .apply_impulse(wheel.forward_world * wheel.forward_impulse, rel);
            }

            if wheel.side_impulse != 0.0 {
                // Pull the application point toward the chassis plane so a
                // strong side bite cannot flip the body outright
                let mut rel_local = self.chassis.orientation.inverse() * rel;
                rel_local.y *= self.config.roll_influence;
                let rel_rolled = self.chassis.orientation * rel_local;
                self.chassis
                    .apply_impulse(wheel.axle_world * wheel.side_impulse, rel_rolled);
            }
        }
    }

    /// Advance wheel spin from the contact-plane forward velocity; sliding
    /// or airborne wheels free-spin under engine force, and the brake locks
    /// a wheel it dominates.
    fn update_wheel_spin(&mut self, dt: f32) {
        let chassis_forward = self.chassis.direction_to_world(Vec3::Z);

        for wheel in &mut self.wheels {
            if wheel.in_contact {
                let plane_forward = chassis_forward
                    - wheel.contact_normal * chassis_forward.dot(wheel.contact_normal);
                let velocity = self.chassis.velocity_at_point(wheel.connection_world);
                let forward_speed = plane_forward.dot(velocity);
                wheel.delta_rotation = forward_speed * dt / self.config.wheel_radius;
            }

            if (wheel.sliding || !wheel.in_contact) && wheel.engine_force != 0.0 {
                wheel.delta_rotation =
                    wheel.engine_force.signum() * self.config.free_spin_speed * dt;
            }

            if wheel.brake.abs() > wheel.engine_force.abs() {
                wheel.delta_rotation = 0.0;
            }

            wheel.rotation += wheel.delta_rotation;
            wheel.delta_rotation *= SPIN_DECAY;
        }
    }

    /// Compose the wheel's world transform.
    ///
    /// Orientation is chassis * steer (about local up) * spin (about local
    /// right), so removing the chassis rotation recovers the wheel's local
    /// steer/spin pose exactly.
    fn update_wheel_transform(&mut self, i: usize) {
        let wheel = &mut self.wheels[i];

        let steer_rotation = Quat::from_axis_angle(Vec3::Y, wheel.steering);
        let spin_rotation = Quat::from_axis_angle(Vec3::X, wheel.rotation);
        let rotation = (self.chassis.orientation * steer_rotation * spin_rotation).normalize();

        let position = wheel.connection_world + wheel.direction_world * wheel.suspension_length;

        wheel.world_transform = Transform { position, rotation };
    }
}

/// Impulse that cancels contact-point velocity along `direction`, clamped to
/// `max_impulse`. With the brake released the clamp is zero and the wheel
/// rolls freely.
fn rolling_friction_impulse(
    chassis: &ChassisState,
    contact_point: Vec3,
    direction: Vec3,
    max_impulse: f32,
) -> f32 {
    let relative_velocity = direction.dot(chassis.velocity_at_point(contact_point));
    let denominator = chassis.impulse_denominator(contact_point, direction);
    if denominator <= 0.0 {
        return 0.0;
    }

    let impulse = -relative_velocity / denominator;
    impulse.clamp(-max_impulse, max_impulse)
}
