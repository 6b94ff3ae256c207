//! World anchoring for floating-origin rendering.
//!
//! Physics runs in true world coordinates without bound. For rendering, the
//! chassis stays pinned at its spawn pose and the environment is translated
//! the opposite way, so GPU-visible positions never drift far from the
//! origin no matter how far the vehicle travels. Height and collision
//! queries always take true coordinates; the offsets here exist only for
//! display.

use glam::Vec3;

/// Maps true world coordinates to render coordinates by accumulating the
/// vehicle's displacement since spawn.
#[derive(Debug, Clone)]
pub struct WorldAnchor {
    spawn_position: Vec3,
    displacement: Vec3,
}

impl WorldAnchor {
    /// Anchor a world around a vehicle spawned at `spawn_position`.
    pub fn new(spawn_position: Vec3) -> Self {
        Self { spawn_position, displacement: Vec3::ZERO }
    }

    /// True-world position the vehicle spawned at. Doubles as the fixed
    /// render-space pose of the chassis.
    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Track the chassis after a physics step.
    pub fn update(&mut self, chassis_true_position: Vec3) {
        self.displacement = chassis_true_position - self.spawn_position;
    }

    /// Accumulated true-world displacement of the vehicle since spawn
    pub fn true_displacement(&self) -> Vec3 {
        self.displacement
    }

    /// Translation applied to every environment object for rendering
    pub fn environment_offset(&self) -> Vec3 {
        -self.displacement
    }

    /// Render-space position of an environment point given in true
    /// coordinates
    pub fn to_render(&self, true_position: Vec3) -> Vec3 {
        true_position + self.environment_offset()
    }

    /// True-world position of a render-space point, for feeding back into
    /// height or collision queries
    pub fn to_true(&self, render_position: Vec3) -> Vec3 {
        render_position + self.displacement
    }
}
