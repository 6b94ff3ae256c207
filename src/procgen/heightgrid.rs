/// Dense heightfield grid shared by terrain meshing, vehicle collision and
/// spawn placement
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Result of a ray intersection against the heightfield surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Surface normal at the intersection
    pub normal: Vec3,
    /// Distance from the ray origin to the intersection
    pub distance: f32,
}

/// Bisection passes used to refine a bracketed ray crossing
const RAYCAST_REFINE_STEPS: u32 = 12;

/// A dense grid of elevation samples centered on the world origin.
///
/// World X spans [-width/2, +width/2] and world Z spans [-depth/2, +depth/2].
/// The grid is immutable between terrain regenerations: the generator builds
/// a fresh one and readers swap to it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightGrid {
    /// Grid resolution along X (number of samples)
    width: usize,
    /// Grid resolution along Z (number of samples)
    depth: usize,
    /// World-space spacing between samples along X
    cell_width: f32,
    /// World-space spacing between samples along Z
    cell_depth: f32,
    /// World-space X of the first sample column
    origin_x: f32,
    /// World-space Z of the first sample row
    origin_z: f32,
    /// Elevation of the valley-floor clamp plane
    floor: f32,
    /// Flattened elevations, row-major: heights[iz * width + ix]
    heights: Vec<f32>,
}

impl HeightGrid {
    /// Create a zeroed grid covering `world_width` x `world_depth` meters.
    pub fn new(width: usize, depth: usize, world_width: f32, world_depth: f32) -> Self {
        Self {
            width,
            depth,
            cell_width: world_width / width.saturating_sub(1).max(1) as f32,
            cell_depth: world_depth / depth.saturating_sub(1).max(1) as f32,
            origin_x: -world_width / 2.0,
            origin_z: -world_depth / 2.0,
            floor: 0.0,
            heights: vec![0.0; width * depth],
        }
    }

    /// Grid resolution along X
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid resolution along Z
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// World-space spacing between samples along X
    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    /// World-space spacing between samples along Z
    pub fn cell_depth(&self) -> f32 {
        self.cell_depth
    }

    /// Smallest world X/Z covered by the grid
    pub fn min_corner(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    /// Raw elevation buffer, row-major
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Elevation of the valley-floor clamp plane. Placement rules and the
    /// spawner resting planes are measured against it.
    pub fn floor_height(&self) -> f32 {
        self.floor
    }

    /// Exact stored elevation at grid indices, `None` outside the grid
    pub fn cell(&self, ix: usize, iz: usize) -> Option<f32> {
        if ix >= self.width || iz >= self.depth {
            return None;
        }
        Some(self.heights[iz * self.width + ix])
    }

    /// Store an elevation at grid indices. Out-of-range indices are ignored.
    pub fn set_cell(&mut self, ix: usize, iz: usize, elevation: f32) {
        if ix < self.width && iz < self.depth {
            self.heights[iz * self.width + ix] = elevation;
        }
    }

    /// Record the elevation the generator clamped valleys to
    pub fn set_floor(&mut self, elevation: f32) {
        self.floor = elevation;
    }

    /// World X/Z of a sample by its grid indices
    pub fn cell_position(&self, ix: usize, iz: usize) -> (f32, f32) {
        (
            self.origin_x + ix as f32 * self.cell_width,
            self.origin_z + iz as f32 * self.cell_depth,
        )
    }

    /// True if the world coordinate lies inside the sampled region
    pub fn contains(&self, world_x: f32, world_z: f32) -> bool {
        let gx = (world_x - self.origin_x) / self.cell_width;
        let gz = (world_z - self.origin_z) / self.cell_depth;
        gx >= 0.0 && gz >= 0.0 && gx <= (self.width - 1) as f32 && gz <= (self.depth - 1) as f32
    }

    /// Sample the surface height at world coordinates using bilinear
    /// interpolation over the four surrounding cells.
    ///
    /// Returns `None` outside the grid bounds: there is no ground there, and
    /// callers skip contact or reject the position rather than treating it
    /// as an error.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> Option<f32> {
        let gx = (world_x - self.origin_x) / self.cell_width;
        let gz = (world_z - self.origin_z) / self.cell_depth;

        if gx < 0.0 || gz < 0.0 || gx > (self.width - 1) as f32 || gz > (self.depth - 1) as f32 {
            return None;
        }

        Some(self.interpolate(gx, gz))
    }

    /// Bilinear sample in grid space. Coordinates must be within bounds.
    fn interpolate(&self, gx: f32, gz: f32) -> f32 {
        let x0 = (gx.floor() as usize).min(self.width - 1);
        let z0 = (gz.floor() as usize).min(self.depth - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.depth - 1);

        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let h00 = self.heights[z0 * self.width + x0];
        let h10 = self.heights[z0 * self.width + x1];
        let h01 = self.heights[z1 * self.width + x0];
        let h11 = self.heights[z1 * self.width + x1];

        let h0 = h00 * (1.0 - fx) + h10 * fx;
        let h1 = h01 * (1.0 - fx) + h11 * fx;

        h0 * (1.0 - fz) + h1 * fz
    }

    /// Bilinear sample with coordinates clamped into the grid, used for
    /// gradient taps near the border.
    fn sample_clamped(&self, world_x: f32, world_z: f32) -> f32 {
        let gx = ((world_x - self.origin_x) / self.cell_width).clamp(0.0, (self.width - 1) as f32);
        let gz = ((world_z - self.origin_z) / self.cell_depth).clamp(0.0, (self.depth - 1) as f32);
        self.interpolate(gx, gz)
    }

    /// Surface normal at world coordinates via central differences, one cell
    /// apart in each direction. `None` outside the grid bounds.
    pub fn normal_at(&self, world_x: f32, world_z: f32) -> Option<Vec3> {
        if !self.contains(world_x, world_z) {
            return None;
        }

        let hx0 = self.sample_clamped(world_x - self.cell_width, world_z);
        let hx1 = self.sample_clamped(world_x + self.cell_width, world_z);
        let hz0 = self.sample_clamped(world_x, world_z - self.cell_depth);
        let hz1 = self.sample_clamped(world_x, world_z + self.cell_depth);

        let ddx = (hx1 - hx0) / (2.0 * self.cell_width.max(1e-6));
        let ddz = (hz1 - hz0) / (2.0 * self.cell_depth.max(1e-6));

        Some(Vec3::new(-ddx, 1.0, -ddz).normalize_or_zero())
    }

    /// Intersect a ray with the heightfield surface.
    ///
    /// Marches along the ray at quarter-cell steps looking for a crossing of
    /// the surface, then refines the bracketed interval by bisection. `dir`
    /// must be normalized. Segments of the ray that leave the grid find no
    /// ground and are skipped.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<RayHit> {
        let step = 0.25 * self.cell_width.min(self.cell_depth);
        if step <= 0.0 || max_dist <= 0.0 {
            return None;
        }

        // Signed clearance of the ray above the surface at parameter t
        let clearance = |t: f32| -> Option<f32> {
            let p = origin + dir * t;
            self.height_at(p.x, p.z).map(|h| p.y - h)
        };

        let mut t_prev = 0.0;
        let mut c_prev = clearance(0.0);

        // Ray starting at or below the surface contacts immediately
        if let Some(c) = c_prev {
            if c <= 0.0 {
                let p = origin;
                let normal = self.normal_at(p.x, p.z)?;
                return Some(RayHit { point: p, normal, distance: 0.0 });
            }
        }

        let steps = (max_dist / step).ceil() as u32;
        for i in 1..=steps {
            let t = (i as f32 * step).min(max_dist);
            let c = clearance(t);

            if let (Some(above), Some(below)) = (c_prev, c) {
                if above > 0.0 && below <= 0.0 {
                    let t_hit = self.refine_crossing(origin, dir, t_prev, t);
                    let p = origin + dir * t_hit;
                    let normal = self.normal_at(p.x, p.z)?;
                    return Some(RayHit { point: p, normal, distance: t_hit });
                }
            }

            t_prev = t;
            c_prev = c;
        }

        None
    }

    /// Bisect a bracketed surface crossing between ray parameters `lo` and
    /// `hi`, where the ray is above the surface at `lo` and below at `hi`.
    fn refine_crossing(&self, origin: Vec3, dir: Vec3, mut lo: f32, mut hi: f32) -> f32 {
        for _ in 0..RAYCAST_REFINE_STEPS {
            let mid = 0.5 * (lo + hi);
            let p = origin + dir * mid;
            match self.height_at(p.x, p.z) {
                Some(h) if p.y - h > 0.0 => lo = mid,
                _ => hi = mid,
            }
        }
        hi
    }
}
