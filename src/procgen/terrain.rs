/// Terrain configuration, heightfield generation and regeneration
use super::heightgrid::HeightGrid;
use super::noise::{NoiseField, Octave, OCTAVE_COUNT};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by terrain configuration and checked queries
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid terrain configuration: grid resolution {width}x{depth} needs at least 2 samples per side")]
    ZeroResolution { width: usize, depth: usize },
    #[error("invalid terrain configuration: octave amplitudes sum to zero")]
    ZeroAmplitudeSum,
    #[error("invalid terrain configuration: world extent {width:.1}x{depth:.1} must be positive")]
    NonPositiveExtent { width: f32, depth: f32 },
    #[error("invalid terrain configuration: height multiplier {0} must be positive")]
    NonPositiveMultiplier(f32),
    #[error("height query ({x:.1}, {z:.1}) is outside the generated terrain")]
    OutOfBounds { x: f32, z: f32 },
}

/// Noise and redistribution parameters for one terrain generation.
///
/// Immutable per generation: changing anything means building a new
/// [`HeightGrid`] through [`TerrainGenerator::regenerate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World extent along X in meters
    pub width: f32,
    /// World extent along Z in meters
    pub depth: f32,
    /// Grid resolution along X (samples)
    pub grid_width: usize,
    /// Grid resolution along Z (samples)
    pub grid_depth: usize,
    /// Noise seed. Randomized per session unless pinned.
    pub seed: u32,
    /// Per-octave spatial frequencies
    pub frequencies: [f32; OCTAVE_COUNT],
    /// Per-octave blend weights
    pub amplitudes: [f32; OCTAVE_COUNT],
    /// Per-octave sample-space offsets
    pub octave_offsets: [(f32, f32); OCTAVE_COUNT],
    /// Power applied during redistribution; > 1 deepens valleys
    pub redistribution_exponent: f32,
    /// Pre-exponent scale nudging mid values toward the extremes
    pub fudge_factor: f32,
    /// Final elevation scale in meters
    pub height_multiplier: f32,
    /// Normalized elevation below which the terrain clamps to a flat floor
    pub floor_elevation: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            depth: 1000.0,
            grid_width: 128,
            grid_depth: 128,
            seed: rand::random::<u32>(),
            frequencies: [14.81, 26.98, 22.11],
            amplitudes: [1.0, 0.5, 0.25],
            octave_offsets: [(0.0, 0.0), (5.3, 9.1), (17.8, 23.5)],
            redistribution_exponent: 2.14,
            fudge_factor: 1.17,
            height_multiplier: 139.5,
            floor_elevation: 0.4,
        }
    }
}

impl TerrainConfig {
    /// Default parameters with a pinned seed
    pub fn with_seed(seed: u32) -> Self {
        Self { seed, ..Self::default() }
    }

    /// Reject degenerate parameter combinations before they can produce
    /// NaN or division by zero during generation.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.grid_width < 2 || self.grid_depth < 2 {
            return Err(TerrainError::ZeroResolution {
                width: self.grid_width,
                depth: self.grid_depth,
            });
        }
        if self.amplitudes.iter().sum::<f32>() <= 0.0 {
            return Err(TerrainError::ZeroAmplitudeSum);
        }
        if self.width <= 0.0 || self.depth <= 0.0 {
            return Err(TerrainError::NonPositiveExtent {
                width: self.width,
                depth: self.depth,
            });
        }
        if self.height_multiplier <= 0.0 {
            return Err(TerrainError::NonPositiveMultiplier(self.height_multiplier));
        }
        Ok(())
    }

    /// Octave parameter array for the noise field
    pub fn octaves(&self) -> [Octave; OCTAVE_COUNT] {
        let mut octaves = [Octave { frequency: 0.0, amplitude: 0.0, offset: (0.0, 0.0) };
            OCTAVE_COUNT];
        for band in 0..OCTAVE_COUNT {
            octaves[band] = Octave {
                frequency: self.frequencies[band],
                amplitude: self.amplitudes[band],
                offset: self.octave_offsets[band],
            };
        }
        octaves
    }

    /// World-space elevation of the clamped floor plane
    pub fn floor_height(&self) -> f32 {
        self.floor_elevation * self.height_multiplier
    }
}

/// Build a heightfield from the config's noise parameters.
///
/// Per cell: three octave samples remapped from [-1, 1] to [0, 1], weighted
/// by amplitude and normalized by the amplitude sum, redistributed through
/// `powf(value * fudge_factor, exponent)`, clamped below `floor_elevation`
/// to exactly `floor_elevation`, then scaled by `height_multiplier`. The
/// normalize -> exponentiate -> clamp -> scale order shapes the floor plane
/// and must not be reordered.
pub fn generate_height_grid(config: &TerrainConfig) -> Result<HeightGrid, TerrainError> {
    config.validate()?;

    let started = Instant::now();
    let field = NoiseField::new(config.seed, config.octaves());
    let amplitude_sum: f32 = config.amplitudes.iter().sum();

    let mut grid = HeightGrid::new(config.grid_width, config.grid_depth, config.width, config.depth);

    for iz in 0..config.grid_depth {
        for ix in 0..config.grid_width {
            let nx = ix as f32 / config.grid_width as f32;
            let nz = iz as f32 / config.grid_depth as f32;

            let mut elevation = 0.0;
            for band in 0..OCTAVE_COUNT {
                let sample = field.sample_octave(band, nx, nz);
                elevation += (sample * 0.5 + 0.5) * config.amplitudes[band];
            }
            elevation /= amplitude_sum;

            // The remapped sum is non-negative; the clamp keeps powf defined
            // if a generator overshoots its nominal range.
            elevation = (elevation * config.fudge_factor)
                .max(0.0)
                .powf(config.redistribution_exponent);

            if elevation < config.floor_elevation {
                elevation = config.floor_elevation;
            }

            grid.set_cell(ix, iz, elevation * config.height_multiplier);
        }
    }
    grid.set_floor(config.floor_height());

    debug!(
        width = config.grid_width,
        depth = config.grid_depth,
        seed = config.seed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated height grid"
    );

    Ok(grid)
}

/// Owns the current heightfield and the config that produced it.
///
/// Regeneration swaps the grid wholesale and bumps `revision`; collaborators
/// holding a collision surface derived from the old grid rebuild it at the
/// swap site.
pub struct TerrainGenerator {
    config: TerrainConfig,
    grid: Arc<HeightGrid>,
    revision: u64,
}

impl TerrainGenerator {
    /// Generate the initial heightfield from `config`.
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        let grid = generate_height_grid(&config)?;
        info!(
            seed = config.seed,
            grid = format!("{}x{}", config.grid_width, config.grid_depth),
            "terrain generated"
        );

        Ok(Self { config, grid: Arc::new(grid), revision: 1 })
    }

    /// Parameters of the current generation
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Shared handle to the current elevation buffer
    pub fn height_grid(&self) -> Arc<HeightGrid> {
        Arc::clone(&self.grid)
    }

    /// Monotonic counter, bumped on every grid swap
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// World-space elevation of the clamped floor plane
    pub fn floor_height(&self) -> f32 {
        self.config.floor_height()
    }

    /// Interpolated surface height at world coordinates, `None` off the grid
    pub fn height_at(&self, world_x: f32, world_z: f32) -> Option<f32> {
        self.grid.height_at(world_x, world_z)
    }

    /// Like [`height_at`](Self::height_at) but with a typed out-of-bounds
    /// error, for callers that need to propagate the miss.
    pub fn height_at_checked(&self, world_x: f32, world_z: f32) -> Result<f32, TerrainError> {
        self.grid
            .height_at(world_x, world_z)
            .ok_or(TerrainError::OutOfBounds { x: world_x, z: world_z })
    }

    /// Rebuild the heightfield from a new config, replacing the grid.
    ///
    /// Any collision surface derived from the previous grid is stale after
    /// this returns; the caller rebuilds it explicitly.
    pub fn regenerate(&mut self, config: TerrainConfig) -> Result<(), TerrainError> {
        let grid = generate_height_grid(&config)?;
        self.install(config, grid);
        Ok(())
    }

    /// Regenerate with the current parameters, optionally replacing the seed.
    /// `None` keeps the existing seed and reproduces the same terrain.
    pub fn reseed(&mut self, seed: Option<u32>) -> Result<(), TerrainError> {
        let mut config = self.config.clone();
        if let Some(seed) = seed {
            config.seed = seed;
        }
        self.regenerate(config)
    }

    /// Install a grid generated elsewhere (the background regeneration path).
    pub fn install(&mut self, config: TerrainConfig, grid: HeightGrid) {
        self.config = config;
        self.grid = Arc::new(grid);
        self.revision += 1;
        info!(seed = self.config.seed, revision = self.revision, "terrain swapped in");
    }
}

/// In-flight background regeneration. The worker thread builds the grid and
/// hands it back through a channel; `poll` never blocks.
pub struct RegenJob {
    rx: mpsc::Receiver<(TerrainConfig, HeightGrid)>,
}

/// Start generating a heightfield on a worker thread.
///
/// The config is validated up front so errors surface at the call site; the
/// finished grid is swapped in by the caller between frames.
pub fn spawn_regeneration(config: TerrainConfig) -> Result<RegenJob, TerrainError> {
    config.validate()?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok(grid) = generate_height_grid(&config) {
            let _ = tx.send((config, grid));
        }
    });

    Ok(RegenJob { rx })
}

impl RegenJob {
    /// Take the finished grid if the worker is done, without blocking.
    pub fn poll(&self) -> Option<(TerrainConfig, HeightGrid)> {
        self.rx.try_recv().ok()
    }
}
