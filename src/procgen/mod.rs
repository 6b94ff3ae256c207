/// Procedural terrain generation
///
/// Multi-octave noise synthesis, the heightfield grid used as both render
/// data and collision geometry, and the generator that ties them together.

pub mod heightgrid;
pub mod noise;
pub mod terrain;

// Re-export main types for convenience
pub use heightgrid::{HeightGrid, RayHit};
pub use noise::{NoiseField, Octave, OCTAVE_COUNT};
pub use terrain::{
    generate_height_grid, spawn_regeneration, RegenJob, TerrainConfig, TerrainError,
    TerrainGenerator,
};
