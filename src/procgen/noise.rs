/// Multi-octave noise sampling for terrain synthesis
use noise::{NoiseFn, Perlin};

/// Number of stacked octaves in a [`NoiseField`]
pub const OCTAVE_COUNT: usize = 3;

/// Parameters for a single noise octave
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Octave {
    /// Spatial frequency applied to normalized grid coordinates
    pub frequency: f32,
    /// Weight of this octave in the blended sample
    pub amplitude: f32,
    /// Fixed sample-space offset, decorrelates octaves sharing a seed
    pub offset: (f32, f32),
}

/// Three-octave 2D noise sampler with a fixed seed.
///
/// Coordinates are normalized grid coordinates (cell index / resolution),
/// so frequency values describe how many noise periods span the grid.
pub struct NoiseField {
    /// One generator per octave, seeded seed, seed+1, seed+2
    generators: [Perlin; OCTAVE_COUNT],
    /// Per-octave frequency/amplitude/offset
    octaves: [Octave; OCTAVE_COUNT],
    /// Cached sum of octave amplitudes, used for normalization
    amplitude_sum: f32,
    /// Seed the generators were built from
    seed: u32,
}

impl NoiseField {
    /// Create a noise field from a seed and per-octave parameters.
    ///
    /// The amplitude sum must be positive; configurations that would make it
    /// zero are rejected upstream at `TerrainConfig` validation.
    pub fn new(seed: u32, octaves: [Octave; OCTAVE_COUNT]) -> Self {
        let amplitude_sum = octaves.iter().map(|o| o.amplitude).sum();

        Self {
            generators: [
                Perlin::new(seed),
                Perlin::new(seed.wrapping_add(1)),
                Perlin::new(seed.wrapping_add(2)),
            ],
            octaves,
            amplitude_sum,
            seed,
        }
    }

    /// Seed this field was constructed with
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Per-octave parameters
    pub fn octaves(&self) -> &[Octave; OCTAVE_COUNT] {
        &self.octaves
    }

    /// Sample one octave at normalized coordinates.
    ///
    /// Returns the raw generator output in [-1, 1], with the octave's
    /// frequency and offset applied but not its amplitude. `band` must be
    /// below [`OCTAVE_COUNT`].
    pub fn sample_octave(&self, band: usize, nx: f32, ny: f32) -> f32 {
        debug_assert!(band < OCTAVE_COUNT, "octave band {} out of range", band);
        let octave = &self.octaves[band];

        self.generators[band].get([
            (nx * octave.frequency + octave.offset.0) as f64,
            (ny * octave.frequency + octave.offset.1) as f64,
        ]) as f32
    }

    /// Sample the blended field at normalized coordinates.
    ///
    /// Returns the amplitude-weighted sum of all octaves normalized by the
    /// total amplitude, a value in [-1, 1]. Deterministic for a fixed seed
    /// and coordinates.
    pub fn sample(&self, nx: f32, ny: f32) -> f32 {
        let mut value = 0.0;

        for band in 0..OCTAVE_COUNT {
            value += self.sample_octave(band, nx, ny) * self.octaves[band].amplitude;
        }

        value / self.amplitude_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_octaves() -> [Octave; OCTAVE_COUNT] {
        [
            Octave { frequency: 14.81, amplitude: 1.0, offset: (0.0, 0.0) },
            Octave { frequency: 26.98, amplitude: 0.5, offset: (5.3, 9.1) },
            Octave { frequency: 22.11, amplitude: 0.25, offset: (17.8, 23.5) },
        ]
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let field1 = NoiseField::new(12345, create_test_octaves());
        let field2 = NoiseField::new(12345, create_test_octaves());

        for x in 0..8 {
            for y in 0..8 {
                let nx = x as f32 / 8.0;
                let ny = y as f32 / 8.0;
                assert_eq!(field1.sample(nx, ny), field2.sample(nx, ny));
            }
        }
    }

    #[test]
    fn test_different_seeds_produce_different_values() {
        let field1 = NoiseField::new(12345, create_test_octaves());
        let field2 = NoiseField::new(54321, create_test_octaves());

        let mut found_difference = false;
        for x in 0..5 {
            for y in 0..5 {
                let nx = x as f32 / 5.0;
                let ny = y as f32 / 5.0;
                if field1.sample(nx, ny) != field2.sample(nx, ny) {
                    found_difference = true;
                }
            }
        }

        assert!(found_difference, "Different seeds should produce different values");
    }

    #[test]
    fn test_blended_sample_stays_in_unit_range() {
        let field = NoiseField::new(42, create_test_octaves());

        for x in 0..32 {
            for y in 0..32 {
                let val = field.sample(x as f32 / 32.0, y as f32 / 32.0);
                assert!(
                    (-1.0..=1.0).contains(&val),
                    "Blended sample {} outside [-1, 1]",
                    val
                );
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_sample_octave_rejects_out_of_range_band() {
        let field = NoiseField::new(1, create_test_octaves());
        field.sample_octave(OCTAVE_COUNT, 0.5, 0.5);
    }

    #[test]
    fn test_octave_offsets_decorrelate_bands() {
        let field = NoiseField::new(7, create_test_octaves());

        // Bands share a seed progression but sample at offset coordinates,
        // so they should not all agree at the same point.
        let mut distinct = false;
        for x in 0..5 {
            for y in 0..5 {
                let nx = x as f32 / 5.0;
                let ny = y as f32 / 5.0;
                let a = field.sample_octave(0, nx, ny);
                let b = field.sample_octave(1, nx, ny);
                if a != b {
                    distinct = true;
                }
            }
        }

        assert!(distinct, "Octave bands should produce distinct samples");
    }
}
