//! Terrain height queries, over a sample grid produced by the terrain generator.
//!
//! The grid is interpolated on the same triangles the renderer builds its mesh from, so collisions
//! agree with the visible surface.

use std::path::Path;

use bincode::{Decode, Encode};

use crate::{
    error::{ConfigError, LavaError},
    util,
};

#[derive(Clone, Debug, Encode, Decode)]
pub struct HeightMap {
    /// Samples along x.
    pub buffer_width: usize,
    /// Samples along y.
    pub buffer_height: usize,
    /// Row-major; sample (i, j) is at `i + j * buffer_width`.
    data: Vec<f64>,
    /// World extent along x (m), centered on the origin.
    pub terrain_width: f64,
    /// World extent along y (m), centered on the origin.
    pub terrain_length: f64,
}

impl HeightMap {
    pub fn new(
        buffer_width: usize,
        buffer_height: usize,
        data: Vec<f64>,
        terrain_width: f64,
        terrain_length: f64,
    ) -> Result<Self, ConfigError> {
        let result = Self {
            buffer_width,
            buffer_height,
            data,
            terrain_width,
            terrain_length,
        };
        result.validate()?;
        Ok(result)
    }

    /// Load a height map written by the terrain generator, using Bincode.
    pub fn load(path: &Path) -> Result<Self, LavaError> {
        let result: Self = util::load(path)?;
        result.validate()?;
        Ok(result)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_width == 0
            || self.buffer_height == 0
            || !(self.terrain_width > 0.)
            || !(self.terrain_length > 0.)
        {
            return Err(ConfigError::EmptyHeightMap);
        }

        let expected = self.buffer_width * self.buffer_height;
        if self.data.len() != expected {
            return Err(ConfigError::HeightMapSize {
                expected,
                got: self.data.len(),
            });
        }

        Ok(())
    }

    /// Level terrain, e.g. for tests and when no generated terrain is available.
    pub fn flat(terrain_width: f64, terrain_length: f64, height: f64) -> Result<Self, ConfigError> {
        Self::new(2, 2, vec![height; 4], terrain_width, terrain_length)
    }

    fn sample(&self, i: usize, j: usize) -> f64 {
        self.data[i + j * self.buffer_width]
    }

    /// Terrain height at world coordinates. Outside the terrain extents, this is 0.
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        let half_w = self.terrain_width / 2.;
        let half_l = self.terrain_length / 2.;

        if !(-half_w..=half_w).contains(&x) || !(-half_l..=half_l).contains(&y) {
            return 0.;
        }

        let max_i = (self.buffer_width - 1) as f64;
        let max_j = (self.buffer_height - 1) as f64;

        // Buffer-pixel space.
        let px = ((x + half_w) / self.terrain_width * max_i).clamp(0., max_i);
        let py = ((y + half_l) / self.terrain_length * max_j).clamp(0., max_j);

        // Keep the cell's far corner in bounds; on the last row or column, the offset becomes 1.
        let i0 = (px.floor() as usize).min(self.buffer_width.saturating_sub(2));
        let j0 = (py.floor() as usize).min(self.buffer_height.saturating_sub(2));
        let i1 = (i0 + 1).min(self.buffer_width - 1);
        let j1 = (j0 + 1).min(self.buffer_height - 1);

        let dx = px - i0 as f64;
        let dy = py - j0 as f64;

        let h00 = self.sample(i0, j0);
        let h10 = self.sample(i1, j0);
        let h01 = self.sample(i0, j1);
        let h11 = self.sample(i1, j1);

        if dx + dy < 1. {
            // Triangle (0,0)-(1,0)-(0,1)
            h00 + (h10 - h00) * dx + (h01 - h00) * dy
        } else {
            // Triangle (1,0)-(1,1)-(0,1)
            h11 + (h01 - h11) * (1. - dx) + (h10 - h11) * (1. - dy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 3x3 sample grid over a 2x2 terrain; samples sit at -1, 0, 1 on both axes.
    fn ramp() -> HeightMap {
        // h = i + 10 j
        let data = (0..9).map(|k| (k % 3) as f64 + 10. * (k / 3) as f64).collect();
        HeightMap::new(3, 3, data, 2., 2.).unwrap()
    }

    #[test]
    fn test_outside_extents_is_zero() {
        let map = HeightMap::flat(10., 10., 5.).unwrap();
        assert_eq!(map.height_at(5.01, 0.), 0.);
        assert_eq!(map.height_at(0., -6.), 0.);
        assert_eq!(map.height_at(0., 0.), 5.);
    }

    #[test]
    fn test_hits_samples_exactly() {
        let map = ramp();
        assert!((map.height_at(-1., -1.) - 0.).abs() < 1e-12);
        assert!((map.height_at(0., -1.) - 1.).abs() < 1e-12);
        assert!((map.height_at(-1., 0.) - 10.).abs() < 1e-12);
        assert!((map.height_at(1., 1.) - 22.).abs() < 1e-12);
    }

    #[test]
    fn test_planar_data_is_reproduced() {
        // A plane is reproduced exactly by either triangle.
        let map = ramp();
        for (x, y) in [(-0.7, -0.9), (-0.2, -0.1), (0.3, 0.6), (0.9, 0.95), (0.5, -0.5)] {
            let expected = (x + 1.) + 10. * (y + 1.);
            assert!((map.height_at(x, y) - expected).abs() < 1e-9, "({x}, {y})");
        }
    }

    #[test]
    fn test_triangle_split() {
        // A single bump in the (1,1) corner only affects the upper triangle.
        let map = HeightMap::new(2, 2, vec![0., 0., 0., 4.], 1., 1.).unwrap();
        // Lower triangle: dx + dy < 1.
        assert_eq!(map.height_at(-0.3, -0.3), 0.);
        // Upper triangle, center of the cell's far half.
        let h = map.height_at(0.25, 0.25);
        assert!((h - 4. * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert_eq!(
            HeightMap::new(3, 3, vec![0.; 8], 1., 1.).unwrap_err(),
            ConfigError::HeightMapSize {
                expected: 9,
                got: 8
            }
        );
        assert_eq!(
            HeightMap::new(0, 3, Vec::new(), 1., 1.).unwrap_err(),
            ConfigError::EmptyHeightMap
        );
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let path = std::env::temp_dir().join(format!("lava_hmap_{}.lava", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert!(HeightMap::load(&path).unwrap_err().is_not_found());

        // Written with a mismatched sample count; rejected on load.
        let bad = HeightMap {
            buffer_width: 3,
            buffer_height: 3,
            data: vec![0.; 4],
            terrain_width: 1.,
            terrain_length: 1.,
        };
        util::save(&path, &bad).unwrap();
        let err = HeightMap::load(&path).unwrap_err();
        assert!(matches!(
            err,
            LavaError::Config(ConfigError::HeightMapSize { expected: 9, got: 4 })
        ));

        let _ = std::fs::remove_file(&path);
    }
}
