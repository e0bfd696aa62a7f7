//! A uniform 2D grid over the terrain footprint, for neighbor search in O(n).
//!
//! Cells are `2h` wide, the same as the neighbor search diameter, so scanning the 3x3 block of
//! cells around a particle finds every neighbor. Buckets hold indices into the particle vector.
//!
//! Only occupied cells have a bucket, so a large terrain with a small smoothing radius costs
//! nothing up front.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::particle::LavaParticle;

pub struct SpatialGrid {
    pub cell_size: f64,
    /// Footprint extents; the grid is centered on the origin.
    pub width: f64,
    pub length: f64,
    pub num_x: usize,
    pub num_y: usize,
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Particles currently filed.
    count: usize,
}

impl SpatialGrid {
    /// `h` is the smoothing radius.
    pub fn new(width: f64, length: f64, h: f64) -> Self {
        let cell_size = 2. * h;
        let num_x = ((width / cell_size).ceil() as usize).max(1);
        let num_y = ((length / cell_size).ceil() as usize).max(1);

        Self {
            cell_size,
            width,
            length,
            num_x,
            num_y,
            cells: HashMap::new(),
            count: 0,
        }
    }

    /// The cell containing a particle's (x, y). May lie outside the grid.
    pub fn cell_of(&self, particle: &LavaParticle) -> (i32, i32) {
        (
            ((particle.posit.x + self.width / 2.) / self.cell_size).floor() as i32,
            ((particle.posit.y + self.length / 2.) / self.cell_size).floor() as i32,
        )
    }

    pub fn in_bounds(&self, cell: (i32, i32)) -> bool {
        let (i, j) = cell;
        i >= 0 && j >= 0 && (i as usize) < self.num_x && (j as usize) < self.num_y
    }

    /// Files the particle under its current cell. Fails without changes if that cell is off the grid.
    pub fn insert(&mut self, id: usize, particle: &mut LavaParticle) -> bool {
        let cell = self.cell_of(particle);
        if !self.in_bounds(cell) {
            return false;
        }

        particle.cell = Some(cell);
        self.cells.entry(cell).or_default().push(id);
        self.count += 1;
        true
    }

    /// Removes the particle from the bucket it was last filed under. Fails if that cell is
    /// unknown or off the grid; absent ids are a no-op.
    pub fn remove(&mut self, id: usize, particle: &LavaParticle) -> bool {
        let Some(cell) = particle.cell.filter(|&c| self.in_bounds(c)) else {
            return false;
        };

        if let Some(bucket) = self.cells.get_mut(&cell) {
            let before = bucket.len();
            bucket.retain(|&other| other != id);
            self.count -= before - bucket.len();

            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
        true
    }

    /// Keeps the particle's bucket in sync with its position. Returns false when the particle is
    /// off the grid; its cell is still recorded so it's picked back up if it re-enters.
    pub fn relocate(&mut self, id: usize, particle: &mut LavaParticle) -> bool {
        let cell = self.cell_of(particle);
        if particle.cell == Some(cell) {
            return self.in_bounds(cell);
        }

        self.remove(id, particle);

        if self.in_bounds(cell) {
            self.insert(id, particle)
        } else {
            particle.cell = Some(cell);
            false
        }
    }

    /// Indices of particles within `2h` of particle `id`, excluding itself.
    /// Empty if the particle is off the grid.
    pub fn neighbors(&self, id: usize, particles: &[LavaParticle]) -> Vec<usize> {
        let mut result = Vec::new();

        let particle = &particles[id];
        let Some((ci, cj)) = particle.cell.filter(|&c| self.in_bounds(c)) else {
            return result;
        };

        let radius_sq = self.cell_size * self.cell_size;

        for dj in -1..=1 {
            for di in -1..=1 {
                let Some(bucket) = self.cells.get(&(ci + di, cj + dj)) else {
                    continue;
                };

                for &other in bucket {
                    if other != id && particle.dist_sq(&particles[other]) < radius_sq {
                        result.push(other);
                    }
                }
            }
        }

        result
    }

    /// Neighbor lists for every particle.
    pub fn all_neighbors(&self, particles: &[LavaParticle]) -> Vec<Vec<usize>> {
        (0..particles.len())
            .into_par_iter()
            .map(|id| self.neighbors(id, particles))
            .collect()
    }

    /// Number of particles currently filed on the grid.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Number of cells with at least one particle.
    pub fn num_occupied(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
