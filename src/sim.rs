//! Simulation state for one run, and the per-step driver.

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    config::{SimParams, VolcanoGeometry},
    emission::spawn_particle,
    error::ConfigError,
    fluid_dynamics::Physics,
    grid::SpatialGrid,
    heightmap::HeightMap,
    integrate,
    kernel::Kernel,
    particle::LavaParticle,
};

/// Everything one run mutates. Owned exclusively by whatever drives the stepping loop.
pub struct Simulation {
    pub params: SimParams,
    pub volcano: VolcanoGeometry,
    pub heightmap: HeightMap,
    pub kernel: Kernel,
    pub grid: SpatialGrid,
    /// Append-only; a particle's index never changes.
    pub particles: Vec<LavaParticle>,
    /// Indices of each particle's neighbors, as of the last refresh.
    pub neighbors: Vec<Vec<usize>>,
    /// Steps taken.
    pub iteration: usize,
    pub time_elapsed: f64,
    rng: StdRng,
}

impl Simulation {
    pub fn new(
        params: SimParams,
        volcano: VolcanoGeometry,
        heightmap: HeightMap,
    ) -> Result<Self, ConfigError> {
        params.validate()?;

        let kernel = Kernel::from_particle_radius(params.particle_radius)?;
        let grid = SpatialGrid::new(heightmap.terrain_width, heightmap.terrain_length, kernel.h);

        let seed = params.seed.unwrap_or_else(rand::random::<u64>);

        Ok(Self {
            params,
            volcano,
            heightmap,
            kernel,
            grid,
            particles: Vec::new(),
            neighbors: Vec::new(),
            iteration: 0,
            time_elapsed: 0.,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn physics(&self) -> Physics<'_> {
        Physics {
            params: &self.params,
            kernel: &self.kernel,
            heightmap: &self.heightmap,
        }
    }

    /// Adds a particle to the simulation, filing it on the grid and giving it a neighbor list.
    /// Existing particles see it once neighbors are next refreshed. Returns its index.
    pub fn add_particle(&mut self, mut particle: LavaParticle) -> usize {
        let id = self.particles.len();
        if !self.grid.insert(id, &mut particle) {
            // Off the grid; it's picked up by `relocate` if it moves onto it.
            particle.cell = Some(self.grid.cell_of(&particle));
        }
        self.particles.push(particle);

        let neighbors = self.grid.neighbors(id, &self.particles);
        self.neighbors.push(neighbors);

        id
    }

    /// Spawn `n` particles in the crater.
    pub fn add_n_particles(&mut self, n: usize) {
        for _ in 0..n {
            let particle =
                spawn_particle(&mut self.rng, &self.params, &self.volcano, &self.heightmap);
            self.add_particle(particle);
        }
    }

    pub fn refresh_neighbors(&mut self) {
        self.neighbors = self.grid.all_neighbors(&self.particles);
    }

    /// Whether neighbor lists are rebuilt on the next step.
    pub fn neighbors_due(&self) -> bool {
        self.iteration % self.params.recompute_neighbors_every == 0
    }

    /// Advance the simulation by one timestep: refresh neighbors on schedule, integrate, resolve
    /// terrain collisions, then re-file particles on the grid.
    pub fn step(&mut self) {
        if self.neighbors_due() {
            self.refresh_neighbors();
        }

        let dt = self.params.timestep;
        let phys = Physics {
            params: &self.params,
            kernel: &self.kernel,
            heightmap: &self.heightmap,
        };

        integrate::step(
            self.params.integrator,
            &mut self.particles,
            &self.neighbors,
            &phys,
            dt,
        );

        integrate::collide_with_terrain(&mut self.particles, &self.heightmap);

        for (id, particle) in self.particles.iter_mut().enumerate() {
            self.grid.relocate(id, particle);
        }

        self.iteration += 1;
        self.time_elapsed += dt;
    }

    /// (x, y, z, temperature) for every particle, in index order.
    pub fn particles_data(&self) -> Vec<[f64; 4]> {
        self.particles.iter().map(LavaParticle::sample).collect()
    }
}

#[cfg(test)]
mod tests {
    use lin_alg::f64::Vec3;

    use super::*;
    use crate::config::Integrator;

    fn sim(integrator: Integrator) -> Simulation {
        let params = SimParams {
            integrator,
            seed: Some(7),
            recompute_neighbors_every: 3,
            // Keeps explicit viscosity well inside its stability limit at this dt.
            max_viscosity: 1_000.,
            ..Default::default()
        };
        let volcano = VolcanoGeometry {
            crater_center: [0., 0.],
            crater_radius: 1.,
            crater_height: 1.,
            volcano_max_height: 1.,
        };
        let heightmap = HeightMap::flat(20., 20., 0.).unwrap();
        Simulation::new(params, volcano, heightmap).unwrap()
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = SimParams {
            timestep: 0.,
            ..Default::default()
        };
        let heightmap = HeightMap::flat(20., 20., 0.).unwrap();
        assert!(Simulation::new(params, VolcanoGeometry::default(), heightmap).is_err());
    }

    #[test]
    fn test_add_particle_tracks_neighbors() {
        let mut sim = sim(Integrator::Euler);
        let r = sim.params.particle_radius;
        let t = sim.params.initial_temperature;
        let ρ = sim.params.density_at_rest;

        sim.add_particle(LavaParticle::new(Vec3::new(0., 0., 1.), r, ρ, t));
        let id = sim.add_particle(LavaParticle::new(Vec3::new(0.1, 0., 1.), r, ρ, t));

        assert_eq!(id, 1);
        assert_eq!(sim.neighbors.len(), 2);
        assert_eq!(sim.neighbors[1], vec![0]);
        // Not seen by the older particle until a refresh.
        assert!(sim.neighbors[0].is_empty());

        sim.refresh_neighbors();
        assert_eq!(sim.neighbors[0], vec![1]);
    }

    #[test]
    fn test_off_grid_particle() {
        let mut sim = sim(Integrator::Euler);
        let r = sim.params.particle_radius;
        let t = sim.params.initial_temperature;
        let ρ = sim.params.density_at_rest;

        sim.add_particle(LavaParticle::new(Vec3::new(50., 0., 1.), r, ρ, t));
        assert!(sim.grid.is_empty());

        // Steps stay well-behaved for particles off the terrain.
        sim.step();
        assert!(sim.particles[0].posit.z.is_finite());
    }

    #[test]
    fn test_neighbor_cadence() {
        let mut sim = sim(Integrator::Euler);
        assert!(sim.neighbors_due());
        sim.step();
        assert!(!sim.neighbors_due());
        sim.step();
        sim.step();
        assert!(sim.neighbors_due());
        assert_eq!(sim.iteration, 3);
        assert!((sim.time_elapsed - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_blob_stays_finite_and_above_ground() {
        for integrator in [Integrator::Euler, Integrator::RungeKutta2] {
            let mut sim = sim(integrator);
            sim.add_n_particles(40);
            for _ in 0..30 {
                sim.step();
            }

            for p in &sim.particles {
                assert!(p.posit.x.is_finite() && p.posit.y.is_finite() && p.posit.z.is_finite());
                assert!(p.temp.is_finite());
                assert!(p.posit.z >= sim.heightmap.height_at(p.posit.x, p.posit.y));
            }
        }
    }
}
