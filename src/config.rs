//! Run parameters. Everything here is validated once, when a simulation is built.

use std::path::Path;

use bincode::{Decode, Encode};

use crate::{
    error::{ConfigError, LavaError},
    kernel::smoothing_radius,
    units::celsius_to_kelvin,
    util,
};

#[derive(Clone, Copy, Debug, PartialEq, Default, Encode, Decode)]
pub enum Integrator {
    /// One physics evaluation per step. Cheap, but unstable for large dt, or a stiff pressure response.
    Euler,
    /// Midpoint-style second-order Runge-Kutta; two evaluations per step.
    #[default]
    RungeKutta2,
}

/// One entry of the emission schedule.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct EmissionInterval {
    /// s
    pub start_time: f64,
    /// s. `None` means until the end of the simulation.
    pub duration: Option<f64>,
    pub particles_per_second: u32,
}

impl EmissionInterval {
    pub fn new(start_time: f64, duration: Option<f64>, particles_per_second: u32) -> Self {
        Self {
            start_time,
            duration,
            particles_per_second,
        }
    }

    pub fn end_time(&self) -> Option<f64> {
        self.duration.map(|d| self.start_time + d)
    }
}

#[derive(Clone, Debug, Encode, Decode)]
pub struct SimParams {
    /// kg/m^3
    pub density_at_rest: f64,
    /// Higher values make the lava less compressible, but need a smaller timestep to stay stable.
    pub incompressibility_k: f64,
    pub max_viscosity: f64,
    /// How fast viscosity falls off as temperature rises.
    pub viscosity_evolution_factor: f64,
    /// m
    pub particle_radius: f64,
    /// K, at emission.
    pub initial_temperature: f64,
    /// K
    pub temp_ground: f64,
    /// K; the air above the flow.
    pub temp_surface: f64,
    // The transfer coefficients are tuning knobs, not physical values. The internal and external
    // ones don't share units.
    pub temp_transfer_coeff_internal: f64,
    pub temp_transfer_coeff_surface: f64,
    pub temp_transfer_coeff_ground: f64,
    /// s
    pub timestep: f64,
    /// Neighbor lists are rebuilt on steps where `iteration % recompute_neighbors_every == 0`.
    pub recompute_neighbors_every: usize,
    pub integrator: Integrator,
    /// Sorted by `start_time`.
    pub particle_schedule: Vec<EmissionInterval>,
    pub max_num_particles: usize,
    /// s
    pub simulation_duration: f64,
    /// Snapshots per second of simulated time.
    pub acquisition_rate: f64,
    /// For the emission RNG. `None` picks a fresh seed each run.
    pub seed: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            density_at_rest: 2_500.,
            incompressibility_k: 100.,
            max_viscosity: 1_000_000.,
            viscosity_evolution_factor: 1.5,
            particle_radius: 0.15,
            initial_temperature: celsius_to_kelvin(1_200.),
            temp_ground: celsius_to_kelvin(20.),
            temp_surface: celsius_to_kelvin(20.),
            temp_transfer_coeff_internal: 0.1,
            temp_transfer_coeff_surface: 400.,
            temp_transfer_coeff_ground: 1_000.,
            timestep: 0.01,
            recompute_neighbors_every: 10,
            integrator: Integrator::RungeKutta2,
            particle_schedule: vec![
                EmissionInterval::new(0., Some(10.), 100),
                EmissionInterval::new(10., Some(5.), 300),
                EmissionInterval::new(15., Some(15.), 200),
            ],
            max_num_particles: 20_000,
            simulation_duration: 30.,
            acquisition_rate: 500.,
            seed: None,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timestep > 0.) || !self.timestep.is_finite() {
            return Err(ConfigError::NonPositiveTimestep(self.timestep));
        }

        if !(smoothing_radius(self.particle_radius) > 0.) {
            return Err(ConfigError::NonPositiveSmoothingRadius(self.particle_radius));
        }

        if !(self.density_at_rest > 0.) {
            return Err(ConfigError::NonPositiveRestDensity(self.density_at_rest));
        }

        if !(self.acquisition_rate > 0.) {
            return Err(ConfigError::NonPositiveAcquisitionRate(self.acquisition_rate));
        }

        if self.recompute_neighbors_every == 0 {
            return Err(ConfigError::ZeroRecomputeInterval);
        }

        if self.simulation_duration < 0. {
            return Err(ConfigError::NegativeSimulationDuration(self.simulation_duration));
        }

        let mut prev = f64::NEG_INFINITY;
        for (index, interval) in self.particle_schedule.iter().enumerate() {
            if interval.start_time < prev {
                return Err(ConfigError::ScheduleOutOfOrder {
                    index,
                    start: interval.start_time,
                    prev,
                });
            }
            if let Some(duration) = interval.duration {
                if duration < 0. {
                    return Err(ConfigError::NegativeIntervalDuration { index, duration });
                }
            }
            prev = interval.start_time;
        }

        Ok(())
    }

    /// Steps between two captured frames; at least one.
    pub fn steps_between_acquisitions(&self) -> usize {
        let time_between = 1. / self.acquisition_rate;
        ((time_between / self.timestep + 1e-9).floor() as usize).max(1)
    }

    /// Simulated time between two captured frames.
    pub fn acquisition_interval(&self) -> f64 {
        self.timestep * self.steps_between_acquisitions() as f64
    }

    /// Total number of steps in a bake.
    pub fn num_steps(&self) -> usize {
        // Guard against float noise, e.g. 30. / 0.01 = 3000.0000000000005.
        (self.simulation_duration / self.timestep - 1e-9).ceil().max(0.) as usize
    }
}

/// Where lava comes out. Supplied by the terrain generator; only used to place new particles.
#[derive(Clone, Debug, Encode, Decode)]
pub struct VolcanoGeometry {
    /// (x, y), m
    pub crater_center: [f64; 2],
    pub crater_radius: f64,
    pub crater_height: f64,
    pub volcano_max_height: f64,
}

impl Default for VolcanoGeometry {
    fn default() -> Self {
        Self {
            crater_center: [0., 0.],
            crater_radius: 70.,
            crater_height: 50.,
            volcano_max_height: 200.,
        }
    }
}

#[derive(Clone, Debug, Default, Encode, Decode)]
pub struct Config {
    pub sim: SimParams,
    pub volcano: VolcanoGeometry,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, LavaError> {
        let result: Self = util::load(path)?;
        result.sim.validate()?;
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> Result<(), LavaError> {
        util::save(path, self)
    }

    /// Load the config at `path`. If there is no file there, write the defaults to it and use
    /// them. A file that exists but fails to decode or validate is an error, and is left untouched.
    pub fn load_or_default(path: &Path) -> Result<Self, LavaError> {
        match Self::load(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                Ok(cfg)
            }
            Err(e) if e.is_not_found() => {
                log::info!("No config at {}; using defaults", path.display());
                let cfg = Self::default();
                if let Err(e) = cfg.save(path) {
                    log::warn!("Error saving default config: {e}");
                }
                Ok(cfg)
            }
            Err(e) => Err(e),
        }
    }
}
