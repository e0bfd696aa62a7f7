//! Precomputes a whole run into a playback buffer, for later random-access playback.

use std::{
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use crate::{
    config::{SimParams, VolcanoGeometry},
    emission::{EmissionBudget, ScheduleCursor},
    error::{ConfigError, LavaError},
    heightmap::HeightMap,
    playback::{ParticleSample, PlaybackBuffer, SnapShot},
    sim::Simulation,
    util,
};

/// Log progress every this many steps.
const PROGRESS_RATIO: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BakeOutcome {
    Completed,
    /// Stopped early. Snapshots captured so far are intact.
    Cancelled { steps_done: usize },
}

/// Drives a simulation through emission, stepping, and snapshot capture.
pub struct SimulationManager {
    pub sim: Simulation,
    pub buffer: PlaybackBuffer,
    cursor: ScheduleCursor,
    budget: EmissionBudget,
    steps_between_acquisitions: usize,
    /// The t = 0 snapshot has been taken.
    started: bool,
}

impl SimulationManager {
    pub fn new(
        params: SimParams,
        volcano: VolcanoGeometry,
        heightmap: HeightMap,
    ) -> Result<Self, ConfigError> {
        let sim = Simulation::new(params, volcano, heightmap)?;

        Ok(Self {
            buffer: PlaybackBuffer::new(sim.params.acquisition_interval()),
            steps_between_acquisitions: sim.params.steps_between_acquisitions(),
            cursor: ScheduleCursor::default(),
            budget: EmissionBudget::default(),
            started: false,
            sim,
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.sim.params
    }

    /// Total particles emitted so far.
    pub fn num_emitted(&self) -> usize {
        self.budget.total
    }

    fn take_snapshot(&mut self) {
        self.buffer.push(SnapShot::new(self.sim.particles_data()));
    }

    /// Emit the particles due at the current simulation time.
    fn emit(&mut self) {
        let params = &self.sim.params;
        let rate = self
            .cursor
            .rate(&params.particle_schedule, self.sim.time_elapsed);

        let n = self
            .budget
            .take(rate, params.timestep, params.max_num_particles);
        if n > 0 {
            self.sim.add_n_particles(n);
        }
    }

    /// Run the whole simulation, storing snapshots in the buffer. This can take a long time,
    /// depending on the particle count and duration.
    pub fn bake(&mut self) -> BakeOutcome {
        self.bake_with_cancel(&AtomicBool::new(false))
    }

    /// As `bake`, but checks `cancel` between steps, and stops early if it's set.
    ///
    /// Baking picks up from the simulation's current step: after a cancellation, calling this again
    /// continues the same run, and once a run has completed, it's a no-op. Frame `i` is always the
    /// state at `i * acquisition_interval`.
    pub fn bake_with_cancel(&mut self, cancel: &AtomicBool) -> BakeOutcome {
        let num_steps = self.sim.params.num_steps();
        let start = self.sim.iteration;

        if !self.started {
            log::info!(
                "Baking {num_steps} steps; {} steps per snapshot, using {:?}",
                self.steps_between_acquisitions,
                self.sim.params.integrator
            );
            // Initial snapshot; t=0.
            self.take_snapshot();
            self.started = true;
        } else if start < num_steps {
            log::info!("Resuming bake at step {start} of {num_steps}");
        }

        let mut start_time = Instant::now();

        for i in start..num_steps {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Bake cancelled after {i} of {num_steps} steps");
                return BakeOutcome::Cancelled { steps_done: i };
            }

            self.emit();
            self.sim.step();

            if self.sim.iteration % self.steps_between_acquisitions == 0 {
                self.take_snapshot();
            }

            self.budget.advance_time(self.sim.time_elapsed);

            if (i + 1) % PROGRESS_RATIO == 0 {
                log::info!(
                    "{:.1}% done. Particles: {} Step time: {}μs",
                    (i + 1) as f64 / num_steps as f64 * 100.,
                    self.sim.particles.len(),
                    start_time.elapsed().as_micros() / PROGRESS_RATIO as u128,
                );
                start_time = Instant::now();
            }
        }

        if start < num_steps {
            log::info!(
                "Bake complete. {} snapshots, {} particles",
                self.buffer.len(),
                self.sim.particles.len()
            );
        }
        BakeOutcome::Completed
    }

    /// Interpolated particle states at `time`; use after baking.
    pub fn get_particles_at(&self, time: f64) -> Vec<ParticleSample> {
        self.buffer.particles_at(time)
    }

    pub fn export_buffer(&self) -> Vec<u8> {
        self.buffer.to_bytes()
    }

    /// Replace the buffer with a packed one, e.g. from a previous bake with the same parameters.
    pub fn import_buffer(&mut self, bytes: &[u8]) -> Result<(), LavaError> {
        self.buffer = PlaybackBuffer::from_bytes(bytes, self.sim.params.acquisition_interval())?;
        Ok(())
    }

    pub fn save_buffer(&self, path: &Path) -> Result<(), LavaError> {
        util::save_bytes(path, &self.export_buffer())
    }

    pub fn load_buffer(&mut self, path: &Path) -> Result<(), LavaError> {
        let bytes = util::load_bytes(path)?;
        self.import_buffer(&bytes)
    }
}
