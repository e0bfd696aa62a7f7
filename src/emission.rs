//! When and where new lava particles appear.

use std::f64::consts::TAU;

use lin_alg::f64::Vec3;
use rand::Rng;

use crate::{
    config::{EmissionInterval, SimParams, VolcanoGeometry},
    heightmap::HeightMap,
    particle::LavaParticle,
};

/// Walks the emission schedule forward in time. Intervals are consumed in order; once time passes an
/// interval's end, it's never revisited.
#[derive(Clone, Debug, Default)]
pub struct ScheduleCursor {
    index: usize,
}

impl ScheduleCursor {
    /// Index of the interval the cursor is on. Equals the schedule length once it's exhausted.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The emission rate (particles per second) at `time`. Call with non-decreasing times.
    pub fn rate(&mut self, schedule: &[EmissionInterval], time: f64) -> u32 {
        while let Some(interval) = schedule.get(self.index) {
            match interval.end_time() {
                Some(end) if time >= end => {
                    self.index += 1;
                    log::debug!("Emission interval {} ended at {end}s", self.index - 1);
                }
                _ => break,
            }
        }

        match schedule.get(self.index) {
            Some(interval) if time >= interval.start_time => interval.particles_per_second,
            _ => 0,
        }
    }
}

/// Caps emission per one-second window, and in total.
#[derive(Clone, Debug, Default)]
pub struct EmissionBudget {
    /// Particles emitted since the start of the current second.
    pub emitted_this_second: u32,
    current_second: i64,
    pub total: usize,
}

impl EmissionBudget {
    /// How many particles to emit this step, at `rate` particles per second.
    pub fn take(&mut self, rate: u32, dt: f64, max_num_particles: usize) -> usize {
        if self.emitted_this_second >= rate || self.total >= max_num_particles {
            return 0;
        }

        let per_step = (rate as f64 * dt).ceil() as usize;
        let result = per_step
            .min((rate - self.emitted_this_second) as usize)
            .min(max_num_particles - self.total);

        self.emitted_this_second += result as u32;
        self.total += result;
        result
    }

    /// Resets the per-second window once `time` enters a new second.
    pub fn advance_time(&mut self, time: f64) {
        let second = time.floor() as i64;
        if second > self.current_second {
            self.current_second = second;
            self.emitted_this_second = 0;
        }
    }
}

/// Create a particle at a random point inside the crater, above the terrain.
pub fn spawn_particle<R: Rng>(
    rng: &mut R,
    params: &SimParams,
    volcano: &VolcanoGeometry,
    heightmap: &HeightMap,
) -> LavaParticle {
    // Particles spawn halfway up the crater, where its radius is about half the rim's.
    let radius_at_z = volcano.crater_radius / 2.;

    // Uniform over the disc.
    let θ = rng.random_range(0.0..TAU);
    let r = radius_at_z * rng.random_range(0.0..=1.0_f64).sqrt();

    let x = volcano.crater_center[0] + r * θ.cos();
    let y = volcano.crater_center[1] + r * θ.sin();

    let z_crater = (volcano.volcano_max_height + volcano.crater_height) / 2.;
    let z_min = heightmap.height_at(x, y) + params.particle_radius;

    LavaParticle::new(
        Vec3::new(x, y, z_crater.max(z_min)),
        params.particle_radius,
        params.density_at_rest,
        params.initial_temperature,
    )
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_schedule_cursor() {
        let schedule = vec![
            EmissionInterval::new(1., Some(2.), 10),
            EmissionInterval::new(3., Some(1.), 20),
            EmissionInterval::new(5., None, 30),
        ];
        let mut cursor = ScheduleCursor::default();

        assert_eq!(cursor.rate(&schedule, 0.), 0);
        assert_eq!(cursor.rate(&schedule, 1.), 10);
        assert_eq!(cursor.rate(&schedule, 2.99), 10);
        assert_eq!(cursor.rate(&schedule, 3.), 20);
        assert_eq!(cursor.index(), 1);
        // Gap between intervals.
        assert_eq!(cursor.rate(&schedule, 4.5), 0);
        assert_eq!(cursor.rate(&schedule, 5.), 30);
        assert_eq!(cursor.rate(&schedule, 1_000.), 30);
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn test_schedule_skips_intervals_passed_over() {
        let schedule = vec![
            EmissionInterval::new(0., Some(1.), 10),
            EmissionInterval::new(1., Some(1.), 20),
            EmissionInterval::new(2., Some(1.), 30),
        ];
        let mut cursor = ScheduleCursor::default();

        assert_eq!(cursor.rate(&schedule, 2.5), 30);
        assert_eq!(cursor.rate(&schedule, 3.), 0);
        assert_eq!(cursor.index(), 3);
        // No re-entry.
        assert_eq!(cursor.rate(&schedule, 0.5), 0);
    }

    #[test]
    fn test_budget() {
        let mut budget = EmissionBudget::default();

        // 25/s at dt 0.1: 3 per step, capped to 25 over the second.
        let mut emitted = 0;
        for step in 0..10 {
            emitted += budget.take(25, 0.1, 1_000);
            budget.advance_time((step + 1) as f64 * 0.1 - 1e-9);
        }
        assert_eq!(emitted, 25);

        budget.advance_time(1.0);
        assert_eq!(budget.take(25, 0.1, 1_000), 3);

        // Global cap.
        assert_eq!(budget.take(1_000, 1., 30), 2);
        assert_eq!(budget.total, 30);
        assert_eq!(budget.take(1_000, 1., 30), 0);
    }

    #[test]
    fn test_spawn_in_crater() {
        let params = SimParams::default();
        let volcano = VolcanoGeometry {
            crater_center: [-7., 7.],
            crater_radius: 8.,
            crater_height: 34.,
            volcano_max_height: 43.,
        };
        let heightmap = HeightMap::flat(500., 500., 0.).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..200 {
            let p = spawn_particle(&mut rng, &params, &volcano, &heightmap);
            let dx = p.posit.x - volcano.crater_center[0];
            let dy = p.posit.y - volcano.crater_center[1];

            assert!((dx * dx + dy * dy).sqrt() <= volcano.crater_radius / 2. + 1e-12);
            assert_eq!(p.posit.z, 38.5);
            assert_eq!(p.temp, params.initial_temperature);
            assert_eq!(p.vel.magnitude(), 0.);
        }
    }

    #[test]
    fn test_spawn_above_terrain() {
        let params = SimParams::default();
        let volcano = VolcanoGeometry::default();
        // Terrain higher than the spawn height.
        let heightmap = HeightMap::flat(1_000., 1_000., 500.).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let p = spawn_particle(&mut rng, &params, &volcano, &heightmap);
        assert!((p.posit.z - (500. + params.particle_radius)).abs() < 1e-9);
    }
}
