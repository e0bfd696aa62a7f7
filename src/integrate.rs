//! Time integration over the whole particle set, and terrain collision.
//!
//! Both integrators share `fluid_dynamics::evaluate`; they differ only in how its derivatives
//! advance the state.

use lin_alg::f64::Vec3;
use rayon::prelude::*;

use crate::{
    config::Integrator,
    fluid_dynamics::{evaluate, Evolution, Physics},
    heightmap::HeightMap,
    particle::LavaParticle,
};

/// Advance every particle by `dt`, using the selected integrator. Neighbor lists are taken as they
/// are; refreshing them is up to the caller.
pub fn step(
    integrator: Integrator,
    particles: &mut [LavaParticle],
    neighbors: &[Vec<usize>],
    phys: &Physics,
    dt: f64,
) {
    match integrator {
        Integrator::Euler => integrate_euler(particles, neighbors, phys, dt),
        Integrator::RungeKutta2 => integrate_rk2(particles, neighbors, phys, dt),
    }
}

/// One evaluation, then velocity, position (using the updated velocity), and temperature.
pub fn integrate_euler(
    particles: &mut [LavaParticle],
    neighbors: &[Vec<usize>],
    phys: &Physics,
    dt: f64,
) {
    let evolution = evaluate(particles, neighbors, phys);

    particles
        .par_iter_mut()
        .zip(evolution)
        .for_each(|(p, evo)| {
            p.vel += evo.force / p.mass() * dt;
            p.posit += p.vel * dt;
            p.temp -= evo.temp_rate * dt;
        });
}

/// Second-order Runge-Kutta. Stage 1 evaluates at the current state; stage 2 at a copy advanced by
/// half a step with stage-1 derivatives, using the same neighbor lists. The original state then
/// advances a full step along the average of both stages.
pub fn integrate_rk2(
    particles: &mut [LavaParticle],
    neighbors: &[Vec<usize>],
    phys: &Physics,
    dt: f64,
) {
    let k1 = evaluate(particles, neighbors, phys);

    let mut half = particles.to_vec();
    half.par_iter_mut().zip(&k1).for_each(|(p, evo)| {
        p.posit += p.vel * (dt * 0.5);
        p.vel += evo.force / p.mass() * (dt * 0.5);
        p.temp -= evo.temp_rate * (dt * 0.5);
    });

    let k2 = evaluate(&mut half, neighbors, phys);

    particles
        .par_iter_mut()
        .zip(half.par_iter())
        .zip(k1.into_par_iter().zip(k2))
        .for_each(|((p, p_half), (evo_1, evo_2))| {
            let Evolution {
                force: force_1,
                temp_rate: temp_rate_1,
            } = evo_1;
            let Evolution {
                force: force_2,
                temp_rate: temp_rate_2,
            } = evo_2;

            let vel_avg: Vec3 = (p.vel + p_half.vel) * 0.5;
            let acc_avg = (force_1 + force_2) * (0.5 / p.mass());

            p.posit += vel_avg * dt;
            p.vel += acc_avg * dt;
            p.temp -= (temp_rate_1 + temp_rate_2) * 0.5 * dt;
        });
}

/// Particles that sink into the terrain stick to its surface: their height is clamped, and their
/// velocity zeroed. Returns how many were clamped.
pub fn collide_with_terrain(particles: &mut [LavaParticle], heightmap: &HeightMap) -> usize {
    particles
        .par_iter_mut()
        .map(|p| {
            let ground = heightmap.height_at(p.posit.x, p.posit.y);
            if p.posit.z < ground {
                p.posit.z = ground;
                p.vel = Vec3::new_zero();
                1
            } else {
                0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SimParams, kernel::Kernel, units::GRAVITY};

    fn particle(params: &SimParams, z: f64) -> LavaParticle {
        LavaParticle::new(
            Vec3::new(0., 0., z),
            params.particle_radius,
            params.density_at_rest,
            params.initial_temperature,
        )
    }

    #[test]
    fn test_collision_clamps_and_counts() {
        let params = SimParams::default();
        let heightmap = HeightMap::flat(10., 10., 2.).unwrap();

        let mut particles = vec![particle(&params, 1.5), particle(&params, 2.5)];
        particles[0].vel = Vec3::new(1., 0., -3.);
        particles[1].vel = Vec3::new(0., 0., -1.);

        assert_eq!(collide_with_terrain(&mut particles, &heightmap), 1);
        assert_eq!(particles[0].posit.z, 2.);
        assert_eq!(particles[0].vel.magnitude(), 0.);
        // Above ground: untouched.
        assert_eq!(particles[1].posit.z, 2.5);
        assert_eq!(particles[1].vel.z, -1.);
    }

    #[test]
    fn test_euler_moves_with_updated_velocity() {
        let params = SimParams::default();
        let kernel = Kernel::from_particle_radius(params.particle_radius).unwrap();
        let heightmap = HeightMap::flat(10., 10., 0.).unwrap();
        let phys = Physics {
            params: &params,
            kernel: &kernel,
            heightmap: &heightmap,
        };

        let dt = 0.01;
        let mut particles = vec![particle(&params, 3.)];
        particles[0].vel = Vec3::new(2., 0., 0.);

        integrate_euler(&mut particles, &[Vec::new()], &phys, dt);

        let p = &particles[0];
        assert!((p.posit.x - 2. * dt).abs() < 1e-12);
        assert!((p.vel.z + GRAVITY * dt).abs() < 1e-12);
        assert!((p.posit.z - (3. - GRAVITY * dt * dt)).abs() < 1e-12);
        assert!(p.temp < params.initial_temperature);
    }

    #[test]
    fn test_rk2_leaves_neighbors_and_count_alone() {
        let params = SimParams::default();
        let kernel = Kernel::from_particle_radius(params.particle_radius).unwrap();
        let heightmap = HeightMap::flat(10., 10., 0.).unwrap();
        let phys = Physics {
            params: &params,
            kernel: &kernel,
            heightmap: &heightmap,
        };

        let mut particles = vec![particle(&params, 3.), particle(&params, 3.2)];
        let neighbors = vec![vec![1], vec![0]];

        integrate_rk2(&mut particles, &neighbors, &phys, 0.001);

        assert_eq!(particles.len(), 2);
        // Pressure on the pair is equal and opposite, leaving gravity. Viscosity differs slightly,
        // since the particles cool at different rates.
        let mean_vz = (particles[0].vel.z + particles[1].vel.z) / 2.;
        assert!((mean_vz + GRAVITY * 0.001).abs() < 1e-6);
        assert!(particles.iter().all(|p| p.posit.z.is_finite()));
    }
}
