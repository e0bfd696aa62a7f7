//! SPH physics for lava: density, pressure, temperature-dependent viscosity, gravity, and heat
//! exchange between particles, the ground, and the air.
//!
//! `evaluate` runs the passes in a fixed order; each pass reads values the previous ones wrote, for
//! all particles:
//!
//! density -> pressure + surface/ground classification -> temperature gradient ->
//! temperature Laplacian (reads neighbors' gradients) -> heat rate -> forces
//!
//! Within a pass, particles are independent given the neighbor lists, so each pass is computed in
//! parallel, then written back before the next one starts.

use lin_alg::f64::Vec3;
use rayon::prelude::*;

use crate::{
    config::SimParams, heightmap::HeightMap, kernel::Kernel, particle::LavaParticle,
    units::GRAVITY,
};

/// Read-only context shared by every evaluation in a run.
#[derive(Clone, Copy)]
pub struct Physics<'a> {
    pub params: &'a SimParams,
    pub kernel: &'a Kernel,
    pub heightmap: &'a HeightMap,
}

/// Time derivatives of one particle, from one evaluation. Used by the integrators to combine stages.
#[derive(Clone, Copy, Debug)]
pub struct Evolution {
    pub force: Vec3,
    /// K/s; positive values cool.
    pub temp_rate: f64,
}

/// ν(T) = ν_max exp(-k T / T_initial). Hotter lava flows more easily.
pub fn viscosity(params: &SimParams, temp: f64) -> f64 {
    params.max_viscosity
        * (-params.viscosity_evolution_factor * temp / params.initial_temperature).exp()
}

fn neighbors_of(neighbors: &[Vec<usize>], i: usize) -> &[usize] {
    neighbors.get(i).map(Vec::as_slice).unwrap_or(&[])
}

/// Computes a per-particle value in parallel, from a frozen view of all particles.
fn per_particle<T, F>(particles: &[LavaParticle], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &LavaParticle) -> T + Sync,
{
    particles.par_iter().enumerate().map(|(i, p)| f(i, p)).collect()
}

/// Includes the particle's own contribution, so an isolated particle keeps a positive density.
pub fn density(i: usize, particles: &[LavaParticle], neighbors: &[usize], kernel: &Kernel) -> f64 {
    let p = &particles[i];
    let mut result = p.mass() * kernel.value(0.);

    for &j in neighbors {
        let r = p.dist_sq(&particles[j]).sqrt();
        result += particles[j].mass() * kernel.value(r);
    }

    result
}

/// Equation of state. Negative pressures are kept; they pull under-dense regions together.
pub fn pressure(params: &SimParams, density: f64) -> f64 {
    params.incompressibility_k * (density - params.density_at_rest)
}

/// A particle is at the surface unless a neighbor sits above it, within its radius horizontally.
pub fn is_on_surface(i: usize, particles: &[LavaParticle], neighbors: &[usize]) -> bool {
    let p = &particles[i];
    let r_sq = p.radius() * p.radius();

    !neighbors.iter().any(|&j| {
        let other = &particles[j];
        let dx = other.posit.x - p.posit.x;
        let dy = other.posit.y - p.posit.y;

        other.posit.z > p.posit.z && dx * dx + dy * dy < r_sq
    })
}

pub fn is_on_ground(p: &LavaParticle, heightmap: &HeightMap) -> bool {
    p.posit.z - p.radius() < heightmap.height_at(p.posit.x, p.posit.y)
}

pub fn temp_gradient(
    i: usize,
    particles: &[LavaParticle],
    neighbors: &[usize],
    kernel: &Kernel,
) -> Vec3 {
    let p = &particles[i];
    let mut result = Vec3::new_zero();

    for &j in neighbors {
        let other = &particles[j];
        let grad_w = kernel.gradient(p.posit - other.posit);
        result += grad_w * ((p.temp - other.temp) * other.mass() / other.density);
    }

    result
}

/// Reads the neighbors' temperature gradients; these must be current.
pub fn temp_laplacian(
    i: usize,
    particles: &[LavaParticle],
    neighbors: &[usize],
    kernel: &Kernel,
) -> f64 {
    let p = &particles[i];
    let mut result = 0.;

    for &j in neighbors {
        let other = &particles[j];
        let grad_w = kernel.gradient(p.posit - other.posit);
        result += grad_w.dot(other.temp_grad) * other.mass() / other.density;
    }

    result
}

/// Internal diffusion, plus exchange with the air and the ground where the particle touches them.
pub fn heat_rate(params: &SimParams, p: &LavaParticle) -> f64 {
    let r_sq = p.radius() * p.radius();
    let mut result = params.temp_transfer_coeff_internal * p.temp_laplacian;

    if p.on_surface {
        result += params.temp_transfer_coeff_surface * (p.temp - params.temp_surface) * r_sq
            / p.density;
    }

    if p.on_ground {
        result +=
            params.temp_transfer_coeff_ground * (p.temp - params.temp_ground) * r_sq / p.density;
    }

    result
}

/// Symmetric SPH pressure force.
pub fn pressure_force(
    i: usize,
    particles: &[LavaParticle],
    neighbors: &[usize],
    kernel: &Kernel,
) -> Vec3 {
    let p = &particles[i];
    let p_term = p.pressure / (p.density * p.density);
    let mut result = Vec3::new_zero();

    for &j in neighbors {
        let other = &particles[j];
        let grad_w = kernel.gradient(p.posit - other.posit);
        let other_term = other.pressure / (other.density * other.density);

        result -= grad_w * (p.mass() * other.mass() * (p_term + other_term));
    }

    result
}

pub fn viscosity_force(
    i: usize,
    particles: &[LavaParticle],
    neighbors: &[usize],
    params: &SimParams,
    kernel: &Kernel,
) -> Vec3 {
    let p = &particles[i];
    let mut sum = Vec3::new_zero();

    for &j in neighbors {
        let other = &particles[j];
        let r = p.dist_sq(other).sqrt();
        sum += (other.vel - p.vel) * (kernel.value(r) * other.mass() / other.density);
    }

    sum * (viscosity(params, p.temp) * p.mass() / p.density)
}

pub fn gravity_force(p: &LavaParticle) -> Vec3 {
    Vec3::new(0., 0., -GRAVITY * p.mass())
}

/// Runs the full physics pipeline over the current particle state. Updates every derived field on
/// the particles (density, pressure, flags, temperature terms, forces), and returns each particle's
/// net force and heating rate.
pub fn evaluate(
    particles: &mut [LavaParticle],
    neighbors: &[Vec<usize>],
    phys: &Physics,
) -> Vec<Evolution> {
    let Physics {
        params,
        kernel,
        heightmap,
    } = *phys;

    let densities = per_particle(particles, |i, _| {
        density(i, particles, neighbors_of(neighbors, i), kernel)
    });
    for (p, ρ) in particles.iter_mut().zip(densities) {
        p.density = ρ;
    }

    let classified = per_particle(particles, |i, p| {
        (
            pressure(params, p.density),
            is_on_surface(i, particles, neighbors_of(neighbors, i)),
            is_on_ground(p, heightmap),
        )
    });
    for (p, (pressure, on_surface, on_ground)) in particles.iter_mut().zip(classified) {
        p.pressure = pressure;
        p.on_surface = on_surface;
        p.on_ground = on_ground;
    }

    let grads = per_particle(particles, |i, _| {
        temp_gradient(i, particles, neighbors_of(neighbors, i), kernel)
    });
    for (p, grad) in particles.iter_mut().zip(grads) {
        p.temp_grad = grad;
    }

    // All gradients are in place before any Laplacian reads them.
    let laplacians = per_particle(particles, |i, _| {
        temp_laplacian(i, particles, neighbors_of(neighbors, i), kernel)
    });
    for (p, lap) in particles.iter_mut().zip(laplacians) {
        p.temp_laplacian = lap;
    }

    particles
        .par_iter_mut()
        .for_each(|p| p.temp_rate = heat_rate(params, p));

    let forces = per_particle(particles, |i, p| {
        let nbrs = neighbors_of(neighbors, i);
        (
            pressure_force(i, particles, nbrs, kernel),
            viscosity_force(i, particles, nbrs, params, kernel),
            gravity_force(p),
        )
    });
    for (p, (f_pressure, f_viscosity, f_gravity)) in particles.iter_mut().zip(forces) {
        p.force_pressure = f_pressure;
        p.force_viscosity = f_viscosity;
        p.force_gravity = f_gravity;
    }

    particles
        .iter()
        .map(|p| Evolution {
            force: p.net_force(),
            temp_rate: p.temp_rate,
        })
        .collect()
}
