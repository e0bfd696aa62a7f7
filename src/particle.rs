//! Lava mass elements. Particles have no identity beyond their index in the simulation's
//! particle vector, which is append-only.

use lin_alg::f64::Vec3;

use crate::units::volume_sphere;

/// Smoothed-particle hydrodynamics point, carrying heat.
#[derive(Clone, Debug)]
pub struct LavaParticle {
    pub posit: Vec3,
    pub vel: Vec3,
    /// Constant per run; set from the radius and rest density at creation.
    mass: f64,
    radius: f64,
    /// Local density
    pub density: f64,
    pub pressure: f64,
    /// K
    pub temp: f64,
    pub temp_grad: Vec3,
    pub temp_laplacian: f64,
    /// K/s. Positive values cool the particle.
    pub temp_rate: f64,
    // Forces are recomputed each evaluation.
    pub force_pressure: Vec3,
    pub force_viscosity: Vec3,
    pub force_gravity: Vec3,
    /// No neighbor caps this particle from above.
    pub on_surface: bool,
    /// The particle's lower extent is below the terrain.
    pub on_ground: bool,
    /// The grid cell this particle was last filed under. `None` until it first lands on the grid.
    pub cell: Option<(i32, i32)>,
}

impl LavaParticle {
    pub fn new(posit: Vec3, radius: f64, density_at_rest: f64, temp: f64) -> Self {
        Self {
            posit,
            vel: Vec3::new_zero(),
            mass: density_at_rest * volume_sphere(radius),
            radius,
            density: density_at_rest,
            pressure: 0.,
            temp,
            temp_grad: Vec3::new_zero(),
            temp_laplacian: 0.,
            temp_rate: 0.,
            force_pressure: Vec3::new_zero(),
            force_viscosity: Vec3::new_zero(),
            force_gravity: Vec3::new_zero(),
            on_surface: true,
            on_ground: false,
            cell: None,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn dist_sq(&self, other: &Self) -> f64 {
        let diff = self.posit - other.posit;
        diff.dot(diff)
    }

    pub fn net_force(&self) -> Vec3 {
        self.force_pressure + self.force_viscosity + self.force_gravity
    }

    /// The (x, y, z, temperature) tuple stored in playback frames.
    pub fn sample(&self) -> [f64; 4] {
        [self.posit.x, self.posit.y, self.posit.z, self.temp]
    }
}
