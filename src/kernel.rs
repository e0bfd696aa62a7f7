//! The SPH smoothing kernel: a compact cubic with support `2h`.
//!
//! W(r) = α (2 - r/h)^3 for 0 <= r <= 2h, with α = 15 / (64π h^3) so that W integrates to 1
//! over its support.

use std::f64::consts::PI;

use lin_alg::f64::Vec3;

use crate::error::ConfigError;

/// Ties the kernel resolution to the particle size: h = r (5/2)^(1/3). With this choice, an isolated
/// particle's self-density equals the rest density it was created with.
pub fn smoothing_radius(particle_radius: f64) -> f64 {
    particle_radius * 2.5_f64.cbrt()
}

#[derive(Clone, Copy, Debug)]
pub struct Kernel {
    /// Smoothing radius.
    pub h: f64,
    /// Normalisation factor.
    pub α: f64,
}

impl Kernel {
    pub fn new(h: f64) -> Result<Self, ConfigError> {
        if !(h > 0.) || !h.is_finite() {
            return Err(ConfigError::NonPositiveSmoothingRadius(h));
        }

        Ok(Self {
            h,
            α: 15. / (64. * PI * h.powi(3)),
        })
    }

    pub fn from_particle_radius(particle_radius: f64) -> Result<Self, ConfigError> {
        Self::new(smoothing_radius(particle_radius))
            .map_err(|_| ConfigError::NonPositiveSmoothingRadius(particle_radius))
    }

    /// Neighbor search radius, and the edge of the kernel's support: 2h.
    pub fn support(&self) -> f64 {
        2. * self.h
    }

    /// Kernel value at distance `r`.
    pub fn value(&self, r: f64) -> f64 {
        if !(0. ..=self.support()).contains(&r) {
            return 0.;
        }
        self.α * (2. - r / self.h).powi(3)
    }

    /// Gradient with respect to the first particle's position, where `diff` is
    /// `posit_first - posit_second`. Zero at coincident points, and outside the support.
    pub fn gradient(&self, diff: Vec3) -> Vec3 {
        let r = diff.dot(diff).sqrt();
        if r <= f64::EPSILON || r > self.support() {
            return Vec3::new_zero();
        }

        let q = 2. - r / self.h;
        diff * (-self.α * 3. * q * q * (2. / self.h) / r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_radius() {
        assert!(Kernel::new(0.).is_err());
        assert!(Kernel::new(-1.).is_err());
        assert!(Kernel::from_particle_radius(0.).is_err());
        assert!(Kernel::new(f64::NAN).is_err());
    }

    #[test]
    fn test_support() {
        let kernel = Kernel::from_particle_radius(0.15).unwrap();
        let s = kernel.support();
        assert!(kernel.value(s) == 0.);
        assert!(kernel.value(s * 1.001) == 0.);
        assert!(kernel.value(s * 10.) == 0.);
        assert!(kernel.value(-0.1) == 0.);
        assert!(kernel.gradient(Vec3::new(s * 1.01, 0., 0.)).magnitude() == 0.);
    }

    #[test]
    fn test_non_negative_and_continuous() {
        let kernel = Kernel::new(0.5).unwrap();
        let n = 1_000;
        let dr = kernel.support() / n as f64;

        let mut prev = kernel.value(0.);
        for i in 1..n {
            let w = kernel.value(i as f64 * dr);
            assert!(w >= 0.);
            // Monotone decreasing, with no jumps.
            assert!(w <= prev);
            assert!(prev - w < 0.01 * kernel.value(0.));
            prev = w;
        }
    }

    #[test]
    fn test_normalization() {
        // Radial quadrature of W(r) 4π r^2 over [0, 2h].
        for h in [0.2, 1.0, 3.7] {
            let kernel = Kernel::new(h).unwrap();
            let n = 20_000;
            let dr = kernel.support() / n as f64;

            let mut integral = 0.;
            for i in 0..n {
                // Midpoint rule
                let r = (i as f64 + 0.5) * dr;
                integral += kernel.value(r) * 4. * PI * r * r * dr;
            }

            assert!((integral - 1.).abs() < 1e-4, "h: {h} integral: {integral}");
        }
    }

    #[test]
    fn test_self_density_matches_rest() {
        let radius = 0.15;
        let rest_density = 2_500.;
        let kernel = Kernel::from_particle_radius(radius).unwrap();
        let mass = rest_density * crate::units::volume_sphere(radius);

        let ρ = mass * kernel.value(0.);
        assert!((ρ - rest_density).abs() < 1e-6 * rest_density);
    }

    #[test]
    fn test_gradient() {
        let kernel = Kernel::new(1.).unwrap();

        assert_eq!(kernel.gradient(Vec3::new_zero()).magnitude(), 0.);

        // Points from the first particle toward the second, i.e. against `diff`.
        let g = kernel.gradient(Vec3::new(0.5, 0., 0.));
        assert!(g.x < 0.);
        assert!(g.y.abs() < 1e-15 && g.z.abs() < 1e-15);

        let expected = kernel.α * 3. * 1.5_f64.powi(2) * 2.;
        assert!((g.x + expected).abs() < 1e-12);

        // Antisymmetric.
        let g_rev = kernel.gradient(Vec3::new(-0.5, 0., 0.));
        assert!((g.x + g_rev.x).abs() < 1e-15);
    }
}
