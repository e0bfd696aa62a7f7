//! Physical constants and the base units used throughout this program.
//!
//! Dist: m
//! Time: s
//! Mass: kg
//! Temperature: K
//!
//! Derived:
//! Velocity: m / s
//! Force: kg × m / s^2
//! Density: kg / m^3

use std::f64::consts::PI;

/// Standard gravity, m/s^2. Acts along -z.
pub const GRAVITY: f64 = 9.81;

/// 0°C, in K.
pub const ZERO_CELSIUS: f64 = 273.15;

pub fn celsius_to_kelvin(temp_c: f64) -> f64 {
    temp_c + ZERO_CELSIUS
}

pub fn volume_sphere(r: f64) -> f64 {
    4. / 3. * PI * r.powi(3)
}
