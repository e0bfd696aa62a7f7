#![allow(non_ascii_idents, confusable_idents, mixed_script_confusables)]

//! Smoothed-particle hydrodynamics for lava flowing out of a volcano crater, over a height-mapped
//! terrain. A run is baked up front into a buffer of snapshots, which a renderer then plays back
//! at any time resolution.

pub mod bake;
pub mod config;
pub mod emission;
pub mod error;
pub mod fluid_dynamics;
pub mod grid;
pub mod heightmap;
pub mod integrate;
pub mod kernel;
pub mod particle;
pub mod playback;
pub mod properties;
pub mod sim;
pub mod units;
pub mod util;

pub use bake::{BakeOutcome, SimulationManager};
pub use config::{Config, EmissionInterval, Integrator, SimParams, VolcanoGeometry};
pub use error::{ConfigError, DecodeError, LavaError};
pub use heightmap::HeightMap;
pub use playback::{ParticleSample, PlaybackBuffer, SnapShot};
pub use sim::Simulation;
