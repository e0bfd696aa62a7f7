//! Error types. The simulation hot path doesn't fail; these cover setup and persistence.

use thiserror::Error;

/// Rejected at construction, before any stepping happens.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("timestep must be positive and finite; got {0}")]
    NonPositiveTimestep(f64),

    #[error("smoothing radius must be positive; particle radius {0} gives a non-positive kernel")]
    NonPositiveSmoothingRadius(f64),

    #[error("rest density must be positive; got {0}")]
    NonPositiveRestDensity(f64),

    #[error("emission schedule is not sorted: interval {index} starts at {start}s, before {prev}s")]
    ScheduleOutOfOrder { index: usize, start: f64, prev: f64 },

    #[error("emission interval {index} has a negative duration ({duration}s)")]
    NegativeIntervalDuration { index: usize, duration: f64 },

    #[error("acquisition rate must be positive; got {0}")]
    NonPositiveAcquisitionRate(f64),

    #[error("neighbor recompute interval must be at least 1")]
    ZeroRecomputeInterval,

    #[error("simulation duration can't be negative; got {0}")]
    NegativeSimulationDuration(f64),

    #[error("height map has {got} samples; {expected} expected from its dimensions")]
    HeightMapSize { expected: usize, got: usize },

    #[error("height map must be at least 1x1 samples, over a positive terrain extent")]
    EmptyHeightMap,
}

/// Decoding a packed playback buffer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("buffer header truncated: {needed} bytes needed, {available} available")]
    TruncatedHeader { needed: usize, available: usize },

    #[error("frame data is {available} bytes, but the frame counts declare {expected}")]
    DataLengthMismatch { expected: usize, available: usize },
}

/// Everything the batch entry point can run into.
#[derive(Debug, Error)]
pub enum LavaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("bincode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid playback buffer: {0}")]
    Buffer(#[from] DecodeError),
}

impl LavaError {
    /// The file being loaded doesn't exist, as opposed to existing but being unreadable or invalid.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
