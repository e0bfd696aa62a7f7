use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};

use crate::error::LavaError;

/// Save to file, using Bincode.
pub fn save<T: Encode>(path: &Path, data: &T) -> Result<(), LavaError> {
    let encoded = bincode::encode_to_vec(data, config::standard())?;
    save_bytes(path, &encoded)
}

/// Load from file, using Bincode.
pub fn load<T: Decode<()>>(path: &Path) -> Result<T, LavaError> {
    let buffer = load_bytes(path)?;
    let (decoded, _len) = bincode::decode_from_slice(&buffer, config::standard())?;
    Ok(decoded)
}

pub fn save_bytes(path: &Path, bytes: &[u8]) -> Result<(), LavaError> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

pub fn load_bytes(path: &Path) -> Result<Vec<u8>, LavaError> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Linear interpolation; `t` in [0, 1] moves from `a` to `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1. - t) + b * t
}

/// Min and max of a series, e.g. for plot ranges. Returns (inf, -inf) for an empty series.
pub fn range(vals: impl Iterator<Item = f64>) -> (f64, f64) {
    vals.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}
