//! Code related to the playback of baked snapshots: time lookup with interpolation, and the packed
//! binary form used to persist a bake.
//!
//! Packed layout, all little-endian:
//!
//! `[u32 frame count][u32 particle count, per frame][f64 x, y, z, temperature, per particle, frame by frame]`

use crate::{error::DecodeError, util::lerp};

/// (x, y, z, temperature)
pub type ParticleSample = [f64; 4];

const FIELDS: usize = 4;
const U32_SIZE: usize = std::mem::size_of::<u32>();
const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Times within this many frames of a frame's time resolve to that frame.
const FRAME_SNAP: f64 = 1e-9;

/// One captured instant. Particle `i` is the same lava element in every snapshot it appears in;
/// snapshots only ever grow at the end, as particles are emitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapShot {
    pub particles: Vec<ParticleSample>,
}

impl SnapShot {
    pub fn new(particles: Vec<ParticleSample>) -> Self {
        Self { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Snapshots captured at a fixed interval; snapshot `i` is the state at `i * acquisition_interval`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackBuffer {
    pub snapshots: Vec<SnapShot>,
    /// s
    pub acquisition_interval: f64,
}

impl PlaybackBuffer {
    pub fn new(acquisition_interval: f64) -> Self {
        Self {
            snapshots: Vec::new(),
            acquisition_interval,
        }
    }

    pub fn push(&mut self, snapshot: SnapShot) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Time of the last snapshot.
    pub fn duration(&self) -> f64 {
        self.len().saturating_sub(1) as f64 * self.acquisition_interval
    }

    /// Particle states at `time`, interpolated linearly between the two snapshots around it. Times
    /// outside the buffer clamp to its ends. Empty if nothing has been baked.
    ///
    /// If a particle was emitted between the two snapshots, it's left out: only particles present
    /// in both are returned.
    pub fn particles_at(&self, time: f64) -> Vec<ParticleSample> {
        if self.snapshots.is_empty() {
            return Vec::new();
        }

        let last = self.snapshots.len() - 1;
        let mut pos = time / self.acquisition_interval;
        // Frame times don't divide exactly, e.g. 0.3 / 0.1 = 2.9999999999999996.
        if (pos - pos.round()).abs() < FRAME_SNAP {
            pos = pos.round();
        }

        let index = if pos.is_nan() || pos < 0. {
            0
        } else {
            (pos.floor() as usize).min(last)
        };

        if index == last {
            return self.snapshots[last].particles.clone();
        }

        let t = (pos - index as f64).clamp(0., 1.);
        let before = &self.snapshots[index].particles;
        if t == 0. {
            return before.clone();
        }
        let after = &self.snapshots[index + 1].particles;

        before
            .iter()
            .zip(after)
            .map(|(a, b)| {
                [
                    lerp(a[0], b[0], t),
                    lerp(a[1], b[1], t),
                    lerp(a[2], b[2], t),
                    lerp(a[3], b[3], t),
                ]
            })
            .collect()
    }

    /// Pack the snapshots into the binary layout described in the module docs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let num_particles: usize = self.snapshots.iter().map(SnapShot::len).sum();
        let mut result = Vec::with_capacity(
            U32_SIZE * (1 + self.snapshots.len()) + num_particles * FIELDS * F64_SIZE,
        );

        result.extend_from_slice(&(self.snapshots.len() as u32).to_le_bytes());
        for snapshot in &self.snapshots {
            result.extend_from_slice(&(snapshot.len() as u32).to_le_bytes());
        }

        for snapshot in &self.snapshots {
            for sample in &snapshot.particles {
                for v in sample {
                    result.extend_from_slice(&v.to_le_bytes());
                }
            }
        }

        result
    }

    /// Unpack snapshots written by `to_bytes`. The interval isn't part of the packed form; it
    /// comes from the parameters the buffer was baked with.
    pub fn from_bytes(bytes: &[u8], acquisition_interval: f64) -> Result<Self, DecodeError> {
        let num_snapshots = read_u32(bytes, 0)? as usize;

        let header_len = U32_SIZE * (1 + num_snapshots);
        if bytes.len() < header_len {
            return Err(DecodeError::TruncatedHeader {
                needed: header_len,
                available: bytes.len(),
            });
        }

        let counts: Vec<usize> = (0..num_snapshots)
            .map(|i| read_u32(bytes, U32_SIZE * (1 + i)).map(|c| c as usize))
            .collect::<Result<_, _>>()?;

        let data = &bytes[header_len..];
        let expected = counts.iter().sum::<usize>() * FIELDS * F64_SIZE;
        if data.len() != expected {
            return Err(DecodeError::DataLengthMismatch {
                expected,
                available: data.len(),
            });
        }

        let mut values = data.chunks_exact(F64_SIZE).map(|chunk| {
            let mut buf = [0; F64_SIZE];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        });

        let mut snapshots = Vec::with_capacity(num_snapshots);
        for count in counts {
            let mut particles = Vec::with_capacity(count);
            for _ in 0..count {
                let mut sample = [0.; FIELDS];
                for field in &mut sample {
                    // Lengths were checked above.
                    *field = values.next().unwrap_or_default();
                }
                particles.push(sample);
            }
            snapshots.push(SnapShot { particles });
        }

        Ok(Self {
            snapshots,
            acquisition_interval,
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let end = offset + U32_SIZE;
    let slice = bytes.get(offset..end).ok_or(DecodeError::TruncatedHeader {
        needed: end,
        available: bytes.len(),
    })?;

    let mut buf = [0; U32_SIZE];
    buf.copy_from_slice(slice);
    Ok(u32::from_le_bytes(buf))
}
