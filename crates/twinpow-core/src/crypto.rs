//! Proof-of-work hashing interfaces.
//!
//! The per-algorithm hash functions are external: this crate only fixes the
//! seam they plug into. Implementations must be pure one-way functions of the
//! header view with a 256-bit output.

use crate::constants::DS_DEV_POW;
use crate::header::{HeaderView, NonceFields};
use crate::serialization::hash32;
use crate::types::Hash32;
use crate::version::PowAlgo;

/// A proof-of-work hash function for one algorithm.
pub trait PowHasher {
    /// Algorithm this hasher implements.
    fn algo(&self) -> PowAlgo;

    /// Output width in bits. Targets are compared as 256-bit integers, so
    /// narrower outputs are zero-extended on the most significant side.
    fn output_bits(&self) -> u32 {
        256
    }

    /// Compute the proof-of-work hash (big-endian) for a header.
    fn pow_hash(&self, header: &HeaderView) -> Hash32;
}

/// Development hasher: BLAKE3 over a fixed little-endian field layout.
///
/// Stands in for the production hash functions in tests and local tooling.
/// Real consensus must not use it.
#[derive(Clone, Copy, Debug)]
pub struct DevHasher {
    algo: PowAlgo,
}

impl DevHasher {
    /// Create a development hasher labelled with `algo`.
    pub const fn new(algo: PowAlgo) -> Self {
        Self { algo }
    }
}

impl PowHasher for DevHasher {
    fn algo(&self) -> PowAlgo {
        self.algo
    }

    fn pow_hash(&self, header: &HeaderView) -> Hash32 {
        let mut buf = Vec::with_capacity(128);
        buf.push(self.algo.index() as u8);
        buf.extend_from_slice(&header.version.full_version().to_le_bytes());
        buf.extend_from_slice(header.prev.as_bytes());
        buf.extend_from_slice(header.merkle_root.as_bytes());
        buf.extend_from_slice(&header.time.to_le_bytes());
        buf.extend_from_slice(&header.bits.to_le_bytes());
        match header.nonce {
            NonceFields::Nonce32(n) => buf.extend_from_slice(&n.to_le_bytes()),
            NonceFields::ProgPow {
                height,
                nonce64,
                mix_hash,
            } => {
                buf.extend_from_slice(&height.to_le_bytes());
                buf.extend_from_slice(&nonce64.to_le_bytes());
                buf.extend_from_slice(mix_hash.as_bytes());
            }
        }
        hash32(DS_DEV_POW, &buf)
    }
}
