// Consensus-critical. Changes require a protocol review + tests.
//! Chain work per block.

use crate::difficulty::bits_to_target;
use crate::error::ConsensusError;
use num_bigint::BigUint;
use num_traits::One;

/// Expected number of hashes needed to meet `bits`.
///
/// Work is defined as `floor(2^256 / (target + 1))`.
pub fn block_proof(bits: u32) -> Result<BigUint, ConsensusError> {
    let target = bits_to_target(bits)?;
    let two_256 = BigUint::one() << 256u32;
    Ok(&two_256 / (&target + BigUint::one()))
}
