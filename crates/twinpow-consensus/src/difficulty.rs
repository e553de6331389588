// Consensus-critical. Changes require a protocol review + tests.
//! Difficulty target utilities.
//!
//! Targets travel on the wire in the Bitcoin-style "compact" encoding:
//! `bits = (exponent << 24) | mantissa` where the mantissa is 3 bytes. The
//! target is interpreted as:
//!
//! - exponent = (bits >> 24) as u8 (number of significant bytes)
//! - mantissa = bits & 0x007fffff (bit 23 is a sign flag)
//!
//! Then: target = mantissa * 256^(exponent - 3)
//!
//! Retargeting math decodes to full-width integers, works on those, and only
//! encodes the final result. Decoding and re-encoding in the middle of a
//! computation silently drops low-order bits.

use crate::error::ConsensusError;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use twinpow_core::Hash32;

/// A 256-bit unsigned proof-of-work target.
pub type Target = BigUint;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Result of decoding compact `bits` without rejecting anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactTarget {
    /// Decoded magnitude, truncated to 256 bits.
    pub target: Target,
    /// Sign flag was set on a non-zero mantissa.
    pub negative: bool,
    /// Exponent/mantissa combination does not fit in 256 bits.
    pub overflow: bool,
}

/// Mask for the low 256 bits.
fn u256_mask() -> BigUint {
    (BigUint::from(1u8) << 256u32) - 1u8
}

/// Decode compact `bits`, reporting sign and overflow instead of failing.
///
/// Mirrors the historical decoder bit for bit, including truncation to 256
/// bits when the exponent pushes the mantissa past the top.
pub fn decode_compact(bits: u32) -> CompactTarget {
    let size = bits >> 24;
    let mut word = bits & MANTISSA_MASK;

    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        BigUint::from(word)
    } else {
        (BigUint::from(word) << (8 * (size - 3))) & u256_mask()
    };

    let negative = word != 0 && (bits & SIGN_BIT) != 0;
    let overflow = word != 0
        && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

    CompactTarget {
        target,
        negative,
        overflow,
    }
}

/// Encode a target into compact `bits`.
///
/// Lossy for targets with more than 24 significant bits, exactly like the
/// wire format. Zero encodes to zero.
pub fn encode_compact(target: &Target) -> u32 {
    let mut size = ((target.bits() + 7) / 8) as u32;
    let mut compact = if size <= 3 {
        let low = target.to_u32().unwrap_or(0);
        low << (8 * (3 - size))
    } else {
        let shifted: BigUint = target >> (8 * (size - 3));
        shifted.to_u32().unwrap_or(0)
    };

    // A set sign bit would read back as negative; move one byte into the exponent.
    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | (size << 24)
}

/// Decode compact `bits` to a target, rejecting unusable encodings.
///
/// Negative or overflowing encodings are `InvalidBits`; zero is `InvalidTarget`.
pub fn bits_to_target(bits: u32) -> Result<Target, ConsensusError> {
    let decoded = decode_compact(bits);
    if decoded.negative || decoded.overflow {
        return Err(ConsensusError::InvalidBits);
    }
    if decoded.target.is_zero() {
        return Err(ConsensusError::InvalidTarget);
    }
    Ok(decoded.target)
}

/// Encode a non-zero target into compact `bits`.
pub fn target_to_bits(target: &Target) -> Result<u32, ConsensusError> {
    if target.is_zero() {
        return Err(ConsensusError::InvalidTarget);
    }
    Ok(encode_compact(target))
}

/// Interpret a 32-byte big-endian hash as a 256-bit integer.
pub fn hash_to_target(hash: &Hash32) -> Target {
    BigUint::from_bytes_be(hash.as_bytes())
}

/// Compare a 32-byte hash value (big-endian) with a target.
/// Returns `true` if `hash <= target`.
pub fn hash_meets_target(hash: &Hash32, target: &Target) -> bool {
    hash_to_target(hash) <= *target
}

/// Largest target with `leading_zero_bits` zero bits on top, i.e.
/// `2^(256 - leading_zero_bits) - 1`.
pub fn target_with_leading_zero_bits(leading_zero_bits: u32) -> Target {
    let width = 256u32.saturating_sub(leading_zero_bits);
    (BigUint::from(1u8) << width) - 1u8
}
