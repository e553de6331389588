// Consensus-critical. Changes require a protocol review + tests.
//! Proof-of-work validation.
//!
//! The PoW condition is:
//!     pow_hash_as_u256 <= target(bits) <= pow_limit[algo]
//!
//! The hash functions themselves are behind [`PowHasher`]; this module only
//! decides whether a given hash satisfies the claimed bits.

use crate::algo::check_header_shape;
use crate::difficulty::{decode_compact, hash_meets_target, Target};
use crate::error::ConsensusError;
use crate::params::ConsensusParams;
use num_traits::Zero;
use twinpow_core::{BlockHeader, Hash32, PowAlgo, PowHasher};

/// Decode `bits` into a target that is usable for `algo`.
///
/// Rejects negative, overflowing and zero encodings, and targets easier
/// than the algorithm's ceiling.
pub fn required_target(
    bits: u32,
    algo: PowAlgo,
    params: &ConsensusParams,
) -> Result<Target, ConsensusError> {
    let decoded = decode_compact(bits);
    if decoded.negative || decoded.overflow {
        return Err(ConsensusError::InvalidBits);
    }
    if decoded.target.is_zero() || decoded.target > *params.pow_limit(algo) {
        return Err(ConsensusError::InvalidTarget);
    }
    Ok(decoded.target)
}

/// True if `hash` satisfies `bits` for `algo`.
pub fn check_proof_of_work(
    hash: &Hash32,
    bits: u32,
    algo: PowAlgo,
    params: &ConsensusParams,
) -> bool {
    match required_target(bits, algo, params) {
        Ok(target) => hash_meets_target(hash, &target),
        Err(_) => false,
    }
}

/// Validate a header's proof of work with the hasher for its algorithm.
///
/// The header must have the shape its epoch and auxpow flag call for, and a
/// merge-mined header must carry `params.aux_chain_id`.
pub fn validate_header_pow<P>(
    header: &BlockHeader,
    hasher: &P,
    params: &ConsensusParams,
) -> Result<(), ConsensusError>
where
    P: PowHasher + ?Sized,
{
    check_header_shape(header, params)?;

    let view = header.view();
    let algo = view.algo();
    if algo == PowAlgo::Aux && view.version.chain_id() != params.aux_chain_id {
        return Err(ConsensusError::InvalidHeader(
            "merge-mined header with a foreign chain id",
        ));
    }
    if hasher.algo() != algo {
        return Err(ConsensusError::InvalidHeader(
            "hasher does not match header algorithm",
        ));
    }

    let target = required_target(view.bits, algo, params)?;
    let hash = hasher.pow_hash(&view);
    if !hash_meets_target(&hash, &target) {
        return Err(ConsensusError::InsufficientPoW);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Network;
    use twinpow_core::{AuxHeader, AuxProof, BlockVersion, DevHasher, LegacyHeader, ProgPowHeader};

    fn main_params() -> ConsensusParams {
        ConsensusParams::for_network(Network::Main)
    }

    /// Regtest with every timestamp in the legacy hash epoch.
    fn legacy_regtest() -> ConsensusParams {
        let mut p = ConsensusParams::for_network(Network::Regtest);
        p.transitional_epoch_time = u32::MAX;
        p.current_epoch_time = u32::MAX;
        p
    }

    fn merged(chain_id: i32, nonce: u32, p: &ConsensusParams) -> BlockHeader {
        let mut version = BlockVersion::new(4);
        version.set_chain_id(chain_id);
        version.set_auxpow(true);
        BlockHeader::Aux(AuxHeader {
            version,
            prev: Hash32::zero(),
            merkle_root: Hash32::zero(),
            time: 0,
            bits: p.pow_limit_bits(PowAlgo::Aux),
            nonce,
            aux_proof: AuxProof(vec![1, 2, 3]),
        })
    }

    fn hash_of(bits: u32) -> Hash32 {
        let mut bytes = [0u8; 32];
        let target = decode_compact(bits).target.to_bytes_be();
        bytes[32 - target.len()..].copy_from_slice(&target);
        Hash32(bytes)
    }

    fn legacy(bits: u32, nonce: u32) -> BlockHeader {
        BlockHeader::Legacy(LegacyHeader {
            version: BlockVersion::new(4),
            prev: Hash32([7u8; 32]),
            merkle_root: Hash32([9u8; 32]),
            time: 1_600_000_000,
            bits,
            nonce,
        })
    }

    #[test]
    fn hash_equal_to_target_passes() {
        let p = main_params();
        let bits = 0x1e0f_ffff;
        let at = hash_of(bits);
        assert!(check_proof_of_work(&at, bits, PowAlgo::Primary, &p));

        let mut above = at;
        above.0[31] = 1;
        assert!(!check_proof_of_work(&above, bits, PowAlgo::Primary, &p));
        assert!(check_proof_of_work(&Hash32::zero(), bits, PowAlgo::Primary, &p));
    }

    #[test]
    fn ceiling_is_per_algorithm() {
        let p = main_params();
        let aux_limit_bits = p.pow_limit_bits(PowAlgo::Aux);
        let zero = Hash32::zero();
        assert!(check_proof_of_work(&zero, aux_limit_bits, PowAlgo::Aux, &p));
        assert!(!check_proof_of_work(&zero, aux_limit_bits, PowAlgo::Primary, &p));
    }

    #[test]
    fn malformed_bits_rejected() {
        let p = main_params();
        let zero = Hash32::zero();
        for bits in [0u32, 0x0100_3456, 0x0492_3456, 0xff12_3456] {
            for algo in PowAlgo::ALL {
                assert!(!check_proof_of_work(&zero, bits, algo, &p), "{bits:08x}");
            }
        }
        assert_eq!(
            required_target(0x0492_3456, PowAlgo::Primary, &p),
            Err(ConsensusError::InvalidBits)
        );
        assert_eq!(
            required_target(0, PowAlgo::Primary, &p),
            Err(ConsensusError::InvalidTarget)
        );
    }

    #[test]
    fn header_validation_with_dev_hasher() {
        let p = legacy_regtest();
        let hasher = DevHasher::new(PowAlgo::Primary);
        let easy = p.pow_limit_bits(PowAlgo::Primary);

        // Half of all hashes meet the regtest ceiling.
        let solved = (0..64u32)
            .map(|nonce| legacy(easy, nonce))
            .find(|h| validate_header_pow(h, &hasher, &p).is_ok());
        assert!(solved.is_some());

        assert_eq!(
            validate_header_pow(&legacy(0x0300_0001, 0), &hasher, &p),
            Err(ConsensusError::InsufficientPoW)
        );
    }

    #[test]
    fn hasher_must_match_lineage() {
        let p = legacy_regtest();
        let header = merged(p.aux_chain_id, 0, &p);
        assert!(matches!(
            validate_header_pow(&header, &DevHasher::new(PowAlgo::Primary), &p),
            Err(ConsensusError::InvalidHeader(_))
        ));

        let mut mislabelled = legacy(p.pow_limit_bits(PowAlgo::Primary), 0);
        if let BlockHeader::Legacy(h) = &mut mislabelled {
            h.version = header.version();
        }
        assert!(matches!(
            validate_header_pow(&mislabelled, &DevHasher::new(PowAlgo::Aux), &p),
            Err(ConsensusError::InvalidHeader(_))
        ));
    }

    #[test]
    fn merged_header_needs_own_chain_id() {
        let p = legacy_regtest();
        let hasher = DevHasher::new(PowAlgo::Aux);

        // Half of all hashes meet the regtest ceiling.
        let solved = (0..64u32)
            .map(|nonce| merged(p.aux_chain_id, nonce, &p))
            .find(|h| validate_header_pow(h, &hasher, &p).is_ok());
        let solved = solved.unwrap();

        let BlockHeader::Aux(mut foreign) = solved else {
            panic!("merged header expected");
        };
        foreign.version.set_chain_id(p.aux_chain_id + 1);
        foreign.version.set_auxpow(true);
        assert_eq!(
            validate_header_pow(&BlockHeader::Aux(foreign), &hasher, &p),
            Err(ConsensusError::InvalidHeader(
                "merge-mined header with a foreign chain id"
            ))
        );
    }

    #[test]
    fn native_header_shape_checked_against_epoch() {
        let p = main_params();
        let hasher = DevHasher::new(PowAlgo::Primary);
        let mut header = legacy(p.pow_limit_bits(PowAlgo::Primary), 0);
        if let BlockHeader::Legacy(h) = &mut header {
            h.time = p.current_epoch_time;
        }
        assert_eq!(
            validate_header_pow(&header, &hasher, &p),
            Err(ConsensusError::InvalidHeader(
                "legacy header shape after the transitional epoch"
            ))
        );

        let early = BlockHeader::ProgPow(ProgPowHeader {
            version: BlockVersion::new(0x2000_0000),
            prev: Hash32::zero(),
            merkle_root: Hash32::zero(),
            time: p.transitional_epoch_time - 1,
            bits: p.pow_limit_bits(PowAlgo::Primary),
            height: 1,
            nonce64: 0,
            mix_hash: Hash32::zero(),
        });
        assert_eq!(
            validate_header_pow(&early, &hasher, &p),
            Err(ConsensusError::InvalidHeader(
                "ProgPoW header shape before the transitional epoch"
            ))
        );
    }
}
