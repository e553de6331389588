// Consensus-critical. Changes require a protocol review + tests.
//! Algorithm and hash-epoch classification.
//!
//! Two classifications exist for every header:
//!
//! - [`PowAlgo`]: which lineage the block belongs to (native or merge-mined),
//!   from the version's auxpow flag.
//! - [`PowEpoch`]: which primary hash function was in force, from the
//!   header timestamp and the activation times in [`ConsensusParams`].
//!
//! The epoch also fixes the on-wire shape of natively mined headers: plain
//! 32-bit nonce before the transitional epoch, height + 64-bit nonce + mix
//! hash from then on. Merge-mined headers keep one shape in every epoch.

use crate::error::ConsensusError;
use crate::params::ConsensusParams;
use twinpow_core::{BlockHeader, BlockVersion, PowAlgo};

/// Primary-algorithm hash epochs, in activation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowEpoch {
    /// Before the transitional epoch.
    Legacy,
    /// From `transitional_epoch_time` until `current_epoch_time`.
    Transitional,
    /// From `current_epoch_time` on.
    Current,
}

/// Hash epoch in force at `time`.
pub fn pow_epoch(time: u32, params: &ConsensusParams) -> PowEpoch {
    if time >= params.current_epoch_time {
        PowEpoch::Current
    } else if time >= params.transitional_epoch_time {
        PowEpoch::Transitional
    } else {
        PowEpoch::Legacy
    }
}

/// Check that `header`'s variant matches both its auxpow flag and the hash
/// epoch of its timestamp.
pub fn check_header_shape(
    header: &BlockHeader,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    header
        .check_shape()
        .map_err(|_| ConsensusError::InvalidHeader("header shape disagrees with auxpow flag"))?;

    match (header, pow_epoch(header.time(), params)) {
        (BlockHeader::Aux(_), _) => Ok(()),
        (BlockHeader::Legacy(_), PowEpoch::Legacy) => Ok(()),
        (BlockHeader::ProgPow(_), PowEpoch::Transitional | PowEpoch::Current) => Ok(()),
        (BlockHeader::Legacy(_), _) => Err(ConsensusError::InvalidHeader(
            "legacy header shape after the transitional epoch",
        )),
        (BlockHeader::ProgPow(_), PowEpoch::Legacy) => Err(ConsensusError::InvalidHeader(
            "ProgPoW header shape before the transitional epoch",
        )),
    }
}

/// Lineage of a candidate block.
///
/// An asserted `aux_override` always yields [`PowAlgo::Aux`]; otherwise the
/// header's own auxpow flag decides. The override can promote a header to
/// the merge-mined lineage but never demote one that carries the flag.
pub fn algorithm_of(version: BlockVersion, aux_override: bool) -> PowAlgo {
    if aux_override {
        PowAlgo::Aux
    } else {
        version.algo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Network;
    use twinpow_core::{AuxHeader, AuxProof, Hash32, LegacyHeader, ProgPowHeader};

    fn legacy_at(time: u32) -> BlockHeader {
        BlockHeader::Legacy(LegacyHeader {
            version: BlockVersion::new(4),
            prev: Hash32::zero(),
            merkle_root: Hash32::zero(),
            time,
            bits: 0x1e0f_ffff,
            nonce: 0,
        })
    }

    fn progpow_at(time: u32) -> BlockHeader {
        BlockHeader::ProgPow(ProgPowHeader {
            version: BlockVersion::new(0x2000_0000),
            prev: Hash32::zero(),
            merkle_root: Hash32::zero(),
            time,
            bits: 0x1e0f_ffff,
            height: 1,
            nonce64: 0,
            mix_hash: Hash32::zero(),
        })
    }

    #[test]
    fn override_takes_precedence() {
        let native = BlockVersion::new(0x2000_0000);
        let mut merged = native;
        merged.set_auxpow(true);

        assert_eq!(algorithm_of(native, false), PowAlgo::Primary);
        assert_eq!(algorithm_of(native, true), PowAlgo::Aux);
        assert_eq!(algorithm_of(merged, false), PowAlgo::Aux);
        assert_eq!(algorithm_of(merged, true), PowAlgo::Aux);
    }

    #[test]
    fn epochs_switch_at_activation_times() {
        let p = ConsensusParams::for_network(Network::Main);
        let t = p.transitional_epoch_time;
        let c = p.current_epoch_time;
        assert_eq!(pow_epoch(t - 1, &p), PowEpoch::Legacy);
        assert_eq!(pow_epoch(t, &p), PowEpoch::Transitional);
        assert_eq!(pow_epoch(c - 1, &p), PowEpoch::Transitional);
        assert_eq!(pow_epoch(c, &p), PowEpoch::Current);
    }

    #[test]
    fn native_shape_follows_epoch() {
        let p = ConsensusParams::for_network(Network::Main);
        let before = p.transitional_epoch_time - 1;
        let after = p.current_epoch_time;

        assert!(check_header_shape(&legacy_at(before), &p).is_ok());
        assert!(check_header_shape(&progpow_at(p.transitional_epoch_time), &p).is_ok());
        assert!(check_header_shape(&progpow_at(after), &p).is_ok());

        assert!(matches!(
            check_header_shape(&progpow_at(before), &p),
            Err(ConsensusError::InvalidHeader(_))
        ));
        assert!(matches!(
            check_header_shape(&legacy_at(after), &p),
            Err(ConsensusError::InvalidHeader(_))
        ));
    }

    #[test]
    fn merged_shape_in_any_epoch() {
        let p = ConsensusParams::for_network(Network::Main);
        let mut version = BlockVersion::new(4);
        version.set_auxpow(true);
        for time in [0, p.transitional_epoch_time, p.current_epoch_time] {
            let header = BlockHeader::Aux(AuxHeader {
                version,
                prev: Hash32::zero(),
                merkle_root: Hash32::zero(),
                time,
                bits: 0x1f00_ffff,
                nonce: 0,
                aux_proof: AuxProof::default(),
            });
            assert!(check_header_shape(&header, &p).is_ok());
        }
    }
}
