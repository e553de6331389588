// Consensus-critical. Changes require a protocol review + tests.
//! Era dispatch: the single entry point for required difficulty.

use crate::chain::{CandidateHeader, ChainIndex};
use crate::dgw::next_work_dark_gravity_wave;
use crate::era::{era_of, RetargetEra};
use crate::error::ConsensusError;
use crate::fixed_interval::next_work_fixed_interval;
use crate::lwma::next_work_lwma_multi_algo;
use crate::observer::{NoopObserver, RetargetObserver};
use crate::params::ConsensusParams;

/// Compact bits required for the block after `chain.tip()`.
///
/// `aux_override` marks the candidate as merge-mined. It only matters once
/// the multi-lineage era is active; the earlier eras always retarget the
/// primary lineage.
pub fn get_next_work_required<C, H>(
    chain: &C,
    candidate: &H,
    params: &ConsensusParams,
    aux_override: bool,
) -> Result<u32, ConsensusError>
where
    C: ChainIndex + ?Sized,
    H: CandidateHeader + ?Sized,
{
    get_next_work_required_observed(chain, candidate, params, aux_override, &NoopObserver)
}

/// [`get_next_work_required`] with every decision reported to `observer`.
pub fn get_next_work_required_observed<C, H>(
    chain: &C,
    candidate: &H,
    params: &ConsensusParams,
    aux_override: bool,
    observer: &dyn RetargetObserver,
) -> Result<u32, ConsensusError>
where
    C: ChainIndex + ?Sized,
    H: CandidateHeader + ?Sized,
{
    let next_height = chain.tip().height + 1;
    match era_of(next_height, params) {
        RetargetEra::MultiLineage => {
            next_work_lwma_multi_algo(chain, candidate, params, aux_override, observer)
        }
        RetargetEra::MovingAverage => {
            next_work_dark_gravity_wave(chain, candidate, params, observer)
        }
        RetargetEra::FixedInterval => next_work_fixed_interval(chain, candidate, params, observer),
    }
}

/// Check that a candidate header carries the bits the retargeting rules require.
pub fn validate_header_difficulty<C, H>(
    chain: &C,
    candidate: &H,
    bits: u32,
    params: &ConsensusParams,
    aux_override: bool,
) -> Result<(), ConsensusError>
where
    C: ChainIndex + ?Sized,
    H: CandidateHeader + ?Sized,
{
    let expected = get_next_work_required(chain, candidate, params, aux_override)?;
    if bits != expected {
        return Err(ConsensusError::BadDifficultyBits {
            expected,
            got: bits,
        });
    }
    Ok(())
}
