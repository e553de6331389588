// Consensus-critical. Changes require a protocol review + tests.
//! Fixed-interval retargeting (Bitcoin style).
//!
//! The target changes only on heights divisible by
//! `difficulty_adjustment_interval()`. On a boundary the previous target is
//! scaled by the elapsed time of the last interval, clamped to a factor of 4
//! either way. Between boundaries the previous bits carry over, except on
//! networks that allow min-difficulty blocks after a long gap.

use crate::chain::{CandidateHeader, ChainIndex, IndexEntry};
use crate::difficulty::{decode_compact, encode_compact};
use crate::era::RetargetEra;
use crate::error::ConsensusError;
use crate::observer::{RetargetEvent, RetargetObserver, RetargetPath};
use crate::params::ConsensusParams;
use twinpow_core::PowAlgo;

/// Required bits for the block after `chain.tip()` under the fixed-interval rules.
pub fn next_work_fixed_interval<C, H>(
    chain: &C,
    candidate: &H,
    params: &ConsensusParams,
    observer: &dyn RetargetObserver,
) -> Result<u32, ConsensusError>
where
    C: ChainIndex + ?Sized,
    H: CandidateHeader + ?Sized,
{
    let last = chain.tip();
    let next_height = last.height + 1;
    let interval = params.difficulty_adjustment_interval() as u64;
    let limit_bits = params.pow_limit_bits(PowAlgo::Primary);

    let report = |path: RetargetPath, bits: u32| {
        observer.on_retarget(&RetargetEvent {
            era: RetargetEra::FixedInterval,
            height: next_height,
            algo: PowAlgo::Primary,
            lineages: 1,
            same_algo: 0,
            path,
            bits,
        });
        bits
    };

    if next_height % interval != 0 {
        if params.allow_min_difficulty_blocks {
            if min_difficulty_gap(&last, candidate, params) {
                return Ok(report(RetargetPath::MinDifficultyGap, limit_bits));
            }
            let found = last_non_min_difficulty(chain, last, interval, limit_bits);
            return Ok(report(RetargetPath::LastNonMinDifficulty, found.bits));
        }
        return Ok(report(RetargetPath::Inherited, last.bits));
    }

    // First block of the period; next_height is a non-zero multiple of interval.
    let first = chain.require_ancestor(next_height - interval)?;

    let bits = calculate_next_work_required(&last, first.block_time(), params);
    let path = if params.no_retargeting {
        RetargetPath::NoRetargeting
    } else {
        RetargetPath::Retargeted
    };
    Ok(report(path, bits))
}

/// Scale `last`'s target by the clamped time since `first_block_time`.
pub fn calculate_next_work_required(
    last: &IndexEntry,
    first_block_time: i64,
    params: &ConsensusParams,
) -> u32 {
    if params.no_retargeting {
        return last.bits;
    }

    let timespan = params.pow_target_timespan;
    let actual = (last.block_time() - first_block_time).clamp(timespan / 4, timespan * 4);

    let limit = params.pow_limit(PowAlgo::Primary);
    let mut next = decode_compact(last.bits).target;
    next *= actual as u64;
    next /= timespan as u64;

    if next > *limit {
        next = limit.clone();
    }
    encode_compact(&next)
}

/// True if the candidate arrives more than two spacings after `last`.
pub(crate) fn min_difficulty_gap<H>(
    last: &IndexEntry,
    candidate: &H,
    params: &ConsensusParams,
) -> bool
where
    H: CandidateHeader + ?Sized,
{
    i64::from(candidate.time()) > last.block_time() + params.pow_target_spacing * 2
}

/// Walk back to the last block not mined under the min-difficulty rule.
///
/// Stops on an interval boundary or at the first indexed block, so the walk
/// is bounded by `interval`.
pub(crate) fn last_non_min_difficulty<C>(
    chain: &C,
    from: IndexEntry,
    interval: u64,
    limit_bits: u32,
) -> IndexEntry
where
    C: ChainIndex + ?Sized,
{
    let mut entry = from;
    while entry.height % interval != 0 && entry.bits == limit_bits {
        match chain.parent(&entry) {
            Some(parent) => entry = parent,
            None => break,
        }
    }
    entry
}
