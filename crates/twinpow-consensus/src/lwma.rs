// Consensus-critical. Changes require a protocol review + tests.
//! Multi-lineage LWMA retargeting.
//!
//! Once merge mining is active each algorithm retargets independently from
//! its own last `N + 1` blocks (its lineage), interleaved arbitrarily with
//! blocks of the other algorithm. Solve times are weighted linearly so the
//! newest ones count most:
//!
//! ```text
//! next = avg(target_1..target_N) * sum(i * solvetime_i) / k
//! k    = N * (N + 1) * T / 2,   T = spacing * lineages
//! ```
//!
//! Solve times are forced monotonic and clamped to `[1, 6T]`. The lineage
//! search never looks further back than `N * lwma_search_multiplier` blocks;
//! a lineage that is too sparse reuses its newest block's bits. Every height
//! in that range must be indexed.

use crate::algo::algorithm_of;
use crate::chain::{CandidateHeader, ChainIndex, IndexEntry};
use crate::difficulty::{decode_compact, encode_compact, Target};
use crate::era::{active_lineages, RetargetEra};
use crate::error::ConsensusError;
use crate::observer::{RetargetEvent, RetargetObserver, RetargetPath};
use crate::params::ConsensusParams;
use num_traits::Zero;

/// Required bits for the block after `chain.tip()` under the multi-lineage rules.
///
/// `aux_override` forces the candidate into the merge-mined lineage; see
/// [`algorithm_of`].
pub fn next_work_lwma_multi_algo<C, H>(
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
    let last = chain.tip();
    let height = last.height;
    let next_height = height + 1;

    let lineages = active_lineages(next_height, params);
    let per_lineage_spacing = params.pow_target_spacing * lineages as i64;
    let window = params.lwma_averaging_window;
    let k = window * (window + 1) * per_lineage_spacing as u64 / 2;

    let algo = algorithm_of(candidate.version(), aux_override);
    let limit = params.pow_limit(algo);
    let limit_bits = encode_compact(limit);

    let report = |path: RetargetPath, same_algo: usize, bits: u32| {
        observer.on_retarget(&RetargetEvent {
            era: RetargetEra::MultiLineage,
            height: next_height,
            algo,
            lineages,
            same_algo,
            path,
            bits,
        });
        bits
    };

    if height < window {
        return Ok(report(RetargetPath::Bootstrap, 0, limit_bits));
    }

    // Newest first.
    let wanted = (window + 1) as usize;
    let search_limit = height.min(window * params.lwma_search_multiplier);
    let mut lineage: Vec<IndexEntry> = Vec::with_capacity(wanted);
    for h in (height - search_limit..=height).rev() {
        if lineage.len() >= wanted {
            break;
        }
        let entry = chain.require_ancestor(h)?;
        if entry.algo() == algo {
            lineage.push(entry);
        }
    }

    if lineage.len() < wanted {
        return Ok(match lineage.first() {
            Some(newest) => report(RetargetPath::SparseLineage, lineage.len(), newest.bits),
            None => report(RetargetPath::EmptyLineage, 0, limit_bits),
        });
    }

    lineage.reverse();

    let max_solvetime = 6 * per_lineage_spacing;
    let mut sum_targets = Target::zero();
    let mut sum_weighted_solvetimes: i64 = 0;
    let mut prev_time = lineage[0].block_time();

    for (i, entry) in lineage.iter().enumerate().skip(1) {
        let mut time = entry.block_time();
        if time <= prev_time {
            time = prev_time + 1;
        }
        let solvetime = (time - prev_time).clamp(1, max_solvetime);
        prev_time = time;

        sum_weighted_solvetimes += i as i64 * solvetime;
        sum_targets += decode_compact(entry.bits).target;
    }

    let mut next = sum_targets / window;
    next *= sum_weighted_solvetimes.max(1) as u64;
    next /= k;

    if next > *limit {
        next = limit.clone();
    }
    Ok(report(
        RetargetPath::Retargeted,
        lineage.len(),
        encode_compact(&next),
    ))
}
