// Consensus-critical. Changes require a protocol review + tests.
//! Moving-average retargeting (DarkGravityWave v3).
//!
//! Every block retargets from the last `dgw_past_blocks` blocks: a running
//! average of their targets, scaled by the clamped time they took.
//!
//! The running average is `avg_n = (avg_{n-1} * n + target_n) / (n + 1)` for
//! the n-th block counted from the tip (n >= 2). That is not an arithmetic
//! mean, and it must not be turned into one: historical targets depend on
//! this exact rounding at every step.
//!
//! While the window also counts blocks per primary hash epoch. A candidate
//! in the transitional or current epoch gets the ceiling until its epoch
//! fills the whole window, so a freshly activated hash function never
//! inherits an average built from the previous function's blocks.

use crate::algo::{pow_epoch, PowEpoch};
use crate::chain::{CandidateHeader, ChainIndex};
use crate::difficulty::{decode_compact, encode_compact, Target};
use crate::era::RetargetEra;
use crate::error::ConsensusError;
use crate::fixed_interval::{last_non_min_difficulty, min_difficulty_gap};
use crate::observer::{RetargetEvent, RetargetObserver, RetargetPath};
use crate::params::ConsensusParams;
use num_traits::Zero;
use twinpow_core::PowAlgo;

/// Required bits for the block after `chain.tip()` under the moving-average rules.
pub fn next_work_dark_gravity_wave<C, H>(
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
    let limit = params.pow_limit(PowAlgo::Primary);
    let limit_bits = encode_compact(limit);
    let past_blocks = params.dgw_past_blocks;

    let report = |path: RetargetPath, bits: u32| {
        observer.on_retarget(&RetargetEvent {
            era: RetargetEra::MovingAverage,
            height: next_height,
            algo: PowAlgo::Primary,
            lineages: 1,
            same_algo: 0,
            path,
            bits,
        });
        bits
    };

    if last.height < past_blocks {
        return Ok(report(RetargetPath::Bootstrap, limit_bits));
    }

    if params.allow_min_difficulty_blocks && params.no_retargeting {
        if min_difficulty_gap(&last, candidate, params) {
            return Ok(report(RetargetPath::MinDifficultyGap, limit_bits));
        }
        let interval = params.difficulty_adjustment_interval() as u64;
        let found = last_non_min_difficulty(chain, last, interval, limit_bits);
        return Ok(report(RetargetPath::LastNonMinDifficulty, found.bits));
    }

    let mut entry = last;
    let mut avg = Target::zero();
    let mut transitional_found = 0u64;
    let mut current_found = 0u64;

    for count in 1..=past_blocks {
        let target = decode_compact(entry.bits).target;
        if count == 1 {
            avg = target;
        } else {
            avg = (avg * count + target) / (count + 1);
        }

        match pow_epoch(entry.time, params) {
            PowEpoch::Transitional => transitional_found += 1,
            PowEpoch::Current => current_found += 1,
            PowEpoch::Legacy => {}
        }

        if count != past_blocks {
            entry = chain
                .parent(&entry)
                .ok_or(ConsensusError::MissingAncestor {
                    height: entry.height.saturating_sub(1),
                })?;
        }
    }

    let epoch_filled = match pow_epoch(candidate.time(), params) {
        PowEpoch::Transitional => transitional_found == past_blocks,
        PowEpoch::Current => current_found == past_blocks,
        PowEpoch::Legacy => true,
    };
    if !epoch_filled {
        return Ok(report(RetargetPath::EpochBootstrap, limit_bits));
    }

    // Spans past_blocks - 1 solve times against a past_blocks timespan; kept as is.
    let target_timespan = past_blocks as i64 * params.pow_target_spacing;
    let actual = (last.block_time() - entry.block_time())
        .clamp(target_timespan / 3, target_timespan * 3);

    let mut next = avg;
    next *= actual as u64;
    next /= target_timespan as u64;

    if next > *limit {
        next = limit.clone();
    }
    Ok(report(RetargetPath::Retargeted, encode_compact(&next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{HeaderChain, IndexEntry};
    use crate::difficulty::bits_to_target;
    use crate::observer::NoopObserver;
    use crate::params::Network;
    use num_bigint::BigUint;
    use twinpow_core::BlockVersion;

    const BITS: u32 = 0x1c0f_ffff;

    fn v() -> BlockVersion {
        BlockVersion::new(0x2000_0000)
    }

    /// Mainnet-shaped params with every block in the current epoch.
    fn params() -> ConsensusParams {
        let mut p = ConsensusParams::for_network(Network::Main);
        p.transitional_epoch_time = 1_000;
        p.current_epoch_time = 2_000;
        p
    }

    fn chain_from(start: u32, blocks: u64, spacing: u32, bits: u32) -> HeaderChain {
        let mut chain = HeaderChain::new(IndexEntry {
            height: 0,
            time: start,
            bits,
            version: v(),
        });
        chain.extend_spaced(blocks - 1, spacing, bits, v());
        chain
    }

    fn candidate_after(chain: &HeaderChain) -> IndexEntry {
        IndexEntry {
            height: 0,
            time: chain.tip().time + 60,
            bits: 0,
            version: v(),
        }
    }

    #[test]
    fn short_chain_gets_ceiling() {
        let p = params();
        let limit_bits = p.pow_limit_bits(PowAlgo::Primary);
        for blocks in [1u64, 2, 100, 180] {
            let chain = chain_from(10_000, blocks, 60, BITS);
            let bits =
                next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                    .unwrap();
            assert_eq!(bits, limit_bits, "{blocks} blocks");
        }
    }

    #[test]
    fn running_average_is_not_a_mean() {
        // Two alternating targets: a true mean would sit halfway between them.
        let p = params();
        let low = bits_to_target(0x1c0f_ffff).unwrap();
        let high = bits_to_target(0x1c1f_fffe).unwrap();

        let mut chain = chain_from(10_000, 1, 60, 0x1c0f_ffff);
        for i in 1..=200u64 {
            let bits = if i % 2 == 0 { 0x1c0f_ffff } else { 0x1c1f_fffe };
            let t = chain.tip().time + 60;
            chain.push(t, bits, v());
        }

        // Recompute the expected running average from the tip backwards.
        let mut avg = BigUint::zero();
        let mut h = chain.tip().height;
        for count in 1..=180u64 {
            let target = decode_compact(chain.ancestor(h).unwrap().bits).target;
            avg = if count == 1 {
                target
            } else {
                (avg * count + target) / (count + 1)
            };
            h -= 1;
        }
        // 179 spacings of 60s against a 180 * 60 timespan.
        let expected = avg.clone() * (179u64 * 60) / (180u64 * 60);

        let bits =
            next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                .unwrap();
        assert_eq!(bits, encode_compact(&expected));

        let mean = (&low + &high) / 2u32;
        assert_ne!(encode_compact(&avg), encode_compact(&mean));
    }

    #[test]
    fn steady_chain_retargets_near_input() {
        let p = params();
        let chain = chain_from(10_000, 400, 60, BITS);
        let bits =
            next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                .unwrap();
        let got = bits_to_target(bits).unwrap();
        let prev = bits_to_target(BITS).unwrap();
        assert!(got < prev);
        assert!(&got * 100u32 > &prev * 99u32);
    }

    #[test]
    fn timespan_clamped_to_a_third() {
        let p = params();
        let chain = chain_from(10_000, 400, 1, BITS);
        let bits =
            next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                .unwrap();
        let expected = bits_to_target(BITS).unwrap() / 3u32;
        assert_eq!(bits, encode_compact(&expected));
    }

    #[test]
    fn slow_chain_capped_at_ceiling() {
        let p = params();
        let limit_bits = p.pow_limit_bits(PowAlgo::Primary);
        let chain = chain_from(10_000, 400, 6_000, 0x1e0f_0000);
        let bits =
            next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                .unwrap();
        assert_eq!(bits, limit_bits);
    }

    #[test]
    fn new_epoch_gets_ceiling_until_window_filled() {
        let mut p = params();
        // The whole chain is in the transitional epoch.
        p.transitional_epoch_time = 1_000;
        p.current_epoch_time = 100_000;
        let limit_bits = p.pow_limit_bits(PowAlgo::Primary);
        let chain = chain_from(10_000, 400, 60, BITS);

        let in_current = IndexEntry {
            height: 0,
            time: 100_000,
            bits: 0,
            version: v(),
        };
        let bits = next_work_dark_gravity_wave(&chain, &in_current, &p, &NoopObserver).unwrap();
        assert_eq!(bits, limit_bits);

        let same_epoch = candidate_after(&chain);
        let bits = next_work_dark_gravity_wave(&chain, &same_epoch, &p, &NoopObserver).unwrap();
        assert_ne!(bits, limit_bits);
    }

    #[test]
    fn regtest_rules_use_min_difficulty_escape() {
        let mut p = params();
        p.allow_min_difficulty_blocks = true;
        p.no_retargeting = true;
        let chain = chain_from(10_000, 400, 60, BITS);

        let late = IndexEntry {
            height: 0,
            time: chain.tip().time + 121,
            bits: 0,
            version: v(),
        };
        let bits = next_work_dark_gravity_wave(&chain, &late, &p, &NoopObserver).unwrap();
        assert_eq!(bits, p.pow_limit_bits(PowAlgo::Primary));

        let bits =
            next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
                .unwrap();
        assert_eq!(bits, BITS);
    }

    #[test]
    fn truncated_index_is_missing_ancestor() {
        let p = params();
        let mut entries = Vec::new();
        for h in 300..400u64 {
            entries.push(IndexEntry {
                height: h,
                time: 10_000 + h as u32 * 60,
                bits: BITS,
                version: v(),
            });
        }
        let chain = HeaderChain::from_entries(entries).unwrap();
        let err = next_work_dark_gravity_wave(&chain, &candidate_after(&chain), &p, &NoopObserver)
            .unwrap_err();
        assert_eq!(err, ConsensusError::MissingAncestor { height: 299 });
    }
}
