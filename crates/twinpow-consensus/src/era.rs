// Consensus-critical. Changes require a protocol review + tests.
//! Retargeting era selection by height.

use crate::params::ConsensusParams;
use std::fmt;

/// Retargeting algorithm in force for a height range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetargetEra {
    /// Bitcoin-style retarget every `difficulty_adjustment_interval` blocks.
    FixedInterval,
    /// DarkGravityWave moving average over `dgw_past_blocks`.
    MovingAverage,
    /// LWMA over same-algorithm ancestors, one lineage per algorithm.
    MultiLineage,
}

impl fmt::Display for RetargetEra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetargetEra::FixedInterval => "fixed-interval",
            RetargetEra::MovingAverage => "moving-average",
            RetargetEra::MultiLineage => "multi-lineage",
        })
    }
}

/// Era governing a block at `height`.
///
/// Aux activation wins over everything; below it the moving-average
/// activation height splits the remaining range.
pub fn era_of(height: u64, params: &ConsensusParams) -> RetargetEra {
    if params.is_aux_active(height) {
        RetargetEra::MultiLineage
    } else if params.is_dgw_active(height) {
        RetargetEra::MovingAverage
    } else {
        RetargetEra::FixedInterval
    }
}

/// Number of lineages producing blocks at `height` (1 before aux activation, 2 after).
pub fn active_lineages(height: u64, params: &ConsensusParams) -> u64 {
    if params.is_aux_active(height) {
        2
    } else {
        1
    }
}
