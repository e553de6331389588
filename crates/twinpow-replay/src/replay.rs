//! Recompute required bits for every block of a dump.

use anyhow::{Context, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{debug, warn};
use twinpow_consensus::{
    block_proof, era_of, get_next_work_required_observed, ChainIndex, ConsensusError,
    ConsensusParams, RetargetEra, RetargetObserver,
};
use twinpow_core::PowAlgo;

use crate::dump::Dump;

/// A block whose bits differ from the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub height: u64,
    pub era: RetargetEra,
    pub expected: u32,
    pub got: u32,
}

/// Outcome of a replay.
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Blocks whose bits were recomputed.
    pub checked: u64,
    /// Blocks skipped because the dump lacks the history they need.
    pub skipped: u64,
    pub mismatches: Vec<Mismatch>,
    /// Cumulative work per lineage, indexed by [`PowAlgo::index`].
    pub work: [BigUint; 2],
}

impl ReplayReport {
    pub fn total_work(&self) -> BigUint {
        self.work.iter().fold(BigUint::zero(), |acc, w| acc + w)
    }
}

/// Check every block after the first against the retargeting rules.
pub fn replay(
    dump: &Dump,
    params: &ConsensusParams,
    observer: &dyn RetargetObserver,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    let chain = &dump.chain;

    for (i, entry) in chain.entries().iter().enumerate() {
        let proof = block_proof(entry.bits)
            .with_context(|| format!("height {}: unusable bits {:08x}", entry.height, entry.bits))?;
        report.work[entry.algo().index()] += proof;

        if i == 0 {
            continue;
        }
        let Some(parent) = chain.view_at(entry.height - 1) else {
            continue;
        };
        let aux_override = dump.aux_flag(entry.height).unwrap_or(false);
        let expected = match get_next_work_required_observed(
            &parent,
            entry,
            params,
            aux_override,
            observer,
        ) {
            Ok(bits) => bits,
            Err(ConsensusError::MissingAncestor { height }) => {
                debug!(height = entry.height, missing = height, "not enough history, skipping");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("height {}", entry.height)),
        };

        report.checked += 1;
        if expected != entry.bits {
            let era = era_of(entry.height, params);
            warn!(
                height = entry.height,
                %era,
                expected = %format!("{expected:08x}"),
                got = %format!("{:08x}", entry.bits),
                "difficulty mismatch"
            );
            report.mismatches.push(Mismatch {
                height: entry.height,
                era,
                expected,
                got: entry.bits,
            });
        }
    }

    debug!(
        tip = chain.tip().height,
        primary_work = %report.work[PowAlgo::Primary.index()],
        aux_work = %report.work[PowAlgo::Aux.index()],
        "replay finished"
    );
    Ok(report)
}
