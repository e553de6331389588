//! Reporting seam for retarget decisions.
//!
//! Retargeters report each decision to a [`RetargetObserver`] right before
//! returning. Observers see a copy of the outcome and cannot change it.

use crate::era::RetargetEra;
use tracing::debug;
use twinpow_core::PowAlgo;

/// Which branch of a retargeter produced the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetargetPath {
    /// Not enough history yet; ceiling returned.
    Bootstrap,
    /// Candidate's hash epoch has not filled the moving-average window; ceiling returned.
    EpochBootstrap,
    /// Lineage found but too sparse; newest same-algorithm block's bits reused.
    SparseLineage,
    /// No same-algorithm block within the search bound; ceiling returned.
    EmptyLineage,
    /// Candidate arrived after a long gap on a permissive network; ceiling returned.
    MinDifficultyGap,
    /// Last block not mined under the min-difficulty rule; its bits reused.
    LastNonMinDifficulty,
    /// Between fixed-interval boundaries; previous bits reused.
    Inherited,
    /// Retargeting disabled; previous bits reused.
    NoRetargeting,
    /// A new target was computed.
    Retargeted,
}

/// One retarget decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetargetEvent {
    /// Era that handled the request.
    pub era: RetargetEra,
    /// Height of the candidate block.
    pub height: u64,
    /// Lineage the candidate was classified into.
    pub algo: PowAlgo,
    /// Lineages active at the candidate height.
    pub lineages: u64,
    /// Same-algorithm ancestors collected (multi-lineage era only).
    pub same_algo: usize,
    /// Branch taken.
    pub path: RetargetPath,
    /// Resulting compact target.
    pub bits: u32,
}

/// Receives retarget decisions.
pub trait RetargetObserver {
    /// Called once per decision.
    fn on_retarget(&self, event: &RetargetEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl RetargetObserver for NoopObserver {
    fn on_retarget(&self, _event: &RetargetEvent) {}
}

/// Forwards events to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RetargetObserver for TracingObserver {
    fn on_retarget(&self, event: &RetargetEvent) {
        debug!(
            era = %event.era,
            height = event.height,
            algo = %event.algo,
            lineages = event.lineages,
            same_algo = event.same_algo,
            path = ?event.path,
            bits = %format!("{:08x}", event.bits),
            "retarget"
        );
    }
}
