//! Consensus error types.

use thiserror::Error;

/// Errors returned by difficulty conversion, retargeting and PoW validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    /// Invalid compact target encoding in `bits` (negative or overflowing).
    #[error("invalid compact target bits")]
    InvalidBits,

    /// Target decoded to zero or otherwise unusable.
    #[error("invalid difficulty target")]
    InvalidTarget,

    /// Proof-of-work hash did not meet the required target.
    #[error("insufficient proof of work")]
    InsufficientPoW,

    /// Header `bits` differ from what the retargeting rules require.
    #[error("bad difficulty bits: expected {expected:08x}, got {got:08x}")]
    BadDifficultyBits {
        /// Bits required by the retargeting rules.
        expected: u32,
        /// Bits carried by the header.
        got: u32,
    },

    /// Header fields violated basic consensus constraints.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// An ancestor that must exist was not returned by the chain index.
    ///
    /// This means the index is corrupt or truncated; callers must treat it as
    /// fatal rather than retry with another answer.
    #[error("chain index has no ancestor at height {height}")]
    MissingAncestor {
        /// Height that was requested.
        height: u64,
    },
}
