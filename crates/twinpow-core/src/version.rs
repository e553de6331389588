// Consensus-critical. Changes require a protocol review + tests.
//! Block version word and proof-of-work algorithm tags.
//!
//! The 32-bit version carries, besides the base version number:
//!
//! - bit 8: the auxiliary proof-of-work (merge-mining) flag
//! - bits 16..21: the auxiliary chain id
//!
//! The algorithm that produced a header is never stored; it is derived from
//! the auxiliary flag.

use crate::constants::*;
use crate::types::CoreError;
use borsh::{BorshDeserialize, BorshSerialize};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Proof-of-work algorithms that can extend the chain.
///
/// The discriminant is the index into per-algorithm parameter arrays.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PowAlgo {
    /// Native algorithm of the chain (mined directly).
    Primary = 0,
    /// Merge-mined algorithm, proven through an auxiliary proof-of-work.
    Aux = 1,
}

impl PowAlgo {
    /// All algorithms in ordinal order.
    pub const ALL: [PowAlgo; NUM_ALGOS] = [PowAlgo::Primary, PowAlgo::Aux];

    /// Ordinal used to index per-algorithm arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short lowercase name, as used in logs and config files.
    pub const fn name(self) -> &'static str {
        match self {
            PowAlgo::Primary => "primary",
            PowAlgo::Aux => "aux",
        }
    }
}

impl fmt::Display for PowAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Block version word with auxpow flag and chain id helpers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BlockVersion(pub i32);

impl BlockVersion {
    /// Wrap a raw version word.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Build a non-auxpow version from a base version and a chain id.
    ///
    /// The base version must be positive and must not reach into the
    /// modifier bits.
    pub fn with_base(base: i32, chain_id: i32) -> Result<Self, CoreError> {
        if base < 1 || base >= VERSION_AUXPOW {
            return Err(CoreError::InvalidValue("base version out of range"));
        }
        let mut v = Self(base);
        v.set_chain_id(chain_id);
        Ok(v)
    }

    /// The raw version word, including modifiers.
    pub const fn full_version(self) -> i32 {
        self.0
    }

    /// Base version without the auxpow flag and this chain's shifted id.
    pub const fn base_version(self) -> i32 {
        (self.0 & !VERSION_AUXPOW) & !(AUXPOW_CHAIN_ID << VERSION_CHAIN_START_BIT)
    }

    /// Chain id encoded in the version.
    pub const fn chain_id(self) -> i32 {
        (self.0 & VERSION_CHAIN_ID_MASK) >> VERSION_CHAIN_START_BIT
    }

    /// Replace the chain id, dropping every bit at or above the chain id field.
    pub fn set_chain_id(&mut self, chain_id: i32) {
        self.0 %= 1 << VERSION_CHAIN_START_BIT;
        self.0 |= chain_id << VERSION_CHAIN_START_BIT;
    }

    /// True if the header claims to be merge-mined.
    pub const fn is_auxpow(self) -> bool {
        self.0 & VERSION_AUXPOW != 0
    }

    /// Set or clear the auxpow flag.
    pub fn set_auxpow(&mut self, auxpow: bool) {
        if auxpow {
            self.0 |= VERSION_AUXPOW;
        } else {
            self.0 &= !VERSION_AUXPOW;
        }
    }

    /// True for versions that predate chain ids.
    pub const fn is_legacy(self) -> bool {
        self.0 <= LEGACY_MAX_VERSION || self.0 == LEGACY_VERSION_MARKER
    }

    /// Algorithm implied by the version flags alone.
    pub const fn algo(self) -> PowAlgo {
        if self.is_auxpow() {
            PowAlgo::Aux
        } else {
            PowAlgo::Primary
        }
    }
}

impl fmt::Debug for BlockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockVersion(0x{:08x})", self.0)
    }
}

impl From<i32> for BlockVersion {
    fn from(value: i32) -> Self {
        Self(value)
    }
}
