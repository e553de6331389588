//! Read-only chain access for retargeting.
//!
//! Retargeters never own or mutate chain state. They see the active chain
//! through [`ChainIndex`], anchored at one tip, and query ancestors by
//! height. Implementations must present a stable snapshot for the duration
//! of a call.

use crate::error::ConsensusError;
use twinpow_core::{BlockHeader, BlockVersion, HeaderView, PowAlgo};

/// Per-block data the retargeters read from the chain index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Block height.
    pub height: u64,
    /// Header timestamp (not required to be monotonic).
    pub time: u32,
    /// Compact difficulty target carried by the header.
    pub bits: u32,
    /// Header version word.
    pub version: BlockVersion,
}

impl IndexEntry {
    /// Lineage this block belongs to, from its own auxpow flag.
    pub fn algo(&self) -> PowAlgo {
        self.version.algo()
    }

    /// Timestamp widened for signed arithmetic.
    pub fn block_time(&self) -> i64 {
        i64::from(self.time)
    }
}

/// The header fields of a not-yet-accepted block that retargeting reads.
pub trait CandidateHeader {
    /// Header timestamp.
    fn time(&self) -> u32;
    /// Header version word.
    fn version(&self) -> BlockVersion;
}

impl CandidateHeader for HeaderView {
    fn time(&self) -> u32 {
        self.time
    }

    fn version(&self) -> BlockVersion {
        self.version
    }
}

impl CandidateHeader for BlockHeader {
    fn time(&self) -> u32 {
        BlockHeader::time(self)
    }

    fn version(&self) -> BlockVersion {
        BlockHeader::version(self)
    }
}

impl CandidateHeader for IndexEntry {
    fn time(&self) -> u32 {
        self.time
    }

    fn version(&self) -> BlockVersion {
        self.version
    }
}

/// Active chain as seen from one tip.
pub trait ChainIndex {
    /// The tip this view is anchored at (the candidate's parent).
    fn tip(&self) -> IndexEntry;

    /// Ancestor of the tip at `height`, or `None` if `height` is above the
    /// tip or below what the index holds.
    fn ancestor(&self, height: u64) -> Option<IndexEntry>;

    /// Parent of `entry`, if indexed.
    fn parent(&self, entry: &IndexEntry) -> Option<IndexEntry> {
        entry.height.checked_sub(1).and_then(|h| self.ancestor(h))
    }

    /// Ancestor at `height` that must exist.
    fn require_ancestor(&self, height: u64) -> Result<IndexEntry, ConsensusError> {
        self.ancestor(height)
            .ok_or(ConsensusError::MissingAncestor { height })
    }
}

/// In-memory chain of index entries with contiguous heights.
///
/// The first entry may sit at any height (e.g. a checkpoint); ancestors
/// below it are reported as missing.
#[derive(Clone, Debug)]
pub struct HeaderChain {
    entries: Vec<IndexEntry>,
}

impl HeaderChain {
    /// Start a chain from its first entry.
    pub fn new(first: IndexEntry) -> Self {
        Self {
            entries: vec![first],
        }
    }

    /// Build from entries that must have strictly consecutive heights.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self, ConsensusError> {
        if entries.is_empty() {
            return Err(ConsensusError::InvalidHeader("empty header chain"));
        }
        if entries
            .windows(2)
            .any(|pair| pair[1].height != pair[0].height + 1)
        {
            return Err(ConsensusError::InvalidHeader("non-contiguous heights"));
        }
        Ok(Self { entries })
    }

    /// Append a block on top of the tip, returning the new entry.
    pub fn push(&mut self, time: u32, bits: u32, version: BlockVersion) -> IndexEntry {
        let entry = IndexEntry {
            height: self.tip().height + 1,
            time,
            bits,
            version,
        };
        self.entries.push(entry);
        entry
    }

    /// Append `count` blocks spaced `spacing` seconds after the tip.
    pub fn extend_spaced(&mut self, count: u64, spacing: u32, bits: u32, version: BlockVersion) {
        for _ in 0..count {
            let time = self.tip().time.saturating_add(spacing);
            self.push(time, bits, version);
        }
    }

    /// Height of the first indexed entry.
    pub fn base_height(&self) -> u64 {
        self.entries[0].height
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a chain holds at least its first entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// View of this chain anchored at an earlier tip.
    pub fn view_at(&self, height: u64) -> Option<ChainView<'_>> {
        let offset = height.checked_sub(self.base_height())? as usize;
        let entries = self.entries.get(..=offset)?;
        Some(ChainView { entries })
    }
}

impl ChainIndex for HeaderChain {
    fn tip(&self) -> IndexEntry {
        self.entries[self.entries.len() - 1]
    }

    fn ancestor(&self, height: u64) -> Option<IndexEntry> {
        lookup(&self.entries, height)
    }
}

/// Borrowed prefix of a [`HeaderChain`], anchored at its last entry.
#[derive(Clone, Copy, Debug)]
pub struct ChainView<'a> {
    entries: &'a [IndexEntry],
}

impl ChainIndex for ChainView<'_> {
    fn tip(&self) -> IndexEntry {
        self.entries[self.entries.len() - 1]
    }

    fn ancestor(&self, height: u64) -> Option<IndexEntry> {
        lookup(self.entries, height)
    }
}

fn lookup(entries: &[IndexEntry], height: u64) -> Option<IndexEntry> {
    let base = entries.first()?.height;
    let offset = usize::try_from(height.checked_sub(base)?).ok()?;
    entries.get(offset).copied()
}
