//! Header dump loading.
//!
//! A dump is a JSON array of header records with contiguous heights, oldest
//! first:
//!
//! ```json
//! [{ "height": 0, "time": 1700000000, "bits": "1e0fffff", "version": 536870912 }]
//! ```
//!
//! `aux` is optional and records whether the block was validated as
//! merge-mined by the node that produced the dump.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use twinpow_consensus::{HeaderChain, IndexEntry};
use twinpow_core::BlockVersion;

/// One header in a dump.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderRecord {
    pub height: u64,
    pub time: u32,
    /// Compact bits as 8 hex characters.
    pub bits: String,
    pub version: i32,
    #[serde(default)]
    pub aux: Option<bool>,
}

impl HeaderRecord {
    fn to_entry(&self) -> Result<IndexEntry> {
        let bits = u32::from_str_radix(self.bits.trim_start_matches("0x"), 16)
            .with_context(|| format!("height {}: bad bits '{}'", self.height, self.bits))?;
        Ok(IndexEntry {
            height: self.height,
            time: self.time,
            bits,
            version: BlockVersion::new(self.version),
        })
    }
}

/// A parsed dump: the chain plus the per-block override flags.
pub struct Dump {
    pub chain: HeaderChain,
    pub aux_flags: Vec<Option<bool>>,
}

impl Dump {
    pub fn parse(json: &str) -> Result<Self> {
        let records: Vec<HeaderRecord> = serde_json::from_str(json).context("parse header dump")?;
        if records.is_empty() {
            bail!("header dump is empty");
        }
        let entries = records
            .iter()
            .map(HeaderRecord::to_entry)
            .collect::<Result<Vec<_>>>()?;
        let chain = HeaderChain::from_entries(entries).context("build header chain")?;
        let aux_flags = records.iter().map(|r| r.aux).collect();
        Ok(Self { chain, aux_flags })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&json)
    }

    /// Override flag recorded for the block at `height`, if any.
    pub fn aux_flag(&self, height: u64) -> Option<bool> {
        let offset = height.checked_sub(self.chain.base_height())?;
        self.aux_flags.get(usize::try_from(offset).ok()?).copied().flatten()
    }
}
