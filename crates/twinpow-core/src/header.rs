// Consensus-critical. Changes require a protocol review + tests.
//! Block header model.
//!
//! Each on-wire header shape is its own struct; [`BlockHeader`] is the sum
//! type over them. Consumers that only care about the logical contents use
//! [`HeaderView`], obtained through [`BlockHeader::view`].

use crate::types::{BlockHash, CoreError, Hash32};
use crate::version::{BlockVersion, PowAlgo};
use borsh::{BorshDeserialize, BorshSerialize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Header shape used before the ProgPoW-style hash epochs (plain 32-bit nonce).
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyHeader {
    /// Version word.
    pub version: BlockVersion,
    /// Hash of the previous block.
    pub prev: BlockHash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash32,
    /// Block timestamp (Unix seconds).
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

/// Header shape for natively mined blocks in the ProgPoW-style epochs.
///
/// The height is committed in the header and the nonce is 64 bits wide; the
/// mix hash is the intermediate digest the hash function exposes for cheap
/// verification.
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgPowHeader {
    /// Version word.
    pub version: BlockVersion,
    /// Hash of the previous block.
    pub prev: BlockHash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash32,
    /// Block timestamp (Unix seconds).
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Height committed by the miner.
    pub height: u32,
    /// 64-bit proof-of-work nonce.
    pub nonce64: u64,
    /// Mix digest produced alongside the final hash.
    pub mix_hash: Hash32,
}

/// Opaque auxiliary proof-of-work payload.
///
/// Verification of the merge-mining proof lives outside this workspace; the
/// bytes are carried through untouched.
#[derive(Clone, PartialEq, Eq, Debug, Default, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuxProof(pub Vec<u8>);

/// Header shape for merge-mined blocks.
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuxHeader {
    /// Version word (auxpow flag set).
    pub version: BlockVersion,
    /// Hash of the previous block.
    pub prev: BlockHash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash32,
    /// Block timestamp (Unix seconds).
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Nonce of the pure header (unused by the parent-chain proof).
    pub nonce: u32,
    /// Merge-mining proof linking this header to a parent-chain block.
    pub aux_proof: AuxProof,
}

/// Any on-wire header shape.
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlockHeader {
    /// Pre-ProgPoW header.
    Legacy(LegacyHeader),
    /// Natively mined ProgPoW-era header.
    ProgPow(ProgPowHeader),
    /// Merge-mined header.
    Aux(AuxHeader),
}

/// Nonce material of a header, by shape.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NonceFields {
    /// Single 32-bit nonce (legacy and merge-mined headers).
    Nonce32(u32),
    /// Height, 64-bit nonce and mix hash (ProgPoW-era headers).
    ProgPow {
        /// Height committed by the miner.
        height: u32,
        /// 64-bit nonce.
        nonce64: u64,
        /// Mix digest.
        mix_hash: Hash32,
    },
}

/// Shape-independent view of a header.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderView {
    /// Version word.
    pub version: BlockVersion,
    /// Hash of the previous block.
    pub prev: BlockHash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash32,
    /// Block timestamp (Unix seconds).
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Nonce material.
    pub nonce: NonceFields,
    /// Merge-mining proof, present only for merge-mined headers.
    pub aux_proof: Option<AuxProof>,
}

impl HeaderView {
    /// Algorithm implied by the header's own version flags.
    pub fn algo(&self) -> PowAlgo {
        self.version.algo()
    }
}

impl BlockHeader {
    /// Version word.
    pub fn version(&self) -> BlockVersion {
        match self {
            BlockHeader::Legacy(h) => h.version,
            BlockHeader::ProgPow(h) => h.version,
            BlockHeader::Aux(h) => h.version,
        }
    }

    /// Timestamp (Unix seconds).
    pub fn time(&self) -> u32 {
        match self {
            BlockHeader::Legacy(h) => h.time,
            BlockHeader::ProgPow(h) => h.time,
            BlockHeader::Aux(h) => h.time,
        }
    }

    /// Compact difficulty target.
    pub fn bits(&self) -> u32 {
        match self {
            BlockHeader::Legacy(h) => h.bits,
            BlockHeader::ProgPow(h) => h.bits,
            BlockHeader::Aux(h) => h.bits,
        }
    }

    /// Hash of the previous block.
    pub fn prev(&self) -> BlockHash {
        match self {
            BlockHeader::Legacy(h) => h.prev,
            BlockHeader::ProgPow(h) => h.prev,
            BlockHeader::Aux(h) => h.prev,
        }
    }

    /// Check that the variant agrees with the auxpow flag in its version.
    pub fn check_shape(&self) -> Result<(), CoreError> {
        let aux_flag = self.version().is_auxpow();
        match (self, aux_flag) {
            (BlockHeader::Aux(_), true) => Ok(()),
            (BlockHeader::Aux(_), false) => {
                Err(CoreError::HeaderShape("merge-mined header without auxpow flag"))
            }
            (_, true) => Err(CoreError::HeaderShape("auxpow flag on a natively mined header")),
            (_, false) => Ok(()),
        }
    }

    /// Convert to the shape-independent view.
    pub fn view(&self) -> HeaderView {
        match self {
            BlockHeader::Legacy(h) => HeaderView {
                version: h.version,
                prev: h.prev,
                merkle_root: h.merkle_root,
                time: h.time,
                bits: h.bits,
                nonce: NonceFields::Nonce32(h.nonce),
                aux_proof: None,
            },
            BlockHeader::ProgPow(h) => HeaderView {
                version: h.version,
                prev: h.prev,
                merkle_root: h.merkle_root,
                time: h.time,
                bits: h.bits,
                nonce: NonceFields::ProgPow {
                    height: h.height,
                    nonce64: h.nonce64,
                    mix_hash: h.mix_hash,
                },
                aux_proof: None,
            },
            BlockHeader::Aux(h) => HeaderView {
                version: h.version,
                prev: h.prev,
                merkle_root: h.merkle_root,
                time: h.time,
                bits: h.bits,
                nonce: NonceFields::Nonce32(h.nonce),
                aux_proof: Some(h.aux_proof.clone()),
            },
        }
    }
}

impl TryFrom<HeaderView> for BlockHeader {
    type Error = CoreError;

    /// Pick the on-wire shape implied by the view's contents.
    fn try_from(view: HeaderView) -> Result<Self, Self::Error> {
        let header = match (view.nonce, view.aux_proof) {
            (NonceFields::Nonce32(nonce), Some(aux_proof)) => BlockHeader::Aux(AuxHeader {
                version: view.version,
                prev: view.prev,
                merkle_root: view.merkle_root,
                time: view.time,
                bits: view.bits,
                nonce,
                aux_proof,
            }),
            (NonceFields::Nonce32(nonce), None) => BlockHeader::Legacy(LegacyHeader {
                version: view.version,
                prev: view.prev,
                merkle_root: view.merkle_root,
                time: view.time,
                bits: view.bits,
                nonce,
            }),
            (
                NonceFields::ProgPow {
                    height,
                    nonce64,
                    mix_hash,
                },
                None,
            ) => BlockHeader::ProgPow(ProgPowHeader {
                version: view.version,
                prev: view.prev,
                merkle_root: view.merkle_root,
                time: view.time,
                bits: view.bits,
                height,
                nonce64,
                mix_hash,
            }),
            (NonceFields::ProgPow { .. }, Some(_)) => {
                return Err(CoreError::HeaderShape(
                    "ProgPoW nonce fields cannot carry an auxiliary proof",
                ))
            }
        };
        header.check_shape()?;
        Ok(header)
    }
}
