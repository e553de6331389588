// Consensus-critical. Changes require a protocol review + tests.
//! Canonical serialization helpers.
//!
//! Rule: consensus-visible objects are encoded with Borsh.
//! Do not use JSON or non-canonical formats for hashing.

use crate::constants::*;
use crate::header::BlockHeader;
use crate::types::{BlockHash, CoreError, Hash32};
use borsh::to_vec;

/// Encode a value with canonical Borsh encoding.
pub fn to_bytes<T: borsh::BorshSerialize>(v: &T) -> Result<Vec<u8>, CoreError> {
    to_vec(v).map_err(|_| CoreError::InvalidValue("borsh serialization failed"))
}

/// Hash bytes with blake3 and return 32 bytes.
pub fn hash32(domain_sep: &[u8], bytes: &[u8]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain_sep);
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; HASH32_LEN];
    arr.copy_from_slice(out.as_bytes());
    Hash32(arr)
}

/// Identity hash of a header = BLAKE3(DS_BLOCK_HEADER || borsh(header)).
///
/// This names a header in indexes and logs. It is not the proof-of-work hash;
/// that one comes from a [`crate::PowHasher`].
pub fn block_header_hash(h: &BlockHeader) -> Result<BlockHash, CoreError> {
    let bytes = to_bytes(h)?;
    Ok(hash32(DS_BLOCK_HEADER, &bytes))
}
