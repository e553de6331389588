//! Protocol-wide constants for twinpow.

/// Length in bytes of a 32-byte hash.
pub const HASH32_LEN: usize = 32;

/// Number of proof-of-work algorithms that can produce blocks on one chain.
pub const NUM_ALGOS: usize = 2;

/// Version modifier flag marking a merge-mined (auxiliary proof-of-work) header.
pub const VERSION_AUXPOW: i32 = 1 << 8;

/// First bit of the auxiliary chain id inside the version word.
pub const VERSION_CHAIN_START_BIT: u32 = 16;

/// Mask selecting the (shifted) auxiliary chain id.
pub const VERSION_CHAIN_ID_MASK: i32 = 0x001f << VERSION_CHAIN_START_BIT;

/// Chain id carried by merge-mined headers of this chain.
pub const AUXPOW_CHAIN_ID: i32 = 9;

/// Full version word used by legacy headers predating chain ids.
pub const LEGACY_VERSION_MARKER: i32 = 0x3000_0000;

/// Highest plain version number treated as legacy.
pub const LEGACY_MAX_VERSION: i32 = 4;

/// Domain separator used when hashing block headers for identity.
///
/// Prevents cross-domain hash collisions.
pub const DS_BLOCK_HEADER: &[u8] = b"TWINPOW::BLOCK_HEADER::V0";

/// Domain separator used by the development proof-of-work hasher.
pub const DS_DEV_POW: &[u8] = b"TWINPOW::DEV_POW::V0";
