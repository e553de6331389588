#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! twinpow core: canonical header types, version flags, hashing seams and
//! serialization helpers shared by the consensus crate and tooling.

pub mod constants;
pub mod crypto;
pub mod header;
pub mod serialization;
pub mod types;
pub mod version;

pub use constants::*;
pub use crypto::*;
pub use header::*;
pub use serialization::*;
pub use types::*;
pub use version::*;
