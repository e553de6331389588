#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! twinpow consensus rules for difficulty.
//!
//! This crate is responsible for:
//! - compact difficulty target encoding/decoding (Bitcoin-style `bits`)
//! - deciding which retargeting era governs a height
//! - the fixed-interval, moving-average and multi-lineage LWMA retargeters
//! - proof-of-work validation against the target and the algorithm ceiling
//!
//! It intentionally does **not** include networking, header storage, or the
//! proof-of-work hash functions themselves. Chain access goes through the
//! [`ChainIndex`] trait and hashing through [`twinpow_core::PowHasher`].

pub mod algo;
pub mod chain;
pub mod dgw;
pub mod difficulty;
pub mod era;
pub mod error;
pub mod fixed_interval;
pub mod lwma;
pub mod next_work;
pub mod observer;
pub mod params;
pub mod pow;
pub mod work;

pub use algo::*;
pub use chain::*;
pub use dgw::*;
pub use difficulty::*;
pub use era::*;
pub use error::*;
pub use fixed_interval::*;
pub use lwma::*;
pub use next_work::*;
pub use observer::*;
pub use params::*;
pub use pow::*;
pub use work::*;
