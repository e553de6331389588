//! Consensus parameters.
//!
//! [`ConsensusParams`] is built once at startup, either from a [`Network`]
//! preset or from a preset plus a [`ParamsConfig`] overlay, and is passed by
//! reference to every retargeting and validation function. Nothing here is
//! mutated after construction and there is no global activation state.

use crate::difficulty::{encode_compact, target_with_leading_zero_bits, Target};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use twinpow_core::{PowAlgo, AUXPOW_CHAIN_ID, NUM_ALGOS};

/// Largest accepted `pow_target_spacing`, in seconds.
pub const MAX_TARGET_SPACING: i64 = 1 << 20;

/// Largest accepted `pow_target_timespan`, in seconds.
pub const MAX_TARGET_TIMESPAN: i64 = 1 << 32;

/// Largest accepted `dgw_past_blocks` and `lwma_averaging_window`.
pub const MAX_WINDOW: u64 = 1 << 12;

/// Largest accepted `lwma_search_multiplier`.
pub const MAX_SEARCH_MULTIPLIER: u64 = 1 << 8;

/// Network selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    Main,
    /// Public test network (min-difficulty blocks allowed).
    Test,
    /// Local regression-test network (no retargeting).
    Regtest,
}

impl Network {
    /// Lowercase network name.
    pub const fn name(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Network {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(ParamsError::new(
                "network",
                format!("unknown network '{other}'"),
            )),
        }
    }
}

/// Error when constructing [`ConsensusParams`] from configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("consensus params error for '{field}': {message}")]
pub struct ParamsError {
    /// The field that is missing or invalid.
    pub field: &'static str,
    /// Description of the error.
    pub message: String,
}

impl ParamsError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Immutable consensus parameters for difficulty and proof-of-work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Network these parameters were derived from.
    pub network: Network,
    /// Easiest permitted target per algorithm, indexed by [`PowAlgo::index`].
    pub pow_limit: [Target; NUM_ALGOS],
    /// Chain-wide target spacing between blocks, in seconds.
    pub pow_target_spacing: i64,
    /// Fixed-interval retarget timespan, in seconds.
    pub pow_target_timespan: i64,
    /// Moving-average (DGW) lookback window, in blocks.
    pub dgw_past_blocks: u64,
    /// LWMA averaging window `N`, in same-algorithm blocks.
    pub lwma_averaging_window: u64,
    /// LWMA scans at most `N * lwma_search_multiplier` ancestors.
    pub lwma_search_multiplier: u64,
    /// First height governed by the moving-average retargeter.
    pub dgw_activation_height: u64,
    /// First height with merge-mined blocks and LWMA retargeting (`None` = never).
    pub aux_activation_height: Option<u64>,
    /// Timestamp at which the transitional primary hash epoch starts.
    pub transitional_epoch_time: u32,
    /// Timestamp at which the current primary hash epoch starts.
    pub current_epoch_time: u32,
    /// Chain id expected in merge-mined version words.
    pub aux_chain_id: i32,
    /// Permit min-difficulty blocks after a long gap.
    pub allow_min_difficulty_blocks: bool,
    /// Never retarget (test mode).
    pub no_retargeting: bool,
}

impl ConsensusParams {
    /// Preset parameters for `network`.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self {
                network,
                pow_limit: [
                    target_with_leading_zero_bits(20),
                    target_with_leading_zero_bits(16),
                ],
                pow_target_spacing: 60,
                pow_target_timespan: 2016 * 60,
                dgw_past_blocks: 180,
                lwma_averaging_window: 45,
                lwma_search_multiplier: 10,
                dgw_activation_height: 338_778,
                aux_activation_height: Some(1_614_560),
                transitional_epoch_time: 1_588_788_000,
                current_epoch_time: 1_710_003_600,
                aux_chain_id: AUXPOW_CHAIN_ID,
                allow_min_difficulty_blocks: false,
                no_retargeting: false,
            },
            Network::Test => Self {
                network,
                pow_limit: [
                    target_with_leading_zero_bits(20),
                    target_with_leading_zero_bits(16),
                ],
                pow_target_spacing: 60,
                pow_target_timespan: 2016 * 60,
                dgw_past_blocks: 180,
                lwma_averaging_window: 45,
                lwma_search_multiplier: 10,
                dgw_activation_height: 200,
                aux_activation_height: Some(5_000),
                transitional_epoch_time: 1_585_159_200,
                current_epoch_time: 1_707_000_000,
                aux_chain_id: AUXPOW_CHAIN_ID,
                allow_min_difficulty_blocks: true,
                no_retargeting: false,
            },
            Network::Regtest => Self {
                network,
                pow_limit: [
                    target_with_leading_zero_bits(1),
                    target_with_leading_zero_bits(1),
                ],
                pow_target_spacing: 60,
                pow_target_timespan: 2016 * 60,
                dgw_past_blocks: 180,
                lwma_averaging_window: 45,
                lwma_search_multiplier: 10,
                dgw_activation_height: 0,
                aux_activation_height: None,
                transitional_epoch_time: 0,
                current_epoch_time: 0,
                aux_chain_id: AUXPOW_CHAIN_ID,
                allow_min_difficulty_blocks: true,
                no_retargeting: true,
            },
        }
    }

    /// Preset for `network` with `cfg` applied on top, validated.
    pub fn from_config(network: Network, cfg: &ParamsConfig) -> Result<Self, ParamsError> {
        let mut params = Self::for_network(network);

        if let Some(hex) = &cfg.pow_limit_primary {
            params.pow_limit[PowAlgo::Primary.index()] = parse_limit("pow_limit_primary", hex)?;
        }
        if let Some(hex) = &cfg.pow_limit_aux {
            params.pow_limit[PowAlgo::Aux.index()] = parse_limit("pow_limit_aux", hex)?;
        }
        if let Some(v) = cfg.pow_target_spacing {
            params.pow_target_spacing = v;
        }
        if let Some(v) = cfg.pow_target_timespan {
            params.pow_target_timespan = v;
        }
        if let Some(v) = cfg.dgw_past_blocks {
            params.dgw_past_blocks = v;
        }
        if let Some(v) = cfg.lwma_averaging_window {
            params.lwma_averaging_window = v;
        }
        if let Some(v) = cfg.lwma_search_multiplier {
            params.lwma_search_multiplier = v;
        }
        if let Some(v) = cfg.dgw_activation_height {
            params.dgw_activation_height = v;
        }
        if cfg.disable_aux {
            params.aux_activation_height = None;
        } else if let Some(v) = cfg.aux_activation_height {
            params.aux_activation_height = Some(v);
        }
        if let Some(v) = cfg.transitional_epoch_time {
            params.transitional_epoch_time = v;
        }
        if let Some(v) = cfg.current_epoch_time {
            params.current_epoch_time = v;
        }
        if let Some(v) = cfg.aux_chain_id {
            params.aux_chain_id = v;
        }
        if let Some(v) = cfg.allow_min_difficulty_blocks {
            params.allow_min_difficulty_blocks = v;
        }
        if let Some(v) = cfg.no_retargeting {
            params.no_retargeting = v;
        }

        params.validate()?;
        Ok(params)
    }

    /// Check internal consistency.
    ///
    /// The upper bounds keep every timespan and weighting product the
    /// retargeters form well inside `i64`.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let max = target_with_leading_zero_bits(0);
        for algo in PowAlgo::ALL {
            let limit = self.pow_limit(algo);
            if limit.is_zero() || *limit > max {
                return Err(ParamsError::new(
                    "pow_limit",
                    format!("{algo} ceiling must be non-zero and fit in 256 bits"),
                ));
            }
        }
        if !(1..=MAX_TARGET_SPACING).contains(&self.pow_target_spacing) {
            return Err(ParamsError::new(
                "pow_target_spacing",
                format!("must be in 1..={MAX_TARGET_SPACING}"),
            ));
        }
        if !(self.pow_target_spacing..=MAX_TARGET_TIMESPAN).contains(&self.pow_target_timespan) {
            return Err(ParamsError::new(
                "pow_target_timespan",
                format!("must be in pow_target_spacing..={MAX_TARGET_TIMESPAN}"),
            ));
        }
        if !(2..=MAX_WINDOW).contains(&self.dgw_past_blocks) {
            return Err(ParamsError::new(
                "dgw_past_blocks",
                format!("must be in 2..={MAX_WINDOW}"),
            ));
        }
        if !(1..=MAX_WINDOW).contains(&self.lwma_averaging_window) {
            return Err(ParamsError::new(
                "lwma_averaging_window",
                format!("must be in 1..={MAX_WINDOW}"),
            ));
        }
        if !(1..=MAX_SEARCH_MULTIPLIER).contains(&self.lwma_search_multiplier) {
            return Err(ParamsError::new(
                "lwma_search_multiplier",
                format!("must be in 1..={MAX_SEARCH_MULTIPLIER}"),
            ));
        }
        if self.transitional_epoch_time > self.current_epoch_time {
            return Err(ParamsError::new(
                "transitional_epoch_time",
                "must not be later than current_epoch_time",
            ));
        }
        Ok(())
    }

    /// Ceiling target for `algo`.
    pub fn pow_limit(&self, algo: PowAlgo) -> &Target {
        &self.pow_limit[algo.index()]
    }

    /// Ceiling target for `algo`, in compact form.
    pub fn pow_limit_bits(&self, algo: PowAlgo) -> u32 {
        encode_compact(self.pow_limit(algo))
    }

    /// Blocks between fixed-interval retargets.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    /// True if merge-mined blocks (and LWMA) are active at `height`.
    pub fn is_aux_active(&self, height: u64) -> bool {
        self.aux_activation_height
            .is_some_and(|activation| height >= activation)
    }

    /// True if the moving-average retargeter is active at `height`.
    pub fn is_dgw_active(&self, height: u64) -> bool {
        height >= self.dgw_activation_height
    }
}

fn parse_limit(field: &'static str, s: &str) -> Result<Target, ParamsError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 64 {
        return Err(ParamsError::new(field, "expected 64 hex characters"));
    }
    let bytes = hex::decode(s).map_err(|e| ParamsError::new(field, e.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Optional overrides for a network preset, loaded from TOML.
///
/// All fields are optional so partial configs can be validated with clear errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsConfig {
    /// Primary-algorithm ceiling as 64 big-endian hex characters.
    pub pow_limit_primary: Option<String>,
    /// Aux-algorithm ceiling as 64 big-endian hex characters.
    pub pow_limit_aux: Option<String>,
    /// Chain-wide target spacing in seconds.
    pub pow_target_spacing: Option<i64>,
    /// Fixed-interval retarget timespan in seconds.
    pub pow_target_timespan: Option<i64>,
    /// Moving-average lookback window.
    pub dgw_past_blocks: Option<u64>,
    /// LWMA averaging window.
    pub lwma_averaging_window: Option<u64>,
    /// LWMA search depth multiplier.
    pub lwma_search_multiplier: Option<u64>,
    /// Moving-average activation height.
    pub dgw_activation_height: Option<u64>,
    /// Merge-mining / LWMA activation height.
    pub aux_activation_height: Option<u64>,
    /// Disable merge-mining / LWMA entirely (wins over `aux_activation_height`).
    pub disable_aux: bool,
    /// Transitional hash epoch start time.
    pub transitional_epoch_time: Option<u32>,
    /// Current hash epoch start time.
    pub current_epoch_time: Option<u32>,
    /// Expected merge-mining chain id.
    pub aux_chain_id: Option<i32>,
    /// Permit min-difficulty blocks after a gap.
    pub allow_min_difficulty_blocks: Option<bool>,
    /// Disable retargeting.
    pub no_retargeting: Option<bool>,
}

impl ParamsConfig {
    /// Parse an overlay from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ParamsError> {
        toml::from_str(s).map_err(|e| ParamsError::new("config", e.to_string()))
    }
}
