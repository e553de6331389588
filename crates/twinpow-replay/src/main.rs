#![forbid(unsafe_code)]

//! Offline tool that replays header dumps through the difficulty rules.

mod dump;
mod replay;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use twinpow_consensus::{
    era_of, get_next_work_required_observed, ChainIndex, ConsensusParams, IndexEntry, Network,
    NoopObserver, ParamsConfig, RetargetObserver, TracingObserver,
};
use twinpow_core::{BlockVersion, PowAlgo};

use crate::dump::Dump;

#[derive(Parser, Debug)]
#[command(name = "twinpow-replay", version)]
struct Cli {
    /// Network preset (main, test, regtest).
    #[arg(long, default_value = "main")]
    network: Network,
    /// TOML file with parameter overrides applied on top of the preset.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log every retarget decision at debug level.
    #[arg(long)]
    trace_retarget: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recompute the required bits of every block in a dump and report mismatches.
    Replay {
        dump: PathBuf,
    },
    /// Print the bits required for a block on top of a dump's tip.
    Next {
        dump: PathBuf,
        /// Candidate timestamp; defaults to one target spacing after the tip.
        #[arg(long)]
        time: Option<u32>,
        /// Candidate is merge-mined.
        #[arg(long)]
        aux: bool,
    },
    /// Print the effective consensus parameters.
    Params,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.trace_retarget);

    let params = load_params(cli.network, cli.config.as_ref())?;
    let observer: &dyn RetargetObserver = if cli.trace_retarget {
        &TracingObserver
    } else {
        &NoopObserver
    };

    match cli.command {
        Commands::Replay { dump } => {
            let dump = Dump::load(&dump)?;
            info!(
                network = %params.network,
                base = dump.chain.base_height(),
                tip = dump.chain.tip().height,
                "replaying header dump"
            );
            let report = replay::replay(&dump, &params, observer)?;
            println!("checked:    {}", report.checked);
            println!("skipped:    {}", report.skipped);
            println!("mismatches: {}", report.mismatches.len());
            for algo in PowAlgo::ALL {
                println!("work[{algo}]: {:x}", report.work[algo.index()]);
            }
            println!("work[total]: {:x}", report.total_work());
            if let Some(first) = report.mismatches.first() {
                bail!(
                    "{} blocks disagree with the rules; first at height {} ({} era): expected {:08x}, got {:08x}",
                    report.mismatches.len(),
                    first.height,
                    first.era,
                    first.expected,
                    first.got
                );
            }
        }
        Commands::Next { dump, time, aux } => {
            let dump = Dump::load(&dump)?;
            let tip = dump.chain.tip();
            let spacing = u32::try_from(params.pow_target_spacing).context("spacing")?;
            let mut version = BlockVersion::new(0x2000_0000);
            version.set_auxpow(aux);
            let candidate = IndexEntry {
                height: tip.height + 1,
                time: time.unwrap_or_else(|| tip.time.saturating_add(spacing)),
                bits: 0,
                version,
            };
            let bits =
                get_next_work_required_observed(&dump.chain, &candidate, &params, aux, observer)?;
            println!(
                "height {} ({} era): {bits:08x}",
                candidate.height,
                era_of(candidate.height, &params)
            );
        }
        Commands::Params => {
            println!("{params:#?}");
        }
    }
    Ok(())
}

fn init_tracing(trace_retarget: bool) {
    let default = if trace_retarget {
        "info,twinpow_consensus=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_params(network: Network, config: Option<&PathBuf>) -> Result<ConsensusParams> {
    let Some(path) = config else {
        return Ok(ConsensusParams::for_network(network));
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = ParamsConfig::from_toml_str(&text)?;
    let params = ConsensusParams::from_config(network, &cfg)?;
    info!(config = %path.display(), "applied parameter overrides");
    Ok(params)
}
