//! Grow a chain across all three retargeting eras, mining every block at
//! exactly the required bits, and check the transitions.

use std::cell::RefCell;
use twinpow_consensus::{
    get_next_work_required_observed, validate_header_difficulty, ChainIndex, ConsensusParams,
    HeaderChain, IndexEntry, Network, RetargetEra, RetargetEvent, RetargetObserver, RetargetPath,
};
use twinpow_core::{BlockVersion, PowAlgo};

const DGW_START: u64 = 2_100;
const AUX_START: u64 = 2_500;
const TIP: u64 = 3_200;

#[derive(Default)]
struct Recorder(RefCell<Vec<RetargetEvent>>);

impl RetargetObserver for Recorder {
    fn on_retarget(&self, event: &RetargetEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

fn params() -> ConsensusParams {
    let mut p = ConsensusParams::for_network(Network::Main);
    p.dgw_activation_height = DGW_START;
    p.aux_activation_height = Some(AUX_START);
    p.transitional_epoch_time = 0;
    p.current_epoch_time = 0;
    p
}

fn version(aux: bool) -> BlockVersion {
    let mut v = BlockVersion::new(0x2000_0000);
    v.set_auxpow(aux);
    v
}

/// Mine up to `TIP`, one block per minute; lineages alternate once merge mining starts.
fn mine(params: &ConsensusParams, recorder: &Recorder) -> HeaderChain {
    let mut chain = HeaderChain::new(IndexEntry {
        height: 0,
        time: 1_700_000_000,
        bits: params.pow_limit_bits(PowAlgo::Primary),
        version: version(false),
    });
    while chain.tip().height < TIP {
        let height = chain.tip().height + 1;
        let aux = height >= AUX_START && height % 2 == 1;
        let candidate = IndexEntry {
            height,
            time: chain.tip().time + 60,
            bits: 0,
            version: version(aux),
        };
        let bits = get_next_work_required_observed(&chain, &candidate, params, false, recorder)
            .expect("complete chain");
        chain.push(candidate.time, bits, candidate.version);
    }
    chain
}

#[test]
fn chain_crosses_every_era() {
    let params = params();
    let recorder = Recorder::default();
    let chain = mine(&params, &recorder);
    let events = recorder.0.borrow();
    assert_eq!(events.len() as u64, TIP);

    let era_at = |height: u64| events[(height - 1) as usize].era;
    assert_eq!(era_at(1), RetargetEra::FixedInterval);
    assert_eq!(era_at(DGW_START - 1), RetargetEra::FixedInterval);
    assert_eq!(era_at(DGW_START), RetargetEra::MovingAverage);
    assert_eq!(era_at(AUX_START - 1), RetargetEra::MovingAverage);
    assert_eq!(era_at(AUX_START), RetargetEra::MultiLineage);

    // Blocks on schedule: the one fixed-interval retarget barely moves.
    let boundary = &events[2016 - 1];
    assert_eq!(boundary.path, RetargetPath::Retargeted);
    let before = chain.ancestor(2015).expect("indexed").bits;
    assert!(boundary.bits <= before);
    assert!(boundary.bits >> 24 == before >> 24);

    // The first merge-mined block starts its lineage at the ceiling.
    let first_aux = &events[AUX_START as usize];
    assert_eq!(first_aux.algo, PowAlgo::Aux);
    assert_eq!(first_aux.path, RetargetPath::EmptyLineage);
    assert_eq!(first_aux.bits, params.pow_limit_bits(PowAlgo::Aux));

    // Until it has a full window, later merge-mined blocks reuse that value.
    let second_aux = &events[AUX_START as usize + 2];
    assert_eq!(second_aux.algo, PowAlgo::Aux);
    assert_eq!(second_aux.path, RetargetPath::SparseLineage);
    assert_eq!(second_aux.bits, params.pow_limit_bits(PowAlgo::Aux));

    // Eventually both lineages retarget from their own history.
    let tail = &events[events.len() - 2..];
    assert!(tail.iter().all(|e| e.path == RetargetPath::Retargeted));
    assert!(tail.iter().any(|e| e.algo == PowAlgo::Aux));
    assert!(tail.iter().any(|e| e.algo == PowAlgo::Primary));
}

#[test]
fn every_mined_block_validates() {
    let params = params();
    let chain = mine(&params, &Recorder::default());

    for entry in chain.entries().iter().skip(1) {
        let view = chain.view_at(entry.height - 1).expect("parent indexed");
        validate_header_difficulty(&view, entry, entry.bits, &params, false)
            .unwrap_or_else(|e| panic!("block {} rejected: {e}", entry.height));
    }
}

#[test]
fn tampered_bits_rejected() {
    let params = params();
    let chain = mine(&params, &Recorder::default());
    let entry = chain.ancestor(TIP).expect("tip");
    let view = chain.view_at(TIP - 1).expect("parent indexed");
    assert!(validate_header_difficulty(&view, &entry, entry.bits ^ 1, &params, false).is_err());
}
