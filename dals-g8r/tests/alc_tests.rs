// SPDX-License-Identifier: Apache-2.0

//! Apply/recover behavior of approximate local changes on random circuits.

use dals_g8r::aig::fanout::fanouts_of;
use dals_g8r::aig::gate::AigRef;
use dals_g8r::aig::topo::{TopoRanks, topo_order_and_cycle_check, topo_sort_refs};
use dals_g8r::alc::Alc;
use dals_g8r::test_utils::random_gate_fn;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use test_case::test_case;

#[test_case(1 ; "seed 1")]
#[test_case(2 ; "seed 2")]
#[test_case(3 ; "seed 3")]
#[test_case(42 ; "seed 42")]
fn test_apply_then_recover_restores_circuit(seed: u64) {
    let original = random_gate_fn(seed, 5, 30, 3);
    let mut g = original.clone();
    let order = topo_sort_refs(&g.gates);
    let ranks = TopoRanks::from_order(&order, g.gates.len());
    let gates: Vec<AigRef> = order.iter().copied().filter(|r| !g.is_source(*r)).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    for _ in 0..50 {
        let target = gates[rng.gen_range(0..gates.len())];
        let earlier: Vec<AigRef> = order
            .iter()
            .copied()
            .filter(|s| ranks.precedes(*s, target))
            .collect();
        let substitute = earlier[rng.gen_range(0..earlier.len())];
        let complemented = rng.gen_bool(0.5);
        let mut alc = Alc::new(&g, &ranks, target, substitute, complemented, 1.0).unwrap();

        alc.apply(&mut g).unwrap();
        assert!(fanouts_of(&g, target).is_empty());
        let (_, cycle) = topo_order_and_cycle_check(&g.gates);
        assert!(cycle.is_none());
        let expected_len = original.gates.len() + usize::from(complemented);
        assert_eq!(g.gates.len(), expected_len);

        alc.recover(&mut g).unwrap();
        assert_eq!(g, original);
    }
}

#[test]
fn test_sequential_commits_stay_acyclic() {
    let original = random_gate_fn(11, 6, 50, 4);
    let mut g = original.clone();
    let order = topo_sort_refs(&g.gates);
    let ranks = TopoRanks::from_order(&order, g.gates.len());
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);

    // Changes built against the original ordering, committed one after the
    // other without recovery.
    let gates: Vec<AigRef> = order.iter().copied().filter(|r| !g.is_source(*r)).collect();
    let mut pending = Vec::new();
    for target in gates.iter().step_by(3) {
        let rank = ranks.rank(*target);
        let substitute = order[rng.gen_range(0..rank)];
        pending.push(Alc::new(&g, &ranks, *target, substitute, rng.gen_bool(0.5), 1.0).unwrap());
    }
    for alc in &mut pending {
        alc.apply(&mut g).unwrap();
        let (_, cycle) = topo_order_and_cycle_check(&g.gates);
        assert!(cycle.is_none());
        assert!(fanouts_of(&g, alc.target()).is_empty());
    }
    assert!(g.gates.len() >= original.gates.len());
}
