//! Property-based tests for the triple and prefix indices.
//!
//! These verify invariants that must hold for any training set:
//! - Index construction is deterministic
//! - Every true triple is reachable through every prefix mapping
//! - Subsampling weights are positive and finite

use kgrank_core::{CorruptionMode, Dataset, PrefixIndex, Triple, TripleIndex};
use proptest::prelude::*;

const N_ENTITY: u32 = 12;
const N_RELATION: u32 = 4;

fn arb_triple() -> impl Strategy<Value = Triple> {
    (0..N_ENTITY, 0..N_RELATION, 0..N_ENTITY).prop_map(|(h, r, t)| Triple::new(h, r, t))
}

fn arb_triples() -> impl Strategy<Value = Vec<Triple>> {
    prop::collection::vec(arb_triple(), 1..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn index_build_is_idempotent(triples in arb_triples()) {
        let a = TripleIndex::with_counts(triples.iter().copied(), N_ENTITY as usize, N_RELATION as usize).unwrap();
        let b = TripleIndex::with_counts(triples.iter().copied(), N_ENTITY as usize, N_RELATION as usize).unwrap();
        prop_assert_eq!(a.n_entity(), b.n_entity());
        prop_assert_eq!(a.n_relation(), b.n_relation());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn weights_positive_and_finite(triples in arb_triples()) {
        let index = TripleIndex::with_counts(triples.iter().copied(), N_ENTITY as usize, N_RELATION as usize).unwrap();
        for w in index.subsampling_weights(&triples).unwrap() {
            prop_assert!(w > 0.0 && w.is_finite(), "bad weight {}", w);
            // Smallest possible denominator is 4 + 4.
            prop_assert!(w <= 1.0 / 8f32.sqrt() + 1e-6);
        }
    }

    #[test]
    fn prefix_index_contains_every_triple(triples in arb_triples()) {
        let index = PrefixIndex::build(&triples);
        for t in &triples {
            prop_assert!(index.contains(t));
            for mode in [CorruptionMode::HeadBatch, CorruptionMode::TailBatch, CorruptionMode::RelationBatch] {
                prop_assert!(index.is_known_completion(t, mode, mode.slot(t)));
            }
        }
    }

    #[test]
    fn out_of_range_ids_always_rejected(mut triples in arb_triples(), bad in N_ENTITY..N_ENTITY + 5) {
        triples.push(Triple::new(0, 0, bad));
        prop_assert!(TripleIndex::with_counts(triples, N_ENTITY as usize, N_RELATION as usize).is_err());
    }

    #[test]
    fn partition_preserves_training_multiset(triples in arb_triples(), n_part in 1usize..6, seed in any::<u64>()) {
        let dataset = Dataset::from_id_triples("prop", triples, vec![], vec![]).unwrap();
        let part = dataset.partition(n_part, &[0], 1.0, seed).unwrap();

        let mut before: Vec<Triple> = dataset.train().to_vec();
        let mut after: Vec<Triple> = part.train_triples().copied().collect();
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);

        let expected = dataset.train().len().div_ceil(n_part);
        prop_assert_eq!(part.train().len(), expected);
    }
}
