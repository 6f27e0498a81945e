//! Property tests for tamper detection.

use proptest::prelude::*;

use veracity_entangle::{DependencyPolicy, EntanglementEngine, EntanglementGraph};

fn arb_fragments() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..8)
}

proptest! {
    /// Building twice over identical inputs yields identical roots.
    #[test]
    fn build_deterministic(frags in arb_fragments()) {
        let g1 = EntanglementGraph::build(&frags, DependencyPolicy::FullOrder).unwrap();
        let g2 = EntanglementGraph::build(&frags, DependencyPolicy::FullOrder).unwrap();
        prop_assert_eq!(g1.root_hash, g2.root_hash);
    }

    /// Flipping any single byte of any fragment breaks integrity and
    /// reports that fragment's index.
    #[test]
    fn any_byte_flip_detected(
        frags in arb_fragments(),
        frag_seed in any::<usize>(),
        byte_seed in any::<usize>(),
    ) {
        let engine = EntanglementEngine;
        let graph = engine.build(&frags, DependencyPolicy::FullOrder).unwrap();

        let fi = frag_seed % frags.len();
        let mut tampered = frags.clone();
        let bi = byte_seed % tampered[fi].len();
        tampered[fi][bi] ^= 0x01;

        let report = engine.verify(&graph, &tampered).unwrap();
        prop_assert!(!report.intact);
        prop_assert!(report.tampered_sections.contains(&fi));
    }

    /// Dropping the last fragment always breaks integrity.
    #[test]
    fn truncation_detected(frags in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 2..8)) {
        let engine = EntanglementEngine;
        let graph = engine.build(&frags, DependencyPolicy::FullOrder).unwrap();

        let truncated = frags[..frags.len() - 1].to_vec();
        let report = engine.verify(&graph, &truncated).unwrap();
        prop_assert!(!report.intact);
        prop_assert_eq!(report.tampered_sections.len(), frags.len());
    }
}
