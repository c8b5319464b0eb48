//! Property tests for the token-swap finders.

use proptest::prelude::*;

use alsvid_arch::{
    ApproxSwapFinder, ExactSwapFinder, Graph, GraphKind, InverseMap, TokenSwapFinder,
};

fn line(n: u32) -> Graph {
    let mut g = Graph::new(n, GraphKind::Undirected);
    for i in 0..n - 1 {
        g.add_edge(i, i + 1);
    }
    g
}

fn square5() -> Graph {
    let mut g = Graph::new(5, GraphKind::Undirected);
    for (u, v) in [(0, 1), (0, 2), (1, 2), (3, 2), (4, 2), (3, 4)] {
        g.add_edge(u, v);
    }
    g
}

fn apply(assign: &InverseMap, swaps: &[alsvid_arch::Swap]) -> InverseMap {
    let mut out = assign.clone();
    for s in swaps {
        out.swap(s.u as usize, s.v as usize);
    }
    out
}

fn permutation(n: u32) -> impl Strategy<Value = Vec<u32>> {
    Just((0..n).collect::<Vec<u32>>()).prop_shuffle()
}

proptest! {
    #[test]
    fn approx_realises_any_permutation_on_square5(to in permutation(5)) {
        let g = square5();
        let from: Vec<u32> = (0..5).collect();

        let mut finder = ApproxSwapFinder::new();
        finder.set_graph(&g).unwrap();
        let swaps = finder.find(&from, &to).unwrap();

        for s in &swaps {
            prop_assert!(g.has_any_edge(s.u, s.v), "swap off the graph: {s:?}");
        }
        prop_assert_eq!(apply(&from, &swaps), to);
    }

    #[test]
    fn approx_stays_within_four_times_optimal(to in permutation(5)) {
        let g = square5();
        let from: Vec<u32> = (0..5).collect();

        let mut exact = ExactSwapFinder::new();
        let mut approx = ApproxSwapFinder::new();
        exact.set_graph(&g).unwrap();
        approx.set_graph(&g).unwrap();

        let opt = exact.find(&from, &to).unwrap().len();
        let got = approx.find(&from, &to).unwrap().len();
        prop_assert!(
            got <= 4 * opt.max(1),
            "approx used {} swaps, optimal is {}",
            got,
            opt
        );
    }

    #[test]
    fn exact_is_sound_on_a_line(to in permutation(6)) {
        let g = line(6);
        let from: Vec<u32> = (0..6).collect();

        let mut finder = ExactSwapFinder::new();
        finder.set_graph(&g).unwrap();
        let swaps = finder.find(&from, &to).unwrap();

        for s in &swaps {
            prop_assert!(g.has_any_edge(s.u, s.v));
        }
        prop_assert_eq!(apply(&from, &swaps), to);
    }

    #[test]
    fn exact_is_minimal_for_adjacent_targets(from in permutation(5)) {
        // One adjacent transposition away must cost exactly one swap.
        let g = square5();
        let mut finder = ExactSwapFinder::new();
        finder.set_graph(&g).unwrap();

        for u in 0..5u32 {
            for v in g.adj(u) {
                let mut to = from.clone();
                to.swap(u as usize, v as usize);
                let swaps = finder.find(&from, &to).unwrap();
                prop_assert_eq!(swaps.len(), 1);
            }
        }
    }
}
