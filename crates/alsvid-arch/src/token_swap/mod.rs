//! Token swapping: realising one qubit assignment from another using
//! adjacent swaps.
//!
//! A finder is given a "from" and a "to" inverse map (physical qubit →
//! token) and must produce a sequence of swaps, each along a graph edge,
//! whose left-to-right application to `from` yields `to`. [`UNDEF`]
//! entries are wildcards: a `to` slot holding [`UNDEF`] accepts any token.

mod approx;
mod exact;

pub use approx::ApproxSwapFinder;
pub use exact::ExactSwapFinder;

use serde::{Deserialize, Serialize};

use crate::error::ArchResult;
use crate::graph::Graph;
use crate::mapping::InverseMap;

/// One adjacent transposition of the tokens at physical qubits `u` and `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub u: u32,
    pub v: u32,
}

/// An ordered sequence of swaps.
pub type SwapSeq = Vec<Swap>;

/// Search for a swap sequence transforming one assignment into another.
pub trait TokenSwapFinder {
    /// Bind the finder to a graph, running any preprocessing.
    fn set_graph(&mut self, g: &Graph) -> ArchResult<()>;

    /// Find swaps realising `to` from `from`. Both maps cover every
    /// physical qubit; entries may be [`crate::mapping::UNDEF`].
    fn find(&mut self, from: &InverseMap, to: &InverseMap) -> ArchResult<SwapSeq>;
}

/// Apply a swap sequence to an assignment. Test helper shared by the
/// finder implementations.
#[cfg(test)]
pub(crate) fn apply_swaps(assign: &InverseMap, swaps: &[Swap]) -> InverseMap {
    let mut out = assign.clone();
    for s in swaps {
        out.swap(s.u as usize, s.v as usize);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;
    use crate::mapping::UNDEF;

    pub(crate) fn square5_graph() -> Graph {
        let mut g = Graph::new(5, GraphKind::Undirected);
        for (u, v) in [(0, 1), (0, 2), (1, 2), (3, 2), (4, 2), (3, 4)] {
            g.add_edge(u, v);
        }
        g
    }

    /// `to` is realised modulo wildcard positions.
    fn matches_modulo_wildcards(result: &InverseMap, to: &InverseMap) -> bool {
        result
            .iter()
            .zip(to.iter())
            .all(|(&r, &t)| t == UNDEF || r == t)
    }

    fn check_finder(finder: &mut dyn TokenSwapFinder, from: &[u32], to: &[u32]) {
        let g = square5_graph();
        finder.set_graph(&g).unwrap();
        let swaps = finder.find(&from.to_vec(), &to.to_vec()).unwrap();
        for s in &swaps {
            assert!(g.has_any_edge(s.u, s.v), "swap not on an edge: {s:?}");
        }
        let result = apply_swaps(&from.to_vec(), &swaps);
        assert!(
            matches_modulo_wildcards(&result, &to.to_vec()),
            "swaps do not realise the target: {result:?} vs {to:?}"
        );
    }

    #[test]
    fn test_exact_full_reversal() {
        check_finder(&mut ExactSwapFinder::new(), &[0, 1, 2, 4, 3], &[4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_approx_full_reversal() {
        check_finder(&mut ApproxSwapFinder::new(), &[0, 1, 2, 4, 3], &[4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_approx_with_wildcards() {
        check_finder(
            &mut ApproxSwapFinder::new(),
            &[0, UNDEF, 2, 4, UNDEF],
            &[UNDEF, UNDEF, 4, 2, 0],
        );
    }

    #[test]
    fn test_approx_within_four_times_optimal() {
        let g = square5_graph();
        let mut exact = ExactSwapFinder::new();
        let mut approx = ApproxSwapFinder::new();
        exact.set_graph(&g).unwrap();
        approx.set_graph(&g).unwrap();

        // A handful of full permutations of the 5-vertex device.
        let cases: Vec<Vec<u32>> = vec![
            vec![4, 3, 2, 1, 0],
            vec![1, 0, 3, 2, 4],
            vec![2, 0, 1, 4, 3],
            vec![3, 4, 0, 1, 2],
        ];
        let from: Vec<u32> = (0..5).collect();

        for to in cases {
            let opt = exact.find(&from, &to).unwrap().len();
            let got = approx.find(&from, &to).unwrap().len();
            assert!(
                got <= 4 * opt.max(1),
                "approx used {got} swaps, optimal is {opt}"
            );
        }
    }
}
