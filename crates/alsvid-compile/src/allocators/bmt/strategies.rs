//! Default strategy implementations for the bounded-mapping-tree
//! allocator.

use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use alsvid_arch::{BfsDistance, Graph, Mapping, UNDEF, invert_mapping};
use alsvid_ir::{QModule, StmtId};

use crate::allocators::bmt::{
    Candidate, CandidateSelector, LiveQubitsPreProcessor, MapSeqSelector,
    NodeCandidatesGenerator, SwapCostEstimator, TracebackInfo,
};
use crate::analysis::{Analyses, CircuitDag, DagIter};
use crate::error::{CompileError, CompileResult};

// ---- candidate generation -----------------------------------------------

/// Yields statements one at a time, in program order.
#[derive(Debug, Default)]
pub struct SequentialCandidatesGenerator {
    ids: Vec<StmtId>,
    pos: usize,
}

impl SequentialCandidatesGenerator {
    /// Create an uninitialised generator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeCandidatesGenerator for SequentialCandidatesGenerator {
    fn init(&mut self, m: &QModule, _analyses: &Analyses) -> CompileResult<()> {
        self.ids = m.statement_ids();
        self.pos = 0;
        Ok(())
    }

    fn finished(&self) -> bool {
        self.pos >= self.ids.len()
    }

    fn generate(&mut self) -> Vec<StmtId> {
        vec![self.ids[self.pos]]
    }

    fn signal_processed(&mut self, stmt: StmtId) {
        debug_assert_eq!(stmt, self.ids[self.pos], "processed node out of order");
        self.pos += 1;
    }
}

/// Yields the set of parallel-ready statements from the circuit DAG
/// frontier.
#[derive(Debug, Default)]
pub struct CircuitCandidatesGenerator {
    dag: Option<CircuitDag>,
    it: Option<DagIter>,
    reached: FxHashMap<NodeIndex, u32>,
    node_of: FxHashMap<StmtId, NodeIndex>,
}

impl CircuitCandidatesGenerator {
    /// Create an uninitialised generator.
    pub fn new() -> Self {
        Self::default()
    }

    fn advance_xbit(&mut self, x: u32) {
        let dag = self.dag.as_ref().expect("generator initialised");
        let it = self.it.as_mut().expect("generator initialised");
        it.next(dag, x);
        *self.reached.entry(it.at(x)).or_insert(0) += 1;
    }
}

impl NodeCandidatesGenerator for CircuitCandidatesGenerator {
    fn init(&mut self, _m: &QModule, analyses: &Analyses) -> CompileResult<()> {
        let dag = analyses.dag.clone();
        self.it = Some(dag.iter());
        self.dag = Some(dag);
        self.reached.clear();
        self.node_of.clear();

        let size = self.dag.as_ref().expect("just set").size();
        for x in 0..size {
            self.advance_xbit(x);
        }
        Ok(())
    }

    fn finished(&self) -> bool {
        let dag = self.dag.as_ref().expect("generator initialised");
        let it = self.it.as_ref().expect("generator initialised");
        it.finished(dag)
    }

    fn generate(&mut self) -> Vec<StmtId> {
        let dag = self.dag.as_ref().expect("generator initialised");
        let it = self.it.as_ref().expect("generator initialised");

        let mut batch = vec![];
        for x in 0..dag.size() {
            let node = it.at(x);
            if let Some(stmt) = dag.stmt(node) {
                if self.reached.get(&node) == Some(&dag.num_xbits(node)) {
                    self.node_of.insert(stmt, node);
                    batch.push(stmt);
                }
            }
        }
        batch.sort_unstable();
        batch.dedup();
        batch
    }

    fn signal_processed(&mut self, stmt: StmtId) {
        let node = self
            .node_of
            .remove(&stmt)
            .expect("processed node came from generate()");
        self.reached.remove(&node);

        let xbits = {
            let dag = self.dag.as_ref().expect("generator initialised");
            match dag.node(node) {
                crate::analysis::DagNode::Op { xbits, .. } => xbits.clone(),
                _ => vec![],
            }
        };
        for x in xbits {
            self.advance_xbit(x);
        }
    }
}

// ---- bounded selection --------------------------------------------------

/// Deterministic truncation to the first `max` candidates.
#[derive(Debug, Default)]
pub struct FirstCandidateSelector;

impl CandidateSelector for FirstCandidateSelector {
    fn select(&mut self, max: u32, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.truncate((max as usize).min(candidates.len()));
        candidates
    }
}

/// Without-replacement roulette selection weighted toward cheap
/// candidates.
///
/// Each candidate's weight is `Σc² − c²`, so lower-cost candidates are
/// favoured without making the choice monotone. Fully deterministic for
/// a given seed.
#[derive(Debug)]
pub struct WeightedRouletteSelector {
    rng: StdRng,
}

impl WeightedRouletteSelector {
    /// Create a selector with the given seed.
    pub fn new(seed: u64) -> Self {
        WeightedRouletteSelector {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CandidateSelector for WeightedRouletteSelector {
    fn select(&mut self, max: u32, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let count = (max as usize).min(candidates.len());
        if count == candidates.len() {
            return candidates;
        }

        let sq_sum: u64 = candidates.iter().map(|c| (c.cost as u64).pow(2)).sum();
        let weights: Vec<u64> = if sq_sum == 0 {
            vec![1; candidates.len()]
        } else {
            candidates
                .iter()
                .map(|c| sq_sum - (c.cost as u64).pow(2))
                .collect()
        };

        let mut total: u64 = weights.iter().sum();
        let mut taken = vec![false; candidates.len()];
        let mut selected = Vec::with_capacity(count);

        for _ in 0..count {
            if total == 0 {
                // Remaining weights are all zero; take in order.
                if let Some(j) = taken.iter().position(|&t| !t) {
                    taken[j] = true;
                    selected.push(j);
                }
                continue;
            }

            let r = self.rng.gen_range(0..total);
            let mut acc = 0u64;
            let mut chosen = None;
            for (j, &w) in weights.iter().enumerate() {
                if taken[j] {
                    continue;
                }
                acc += w;
                if r < acc {
                    chosen = Some(j);
                    break;
                }
            }
            let j = chosen.unwrap_or_else(|| {
                taken.iter().position(|&t| !t).expect("count < len")
            });
            taken[j] = true;
            total -= weights[j];
            selected.push(j);
        }

        let mut by_index: Vec<(usize, Candidate)> = candidates
            .into_iter()
            .enumerate()
            .filter(|(j, _)| selected.contains(j))
            .collect();
        by_index.sort_by_key(|(j, _)| selected.iter().position(|s| s == j));
        by_index.into_iter().map(|(_, c)| c).collect()
    }
}

// ---- cost estimation ----------------------------------------------------

/// Overweights the expected swap distance relative to per-partition
/// mapping cost. Tunable.
const SWAP_DISTANCE_WEIGHT: u32 = 30;

/// Estimates transition cost as the weighted sum of geodesic distances
/// each live qubit has to travel.
#[derive(Debug, Default)]
pub struct GeoDistanceEstimator {
    dist: Vec<Vec<u32>>,
}

impl GeoDistanceEstimator {
    /// Create an unbound estimator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwapCostEstimator for GeoDistanceEstimator {
    fn init(&mut self, g: &Graph) {
        let mut bfs = BfsDistance::new();
        self.dist = (0..g.size()).map(|u| bfs.row(g, u).to_vec()).collect();
    }

    fn estimate(&mut self, from: &Mapping, to: &Mapping) -> u32 {
        let mut total = 0u32;
        for (i, &src) in from.iter().enumerate() {
            if src != UNDEF {
                total = total.saturating_add(self.dist[src as usize][to[i] as usize]);
            }
        }
        total.saturating_mul(SWAP_DISTANCE_WEIGHT)
    }
}

// ---- live-qubit propagation ---------------------------------------------

/// Carries live qubits into the next mapping, preferring their current
/// position and falling back to the nearest free physical qubit.
#[derive(Debug, Default)]
pub struct GeoNearestProcessor {
    dist: Vec<Vec<u32>>,
    p: u32,
}

impl GeoNearestProcessor {
    /// Create an unbound processor.
    pub fn new() -> Self {
        Self::default()
    }

    fn nearest_free(&self, u: u32, inv: &[u32]) -> u32 {
        let mut best = 0;
        let mut best_dist = UNDEF;
        for v in 0..self.p {
            if inv[v as usize] == UNDEF && self.dist[u as usize][v as usize] < best_dist {
                best_dist = self.dist[u as usize][v as usize];
                best = v;
            }
        }
        best
    }
}

impl LiveQubitsPreProcessor for GeoNearestProcessor {
    fn init(&mut self, g: &Graph) {
        self.p = g.size();
        let mut bfs = BfsDistance::new();
        self.dist = (0..g.size()).map(|u| bfs.row(g, u).to_vec()).collect();
    }

    fn process(&mut self, from: &Mapping, to: &mut Mapping) {
        let mut to_inv = invert_mapping(self.p, to);

        for i in 0..from.len() {
            if to[i] == UNDEF && from[i] != UNDEF {
                if to_inv[from[i] as usize] == UNDEF {
                    to[i] = from[i];
                } else {
                    to[i] = self.nearest_free(from[i], &to_inv);
                }
                to_inv[to[i] as usize] = i as u32;
            }
        }

        // The nearest-free rule must keep the mapping injective.
        let mut seen = vec![false; self.p as usize];
        for &pq in to.iter().filter(|&&pq| pq != UNDEF) {
            assert!(
                !seen[pq as usize],
                "live-qubit propagation produced a non-injective mapping"
            );
            seen[pq as usize] = true;
        }
    }
}

// ---- mapping-sequence selection -----------------------------------------

/// Keeps the `n` cheapest final DP rows for traceback.
#[derive(Debug)]
pub struct BestNMapSeqSelector {
    n: u32,
}

impl BestNMapSeqSelector {
    /// Keep the `n` best rows.
    pub fn new(n: u32) -> Self {
        BestNMapSeqSelector { n: n.max(1) }
    }
}

impl MapSeqSelector for BestNMapSeqSelector {
    fn select(&mut self, mem: &[Vec<TracebackInfo>]) -> Vec<u32> {
        let last = mem.last().expect("DP table has at least one row");
        let mut ranked: Vec<(u64, u32)> = last
            .iter()
            .enumerate()
            .map(|(i, info)| {
                (
                    info.mapping_cost as u64 + info.swap_cost as u64,
                    i as u32,
                )
            })
            .collect();
        ranked.sort_unstable();
        ranked
            .into_iter()
            .take(self.n as usize)
            .map(|(_, i)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_arch::GraphKind;

    fn line(n: u32) -> Graph {
        let mut g = Graph::new(n, GraphKind::Undirected);
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g
    }

    fn cand(mapping: Vec<u32>, cost: u32) -> Candidate {
        Candidate { mapping, cost }
    }

    #[test]
    fn test_sequential_generator_walks_in_order() {
        let m = alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\nreset q[0];\n")
            .unwrap();
        let analyses = Analyses::build(&m).unwrap();
        let ids = m.statement_ids();

        let mut generator = SequentialCandidatesGenerator::new();
        generator.init(&m, &analyses).unwrap();

        assert!(!generator.finished());
        assert_eq!(generator.generate(), vec![ids[0]]);
        generator.signal_processed(ids[0]);
        assert_eq!(generator.generate(), vec![ids[1]]);
        generator.signal_processed(ids[1]);
        assert!(generator.finished());
    }

    #[test]
    fn test_circuit_generator_yields_parallel_ready() {
        let m = alsvid_qasm::parse(
            "OPENQASM 2.0;\nqreg q[4];\nCX q[0], q[1];\nCX q[2], q[3];\nCX q[1], q[2];\n",
        )
        .unwrap();
        let analyses = Analyses::build(&m).unwrap();
        let ids = m.statement_ids();

        let mut generator = CircuitCandidatesGenerator::new();
        generator.init(&m, &analyses).unwrap();

        let batch = generator.generate();
        assert_eq!(batch, vec![ids[0], ids[1]]);

        generator.signal_processed(ids[0]);
        let batch = generator.generate();
        assert_eq!(batch, vec![ids[1]]);

        generator.signal_processed(ids[1]);
        assert_eq!(generator.generate(), vec![ids[2]]);
        generator.signal_processed(ids[2]);
        assert!(generator.finished());
    }

    #[test]
    fn test_first_selector_truncates() {
        let cands = vec![
            cand(vec![0], 1),
            cand(vec![1], 2),
            cand(vec![2], 3),
        ];
        let mut sel = FirstCandidateSelector;
        let kept = sel.select(2, cands);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].cost, 1);
    }

    #[test]
    fn test_roulette_is_seeded_and_complete() {
        let cands: Vec<Candidate> = (0..6).map(|i| cand(vec![i], i)).collect();

        let mut a = WeightedRouletteSelector::new(42);
        let mut b = WeightedRouletteSelector::new(42);
        let ka: Vec<u32> = a.select(3, cands.clone()).iter().map(|c| c.cost).collect();
        let kb: Vec<u32> = b.select(3, cands.clone()).iter().map(|c| c.cost).collect();
        assert_eq!(ka, kb, "same seed must select the same candidates");
        assert_eq!(ka.len(), 3);

        // Unbounded selection returns everything untouched.
        let mut c = WeightedRouletteSelector::new(0);
        assert_eq!(c.select(UNDEF, cands.clone()).len(), 6);
    }

    #[test]
    fn test_geo_estimator_weights_distance() {
        let g = line(4);
        let mut est = GeoDistanceEstimator::new();
        est.init(&g);

        let from = vec![0, 1, UNDEF, UNDEF];
        let to = vec![3, 1, UNDEF, UNDEF];
        assert_eq!(est.estimate(&from, &to), 3 * SWAP_DISTANCE_WEIGHT);
    }

    #[test]
    fn test_live_propagation_prefers_same_slot() {
        let g = line(4);
        let mut live = GeoNearestProcessor::new();
        live.init(&g);

        let from = vec![2, 0, UNDEF, UNDEF];
        let mut to = vec![UNDEF, UNDEF, 3, UNDEF];
        live.process(&from, &mut to);

        assert_eq!(to[0], 2);
        assert_eq!(to[1], 0);
        assert_eq!(to[2], 3);
        assert_eq!(to[3], UNDEF);
    }

    #[test]
    fn test_live_propagation_moves_to_nearest_free() {
        let g = line(4);
        let mut live = GeoNearestProcessor::new();
        live.init(&g);

        // Virtual 0 sat on physical 1, which the next mapping gives away.
        let from = vec![1, UNDEF];
        let mut to = vec![UNDEF, 1];
        live.process(&from, &mut to);

        assert!(to[0] == 0 || to[0] == 2, "nearest free neighbour of 1");
    }

    #[test]
    fn test_best_n_selector_orders_by_total_cost() {
        let row = vec![
            TracebackInfo {
                mapping: vec![],
                parent: UNDEF,
                mapping_cost: 10,
                swap_cost: 5,
            },
            TracebackInfo {
                mapping: vec![],
                parent: UNDEF,
                mapping_cost: 3,
                swap_cost: 1,
            },
            TracebackInfo {
                mapping: vec![],
                parent: UNDEF,
                mapping_cost: 6,
                swap_cost: 0,
            },
        ];
        let mut sel = BestNMapSeqSelector::new(2);
        assert_eq!(sel.select(&[row]), vec![1, 2]);
    }
}
