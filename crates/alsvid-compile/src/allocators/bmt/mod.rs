//! The bounded-mapping-tree allocator.
//!
//! A three-phase search:
//!
//! 1. **Partitioning** — walk the program, growing a set of partial
//!    mapping candidates per partition; when no candidate can absorb the
//!    next dependency, close the partition and start a fresh one.
//! 2. **Dynamic programming** — glue the per-partition candidate sets
//!    together, charging each transition the estimated swap distance,
//!    then realise the chosen transitions with a token-swap finder.
//! 3. **Emission** — replay the program partition by partition, renaming
//!    through the current mapping and issuing swap and reverse-CX
//!    intrinsics at partition boundaries.
//!
//! The phases are parameterised by strategy objects (candidate
//! generation, bounded selection, cost estimation, live-qubit
//! propagation, sequence selection, token swapping) so variants share
//! one engine.

pub mod strategies;

pub use strategies::{
    BestNMapSeqSelector, CircuitCandidatesGenerator, FirstCandidateSelector,
    GeoDistanceEstimator, GeoNearestProcessor, SequentialCandidatesGenerator,
    WeightedRouletteSelector,
};

use alsvid_arch::{
    ApproxSwapFinder, ArchGraph, Graph, Mapping, SwapSeq, TokenSwapFinder, UNDEF, fill_mapping,
    identity_mapping, invert_mapping,
};
use alsvid_ir::{QModule, Stmt, StmtId};

use crate::allocators::{AllocContext, QbitAllocator, mapping_rename_table};
use crate::analysis::{Analyses, Dep};
use crate::error::{CompileError, CompileResult};
use crate::intrinsics;
use crate::stats::{Stats, Timer};

/// A partial mapping plus its accumulated cost.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The partial virtual-to-physical assignment.
    pub mapping: Mapping,
    /// Cost of the dependencies absorbed so far.
    pub cost: u32,
}

/// One cell of the phase-2 dynamic-programming table.
#[derive(Debug, Clone)]
pub struct TracebackInfo {
    /// The (live-qubit-completed) mapping of this cell.
    pub mapping: Mapping,
    /// Index of the chosen predecessor in the previous row.
    pub parent: u32,
    /// Accumulated mapping cost.
    pub mapping_cost: u32,
    /// Accumulated estimated swap cost.
    pub swap_cost: u32,
}

/// The phase-2 result: one mapping per partition and the swap sequences
/// realising each transition.
#[derive(Debug, Clone)]
pub struct MappingSwapSequence {
    /// Mappings, one per partition.
    pub mappings: Vec<Mapping>,
    /// Swap sequences between consecutive mappings.
    pub swap_seqs: Vec<SwapSeq>,
    /// Total mapping + swap cost.
    pub cost: u32,
}

/// Produces the next batch of allocatable statements.
pub trait NodeCandidatesGenerator {
    /// Bind to the program under allocation.
    fn init(&mut self, m: &QModule, analyses: &Analyses) -> CompileResult<()>;
    /// True once every statement was consumed.
    fn finished(&self) -> bool;
    /// The current batch of candidate statements.
    fn generate(&mut self) -> Vec<StmtId>;
    /// Mark one statement of the batch as committed.
    fn signal_processed(&mut self, stmt: StmtId);
}

/// Bounded selection over mapping candidates.
pub trait CandidateSelector {
    /// Keep at most `max` of `candidates`.
    fn select(&mut self, max: u32, candidates: Vec<Candidate>) -> Vec<Candidate>;
}

/// Estimates the swap cost of moving between two mappings.
pub trait SwapCostEstimator {
    /// Bind to the coupling graph.
    fn init(&mut self, g: &Graph);
    /// Weighted distance estimate between two mappings.
    fn estimate(&mut self, from: &Mapping, to: &Mapping) -> u32;
}

/// Completes a mapping with the live qubits of its predecessor.
pub trait LiveQubitsPreProcessor {
    /// Bind to the coupling graph.
    fn init(&mut self, g: &Graph);
    /// Fill every slot of `to` that is live in `from` but unset in `to`.
    fn process(&mut self, from: &Mapping, to: &mut Mapping);
}

/// Chooses which final DP rows to traceback.
pub trait MapSeqSelector {
    /// Indices into the last row of `mem`.
    fn select(&mut self, mem: &[Vec<TracebackInfo>]) -> Vec<u32>;
}

/// The bounded-mapping-tree allocator with pluggable strategies.
pub struct BmtAllocator {
    generator: Box<dyn NodeCandidatesGenerator>,
    children_selector: Box<dyn CandidateSelector>,
    partial_selector: Box<dyn CandidateSelector>,
    estimator: Box<dyn SwapCostEstimator>,
    live: Box<dyn LiveQubitsPreProcessor>,
    mapseq_selector: Box<dyn MapSeqSelector>,
    ts_finder: Box<dyn TokenSwapFinder>,
}

impl BmtAllocator {
    /// The improved strategy mix: circuit-frontier candidate generation
    /// and seeded weighted-roulette selection.
    pub fn new_improved(seed: u64) -> Self {
        BmtAllocator {
            generator: Box::new(CircuitCandidatesGenerator::new()),
            children_selector: Box::new(WeightedRouletteSelector::new(seed)),
            partial_selector: Box::new(WeightedRouletteSelector::new(seed.wrapping_add(1))),
            estimator: Box::new(GeoDistanceEstimator::new()),
            live: Box::new(GeoNearestProcessor::new()),
            mapseq_selector: Box::new(BestNMapSeqSelector::new(1)),
            ts_finder: Box::new(ApproxSwapFinder::new()),
        }
    }

    /// The deterministic strategy mix: program-order candidate
    /// generation and first-k selection.
    pub fn new_sequential() -> Self {
        BmtAllocator {
            generator: Box::new(SequentialCandidatesGenerator::new()),
            children_selector: Box::new(FirstCandidateSelector),
            partial_selector: Box::new(FirstCandidateSelector),
            estimator: Box::new(GeoDistanceEstimator::new()),
            live: Box::new(GeoNearestProcessor::new()),
            mapseq_selector: Box::new(BestNMapSeqSelector::new(1)),
            ts_finder: Box::new(ApproxSwapFinder::new()),
        }
    }

    /// Override how many final mapping sequences phase 2 tracebacks.
    pub fn with_max_mapseq(mut self, n: u32) -> Self {
        self.mapseq_selector = Box::new(BestNMapSeqSelector::new(n));
        self
    }

    // ---- phase 1 --------------------------------------------------------

    /// Weight-rank a batch of candidate statements. Lower is better:
    /// dependency-free statements first, then already-satisfied pairs,
    /// half-mapped, unmapped, and finally mapped-but-distant pairs.
    fn rank_candidates(
        analyses: &Analyses,
        batch: &[StmtId],
        mapped: &[bool],
        neighbors: &[rustc_hash::FxHashSet<u32>],
    ) -> CompileResult<Vec<(u32, StmtId, Option<Dep>)>> {
        let mut ranked = Vec::with_capacity(batch.len());

        for &sid in batch {
            let deps = analyses
                .deps
                .deps(sid)
                .map(|d| d.deps.as_slice())
                .unwrap_or_default();

            let (weight, dep) = match deps {
                [] => (0, None),
                [dep] => {
                    let (a, b) = (dep.from as usize, dep.to as usize);
                    let weight = if mapped[a] && mapped[b] && neighbors[a].contains(&dep.to) {
                        1
                    } else if !mapped[a] && !mapped[b] {
                        3
                    } else if !mapped[a] || !mapped[b] {
                        2
                    } else {
                        4
                    };
                    (weight, Some(*dep))
                }
                _ => {
                    return Err(CompileError::UnsupportedCall {
                        stmt: format!("{sid}"),
                    });
                }
            };
            ranked.push((weight, sid, dep));
        }

        ranked.sort_by_key(|&(weight, sid, _)| (weight, sid));
        Ok(ranked)
    }

    /// Extend every candidate with one dependency, bounding the fan-out
    /// with the children and partial-solution selectors.
    fn extend_candidates(
        &mut self,
        arch: &ArchGraph,
        ctx: &AllocContext,
        dep: Dep,
        mapped: &[bool],
        candidates: &[Candidate],
        ignore_children_limit: bool,
    ) -> Vec<Candidate> {
        let (a, b) = (dep.from as usize, dep.to as usize);
        let p = arch.size();
        let children_bound = if ignore_children_limit {
            UNDEF
        } else {
            ctx.bmt.max_children
        };

        let mut extended = vec![];
        for cand in candidates {
            let inv = invert_mapping(p, &cand.mapping);
            let mut pairs: Vec<(u32, u32)> = vec![];

            if mapped[a] && mapped[b] {
                let (u, v) = (cand.mapping[a], cand.mapping[b]);
                if arch.has_edge(u, v) || arch.has_edge(v, u) {
                    pairs.push((u, v));
                }
            } else if !mapped[a] && !mapped[b] {
                for u in 0..p {
                    if inv[u as usize] != UNDEF {
                        continue;
                    }
                    for v in arch.adj(u) {
                        if inv[v as usize] == UNDEF {
                            pairs.push((u, v));
                        }
                    }
                }
            } else {
                let u = if mapped[a] {
                    cand.mapping[a]
                } else {
                    cand.mapping[b]
                };
                for v in arch.adj(u) {
                    if inv[v as usize] == UNDEF {
                        if mapped[a] {
                            pairs.push((u, v));
                        } else {
                            pairs.push((v, u));
                        }
                    }
                }
            }

            let mut local = Vec::with_capacity(pairs.len());
            for (u, v) in pairs {
                let mut child = cand.clone();
                child.mapping[a] = u;
                child.mapping[b] = v;
                child.cost += ctx.costs.cx_cost(arch, u, v);
                local.push(child);
            }

            extended.extend(self.children_selector.select(children_bound, local));
        }

        self.partial_selector.select(ctx.bmt.max_partial, extended)
    }

    /// Partition the program into maximal prefixes whose dependencies
    /// are satisfiable under a shared set of partial mappings.
    fn phase1(
        &mut self,
        arch: &ArchGraph,
        ctx: &AllocContext,
        analyses: &Analyses,
        v: u32,
    ) -> CompileResult<(Vec<Vec<Candidate>>, Vec<Vec<StmtId>>)> {
        let fresh = || {
            vec![Candidate {
                mapping: vec![UNDEF; v as usize],
                cost: 0,
            }]
        };

        let mut partitions: Vec<Vec<StmtId>> = vec![vec![]];
        let mut candidates = fresh();
        let mut collection: Vec<Vec<Candidate>> = vec![];
        let mut mapped = vec![false; v as usize];
        let mut neighbors = vec![rustc_hash::FxHashSet::default(); v as usize];
        let mut first = true;
        let mut stuck = false;

        tracing::debug!("phase 1: solving subgraph-isomorphism prefixes");

        while !self.generator.finished() {
            let batch = self.generator.generate();
            let ranked = Self::rank_candidates(analyses, &batch, &mapped, &neighbors)?;
            if ranked.is_empty() {
                return Err(CompileError::Unreachable(
                    "candidate generator produced an empty batch".into(),
                ));
            }

            let mut chosen: Option<(StmtId, Option<Dep>)> = None;
            let mut new_candidates: Vec<Candidate> = vec![];

            for (_, sid, dep) in ranked {
                match dep {
                    None => {
                        new_candidates = candidates.clone();
                        chosen = Some((sid, None));
                        break;
                    }
                    Some(dep) => {
                        new_candidates =
                            self.extend_candidates(arch, ctx, dep, &mapped, &candidates, first);
                        first = false;
                        if !new_candidates.is_empty() {
                            chosen = Some((sid, Some(dep)));
                            break;
                        }
                    }
                }
            }

            if new_candidates.is_empty() {
                if stuck {
                    return Err(CompileError::Unreachable(
                        "no candidate extension exists even for a fresh partition".into(),
                    ));
                }
                stuck = true;

                // Close the current partition and retry the batch fresh.
                collection.push(std::mem::replace(&mut candidates, fresh()));
                mapped.fill(false);
                partitions.push(vec![]);
                first = true;
            } else {
                stuck = false;
                let (sid, dep) = chosen.expect("an extension implies a chosen node");
                if let Some(dep) = dep {
                    mapped[dep.from as usize] = true;
                    mapped[dep.to as usize] = true;
                    neighbors[dep.from as usize].insert(dep.to);
                    neighbors[dep.to as usize].insert(dep.from);
                    candidates = new_candidates;
                }
                partitions
                    .last_mut()
                    .expect("at least one open partition")
                    .push(sid);
                self.generator.signal_processed(sid);
            }
        }

        collection.push(candidates);
        Ok((collection, partitions))
    }

    // ---- phase 2 --------------------------------------------------------

    fn traceback(mem: &[Vec<TracebackInfo>], mut idx: u32) -> (Vec<Mapping>, u32) {
        let last = mem.len() - 1;
        let mapping_cost = mem[last][idx as usize].mapping_cost;

        let mut mappings = Vec::with_capacity(mem.len());
        for row in mem.iter().rev() {
            let info = &row[idx as usize];
            mappings.push(info.mapping.clone());
            idx = info.parent;
        }
        mappings.reverse();
        (mappings, mapping_cost)
    }

    /// Swaps realising `to` from `from`, after aligning the mapped sets.
    fn transforming_swaps(
        &mut self,
        p: u32,
        from: &Mapping,
        mut to: Mapping,
    ) -> CompileResult<SwapSeq> {
        for i in 0..from.len() {
            if from[i] != UNDEF && to[i] == UNDEF {
                return Err(CompileError::Unreachable(
                    "a qubit mapped in the previous partition is unmapped in the next".into(),
                ));
            }
            if from[i] == UNDEF && to[i] != UNDEF {
                to[i] = UNDEF;
            }
        }

        let from_inv = invert_mapping(p, from);
        let to_inv = invert_mapping(p, &to);
        Ok(self.ts_finder.find(&from_inv, &to_inv)?)
    }

    /// Make every mapping of the sequence a total permutation: complete
    /// the final one, then propagate backwards undoing each transition's
    /// swaps.
    fn normalize(mss: &mut MappingSwapSequence, p: u32) {
        let len = mss.mappings.len();
        if len == 0 {
            return;
        }

        let last = mss.mappings.last_mut().expect("nonempty sequence");
        fill_mapping(p, last);
        let mut inv = invert_mapping(p, last);

        for i in (1..len).rev() {
            mss.mappings[i - 1] = mss.mappings[i].clone();
            for s in mss.swap_seqs[i - 1].clone().iter().rev() {
                let a = inv[s.u as usize];
                let b = inv[s.v as usize];
                if a != UNDEF {
                    mss.mappings[i - 1][a as usize] = s.v;
                }
                if b != UNDEF {
                    mss.mappings[i - 1][b as usize] = s.u;
                }
                inv.swap(s.u as usize, s.v as usize);
            }
        }
    }

    /// Glue the partition candidates with dynamic programming and pick
    /// the cheapest realisable mapping sequence.
    fn phase2(
        &mut self,
        arch: &ArchGraph,
        ctx: &AllocContext,
        collection: Vec<Vec<Candidate>>,
    ) -> CompileResult<MappingSwapSequence> {
        let layers = collection.len();
        let p = arch.size();

        tracing::debug!(layers, "phase 2: dynamic programming over partitions");

        let mut mem: Vec<Vec<TracebackInfo>> = Vec::with_capacity(layers);
        mem.push(
            collection[0]
                .iter()
                .map(|c| TracebackInfo {
                    mapping: c.mapping.clone(),
                    parent: UNDEF,
                    mapping_cost: c.cost,
                    swap_cost: 0,
                })
                .collect(),
        );

        for i in 1..layers {
            let mut row = Vec::with_capacity(collection[i].len());
            for cand in &collection[i] {
                let mut best = TracebackInfo {
                    mapping: vec![],
                    parent: UNDEF,
                    mapping_cost: UNDEF,
                    swap_cost: 0,
                };

                for (k, prev) in mem[i - 1].iter().enumerate() {
                    let mut mapping = cand.mapping.clone();
                    self.live.process(&prev.mapping, &mut mapping);

                    let mapping_cost = prev.mapping_cost.saturating_add(cand.cost);
                    let swap_cost = self
                        .estimator
                        .estimate(&prev.mapping, &mapping)
                        .saturating_add(prev.swap_cost);

                    if (mapping_cost as u64 + swap_cost as u64)
                        < (best.mapping_cost as u64 + best.swap_cost as u64)
                    {
                        best = TracebackInfo {
                            mapping,
                            parent: k as u32,
                            mapping_cost,
                            swap_cost,
                        };
                    }
                }
                row.push(best);
            }
            mem.push(row);
        }

        let mut best = MappingSwapSequence {
            mappings: vec![],
            swap_seqs: vec![],
            cost: UNDEF,
        };

        for idx in self.mapseq_selector.select(&mem) {
            let (mappings, mapping_cost) = Self::traceback(&mem, idx);

            let mut swap_seqs = Vec::with_capacity(layers - 1);
            let mut swap_cost = 0u32;
            for i in 1..layers {
                let swaps =
                    self.transforming_swaps(p, &mappings[i - 1], mappings[i].clone())?;
                swap_cost = swap_cost.saturating_add(swaps.len() as u32 * ctx.costs.swap);
                swap_seqs.push(swaps);
            }

            let total = swap_cost.saturating_add(mapping_cost);
            if total < best.cost {
                best = MappingSwapSequence {
                    mappings,
                    swap_seqs,
                    cost: total,
                };
            }
        }

        if best.mappings.is_empty() {
            return Err(CompileError::Unreachable(
                "phase 2 selected no mapping sequence".into(),
            ));
        }

        Self::normalize(&mut best, p);
        Ok(best)
    }

    // ---- phase 3 --------------------------------------------------------

    /// Re-issue the program partition by partition, switching mappings
    /// (and issuing the realising swaps) whenever the current one cannot
    /// satisfy a dependency.
    fn phase3(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        mss: &MappingSwapSequence,
        partitions: &[Vec<StmtId>],
    ) -> CompileResult<Mapping> {
        let mut idx = 0usize;
        let initial = mss.mappings[0].clone();
        let mut mapping = initial.clone();
        let mut table = mapping_rename_table(&analyses.xbits, &mapping, arch)?;

        let mut issued: Vec<Stmt> = vec![];

        for partition in partitions {
            for &sid in partition {
                let stmt = m
                    .statement(sid)
                    .ok_or_else(|| CompileError::Unreachable(format!("lost statement {sid}")))?
                    .clone();
                let dep = analyses.deps.dep(sid);

                let Some(dep) = dep else {
                    let mut renamed = stmt.clone();
                    alsvid_ir::rename_stmt_qargs(&mut renamed, &table);
                    issued.push(renamed);
                    continue;
                };

                let (a, b) = (dep.from as usize, dep.to as usize);
                let mut u = mapping[a];
                let mut v = mapping[b];

                // An unsatisfiable pair means this partition is done:
                // advance to the next mapping, realising it with swaps.
                if u == UNDEF
                    || v == UNDEF
                    || (!arch.has_edge(u, v) && !arch.has_edge(v, u))
                {
                    idx += 1;
                    if idx >= mss.mappings.len() {
                        return Err(CompileError::Unreachable(format!(
                            "ran out of mappings while issuing '{stmt}'"
                        )));
                    }
                    mapping = mss.mappings[idx].clone();
                    table = mapping_rename_table(&analyses.xbits, &mapping, arch)?;

                    for s in &mss.swap_seqs[idx - 1] {
                        let (mut su, mut sv) = (s.u, s.v);
                        if !arch.has_edge(su, sv) {
                            std::mem::swap(&mut su, &mut sv);
                        }
                        issued.push(Stmt::bare(intrinsics::swap_call(
                            arch.node(su)?.clone(),
                            arch.node(sv)?.clone(),
                        )));
                    }

                    u = mapping[a];
                    v = mapping[b];
                }

                if arch.has_edge(u, v) {
                    let mut renamed = stmt.clone();
                    alsvid_ir::rename_stmt_qargs(&mut renamed, &table);
                    issued.push(renamed);
                } else if arch.has_edge(v, u) {
                    issued.push(stmt.rewrap(intrinsics::rev_cx_call(
                        arch.node(u)?.clone(),
                        arch.node(v)?.clone(),
                    )));
                } else {
                    return Err(CompileError::Unreachable(format!(
                        "mapping cannot satisfy dependency ({a} -> {u}, {b} -> {v})"
                    )));
                }
            }
        }

        m.clear_statements();
        m.push_statements(issued);

        Ok(initial)
    }
}

impl QbitAllocator for BmtAllocator {
    fn name(&self) -> &'static str {
        "bmt"
    }

    fn allocate(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        ctx: &AllocContext,
        stats: &mut Stats,
    ) -> CompileResult<Mapping> {
        let v = analyses.xbits.q_size();

        self.generator.init(m, analyses)?;
        self.live.init(arch.graph());
        self.estimator.init(arch.graph());
        self.ts_finder.set_graph(arch.graph())?;

        if analyses.deps.total() == 0 {
            return Ok(identity_mapping(arch.size()));
        }

        let timer = Timer::start();
        let (collection, partitions) = self.phase1(arch, ctx, analyses, v)?;
        stats.phase1_time = timer.elapsed_secs();
        stats.partitions = partitions.iter().filter(|p| !p.is_empty()).count() as u32;

        let timer = Timer::start();
        let mss = self.phase2(arch, ctx, collection)?;
        stats.phase2_time = timer.elapsed_secs();
        stats.total_cost = mss.cost;

        let timer = Timer::start();
        let initial = self.phase3(m, arch, analyses, &mss, &partitions)?;
        stats.phase3_time = timer.elapsed_secs();

        Ok(initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::{replace_with_arch_specs, run_allocation};
    use alsvid_arch::presets;

    fn allocate(src: &str, mut alloc: BmtAllocator) -> (QModule, Mapping) {
        let arch = presets::square5();
        let mut m = alsvid_qasm::parse(src).unwrap();
        let ctx = AllocContext::default();
        let mut stats = Stats::default();
        let mapping =
            run_allocation(&mut alloc, &mut m, &arch, &ctx, &mut stats).unwrap();
        (m, mapping)
    }

    #[test]
    fn test_single_cx_direct() {
        let (m, mapping) = allocate(
            "OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[1];\n",
            BmtAllocator::new_sequential(),
        );
        let arch = presets::square5();

        assert_eq!(m.num_statements(), 1);
        let (_, stmt) = m.statements().next().unwrap();
        let qargs = stmt.qop.qargs();
        let u = arch.uid(&qargs[0].to_string()).unwrap();
        let v = arch.uid(&qargs[1].to_string()).unwrap();
        assert!(arch.has_edge(u, v));
        assert!(mapping.iter().all(|&p| p != UNDEF));
    }

    #[test]
    fn test_empty_program_identity() {
        let arch = presets::square5();
        let mut m = alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[3];\n").unwrap();
        replace_with_arch_specs(&mut m, &arch).unwrap();

        let analyses = Analyses::build(&m).unwrap();
        let mut alloc = BmtAllocator::new_sequential();
        let mapping = alloc
            .allocate(
                &mut m,
                &arch,
                &analyses,
                &AllocContext::default(),
                &mut Stats::default(),
            )
            .unwrap();
        assert_eq!(mapping, identity_mapping(5));
        assert_eq!(m.num_statements(), 0);
    }

    #[test]
    fn test_triangle_pairs_no_swaps() {
        // Two triangles of interactions fit square5 without any swap.
        let src = "OPENQASM 2.0;\nqreg q[5];\nCX q[2], q[1];\nCX q[2], q[0];\nCX q[1], q[0];\nCX q[4], q[3];\nCX q[4], q[0];\nCX q[3], q[0];\n";
        let (m, _) = allocate(src, BmtAllocator::new_sequential());

        let swaps = m
            .statements()
            .filter(|(_, s)| s.qop.is_call_to(intrinsics::SWAP))
            .count();
        assert_eq!(swaps, 0, "a zero-swap placement exists:\n{m}");
    }

    #[test]
    fn test_normalize_produces_total_permutations() {
        let mut mss = MappingSwapSequence {
            mappings: vec![vec![0, 1, UNDEF, UNDEF, UNDEF], vec![1, 0, UNDEF, UNDEF, UNDEF]],
            swap_seqs: vec![vec![alsvid_arch::Swap { u: 0, v: 1 }]],
            cost: 7,
        };
        BmtAllocator::normalize(&mut mss, 5);

        for mapping in &mss.mappings {
            let mut sorted = mapping.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
        }
        assert_eq!(mss.mappings[0][0], 0);
        assert_eq!(mss.mappings[1][0], 1);
    }

    #[test]
    fn test_roulette_variant_also_legal() {
        let src = "OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[3];\nCX q[1], q[4];\nCX q[0], q[4];\n";
        let (m, _) = allocate(src, BmtAllocator::new_improved(7));
        let arch = presets::square5();

        for (_, stmt) in m.statements() {
            if let alsvid_ir::Qop::Cx { control, target } = &stmt.qop {
                let u = arch.uid(&control.to_string()).unwrap();
                let v = arch.uid(&target.to_string()).unwrap();
                assert!(arch.has_any_edge(u, v), "illegal CX in output: {stmt}");
            }
        }
    }
}
