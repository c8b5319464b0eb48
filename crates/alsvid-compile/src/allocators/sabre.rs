//! SABRE-style heuristic allocation.
//!
//! After Li, Ding and Xie: "Tackling the Qubit Mapping Problem for
//! NISQ-Era Quantum Devices".

use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_arch::{ArchGraph, BfsDistance, Mapping, identity_mapping, invert_mapping};
use alsvid_ir::{QModule, Stmt, StmtId};

use crate::allocators::{AllocContext, QbitAllocator};
use crate::analysis::{Analyses, DagNode, Dep};
use crate::error::{CompileError, CompileResult};
use crate::intrinsics;
use crate::stats::Stats;

/// Heuristic router maintaining a front layer of blocked two-qubit
/// gates.
///
/// While the front has a non-adjacent pair, every swap on an edge
/// incident to a front endpoint is scored by
/// `H = Σ D(front) + 0.5 · Σ D(lookahead)` over the cached BFS distance,
/// and the minimum is applied. Several seeded random initial mappings
/// are tried; the run with the fewest swaps wins.
pub struct SabreAllocator {
    lookahead: usize,
    restarts: usize,
}

impl SabreAllocator {
    /// Default configuration: 20-statement lookahead, 5 restarts.
    pub fn new() -> Self {
        SabreAllocator {
            lookahead: 20,
            restarts: 5,
        }
    }

    /// Override the lookahead window.
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Override the number of random restarts.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Route the program under `initial`. When `issued` is given, the
    /// rewritten statements are collected into it; `cost` accumulates
    /// the intrinsic costs. Returns the number of swaps used.
    #[allow(clippy::too_many_arguments)]
    fn route(
        &self,
        m: &QModule,
        arch: &ArchGraph,
        ctx: &AllocContext,
        analyses: &Analyses,
        dist: &[Vec<u32>],
        mut mapping: Mapping,
        mut issued: Option<&mut Vec<Stmt>>,
        cost: &mut u32,
    ) -> CompileResult<u32> {
        let dag = &analyses.dag;
        let xbits = &analyses.xbits;
        let xn = dag.size();

        let program: Vec<(usize, StmtId)> =
            m.statement_ids().into_iter().enumerate().collect();
        let position: FxHashMap<StmtId, usize> =
            program.iter().map(|&(i, id)| (id, i)).collect();

        let mut it = dag.iter();
        let mut reached: FxHashMap<NodeIndex, u32> = FxHashMap::default();
        for x in 0..xn {
            it.next(dag, x);
            *reached.entry(it.at(x)).or_insert(0) += 1;
        }

        let mut executed: FxHashSet<StmtId> = FxHashSet::default();
        let mut nswaps = 0u32;

        // A generous bound; exceeding it means the heuristic stopped
        // making progress, which is a bug.
        let step_limit = (m.num_statements() as u64 + 1)
            * (arch.size() as u64 + 1)
            * (arch.size() as u64 + 1)
            * 4;
        let mut steps = 0u64;

        loop {
            // Issue everything executable under the current mapping.
            let mut changed = true;
            while changed {
                changed = false;
                for x in 0..xn {
                    let node = it.at(x);
                    let Some(sid) = dag.stmt(node) else { continue };
                    if reached.get(&node) != Some(&dag.num_xbits(node)) {
                        continue;
                    }

                    let dep = analyses.deps.dep(sid);
                    let ok = match dep {
                        None => true,
                        Some(d) => {
                            let (u, v) =
                                (mapping[d.from as usize], mapping[d.to as usize]);
                            arch.has_any_edge(u, v)
                        }
                    };
                    if !ok {
                        continue;
                    }

                    if let Some(out) = issued.as_mut() {
                        let stmt = m.statement(sid).ok_or_else(|| {
                            CompileError::Unreachable(format!("lost statement {sid}"))
                        })?;
                        out.push(issue_gate(stmt, dep, &mapping, arch, xbits, ctx, cost)?);
                    }
                    executed.insert(sid);

                    let node_xbits = match dag.node(node) {
                        DagNode::Op { xbits, .. } => xbits.clone(),
                        _ => vec![],
                    };
                    for xb in node_xbits {
                        it.next(dag, xb);
                        *reached.entry(it.at(xb)).or_insert(0) += 1;
                    }
                    changed = true;
                }
            }

            if it.finished(dag) {
                break;
            }

            // The front layer: ready but blocked two-qubit gates.
            let mut front: Vec<Dep> = vec![];
            let mut front_ids: FxHashSet<StmtId> = FxHashSet::default();
            let mut offset = usize::MAX;
            for x in 0..xn {
                let node = it.at(x);
                let Some(sid) = dag.stmt(node) else { continue };
                if reached.get(&node) != Some(&dag.num_xbits(node)) {
                    continue;
                }
                let Some(dep) = analyses.deps.dep(sid) else { continue };
                if front_ids.insert(sid) {
                    front.push(dep);
                    offset = offset.min(position[&sid]);
                }
            }

            if front.is_empty() {
                return Err(CompileError::Unreachable(
                    "routing stalled with no blocked gate at the frontier".into(),
                ));
            }

            // The lookahead window: upcoming dependencies past the front.
            let mut lookahead: Vec<Dep> = vec![];
            for &(i, sid) in &program {
                if i < offset || i >= offset + self.lookahead {
                    continue;
                }
                if executed.contains(&sid) || front_ids.contains(&sid) {
                    continue;
                }
                if let Some(dep) = analyses.deps.dep(sid) {
                    lookahead.push(dep);
                }
            }

            // Score every swap on an edge incident to a front endpoint.
            let inv = invert_mapping(arch.size(), &mapping);
            let mut used: Vec<u32> = vec![];
            for dep in &front {
                for q in [mapping[dep.from as usize], mapping[dep.to as usize]] {
                    if !used.contains(&q) {
                        used.push(q);
                    }
                }
            }

            let mut best: Option<(f64, (u32, u32))> = None;
            for &u in &used {
                for v in arch.adj(u) {
                    let mut trial = mapping.clone();
                    trial.swap(inv[u as usize] as usize, inv[v as usize] as usize);

                    let current: u32 = front
                        .iter()
                        .map(|d| {
                            dist[trial[d.from as usize] as usize]
                                [trial[d.to as usize] as usize]
                        })
                        .sum();
                    let next: u32 = lookahead
                        .iter()
                        .map(|d| {
                            dist[trial[d.from as usize] as usize]
                                [trial[d.to as usize] as usize]
                        })
                        .sum();
                    let score = current as f64 + 0.5 * next as f64;

                    let better = match &best {
                        None => true,
                        Some((s, pair)) => {
                            score < *s || (score == *s && (u, v) < *pair)
                        }
                    };
                    if better {
                        best = Some((score, (u, v)));
                    }
                }
            }

            let (_, (u, v)) = best.ok_or_else(|| {
                CompileError::Unreachable("no swap candidate at the frontier".into())
            })?;

            mapping.swap(inv[u as usize] as usize, inv[v as usize] as usize);
            nswaps += 1;
            if let Some(out) = issued.as_mut() {
                let (mut su, mut sv) = (u, v);
                if !arch.has_edge(su, sv) {
                    std::mem::swap(&mut su, &mut sv);
                }
                out.push(Stmt::bare(intrinsics::swap_call(
                    arch.node(su)?.clone(),
                    arch.node(sv)?.clone(),
                )));
                *cost += ctx.costs.swap;
            }

            steps += 1;
            if steps > step_limit {
                return Err(CompileError::Unreachable(
                    "routing exceeded its step budget".into(),
                ));
            }
        }

        Ok(nswaps)
    }
}

impl Default for SabreAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite one executable statement under the mapping.
fn issue_gate(
    stmt: &Stmt,
    dep: Option<Dep>,
    mapping: &Mapping,
    arch: &ArchGraph,
    xbits: &crate::analysis::XbitTable,
    ctx: &AllocContext,
    cost: &mut u32,
) -> CompileResult<Stmt> {
    if let Some(dep) = dep {
        let (u, v) = (mapping[dep.from as usize], mapping[dep.to as usize]);
        if !arch.has_edge(u, v) && arch.has_edge(v, u) {
            *cost += ctx.costs.rev;
            return Ok(stmt.rewrap(intrinsics::rev_cx_call(
                arch.node(u)?.clone(),
                arch.node(v)?.clone(),
            )));
        }
    }

    let mut renamed = stmt.clone();
    for arg in renamed.qop.qargs_mut() {
        let uid = xbits.arg_q_uid(arg).ok_or_else(|| {
            CompileError::Unreachable(format!("unresolved quantum argument '{arg}'"))
        })?;
        *arg = arch.node(mapping[uid as usize])?.clone();
    }
    Ok(renamed)
}

impl QbitAllocator for SabreAllocator {
    fn name(&self) -> &'static str {
        "sabre"
    }

    fn allocate(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        ctx: &AllocContext,
        stats: &mut Stats,
    ) -> CompileResult<Mapping> {
        let p = arch.size();

        if analyses.deps.total() == 0 {
            return Ok(identity_mapping(p));
        }

        let mut bfs = BfsDistance::new();
        let dist: Vec<Vec<u32>> = (0..p).map(|u| bfs.row(arch.graph(), u).to_vec()).collect();

        let mut rng = StdRng::seed_from_u64(ctx.seed);
        let mut best: Option<(Mapping, u32)> = None;

        for restart in 0..self.restarts {
            let initial = if restart == 0 {
                identity_mapping(p)
            } else {
                let mut perm = identity_mapping(p);
                perm.shuffle(&mut rng);
                perm
            };

            let mut scratch = 0;
            let nswaps = self.route(
                m,
                arch,
                ctx,
                analyses,
                &dist,
                initial.clone(),
                None,
                &mut scratch,
            )?;
            tracing::debug!(restart, nswaps, "sabre restart scored");

            if best.as_ref().is_none_or(|(_, n)| nswaps < *n) {
                best = Some((initial, nswaps));
            }
        }

        let (initial, _) = best.expect("at least one restart ran");

        let mut issued = vec![];
        let mut cost = 0;
        self.route(
            m,
            arch,
            ctx,
            analyses,
            &dist,
            initial.clone(),
            Some(&mut issued),
            &mut cost,
        )?;

        m.clear_statements();
        m.push_statements(issued);
        stats.total_cost = cost;

        Ok(initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::run_allocation;
    use alsvid_arch::presets;

    #[test]
    fn test_sabre_routes_distant_pair() {
        let arch = presets::square5();
        let mut m =
            alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[4];\nCX q[0], q[1];\n")
                .unwrap();
        let mut stats = Stats::default();
        run_allocation(
            &mut SabreAllocator::new(),
            &mut m,
            &arch,
            &AllocContext::default(),
            &mut stats,
        )
        .unwrap();

        for (_, stmt) in m.statements() {
            if let alsvid_ir::Qop::Cx { control, target } = &stmt.qop {
                let u = arch.uid(&control.to_string()).unwrap();
                let v = arch.uid(&target.to_string()).unwrap();
                assert!(arch.has_any_edge(u, v), "illegal CX in output: {stmt}");
            }
        }
    }

    #[test]
    fn test_sabre_adjacent_program_needs_no_swaps() {
        let arch = presets::square5();
        let mut m =
            alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[1];\nCX q[2], q[3];\n")
                .unwrap();
        run_allocation(
            &mut SabreAllocator::new(),
            &mut m,
            &arch,
            &AllocContext::default(),
            &mut Stats::default(),
        )
        .unwrap();

        let swaps = m
            .statements()
            .filter(|(_, s)| s.qop.is_call_to(intrinsics::SWAP))
            .count();
        assert_eq!(swaps, 0);
    }
}
