//! Greedy circuit-walking allocation.

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;

use alsvid_arch::{ArchGraph, Mapping, UNDEF, identity_mapping, invert_mapping};
use alsvid_arch::distance::bfs_path;
use alsvid_ir::{QModule, StmtId};

use crate::allocators::{AllocContext, QbitAllocator};
use crate::analysis::{Analyses, DagNode};
use crate::error::{CompileError, CompileResult};
use crate::solution::{Op, Solution, apply_solution};
use crate::stats::Stats;

/// The action the greedy step decided on for one candidate gate.
#[derive(Debug, Clone)]
enum Action {
    /// Issue along a (possibly reversed) edge, swapping along `path`
    /// first when it is non-empty.
    Swp { path: Vec<u32>, move_tgt_to_src: bool },
    /// Relocate the unpinned virtual `from` onto `to`'s position.
    Frz { from: u32, to: u32 },
}

#[derive(Debug, Clone)]
struct AllocProps {
    stmt: StmtId,
    node: NodeIndex,
    cost: u32,
    action: Action,
}

/// Walks the circuit DAG frontier, at each step allocating the ready
/// gate with the cheapest immediate action: a direct edge, a reverse
/// edge, relocating a still-unpinned endpoint next to its partner, or a
/// shortest-path swap chain.
pub struct GreedyAllocator;

impl GreedyAllocator {
    /// Create the allocator.
    pub fn new() -> Self {
        GreedyAllocator
    }
}

impl Default for GreedyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl QbitAllocator for GreedyAllocator {
    fn name(&self) -> &'static str {
        "greedy"
    }

    #[allow(clippy::too_many_lines)]
    fn allocate(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        ctx: &AllocContext,
        stats: &mut Stats,
    ) -> CompileResult<Mapping> {
        let dag = &analyses.dag;
        let xn = dag.size();
        let p = arch.size();
        let v = analyses.xbits.q_size();

        let mut mapping = identity_mapping(p);
        let mut assign = invert_mapping(p, &mapping);

        let mut sol = Solution {
            initial: mapping.clone(),
            op_seqs: vec![],
            cost: 0,
        };

        let mut order: Vec<StmtId> = vec![];
        let mut it = dag.iter();
        for x in 0..xn {
            it.next(dag, x);
        }

        let mut marked = vec![false; xn as usize];
        let mut reached: FxHashMap<NodeIndex, u32> = FxHashMap::default();
        let mut frozen = vec![false; v as usize];

        let advance_node = |it: &mut crate::analysis::DagIter,
                            marked: &mut [bool],
                            node: NodeIndex|
         -> Vec<u32> {
            let xbits = match dag.node(node) {
                DagNode::Op { xbits, .. } => xbits.clone(),
                _ => vec![],
            };
            for &x in &xbits {
                marked[x as usize] = false;
                it.next(dag, x);
            }
            xbits
        };

        while order.len() < m.num_statements() {
            // Trivial single-xbit nodes go straight out.
            let mut redo = false;
            loop {
                let mut changed = false;
                for x in 0..xn {
                    let node = it.at(x);
                    if dag.node(node).is_op() && dag.num_xbits(node) == 1 {
                        order.push(dag.stmt(node).expect("op node has a statement"));
                        it.next(dag, x);
                        changed = true;
                    }
                }
                redo = redo || changed;
                if !changed {
                    break;
                }
            }
            if redo {
                continue;
            }

            // Reach gates through unmarked xbits.
            for x in 0..xn {
                let node = it.at(x);
                if dag.node(node).is_op() && !marked[x as usize] {
                    marked[x as usize] = true;
                    let count = reached.entry(node).or_insert_with(|| dag.num_xbits(node));
                    *count -= 1;
                }
            }

            let mut allocatable: Vec<NodeIndex> = vec![];
            for x in 0..xn {
                let node = it.at(x);
                if dag.node(node).is_op()
                    && reached.get(&node) == Some(&0)
                    && !allocatable.contains(&node)
                {
                    allocatable.push(node);
                }
            }

            if allocatable.is_empty() {
                return Err(CompileError::Unreachable(
                    "greedy walk stalled with no allocatable gate".into(),
                ));
            }

            // Dependency-free multi-xbit nodes (barriers, measures) pin
            // their qubits and go out unchanged.
            let mut issued_depless = false;
            for &node in &allocatable {
                let sid = dag.stmt(node).expect("op node has a statement");
                if analyses.deps.dep(sid).is_some() {
                    continue;
                }
                issued_depless = true;
                order.push(sid);
                for x in advance_node(&mut it, &mut marked, node) {
                    if x < v {
                        frozen[x as usize] = true;
                    }
                }
            }
            if issued_depless {
                continue;
            }

            // Cost every allocatable gate's cheapest action.
            let mut best: Option<AllocProps> = None;
            for &node in &allocatable {
                let sid = dag.stmt(node).expect("op node has a statement");
                let dep = analyses
                    .deps
                    .dep(sid)
                    .expect("dependency-free nodes were issued above");
                let (a, b) = (dep.from as usize, dep.to as usize);
                let (u, w) = (mapping[a], mapping[b]);

                let mut props = AllocProps {
                    stmt: sid,
                    node,
                    cost: 0,
                    action: Action::Swp {
                        path: vec![],
                        move_tgt_to_src: false,
                    },
                };

                if arch.has_edge(u, w) {
                    // Free.
                } else if arch.has_edge(w, u) {
                    props.cost = ctx.costs.rev;
                } else {
                    // Try relocating an unpinned endpoint next to the
                    // other one before resorting to swaps.
                    let mut found_frozen = false;
                    if !frozen[a] || !frozen[b] {
                        let (mut not_frozen, mut other) =
                            if !frozen[b] { (b, a) } else { (a, b) };

                        for _ in 0..2 {
                            if found_frozen || frozen[not_frozen] {
                                break;
                            }
                            let anchor = mapping[other];
                            for nb in arch.adj(anchor) {
                                let candidate = assign[nb as usize];
                                if candidate != UNDEF && !frozen[candidate as usize] {
                                    props.action = Action::Frz {
                                        from: not_frozen as u32,
                                        to: candidate,
                                    };
                                    if !arch.has_edge(anchor, mapping[candidate as usize]) {
                                        props.cost = ctx.costs.rev;
                                    }
                                    found_frozen = true;
                                    break;
                                }
                            }
                            std::mem::swap(&mut not_frozen, &mut other);
                        }
                    }

                    if !found_frozen {
                        let path = bfs_path(arch.graph(), u, w);
                        if path.len() < 2 {
                            return Err(CompileError::Unreachable(format!(
                                "no path between physical qubits {u} and {w}"
                            )));
                        }
                        let mut cost = (path.len() as u32 - 2) * ctx.costs.swap;

                        let edge_from_u = arch.has_edge(path[0], path[1]);
                        let edge_to_w =
                            arch.has_edge(path[path.len() - 2], path[path.len() - 1]);
                        let move_tgt_to_src = if edge_from_u {
                            true
                        } else {
                            if !edge_to_w {
                                cost += ctx.costs.rev;
                            }
                            false
                        };

                        props.cost = cost;
                        props.action = Action::Swp {
                            path,
                            move_tgt_to_src,
                        };
                    }
                }

                if best.as_ref().is_none_or(|b| props.cost < b.cost) {
                    best = Some(props);
                }
            }

            let best = best.expect("allocatable set was nonempty");
            let mut ops: Vec<Op> = vec![];

            match best.action {
                Action::Swp {
                    mut path,
                    move_tgt_to_src,
                } => {
                    if move_tgt_to_src {
                        path.reverse();
                    }
                    if path.len() > 2 {
                        for win in path[..path.len() - 1].windows(2) {
                            let (pu, pv) = (win[0], win[1]);
                            let (a, b) = (assign[pu as usize], assign[pv as usize]);
                            frozen[a as usize] = true;
                            frozen[b as usize] = true;
                            ops.push(Op::Swap { a, b });
                            mapping.swap(a as usize, b as usize);
                            assign.swap(pu as usize, pv as usize);
                        }
                    }
                }
                Action::Frz { from, to } => {
                    let (pu, pv) = (mapping[from as usize], mapping[to as usize]);
                    sol.initial.swap(from as usize, to as usize);
                    mapping.swap(from as usize, to as usize);
                    assign.swap(pu as usize, pv as usize);
                }
            }

            let dep = analyses
                .deps
                .dep(best.stmt)
                .expect("best node carries a dependency");
            frozen[dep.from as usize] = true;
            frozen[dep.to as usize] = true;

            let (u, w) = (mapping[dep.from as usize], mapping[dep.to as usize]);
            if arch.has_edge(u, w) {
                ops.push(Op::Cnot {
                    a: dep.from,
                    b: dep.to,
                });
            } else if arch.has_edge(w, u) {
                ops.push(Op::Rev {
                    a: dep.from,
                    b: dep.to,
                });
            } else {
                return Err(CompileError::Unreachable(format!(
                    "greedy action left dependency ({}, {}) unsatisfied",
                    dep.from, dep.to
                )));
            }

            order.push(best.stmt);
            sol.op_seqs.push((best.stmt, ops));
            sol.cost += best.cost;

            advance_node(&mut it, &mut marked, best.node);
            reached.remove(&best.node);
        }

        m.reorder_statements(&order)?;
        apply_solution(m, &sol, arch)?;
        stats.total_cost = sol.cost;

        Ok(sol.initial)
    }
}
