//! Exact allocation by dynamic programming over permutations.

use alsvid_arch::distance::bfs_path;
use alsvid_arch::{
    ArchGraph, ExactSwapFinder, Mapping, TokenSwapFinder, UNDEF, identity_mapping,
    invert_mapping,
};
use alsvid_ir::QModule;

use crate::allocators::{AllocContext, QbitAllocator};
use crate::analysis::{Analyses, Dep};
use crate::error::{CompileError, CompileResult};
use crate::solution::{Op, Solution, apply_solution};
use crate::stats::Stats;

/// Optimal allocator for small devices.
///
/// Enumerates every placement permutation and runs dynamic programming
/// over the dependency stream, charging transitions with the exact
/// token-swap finder. A dependency may also be satisfied at two-edge
/// distance with a bridged CX. Rejected on devices where the permutation
/// space exceeds the exact finder's bound.
pub struct DynprogAllocator;

#[derive(Debug, Clone, Copy)]
struct Val {
    parent: u32,
    cost: u32,
}

impl DynprogAllocator {
    /// Create the allocator.
    pub fn new() -> Self {
        DynprogAllocator
    }

    fn build_solution(
        &self,
        arch: &ArchGraph,
        ctx: &AllocContext,
        analyses: &Analyses,
    ) -> CompileResult<Solution> {
        let p = arch.size();
        let deps: Vec<(alsvid_ir::StmtId, Dep)> = analyses
            .deps
            .with_deps()
            .map(|d| (d.stmt, d.deps[0]))
            .collect();
        let dep_n = deps.len();

        let mut tsp = ExactSwapFinder::new();
        tsp.set_graph(arch.graph())?;
        let perms: Vec<Vec<u32>> = tsp.permutations().to_vec();
        let perm_n = perms.len();

        if dep_n == 0 {
            return Ok(Solution {
                initial: identity_mapping(p),
                op_seqs: vec![],
                cost: 0,
            });
        }

        // vals[perm][step]: cheapest way to sit on `perm` having served
        // the first `step` dependencies.
        let mut vals = vec![
            vec![
                Val {
                    parent: UNDEF,
                    cost: UNDEF
                };
                dep_n + 1
            ];
            perm_n
        ];
        for row in vals.iter_mut() {
            row[0].cost = 0;
        }

        for (j, &(_, dep)) in deps.iter().enumerate() {
            let step = j + 1;

            for tgt in 0..perm_n {
                let tgt_perm = &perms[tgt];
                let (u, v) = (
                    tgt_perm[dep.from as usize],
                    tgt_perm[dep.to as usize],
                );

                let has_edge = arch.has_any_edge(u, v);
                let path = bfs_path(arch.graph(), u, v);
                if !has_edge && path.len() != 3 {
                    continue;
                }

                let gate_cost = if has_edge {
                    ctx.costs.cx_cost(arch, u, v)
                } else {
                    ctx.costs.lcx
                };

                let mut best = Val {
                    parent: UNDEF,
                    cost: UNDEF,
                };
                for src in 0..perm_n {
                    let src_cost = vals[src][step - 1].cost;
                    if src_cost == UNDEF {
                        continue;
                    }

                    let mut cost = src_cost;
                    if src != tgt {
                        let src_inv = invert_mapping(p, &perms[src]);
                        let tgt_inv = invert_mapping(p, &perms[tgt]);
                        let swaps = tsp.find(&src_inv, &tgt_inv)?;
                        cost = cost.saturating_add(swaps.len() as u32 * ctx.costs.swap);
                    }
                    cost = cost.saturating_add(gate_cost);

                    if cost < best.cost {
                        best = Val {
                            parent: src as u32,
                            cost,
                        };
                    }
                }
                vals[tgt][step] = best;
            }
        }

        // Cheapest final permutation, then the chain back to the start.
        let mut final_perm = 0usize;
        for tgt in 1..perm_n {
            if vals[tgt][dep_n].cost < vals[final_perm][dep_n].cost {
                final_perm = tgt;
            }
        }
        if vals[final_perm][dep_n].cost == UNDEF {
            return Err(CompileError::Unreachable(
                "no permutation sequence satisfies the dependency stream".into(),
            ));
        }

        let mut chain = vec![0usize; dep_n];
        let mut cur = final_perm;
        for step in (1..=dep_n).rev() {
            chain[step - 1] = cur;
            cur = vals[cur][step].parent as usize;
        }

        let mut sol = Solution {
            initial: perms[chain[0]].clone(),
            op_seqs: Vec::with_capacity(dep_n),
            cost: vals[final_perm][dep_n].cost,
        };

        for (j, &(sid, dep)) in deps.iter().enumerate() {
            let mut ops = vec![];

            if j > 0 && chain[j] != chain[j - 1] {
                let mut src_inv = invert_mapping(p, &perms[chain[j - 1]]);
                let tgt_inv = invert_mapping(p, &perms[chain[j]]);
                for s in tsp.find(&src_inv, &tgt_inv)? {
                    let (mut u, mut v) = (s.u, s.v);
                    if !arch.has_edge(u, v) {
                        std::mem::swap(&mut u, &mut v);
                    }
                    ops.push(Op::Swap {
                        a: src_inv[u as usize],
                        b: src_inv[v as usize],
                    });
                    src_inv.swap(u as usize, v as usize);
                }
            }

            let tgt_perm = &perms[chain[j]];
            let (u, v) = (
                tgt_perm[dep.from as usize],
                tgt_perm[dep.to as usize],
            );
            if arch.has_edge(u, v) {
                ops.push(Op::Cnot {
                    a: dep.from,
                    b: dep.to,
                });
            } else if arch.has_edge(v, u) {
                ops.push(Op::Rev {
                    a: dep.from,
                    b: dep.to,
                });
            } else {
                let path = bfs_path(arch.graph(), u, v);
                if path.len() != 3 {
                    return Err(CompileError::Unreachable(format!(
                        "bridged CX needs a two-edge path between {u} and {v}"
                    )));
                }
                let tgt_inv = invert_mapping(p, tgt_perm);
                ops.push(Op::Lcnot {
                    a: dep.from,
                    w: tgt_inv[path[1] as usize],
                    b: dep.to,
                });
            }

            sol.op_seqs.push((sid, ops));
        }

        Ok(sol)
    }
}

impl Default for DynprogAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl QbitAllocator for DynprogAllocator {
    fn name(&self) -> &'static str {
        "dynprog"
    }

    fn allocate(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        ctx: &AllocContext,
        stats: &mut Stats,
    ) -> CompileResult<Mapping> {
        let sol = self.build_solution(arch, ctx, analyses)?;
        apply_solution(m, &sol, arch)?;
        stats.total_cost = sol.cost;
        Ok(sol.initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::run_allocation;
    use crate::intrinsics;
    use alsvid_arch::presets;

    fn allocate(src: &str) -> (QModule, Mapping) {
        let arch = presets::square5();
        let mut m = alsvid_qasm::parse(src).unwrap();
        let mapping = run_allocation(
            &mut DynprogAllocator::new(),
            &mut m,
            &arch,
            &AllocContext::default(),
            &mut Stats::default(),
        )
        .unwrap();
        (m, mapping)
    }

    #[test]
    fn test_dynprog_single_cx() {
        let (m, mapping) = allocate("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[1];\n");
        let arch = presets::square5();

        let mut sorted = mapping.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);

        for (_, stmt) in m.statements() {
            if let alsvid_ir::Qop::Cx { control, target } = &stmt.qop {
                let u = arch.uid(&control.to_string()).unwrap();
                let v = arch.uid(&target.to_string()).unwrap();
                assert!(arch.has_any_edge(u, v));
            }
        }
    }

    #[test]
    fn test_dynprog_finds_zero_swap_placement() {
        let src = "OPENQASM 2.0;\nqreg q[5];\nCX q[2], q[1];\nCX q[2], q[0];\nCX q[1], q[0];\nCX q[4], q[3];\nCX q[4], q[0];\nCX q[3], q[0];\n";
        let (m, _) = allocate(src);
        let swaps = m
            .statements()
            .filter(|(_, s)| s.qop.is_call_to(intrinsics::SWAP))
            .count();
        assert_eq!(swaps, 0, "an optimal allocator must avoid all swaps:\n{m}");
    }

    #[test]
    fn test_dynprog_rejects_large_devices() {
        let arch = presets::linear16();
        let mut m = alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n").unwrap();
        let err = run_allocation(
            &mut DynprogAllocator::new(),
            &mut m,
            &arch,
            &AllocContext::default(),
            &mut Stats::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Arch(_)));
    }
}
