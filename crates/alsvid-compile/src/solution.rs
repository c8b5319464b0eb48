//! Shared solution model and applier.
//!
//! Solution-building allocators describe their result as an initial
//! mapping plus, per dependency-carrying statement, the operation
//! sequence realising it. [`apply_solution`] then rewrites the module in
//! one pass.

use serde::{Deserialize, Serialize};

use alsvid_arch::{ArchGraph, Mapping};
use alsvid_ir::{Arg, QModule, Stmt, StmtId};

use crate::analysis::XbitTable;
use crate::error::{CompileError, CompileResult};
use crate::intrinsics;

/// One physical-level operation of a solution. Indices are virtual; the
/// applier maps them through the evolving placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Issue the statement's own gate on `(a, b)`.
    Cnot {
        /// Control side.
        a: u32,
        /// Target side.
        b: u32,
    },
    /// Swap the placements of `a` and `b`.
    Swap {
        /// First side.
        a: u32,
        /// Second side.
        b: u32,
    },
    /// Issue a reverse-CX intrinsic on `(a, b)`.
    Rev {
        /// Control side.
        a: u32,
        /// Target side.
        b: u32,
    },
    /// Issue a bridged-CX intrinsic on `(a, b)` through `w`.
    Lcnot {
        /// Control side.
        a: u32,
        /// Bridge qubit.
        w: u32,
        /// Target side.
        b: u32,
    },
}

/// An allocator's result in the shared solution model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solution {
    /// The initial virtual-to-physical mapping (total).
    pub initial: Mapping,
    /// Per-statement operation sequences, in program order.
    pub op_seqs: Vec<(StmtId, Vec<Op>)>,
    /// Accumulated cost.
    pub cost: u32,
}

/// Rewrite a module according to a solution.
///
/// Walks statements in program order, maintaining the placement of every
/// virtual qubit. Statements matching the next operation sequence emit
/// their ops (intrinsics inherit the statement's classical condition);
/// everything else is renamed in place.
pub fn apply_solution(m: &mut QModule, sol: &Solution, arch: &ArchGraph) -> CompileResult<()> {
    let xbits = XbitTable::build(m);

    // Placement of each virtual qubit, as the device argument node.
    let mut vmap: Vec<Arg> = Vec::with_capacity(xbits.q_size() as usize);
    for vq in 0..xbits.q_size() {
        let pq = *sol.initial.get(vq as usize).ok_or_else(|| {
            CompileError::Unreachable("solution's initial mapping is too small".into())
        })?;
        vmap.push(arch.node(pq)?.clone());
    }

    let rename = |stmt: &Stmt, vmap: &[Arg]| -> CompileResult<Stmt> {
        let mut out = stmt.clone();
        for arg in out.qop.qargs_mut() {
            let uid = xbits.arg_q_uid(arg).ok_or_else(|| {
                CompileError::Unreachable(format!("unresolved quantum argument '{arg}'"))
            })?;
            *arg = vmap[uid as usize].clone();
        }
        Ok(out)
    };

    let mut dep_idx = 0usize;
    let mut plan: Vec<(StmtId, Vec<Stmt>)> = vec![];

    for (id, stmt) in m.statements() {
        let has_ops = dep_idx < sol.op_seqs.len() && sol.op_seqs[dep_idx].0 == id;
        if !has_ops {
            plan.push((id, vec![rename(stmt, &vmap)?]));
            continue;
        }

        let ops = &sol.op_seqs[dep_idx].1;
        dep_idx += 1;

        if ops.is_empty() {
            plan.push((id, vec![rename(stmt, &vmap)?]));
            continue;
        }

        let mut repl = vec![];
        for op in ops {
            match *op {
                Op::Cnot { .. } => repl.push(rename(stmt, &vmap)?),
                Op::Swap { a, b } => {
                    repl.push(Stmt::bare(intrinsics::swap_call(
                        vmap[a as usize].clone(),
                        vmap[b as usize].clone(),
                    )));
                    vmap.swap(a as usize, b as usize);
                }
                Op::Rev { a, b } => repl.push(stmt.rewrap(intrinsics::rev_cx_call(
                    vmap[a as usize].clone(),
                    vmap[b as usize].clone(),
                ))),
                Op::Lcnot { a, w, b } => repl.push(stmt.rewrap(intrinsics::lcx_call(
                    vmap[a as usize].clone(),
                    vmap[w as usize].clone(),
                    vmap[b as usize].clone(),
                ))),
            }
        }
        plan.push((id, repl));
    }

    for (id, repl) in plan {
        m.replace_statement(id, repl)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::replace_with_arch_specs;
    use alsvid_arch::presets;

    #[test]
    fn test_apply_renames_and_emits_swaps() {
        let arch = presets::square5();
        let mut m =
            alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[3];\n").unwrap();
        replace_with_arch_specs(&mut m, &arch).unwrap();
        let (id, _) = m.statements().next().unwrap();

        // Move virtual 3 next to virtual 0 (swap with virtual 1), then CX.
        let sol = Solution {
            initial: vec![0, 1, 2, 3, 4],
            op_seqs: vec![(id, vec![Op::Swap { a: 1, b: 3 }, Op::Cnot { a: 0, b: 3 }])],
            cost: 7,
        };
        apply_solution(&mut m, &sol, &arch).unwrap();

        let rendered: Vec<String> = m.statements().map(|(_, s)| s.to_string()).collect();
        assert_eq!(rendered, vec!["intrinsic_swap__ q[1], q[3];", "CX q[0], q[1];"]);
    }

    #[test]
    fn test_apply_keeps_condition_on_intrinsics() {
        let arch = presets::square5();
        let mut m = alsvid_qasm::parse(
            "OPENQASM 2.0;\nqreg q[5];\ncreg c[1];\nif (c == 1) CX q[0], q[1];\n",
        )
        .unwrap();
        replace_with_arch_specs(&mut m, &arch).unwrap();
        let (id, _) = m.statements().next().unwrap();

        let sol = Solution {
            initial: vec![0, 1, 2, 3, 4],
            op_seqs: vec![(id, vec![Op::Rev { a: 0, b: 1 }])],
            cost: 4,
        };
        apply_solution(&mut m, &sol, &arch).unwrap();

        let rendered: Vec<String> = m.statements().map(|(_, s)| s.to_string()).collect();
        assert_eq!(rendered, vec!["if (c == 1) intrinsic_rev_cx__ q[0], q[1];"]);
    }

    #[test]
    fn test_apply_with_nontrivial_initial() {
        let arch = presets::square5();
        let mut m =
            alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[5];\nreset q[0];\nCX q[0], q[1];\n")
                .unwrap();
        replace_with_arch_specs(&mut m, &arch).unwrap();
        let (cx_id, _) = m.statements().nth(1).unwrap();

        let sol = Solution {
            initial: vec![2, 4, 0, 1, 3],
            op_seqs: vec![(cx_id, vec![Op::Cnot { a: 0, b: 1 }])],
            cost: 0,
        };
        apply_solution(&mut m, &sol, &arch).unwrap();

        let rendered: Vec<String> = m.statements().map(|(_, s)| s.to_string()).collect();
        assert_eq!(rendered, vec!["reset q[2];", "CX q[2], q[4];"]);
    }
}
