//! Semantic equivalence checking.

use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_arch::{Mapping, UNDEF, fill_mapping};
use alsvid_ir::{QModule, Qop, Stmt};

use crate::analysis::{CircuitDag, DagIter, DagNode, XbitTable};
use crate::error::CompileResult;
use crate::intrinsics;
use crate::passes::{FlattenPass, InlineAllPass};
use crate::pass::Pass;

/// Verifies a rewritten module against its pre-allocation source.
///
/// The source is flattened and inlined the same way the allocator saw
/// it, then replayed statement by statement against the output's circuit
/// DAG: a running mapping (seeded with the initial mapping) is advanced
/// past every `intrinsic_swap__` at the frontier, and each source
/// statement must find a matching gate at its mapped position. Bridged
/// CX gates compare endpoints only.
pub struct SemanticVerifierPass {
    src: QModule,
    initial: Mapping,
    basis: Vec<String>,
}

impl SemanticVerifierPass {
    /// Compare against `src` under `initial`.
    pub fn new(src: QModule, initial: Mapping) -> Self {
        SemanticVerifierPass {
            src,
            initial,
            basis: vec![],
        }
    }

    /// Use the same inline basis the allocator used.
    #[must_use]
    pub fn with_basis(mut self, basis: Vec<String>) -> Self {
        self.basis = basis;
        self
    }

    /// True if `dst` is semantically equivalent to the source.
    pub fn verify(&mut self, dst: &QModule) -> CompileResult<bool> {
        FlattenPass.run(&mut self.src)?;
        InlineAllPass::new(self.basis.iter().cloned()).run(&mut self.src)?;

        let src_xbits = XbitTable::build(&self.src);
        let dst_xbits = XbitTable::build(dst);
        let dag = CircuitDag::build(dst, &dst_xbits)?;
        let p = dst_xbits.q_size();

        if src_xbits.q_size() > p || src_xbits.c_size() != dst_xbits.c_size() {
            return Ok(false);
        }

        let mut map = self.initial.clone();
        map.resize(p as usize, UNDEF);
        fill_mapping(p, &mut map);

        let mut frontier = Frontier::new(dst, &dst_xbits, &dag);
        frontier.settle(&mut map);

        for (_, stmt) in self.src.statements() {
            let ok = match &stmt.qop {
                Qop::Measure { qarg, carg } if stmt.cond.is_none() => {
                    self.visit_measure(&src_xbits, &mut frontier, &mut map, qarg, carg, p)
                }
                _ => self.visit_qop(&src_xbits, &mut frontier, &mut map, stmt, p),
            };
            if !ok {
                tracing::warn!(statement = %stmt, "semantic mismatch");
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_measure(
        &self,
        src_xbits: &XbitTable,
        frontier: &mut Frontier<'_>,
        map: &mut Mapping,
        qarg: &alsvid_ir::Arg,
        carg: &alsvid_ir::Arg,
        p: u32,
    ) -> bool {
        let (Some(src_q), Some(src_c)) =
            (src_xbits.arg_q_uid(qarg), src_xbits.arg_c_uid(carg))
        else {
            return false;
        };
        let q = map[src_q as usize];
        let c = p + src_c;

        let node = frontier.at(q);
        let ok = frontier.dag.node(node).is_op()
            && frontier.at(c) == node
            && frontier.ready(node)
            && frontier
                .stmt(node)
                .is_some_and(|s| matches!(s.qop, Qop::Measure { .. }) && s.cond.is_none());

        if ok {
            frontier.consume(node, map);
        }
        ok
    }

    #[allow(clippy::too_many_lines)]
    fn visit_qop(
        &self,
        src_xbits: &XbitTable,
        frontier: &mut Frontier<'_>,
        map: &mut Mapping,
        stmt: &Stmt,
        p: u32,
    ) -> bool {
        // Mapped positions of the source statement's qubits.
        let mut op_qubits = vec![];
        for qarg in stmt.qop.qargs() {
            let Some(uid) = src_xbits.arg_q_uid(qarg) else {
                return false;
            };
            op_qubits.push(map[uid as usize]);
        }
        if op_qubits.is_empty() {
            return false;
        }

        let op_cbits: Vec<u32> = match &stmt.cond {
            Some(cond) => match src_xbits.reg_uids(&cond.reg) {
                Some(uids) => uids.iter().map(|&c| p + c).collect(),
                None => return false,
            },
            None => vec![],
        };

        let node = frontier.at(op_qubits[0]);
        let Some(dst_stmt) = frontier.stmt(node) else {
            return false;
        };
        let dst_stmt = dst_stmt.clone();

        // Conditions must agree on register and value.
        let dst_cbits: Vec<u32> = match (&stmt.cond, &dst_stmt.cond) {
            (Some(sc), Some(dc)) => {
                if sc.value != dc.value {
                    return false;
                }
                match frontier.dst_xbits.reg_uids(&dc.reg) {
                    Some(uids) => uids.iter().map(|&c| p + c).collect(),
                    None => return false,
                }
            }
            (None, None) => vec![],
            _ => return false,
        };
        if op_cbits.len() != dst_cbits.len() {
            return false;
        }

        // Physical qubits of the matched output gate.
        let mut dst_qubits = vec![];
        for qarg in dst_stmt.qop.qargs() {
            let Some(uid) = frontier.dst_xbits.arg_q_uid(qarg) else {
                return false;
            };
            dst_qubits.push(uid);
        }

        // Every mapped source qubit participates, and every involved
        // wire has reached this very gate.
        if !op_qubits.iter().all(|q| dst_qubits.contains(q)) {
            return false;
        }
        if !dst_qubits.iter().all(|&q| frontier.at(q) == node) {
            return false;
        }
        if !frontier.ready(node) {
            return false;
        }

        let ok = if op_qubits.len() > 1 {
            // Two-qubit interactions compare as CNOT endpoints; reverse
            // CX shares the semantics, a bridge compares its endpoints.
            if op_qubits.len() != 2 || dst_qubits.len() < 2 {
                return false;
            }
            let transformed = if dst_stmt.qop.is_call_to(intrinsics::LCX) {
                (dst_qubits[0], dst_qubits[2])
            } else {
                (dst_qubits[0], dst_qubits[1])
            };
            (op_qubits[0], op_qubits[1]) == transformed
        } else {
            same_gate(&stmt.qop, &dst_stmt.qop)
        };

        if ok {
            frontier.consume(node, map);
        }
        ok
    }
}

/// Kind and parameter equality for single-qubit forms.
fn same_gate(src: &Qop, dst: &Qop) -> bool {
    match (src, dst) {
        (
            Qop::U {
                theta: t1,
                phi: p1,
                lambda: l1,
                ..
            },
            Qop::U {
                theta: t2,
                phi: p2,
                lambda: l2,
                ..
            },
        ) => t1 == t2 && p1 == p2 && l1 == l2,
        (
            Qop::Call {
                name: n1,
                params: p1,
                ..
            },
            Qop::Call {
                name: n2,
                params: p2,
                ..
            },
        ) => n1 == n2 && p1 == p2,
        (Qop::Reset { .. }, Qop::Reset { .. }) => true,
        (Qop::Barrier { .. }, Qop::Barrier { .. }) => true,
        (Qop::Measure { .. }, Qop::Measure { .. }) => true,
        _ => false,
    }
}

/// The output module's frontier state.
struct Frontier<'d> {
    dst: &'d QModule,
    dst_xbits: &'d XbitTable,
    dag: &'d CircuitDag,
    it: DagIter,
    reached: FxHashMap<NodeIndex, u32>,
    marked: Vec<bool>,
}

impl<'d> Frontier<'d> {
    fn new(dst: &'d QModule, dst_xbits: &'d XbitTable, dag: &'d CircuitDag) -> Self {
        let mut it = dag.iter();
        for x in 0..dag.size() {
            it.next(dag, x);
        }
        Frontier {
            dst,
            dst_xbits,
            dag,
            it,
            reached: FxHashMap::default(),
            marked: vec![false; dag.size() as usize],
        }
    }

    fn at(&self, x: u32) -> NodeIndex {
        self.it.at(x)
    }

    fn stmt(&self, node: NodeIndex) -> Option<&Stmt> {
        self.dag.stmt(node).and_then(|sid| self.dst.statement(sid))
    }

    fn ready(&self, node: NodeIndex) -> bool {
        self.reached.get(&node) == Some(&0)
    }

    fn update_reached(&mut self) {
        for x in 0..self.dag.size() {
            let node = self.it.at(x);
            if self.dag.node(node).is_op() && !self.marked[x as usize] {
                self.marked[x as usize] = true;
                let count = self
                    .reached
                    .entry(node)
                    .or_insert_with(|| self.dag.num_xbits(node));
                *count -= 1;
            }
        }
    }

    fn advance(&mut self, node: NodeIndex) {
        let xbits = match self.dag.node(node) {
            DagNode::Op { xbits, .. } => xbits.clone(),
            _ => vec![],
        };
        for x in xbits {
            self.it.next(self.dag, x);
            self.marked[x as usize] = false;
        }
    }

    /// Pop every ready swap intrinsic, committing its effect to `map`.
    fn pop_swaps(&mut self, map: &mut Mapping) -> bool {
        self.update_reached();

        let mut pending: Vec<(u32, u32)> = vec![];
        let mut processed: FxHashSet<NodeIndex> = FxHashSet::default();

        for x in 0..self.dag.size() {
            let node = self.it.at(x);
            if !self.dag.node(node).is_op() || !self.ready(node) || processed.contains(&node) {
                continue;
            }
            let Some(stmt) = self.stmt(node) else { continue };
            let Qop::Call { name, qargs, .. } = &stmt.qop else {
                continue;
            };
            if name != intrinsics::SWAP || qargs.len() != 2 {
                continue;
            }
            let (Some(u), Some(v)) = (
                self.dst_xbits.arg_q_uid(&qargs[0]),
                self.dst_xbits.arg_q_uid(&qargs[1]),
            ) else {
                continue;
            };

            processed.insert(node);
            pending.push((u, v));
            self.advance(node);
        }

        if pending.is_empty() {
            return false;
        }

        // Swaps of one round act on disjoint wires; the inverse computed
        // up front stays valid for all of them.
        let mut assign = vec![UNDEF; map.len()];
        for (vq, &pq) in map.iter().enumerate() {
            if pq != UNDEF {
                assign[pq as usize] = vq as u32;
            }
        }
        for (u, v) in pending {
            let (a, b) = (assign[u as usize], assign[v as usize]);
            if a != UNDEF && b != UNDEF {
                map.swap(a as usize, b as usize);
            }
        }
        true
    }

    /// Settle the frontier: count reached wires and commute swaps out.
    fn settle(&mut self, map: &mut Mapping) {
        while self.pop_swaps(map) {}
    }

    /// Consume a matched gate and settle again.
    fn consume(&mut self, node: NodeIndex, map: &mut Mapping) {
        self.advance(node);
        self.settle(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> QModule {
        alsvid_qasm::parse(src).unwrap()
    }

    fn identity(n: u32) -> Mapping {
        (0..n).collect()
    }

    #[test]
    fn test_identity_rewrite_accepted() {
        let src = parse("OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nCX q[0], q[1];\nmeasure q[0] -> c[0];\n");
        let dst = src.clone_module();
        let mut verifier = SemanticVerifierPass::new(src, identity(2));
        assert!(verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_renamed_under_mapping_accepted() {
        let src = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n");
        // Virtual 0 → physical 1, virtual 1 → physical 0.
        let dst = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[1], q[0];\n");
        let mut verifier = SemanticVerifierPass::new(src, vec![1, 0]);
        assert!(verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_swap_commutes_mapping() {
        let src = parse("OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[1];\nCX q[0], q[2];\n");
        let mut dst = parse("OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[1];\n");
        crate::intrinsics::ensure_declared(&mut dst).unwrap();
        dst.push_statement(Stmt::bare(crate::intrinsics::swap_call(
            alsvid_ir::Arg::idx("q", 1),
            alsvid_ir::Arg::idx("q", 2),
        )));
        dst.push_statement(Stmt::bare(Qop::Cx {
            control: alsvid_ir::Arg::idx("q", 0),
            target: alsvid_ir::Arg::idx("q", 1),
        }));

        let mut verifier = SemanticVerifierPass::new(src, identity(3));
        assert!(verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_wrong_target_rejected() {
        let src = parse("OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[1];\n");
        let dst = parse("OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[2];\n");
        let mut verifier = SemanticVerifierPass::new(src, identity(3));
        assert!(!verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_reversed_direction_rejected() {
        let src = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n");
        let dst = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[1], q[0];\n");
        let mut verifier = SemanticVerifierPass::new(src, identity(2));
        assert!(!verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_rev_intrinsic_matches_cx_semantics() {
        let src = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n");
        let mut dst = parse("OPENQASM 2.0;\nqreg q[2];\n");
        crate::intrinsics::ensure_declared(&mut dst).unwrap();
        dst.push_statement(Stmt::bare(crate::intrinsics::rev_cx_call(
            alsvid_ir::Arg::idx("q", 0),
            alsvid_ir::Arg::idx("q", 1),
        )));

        let mut verifier = SemanticVerifierPass::new(src, identity(2));
        assert!(verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_bridge_compares_endpoints() {
        let src = parse("OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[2];\n");
        let mut dst = parse("OPENQASM 2.0;\nqreg q[3];\n");
        crate::intrinsics::ensure_declared(&mut dst).unwrap();
        dst.push_statement(Stmt::bare(crate::intrinsics::lcx_call(
            alsvid_ir::Arg::idx("q", 0),
            alsvid_ir::Arg::idx("q", 1),
            alsvid_ir::Arg::idx("q", 2),
        )));

        let mut verifier = SemanticVerifierPass::new(src, identity(3));
        assert!(verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_missing_statement_rejected() {
        let src = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\nreset q[0];\n");
        let dst = parse("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n");
        let mut verifier = SemanticVerifierPass::new(src, identity(2));
        assert!(!verifier.verify(&dst).unwrap());
    }

    #[test]
    fn test_condition_value_must_match() {
        let src = parse("OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nif (c == 1) reset q[0];\n");
        let dst = parse("OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nif (c == 0) reset q[0];\n");
        let mut verifier = SemanticVerifierPass::new(src, identity(1));
        assert!(!verifier.verify(&dst).unwrap());

        let src = parse("OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nif (c == 1) reset q[0];\n");
        let dst2 = parse("OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nif (c == 1) reset q[0];\n");
        let mut verifier = SemanticVerifierPass::new(src, identity(1));
        assert!(verifier.verify(&dst2).unwrap());
    }
}
