//! Circuit DAG construction.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashSet;

use alsvid_ir::{QModule, Qop, StmtId};

use crate::analysis::xbit::XbitTable;
use crate::error::{CompileError, CompileResult};

/// A node of the circuit DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagNode {
    /// Start of an xbit's chain.
    In(u32),
    /// End of an xbit's chain.
    Out(u32),
    /// A statement touching one or more xbits.
    Op {
        /// The statement this node represents.
        stmt: StmtId,
        /// Real ids of every xbit the statement touches.
        xbits: Vec<u32>,
    },
}

impl DagNode {
    /// True for operation nodes.
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op { .. })
    }

    /// True for output nodes.
    pub fn is_output(&self) -> bool {
        matches!(self, DagNode::Out(_))
    }
}

/// The circuit DAG of a module.
///
/// Every xbit (quantum bits first, then classical bits at
/// `q_size + c`) owns a chain `In → op → … → Out`; an operation node
/// touching `k` xbits sits on `k` chains. Edges carry the xbit id of the
/// chain they belong to.
///
/// Conditions contribute their register's classical bits; measurements
/// contribute the target classical bit.
#[derive(Debug, Clone)]
pub struct CircuitDag {
    graph: DiGraph<DagNode, u32>,
    inputs: Vec<NodeIndex>,
    q_size: u32,
    c_size: u32,
}

impl CircuitDag {
    /// Build the DAG of a flattened module.
    pub fn build(m: &QModule, xbits: &XbitTable) -> CompileResult<Self> {
        let q_size = xbits.q_size();
        let c_size = xbits.c_size();
        let n = (q_size + c_size) as usize;

        let mut graph = DiGraph::new();
        let inputs: Vec<NodeIndex> = (0..n as u32)
            .map(|x| graph.add_node(DagNode::In(x)))
            .collect();
        let mut tails = inputs.clone();

        for (id, stmt) in m.statements() {
            let touched = touched_xbits(stmt, xbits)?;
            let op = graph.add_node(DagNode::Op {
                stmt: id,
                xbits: touched.clone(),
            });
            for x in touched {
                graph.add_edge(tails[x as usize], op, x);
                tails[x as usize] = op;
            }
        }

        for (x, &tail) in tails.iter().enumerate() {
            let out = graph.add_node(DagNode::Out(x as u32));
            graph.add_edge(tail, out, x as u32);
        }

        Ok(CircuitDag {
            graph,
            inputs,
            q_size,
            c_size,
        })
    }

    /// Number of xbits.
    pub fn size(&self) -> u32 {
        self.q_size + self.c_size
    }

    /// Number of quantum bits.
    pub fn q_size(&self) -> u32 {
        self.q_size
    }

    /// Number of classical bits.
    pub fn c_size(&self) -> u32 {
        self.c_size
    }

    /// The node payload at `idx`.
    pub fn node(&self, idx: NodeIndex) -> &DagNode {
        &self.graph[idx]
    }

    /// The statement at an operation node.
    pub fn stmt(&self, idx: NodeIndex) -> Option<StmtId> {
        match &self.graph[idx] {
            DagNode::Op { stmt, .. } => Some(*stmt),
            _ => None,
        }
    }

    /// Number of xbits an operation node touches.
    pub fn num_xbits(&self, idx: NodeIndex) -> u32 {
        match &self.graph[idx] {
            DagNode::Op { xbits, .. } => xbits.len() as u32,
            _ => 0,
        }
    }

    /// Successor of `idx` along the chain of xbit `x`.
    pub fn next_on(&self, idx: NodeIndex, x: u32) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| *e.weight() == x)
            .map(|e| e.target())
    }

    /// Predecessor of `idx` along the chain of xbit `x`.
    pub fn prev_on(&self, idx: NodeIndex, x: u32) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| *e.weight() == x)
            .map(|e| e.source())
    }

    /// A frontier positioned at every xbit's input node.
    pub fn iter(&self) -> DagIter {
        DagIter {
            pos: self.inputs.clone(),
        }
    }
}

/// A movable frontier over the per-xbit chains.
#[derive(Debug, Clone)]
pub struct DagIter {
    pos: Vec<NodeIndex>,
}

impl DagIter {
    /// Advance xbit `x` one node forward. False at the output.
    pub fn next(&mut self, dag: &CircuitDag, x: u32) -> bool {
        match dag.next_on(self.pos[x as usize], x) {
            Some(n) => {
                self.pos[x as usize] = n;
                true
            }
            None => false,
        }
    }

    /// Move xbit `x` one node backward. False at the input.
    pub fn back(&mut self, dag: &CircuitDag, x: u32) -> bool {
        match dag.prev_on(self.pos[x as usize], x) {
            Some(n) => {
                self.pos[x as usize] = n;
                true
            }
            None => false,
        }
    }

    /// The node xbit `x` currently points at.
    pub fn at(&self, x: u32) -> NodeIndex {
        self.pos[x as usize]
    }

    /// The statement xbit `x` currently points at, if on an op node.
    pub fn stmt(&self, dag: &CircuitDag, x: u32) -> Option<StmtId> {
        dag.stmt(self.at(x))
    }

    /// True once every xbit reached its output node.
    pub fn finished(&self, dag: &CircuitDag) -> bool {
        (0..dag.size()).all(|x| dag.node(self.at(x)).is_output())
    }
}

/// The real xbit ids a statement touches, without duplicates.
pub fn touched_xbits(stmt: &alsvid_ir::Stmt, xbits: &XbitTable) -> CompileResult<Vec<u32>> {
    let mut out = vec![];
    let mut seen = FxHashSet::default();
    let mut push = |x: u32| {
        if seen.insert(x) {
            out.push(x);
        }
    };

    for arg in stmt.qop.qargs() {
        let uid = xbits.arg_q_uid(arg).ok_or_else(|| {
            CompileError::Unreachable(format!(
                "unresolved quantum argument '{arg}' in '{stmt}' (module not flattened?)"
            ))
        })?;
        push(uid);
    }

    if let Qop::Measure { carg, .. } = &stmt.qop {
        let uid = xbits.arg_c_uid(carg).ok_or_else(|| {
            CompileError::Unreachable(format!("unresolved classical argument '{carg}' in '{stmt}'"))
        })?;
        push(xbits.q_size() + uid);
    }

    if let Some(cond) = &stmt.cond {
        let uids = xbits.reg_uids(&cond.reg).ok_or_else(|| {
            CompileError::Unreachable(format!("unknown condition register '{}'", cond.reg))
        })?;
        for &uid in uids {
            push(xbits.q_size() + uid);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(src: &str) -> (QModule, XbitTable, CircuitDag) {
        let m = alsvid_qasm::parse(src).expect("test source must parse");
        let xbits = XbitTable::build(&m);
        let dag = CircuitDag::build(&m, &xbits).unwrap();
        (m, xbits, dag)
    }

    #[test]
    fn test_chain_structure() {
        let (m, _, dag) = build("OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\nreset q[0];\n");
        let ids = m.statement_ids();

        let mut it = dag.iter();
        assert!(it.next(&dag, 0));
        assert_eq!(it.stmt(&dag, 0), Some(ids[0]));
        assert!(it.next(&dag, 0));
        assert_eq!(it.stmt(&dag, 0), Some(ids[1]));
        assert!(it.next(&dag, 0));
        assert!(dag.node(it.at(0)).is_output());
        assert!(!it.next(&dag, 0));

        // Qubit 1 sees only the CX.
        assert!(it.next(&dag, 1));
        assert_eq!(it.stmt(&dag, 1), Some(ids[0]));
        assert!(it.next(&dag, 1));
        assert!(dag.node(it.at(1)).is_output());
    }

    #[test]
    fn test_gate_node_spans_all_chains() {
        let (m, _, dag) = build("OPENQASM 2.0;\nqreg q[3];\nbarrier q[0], q[1], q[2];\n");
        let ids = m.statement_ids();

        let mut it = dag.iter();
        for x in 0..3 {
            it.next(&dag, x);
            assert_eq!(it.stmt(&dag, x), Some(ids[0]));
        }
        assert_eq!(dag.num_xbits(it.at(0)), 3);
        assert_eq!(it.at(0), it.at(1));
        assert_eq!(it.at(1), it.at(2));
    }

    #[test]
    fn test_measure_touches_classical_bit() {
        let (_, xbits, dag) = build("OPENQASM 2.0;\nqreg q[1];\ncreg c[1];\nmeasure q[0] -> c[0];\n");
        let mut it = dag.iter();
        let cbit = xbits.q_size();
        assert!(it.next(&dag, cbit));
        assert!(dag.node(it.at(cbit)).is_op());
    }

    #[test]
    fn test_condition_touches_whole_register() {
        let (_, xbits, dag) =
            build("OPENQASM 2.0;\nqreg q[1];\ncreg c[2];\nif (c == 1) reset q[0];\n");
        let mut it = dag.iter();
        for c in 0..2 {
            let x = xbits.q_size() + c;
            assert!(it.next(&dag, x));
            assert!(dag.node(it.at(x)).is_op(), "condition bit {c} not wired");
        }
    }

    #[test]
    fn test_back_moves_to_previous() {
        let (m, _, dag) = build("OPENQASM 2.0;\nqreg q[1];\nreset q[0];\nreset q[0];\n");
        let ids = m.statement_ids();
        let mut it = dag.iter();
        it.next(&dag, 0);
        it.next(&dag, 0);
        assert_eq!(it.stmt(&dag, 0), Some(ids[1]));
        assert!(it.back(&dag, 0));
        assert_eq!(it.stmt(&dag, 0), Some(ids[0]));
    }
}
