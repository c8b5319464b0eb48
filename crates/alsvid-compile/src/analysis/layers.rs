//! CNOT-priority layering.

use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_ir::{QModule, StmtId};

use crate::analysis::dag::CircuitDag;
use crate::error::CompileResult;

/// A layering of the program: an ordered list of layers whose members
/// touch pairwise-disjoint xbits, plus the flattened statement ordering.
#[derive(Debug, Clone, Default)]
pub struct Layering {
    /// Layers in execution order.
    pub layers: Vec<Vec<StmtId>>,
    /// All statements, layer by layer.
    pub order: Vec<StmtId>,
}

/// Layer a program giving multi-qubit gates priority treatment.
///
/// Each round first drains every parallel-ready single-qubit gate into
/// its own layers, then emits one layer of multi-xbit gates whose every
/// xbit has reached them. Controlled gates are the ones that matter for
/// allocation, so they are never mixed into the single-qubit layers.
pub fn cnot_priority_layering(dag: &CircuitDag) -> Layering {
    let xbit_n = dag.size();
    let qubit_n = dag.q_size();

    let mut layering = Layering::default();
    let mut marked = vec![false; xbit_n as usize];
    let mut reached: FxHashMap<petgraph::graph::NodeIndex, u32> = FxHashMap::default();

    let mut it = dag.iter();
    for x in 0..xbit_n {
        it.next(dag, x);
    }

    loop {
        let mut stop = true;

        // Emit single-qubit gates that may execute in parallel.
        loop {
            let mut ugate = false;
            let mut layer = vec![];
            let mut seen = FxHashSet::default();

            for q in 0..qubit_n {
                let node = it.at(q);
                if dag.node(node).is_op() && dag.num_xbits(node) == 1 {
                    if seen.insert(node) {
                        layer.push(dag.stmt(node).expect("op node has a statement"));
                    }
                    it.next(dag, q);
                    ugate = true;
                }
            }

            if !layer.is_empty() {
                layering.order.extend(layer.iter().copied());
                layering.layers.push(layer);
            }
            if !ugate {
                break;
            }
        }

        // Reach gates through unmarked xbits.
        for x in 0..xbit_n {
            let node = it.at(x);
            if dag.node(node).is_op() && !marked[x as usize] {
                marked[x as usize] = true;
                let count = reached.entry(node).or_insert_with(|| dag.num_xbits(node));
                *count -= 1;
            }
        }

        // Advance the gates every xbit has reached, as one layer.
        let mut layer = vec![];
        let mut seen = FxHashSet::default();
        for x in 0..xbit_n {
            let node = it.at(x);
            if dag.node(node).is_op() && reached.get(&node) == Some(&0) {
                if seen.insert(node) {
                    layer.push(dag.stmt(node).expect("op node has a statement"));
                }
                marked[x as usize] = false;
                it.next(dag, x);
            }

            if !dag.node(it.at(x)).is_output() {
                stop = false;
            }
        }

        if !layer.is_empty() {
            layering.order.extend(layer.iter().copied());
            layering.layers.push(layer);
        }

        if stop {
            break;
        }
    }

    layering
}

/// Rewrite a module's statement order from its layering.
pub fn reorder_by_layers(m: &mut QModule, dag: &CircuitDag) -> CompileResult<Layering> {
    let layering = cnot_priority_layering(dag);
    m.reorder_statements(&layering.order)?;
    Ok(layering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::xbit::XbitTable;
    use rustc_hash::FxHashSet;

    fn layer(src: &str) -> (QModule, XbitTable, Layering) {
        let m = alsvid_qasm::parse(src).expect("test source must parse");
        let xbits = XbitTable::build(&m);
        let dag = CircuitDag::build(&m, &xbits).unwrap();
        let layering = cnot_priority_layering(&dag);
        (m, xbits, layering)
    }

    #[test]
    fn test_all_statements_ordered_once() {
        let src = "OPENQASM 2.0;\nqreg q[3];\ncreg c[3];\nU(0, 0, 0) q[0];\nCX q[0], q[1];\nCX q[1], q[2];\nmeasure q[2] -> c[2];\n";
        let (m, _, layering) = layer(src);
        assert_eq!(layering.order.len(), m.num_statements());
        let unique: FxHashSet<_> = layering.order.iter().collect();
        assert_eq!(unique.len(), m.num_statements());
    }

    #[test]
    fn test_layers_touch_disjoint_xbits() {
        let src = "OPENQASM 2.0;\nqreg q[4];\nCX q[0], q[1];\nCX q[2], q[3];\nCX q[1], q[2];\n";
        let (m, xbits, layering) = layer(src);

        for layer in &layering.layers {
            let mut seen = FxHashSet::default();
            for id in layer {
                let stmt = m.statement(*id).unwrap();
                for x in crate::analysis::dag::touched_xbits(stmt, &xbits).unwrap() {
                    assert!(seen.insert(x), "layer shares xbit {x}");
                }
            }
        }
    }

    #[test]
    fn test_parallel_cx_share_a_layer() {
        let src = "OPENQASM 2.0;\nqreg q[4];\nCX q[0], q[1];\nCX q[2], q[3];\n";
        let (_, _, layering) = layer(src);
        assert_eq!(layering.layers.len(), 1);
        assert_eq!(layering.layers[0].len(), 2);
    }

    #[test]
    fn test_single_qubit_gates_layered_separately() {
        let src = "OPENQASM 2.0;\nqreg q[2];\nU(0, 0, 0) q[0];\nCX q[0], q[1];\n";
        let (_, _, layering) = layer(src);
        assert_eq!(layering.layers.len(), 2);
        assert_eq!(layering.layers[0].len(), 1);
    }

    #[test]
    fn test_reorder_keeps_ids() {
        let src = "OPENQASM 2.0;\nqreg q[3];\nCX q[0], q[1];\nU(0, 0, 0) q[2];\n";
        let mut m = alsvid_qasm::parse(src).unwrap();
        let before: FxHashSet<_> = m.statement_ids().into_iter().collect();
        let xbits = XbitTable::build(&m);
        let dag = CircuitDag::build(&m, &xbits).unwrap();
        reorder_by_layers(&mut m, &dag).unwrap();
        let after: FxHashSet<_> = m.statement_ids().into_iter().collect();
        assert_eq!(before, after);
    }
}
