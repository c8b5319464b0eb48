//! Layer-based statement reordering.

use alsvid_ir::QModule;

use crate::analysis::{CircuitDag, XbitTable, layers};
use crate::error::CompileResult;
use crate::pass::Pass;

/// Reorders statements into the CNOT-priority layer order.
///
/// Exposes the parallelism the layering finds to the allocators that walk
/// the program sequentially.
pub struct LayerReorderPass;

impl Pass for LayerReorderPass {
    fn name(&self) -> &'static str {
        "layer-reorder"
    }

    fn run(&mut self, m: &mut QModule) -> CompileResult<bool> {
        let xbits = XbitTable::build(m);
        let dag = CircuitDag::build(m, &xbits)?;
        let before = m.statement_ids();
        let layering = layers::reorder_by_layers(m, &dag)?;
        Ok(layering.order != before)
    }
}
