//! Qubit allocators.
//!
//! Every allocator implements the same contract: given a module whose
//! registers were replaced by the device's, produce an initial
//! virtual-to-physical mapping and leave the module rewritten so every
//! two-qubit gate touches adjacent physical qubits, using the
//! [`crate::intrinsics`] gates where the coupling demands it.

pub mod bmt;
pub mod dynprog;
pub mod greedy;
pub mod sabre;

pub use bmt::BmtAllocator;
pub use dynprog::DynprogAllocator;
pub use greedy::GreedyAllocator;
pub use sabre::SabreAllocator;

use alsvid_arch::{ArchGraph, Mapping, UNDEF};
use alsvid_ir::{QModule, RegKind, RenameTable};

use crate::analysis::{Analyses, XbitTable};
use crate::error::{CompileError, CompileResult};
use crate::pass::Pass;
use crate::passes::InlineAllPass;
use crate::stats::{Stats, Timer};

/// Costs of the allocation intrinsics, in units of the cost model.
#[derive(Debug, Clone, Copy)]
pub struct CostConfig {
    /// Cost of one swap.
    pub swap: u32,
    /// Cost of a reverse-edge CX.
    pub rev: u32,
    /// Cost of a bridged CX.
    pub lcx: u32,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            swap: 7,
            rev: 4,
            lcx: 10,
        }
    }
}

impl CostConfig {
    /// Cost of issuing a CX on physical qubits `(u, v)`.
    ///
    /// Free on a declared edge, the reverse cost on a reverse-only edge,
    /// and the bridge cost otherwise.
    pub fn cx_cost(&self, arch: &ArchGraph, u: u32, v: u32) -> u32 {
        if arch.has_edge(u, v) {
            0
        } else if arch.has_edge(v, u) {
            self.rev
        } else {
            self.lcx
        }
    }
}

/// Search bounds for the bounded-mapping-tree allocator.
#[derive(Debug, Clone, Copy)]
pub struct BmtConfig {
    /// Max children kept per partial solution. `u32::MAX` is unbounded.
    pub max_children: u32,
    /// Max partial solutions kept per step. `u32::MAX` is unbounded.
    pub max_partial: u32,
    /// How many final mapping sequences to traceback.
    pub max_mapseq: u32,
}

impl Default for BmtConfig {
    fn default() -> Self {
        BmtConfig {
            max_children: UNDEF,
            max_partial: UNDEF,
            max_mapseq: 1,
        }
    }
}

/// Shared allocator inputs.
#[derive(Debug, Clone)]
pub struct AllocContext {
    /// Intrinsic costs.
    pub costs: CostConfig,
    /// Seed for the randomised strategies.
    pub seed: u64,
    /// Bounded-mapping-tree knobs.
    pub bmt: BmtConfig,
    /// Gate names preserved by inlining.
    pub basis: Vec<String>,
}

impl Default for AllocContext {
    fn default() -> Self {
        AllocContext {
            costs: CostConfig::default(),
            seed: 0,
            bmt: BmtConfig::default(),
            basis: vec![],
        }
    }
}

/// The allocator contract.
pub trait QbitAllocator {
    /// The allocator name, for logs.
    fn name(&self) -> &'static str;

    /// Allocate qubits and rewrite the module. Returns the initial
    /// mapping from virtual to physical qubits.
    ///
    /// `analyses` describes the module's state on entry; allocators
    /// rewrite the module only after they are done reading it.
    fn allocate(
        &mut self,
        m: &mut QModule,
        arch: &ArchGraph,
        analyses: &Analyses,
        ctx: &AllocContext,
        stats: &mut Stats,
    ) -> CompileResult<Mapping>;
}

/// The allocator selection keys of the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorKind {
    /// Bounded mapping tree (three-phase search).
    Bmt,
    /// SABRE-style heuristic routing.
    Sabre,
    /// Exact dynamic programming over permutations.
    Dynprog,
    /// Greedy circuit walking.
    Greedy,
}

impl AllocatorKind {
    /// Parse a `-alloc` key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Q_bmt" => Some(AllocatorKind::Bmt),
            "Q_sabre" => Some(AllocatorKind::Sabre),
            "Q_dynprog" => Some(AllocatorKind::Dynprog),
            "Q_greedy" => Some(AllocatorKind::Greedy),
            _ => None,
        }
    }

    /// The `-alloc` key of this allocator.
    pub fn key(self) -> &'static str {
        match self {
            AllocatorKind::Bmt => "Q_bmt",
            AllocatorKind::Sabre => "Q_sabre",
            AllocatorKind::Dynprog => "Q_dynprog",
            AllocatorKind::Greedy => "Q_greedy",
        }
    }

    /// All selectable allocators.
    pub fn all() -> &'static [AllocatorKind] {
        &[
            AllocatorKind::Bmt,
            AllocatorKind::Sabre,
            AllocatorKind::Dynprog,
            AllocatorKind::Greedy,
        ]
    }
}

/// Instantiate an allocator by kind.
pub fn create_allocator(kind: AllocatorKind, ctx: &AllocContext) -> Box<dyn QbitAllocator> {
    match kind {
        AllocatorKind::Bmt => {
            Box::new(BmtAllocator::new_improved(ctx.seed).with_max_mapseq(ctx.bmt.max_mapseq))
        }
        AllocatorKind::Sabre => Box::new(SabreAllocator::new()),
        AllocatorKind::Dynprog => Box::new(DynprogAllocator::new()),
        AllocatorKind::Greedy => Box::new(GreedyAllocator::new()),
    }
}

/// Rename program qubits to device qubits (identity placement) and swap
/// the program's quantum registers for the device's.
///
/// After this step the module's virtual qubit `i` is spelled with the
/// device's name for physical qubit `i`, and the virtual space has the
/// device's size. Classical registers are kept.
pub fn replace_with_arch_specs(m: &mut QModule, arch: &ArchGraph) -> CompileResult<()> {
    let xbits = XbitTable::build(m);
    if xbits.q_size() > arch.size() {
        return Err(CompileError::OverCapacity {
            virtuals: xbits.q_size(),
            physicals: arch.size(),
        });
    }

    let mut table = RenameTable::default();
    for uid in 0..xbits.q_size() {
        table.insert(xbits.q_arg(uid).to_string(), arch.node(uid)?.clone());
    }

    for id in m.statement_ids() {
        let stmt = m
            .statement_mut(id)
            .ok_or_else(|| CompileError::Unreachable(format!("lost statement {id}")))?;
        alsvid_ir::rename_stmt_qargs(stmt, &table);
    }

    m.remove_qregs();
    for (name, size) in arch.regs() {
        m.add_reg(name.clone(), *size, RegKind::Quantum)?;
    }
    Ok(())
}

/// Build the rename table realising `mapping` on an arch-renamed module.
pub(crate) fn mapping_rename_table(
    xbits: &XbitTable,
    mapping: &Mapping,
    arch: &ArchGraph,
) -> CompileResult<RenameTable> {
    let mut table = RenameTable::default();
    for (vq, &pq) in mapping.iter().enumerate() {
        if pq == UNDEF {
            continue;
        }
        if (vq as u32) < xbits.q_size() {
            table.insert(xbits.q_arg(vq as u32).to_string(), arch.node(pq)?.clone());
        }
    }
    Ok(table)
}

/// Run the full allocation sequence: inline to the basis, adopt the
/// device registers, extract dependencies, then allocate.
///
/// The analyses are computed through an [`AnalysisCache`] once the
/// mutating preparation passes are done.
pub fn run_allocation(
    allocator: &mut dyn QbitAllocator,
    m: &mut QModule,
    arch: &ArchGraph,
    ctx: &AllocContext,
    stats: &mut Stats,
) -> CompileResult<Mapping> {
    let timer = Timer::start();
    InlineAllPass::new(ctx.basis.iter().cloned()).run(m)?;
    stats.inline_time = timer.elapsed_secs();

    let timer = Timer::start();
    replace_with_arch_specs(m, arch)?;
    stats.replace_time = timer.elapsed_secs();

    let mut cache = crate::analysis::AnalysisCache::new();
    let analyses = cache.get(m)?;
    stats.dependencies = analyses.deps.total();

    tracing::info!(
        allocator = allocator.name(),
        qubits = arch.size(),
        dependencies = stats.dependencies,
        "allocating qubits"
    );

    let timer = Timer::start();
    let mapping = allocator.allocate(m, arch, analyses, ctx, stats)?;
    stats.alloc_time = timer.elapsed_secs();

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_arch::presets;

    #[test]
    fn test_allocator_keys() {
        for kind in AllocatorKind::all() {
            assert_eq!(AllocatorKind::from_key(kind.key()), Some(*kind));
        }
        assert_eq!(AllocatorKind::from_key("Q_magic"), None);
    }

    #[test]
    fn test_cx_cost() {
        let arch = presets::ibmqx2();
        let costs = CostConfig::default();
        assert_eq!(costs.cx_cost(&arch, 1, 0), 0);
        assert_eq!(costs.cx_cost(&arch, 0, 1), 4);
        assert_eq!(costs.cx_cost(&arch, 0, 4), 10);
    }

    #[test]
    fn test_replace_with_arch_specs() {
        let arch = presets::square5();
        let mut m =
            alsvid_qasm::parse("OPENQASM 2.0;\nqreg r[2];\ncreg c[2];\nCX r[0], r[1];\nmeasure r[0] -> c[0];\n")
                .unwrap();
        replace_with_arch_specs(&mut m, &arch).unwrap();

        let rendered: Vec<String> = m.statements().map(|(_, s)| s.to_string()).collect();
        assert_eq!(rendered[0], "CX q[0], q[1];");
        assert_eq!(rendered[1], "measure q[0] -> c[0];");

        let xbits = XbitTable::build(&m);
        assert_eq!(xbits.q_size(), 5);
        assert_eq!(xbits.c_size(), 2);
    }

    #[test]
    fn test_replace_rejects_oversized_programs() {
        let arch = presets::square5();
        let mut m = alsvid_qasm::parse("OPENQASM 2.0;\nqreg r[9];\nreset r[8];\n").unwrap();
        assert!(matches!(
            replace_with_arch_specs(&mut m, &arch),
            Err(CompileError::OverCapacity { .. })
        ));
    }
}
