//! The compilation driver.

use alsvid_arch::{ArchGraph, Mapping};
use alsvid_ir::QModule;

use crate::allocators::{
    AllocContext, AllocatorKind, BmtConfig, CostConfig, create_allocator, run_allocation,
};
use crate::analysis::XbitTable;
use crate::error::{CompileError, CompileResult};
use crate::intrinsics;
use crate::pass::Pass;
use crate::passes::{FlattenPass, LayerReorderPass, ReverseEdgesPass};
use crate::stats::Stats;
use crate::verify::{ArchVerifierPass, SemanticVerifierPass, VerifyReport};

/// Everything configurable about one compilation.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    /// Which allocator to run.
    pub allocator: AllocatorKind,
    /// Gate names preserved by inlining.
    pub basis: Vec<String>,
    /// Reorder statements by layer before allocating.
    pub reorder: bool,
    /// Run the post-allocation verifiers.
    pub verify: bool,
    /// Emit even when verification fails.
    pub force: bool,
    /// Seed for the randomised strategies.
    pub seed: u64,
    /// Intrinsic costs.
    pub costs: CostConfig,
    /// Bounded-mapping-tree knobs.
    pub bmt: BmtConfig,
}

impl Default for CompileSettings {
    fn default() -> Self {
        CompileSettings {
            allocator: AllocatorKind::Bmt,
            basis: vec![],
            reorder: false,
            verify: false,
            force: false,
            seed: 0,
            costs: CostConfig::default(),
            bmt: BmtConfig::default(),
        }
    }
}

/// The result of one compilation.
#[derive(Debug)]
pub struct CompileOutput {
    /// The rewritten module. `None` when verification failed and
    /// `force` was off.
    pub module: Option<QModule>,
    /// The initial virtual-to-physical mapping.
    pub initial: Mapping,
    /// Verifier outcome, when verification ran.
    pub verify: Option<VerifyReport>,
    /// Collected statistics.
    pub stats: Stats,
}

/// Compile one module for a device.
///
/// The pipeline: flatten, optionally layer-reorder, check capacity,
/// allocate (which inlines to the basis and adopts the device
/// registers), lower reverse edges, then optionally verify. On a failed
/// verification the module is withheld unless `force` is set.
pub fn compile(
    mut qmod: QModule,
    arch: &ArchGraph,
    settings: &CompileSettings,
) -> CompileResult<CompileOutput> {
    let mut stats = Stats::default();

    let src_copy = settings.verify.then(|| qmod.clone_module());

    FlattenPass.run(&mut qmod)?;
    if settings.reorder {
        LayerReorderPass.run(&mut qmod)?;
    }

    let xbits = XbitTable::build(&qmod);
    if xbits.q_size() > arch.size() {
        return Err(CompileError::OverCapacity {
            virtuals: xbits.q_size(),
            physicals: arch.size(),
        });
    }

    let ctx = AllocContext {
        costs: settings.costs,
        seed: settings.seed,
        bmt: settings.bmt,
        basis: settings.basis.clone(),
    };
    let mut allocator = create_allocator(settings.allocator, &ctx);
    let initial = run_allocation(allocator.as_mut(), &mut qmod, arch, &ctx, &mut stats)?;

    intrinsics::ensure_declared(&mut qmod)?;
    ReverseEdgesPass::new(arch).run(&mut qmod)?;

    let mut verify = None;
    if settings.verify {
        let src = src_copy.expect("copy taken when verify is on");

        let arch_ok = ArchVerifierPass::new(arch).verify(&qmod);
        let semantic_ok = SemanticVerifierPass::new(src, initial.clone())
            .with_basis(settings.basis.clone())
            .verify(&qmod)?;

        if !arch_ok {
            tracing::error!("architecture restrictions violated in compiled code");
        }
        if !semantic_ok {
            tracing::error!("compiled code is semantically different from the source");
        }

        let report = VerifyReport {
            arch_ok,
            semantic_ok,
        };
        verify = Some(report);

        if !report.ok() {
            if !settings.force {
                return Ok(CompileOutput {
                    module: None,
                    initial,
                    verify,
                    stats,
                });
            }
            tracing::warn!("emitting an unverified module (--force)");
        }
    }

    Ok(CompileOutput {
        module: Some(qmod),
        initial,
        verify,
        stats,
    })
}
