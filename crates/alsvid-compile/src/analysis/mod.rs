//! Program analyses: bit numbering, dependencies, circuit DAG, layering.

pub mod dag;
pub mod deps;
pub mod layers;
pub mod xbit;

pub use dag::{CircuitDag, DagIter, DagNode};
pub use deps::{Dep, Dependencies, DependencyTable};
pub use layers::{Layering, cnot_priority_layering};
pub use xbit::XbitTable;

use alsvid_ir::QModule;

use crate::error::CompileResult;

/// The analysis bundle every allocator consumes.
#[derive(Debug, Clone)]
pub struct Analyses {
    /// Bit numbering.
    pub xbits: XbitTable,
    /// Per-statement dependencies.
    pub deps: DependencyTable,
    /// The circuit DAG.
    pub dag: CircuitDag,
}

impl Analyses {
    /// Run all analyses on a module.
    pub fn build(m: &QModule) -> CompileResult<Self> {
        let xbits = XbitTable::build(m);
        let deps = DependencyTable::build(m, &xbits)?;
        let dag = CircuitDag::build(m, &xbits)?;
        Ok(Analyses { xbits, deps, dag })
    }
}

/// Memoised analyses keyed on the module's version counter.
///
/// A mutating pass bumps the module counter; the next lookup rebuilds.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    version: Option<u64>,
    cached: Option<Analyses>,
}

impl AnalysisCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The analyses for the module's current state.
    pub fn get(&mut self, m: &QModule) -> CompileResult<&Analyses> {
        if self.version != Some(m.version_counter()) || self.cached.is_none() {
            self.cached = Some(Analyses::build(m)?);
            self.version = Some(m.version_counter());
        }
        Ok(self.cached.as_ref().expect("cache just filled"))
    }

    /// Drop any cached result.
    pub fn invalidate(&mut self) {
        self.version = None;
        self.cached = None;
    }
}
