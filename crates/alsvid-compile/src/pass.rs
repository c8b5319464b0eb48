//! The pass abstraction.

use alsvid_ir::QModule;

use crate::error::CompileResult;

/// A rewriting or analysis step over a [`QModule`].
///
/// `run` returns whether the module was mutated; the driver uses this to
/// invalidate cached analyses (the module's own version counter backs
/// the cache, so the flag is informative for logging and scheduling).
pub trait Pass {
    /// The pass name, for logs and stats.
    fn name(&self) -> &'static str;

    /// Run the pass. `Ok(true)` means the module changed.
    fn run(&mut self, m: &mut QModule) -> CompileResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullPass;

    impl Pass for NullPass {
        fn name(&self) -> &'static str {
            "null"
        }

        fn run(&mut self, _m: &mut QModule) -> CompileResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_pass_object_safety() {
        let mut pass: Box<dyn Pass> = Box::new(NullPass);
        let mut m = QModule::new();
        assert!(!pass.run(&mut m).unwrap());
        assert_eq!(pass.name(), "null");
    }
}
