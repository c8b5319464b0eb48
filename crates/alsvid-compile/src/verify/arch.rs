//! Architecture legality checking.

use alsvid_arch::ArchGraph;
use alsvid_ir::{QModule, Qop, Stmt};

use crate::intrinsics;

/// Checks that every two-qubit interaction of a rewritten module either
/// uses a declared coupling edge (respecting its direction) or is a
/// legal intrinsic application.
pub struct ArchVerifierPass<'a> {
    arch: &'a ArchGraph,
}

impl<'a> ArchVerifierPass<'a> {
    /// Verify against the given device.
    pub fn new(arch: &'a ArchGraph) -> Self {
        ArchVerifierPass { arch }
    }

    /// True if the whole module is legal.
    pub fn verify(&self, m: &QModule) -> bool {
        m.statements().all(|(_, stmt)| {
            let ok = self.check_stmt(stmt);
            if !ok {
                tracing::warn!(statement = %stmt, "architecture violation");
            }
            ok
        })
    }

    fn uid(&self, arg: &alsvid_ir::Arg) -> Option<u32> {
        self.arch.uid(&arg.to_string()).ok()
    }

    fn check_stmt(&self, stmt: &Stmt) -> bool {
        match &stmt.qop {
            Qop::Cx { control, target } => {
                let (Some(u), Some(v)) = (self.uid(control), self.uid(target)) else {
                    return false;
                };
                self.arch.has_edge(u, v)
            }
            Qop::Call { name, qargs, .. } => self.check_call(name, qargs),
            // Single-qubit forms and barriers are always legal.
            Qop::U { .. } | Qop::Measure { .. } | Qop::Reset { .. } | Qop::Barrier { .. } => {
                true
            }
        }
    }

    fn check_call(&self, name: &str, qargs: &[alsvid_ir::Arg]) -> bool {
        let uids: Option<Vec<u32>> = qargs.iter().map(|a| self.uid(a)).collect();

        match (name, qargs.len()) {
            (intrinsics::SWAP, 2) => {
                let Some(uids) = uids else { return false };
                self.arch.has_edge(uids[0], uids[1])
            }
            (intrinsics::REV_CX, 2) => {
                let Some(uids) = uids else { return false };
                self.arch.has_edge(uids[1], uids[0])
            }
            (intrinsics::LCX, 3) => {
                let Some(uids) = uids else { return false };
                self.arch.has_any_edge(uids[0], uids[1])
                    && self.arch.has_any_edge(uids[1], uids[2])
            }
            (_, 0 | 1) => true,
            (_, 2) => {
                let Some(uids) = uids else { return false };
                self.arch.has_edge(uids[0], uids[1])
            }
            // Wider non-intrinsic calls cannot be checked against the
            // coupling graph.
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_arch::presets;

    fn verify(src: &str) -> bool {
        let arch = presets::square5();
        let m = alsvid_qasm::parse(src).unwrap();
        ArchVerifierPass::new(&arch).verify(&m)
    }

    #[test]
    fn test_adjacent_cx_legal() {
        assert!(verify("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[1];\n"));
    }

    #[test]
    fn test_distant_cx_illegal() {
        assert!(!verify("OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[4];\n"));
    }

    #[test]
    fn test_intrinsics_checked_by_kind() {
        let arch = presets::ibmqx2();
        let mut m = alsvid_qasm::parse("OPENQASM 2.0;\nqreg q[5];\n").unwrap();
        crate::intrinsics::ensure_declared(&mut m).unwrap();

        // 1 → 0 is declared on ibmqx2, 0 → 1 is not.
        m.push_statement(Stmt::bare(crate::intrinsics::swap_call(
            alsvid_ir::Arg::idx("q", 1),
            alsvid_ir::Arg::idx("q", 0),
        )));
        m.push_statement(Stmt::bare(crate::intrinsics::rev_cx_call(
            alsvid_ir::Arg::idx("q", 0),
            alsvid_ir::Arg::idx("q", 1),
        )));
        assert!(ArchVerifierPass::new(&arch).verify(&m));

        m.push_statement(Stmt::bare(crate::intrinsics::rev_cx_call(
            alsvid_ir::Arg::idx("q", 1),
            alsvid_ir::Arg::idx("q", 0),
        )));
        assert!(!ArchVerifierPass::new(&arch).verify(&m));
    }

    #[test]
    fn test_bridge_needs_both_hops() {
        let src = "OPENQASM 2.0;\nqreg q[5];\ngate intrinsic_lcx__ a, w, b { CX w, b; CX a, w; CX w, b; CX a, w; }\nintrinsic_lcx__ q[0], q[2], q[4];\n";
        assert!(verify(src));

        let bad = "OPENQASM 2.0;\nqreg q[5];\ngate intrinsic_lcx__ a, w, b { CX w, b; CX a, w; CX w, b; CX a, w; }\nintrinsic_lcx__ q[0], q[1], q[4];\n";
        assert!(!verify(bad));
    }

    #[test]
    fn test_single_qubit_forms_legal() {
        assert!(verify(
            "OPENQASM 2.0;\nqreg q[5];\ncreg c[5];\nU(0, 0, 0) q[4];\nreset q[3];\nmeasure q[0] -> c[0];\nbarrier q[0], q[4];\n"
        ));
    }
}
