//! Reverse-edge lowering.

use alsvid_arch::ArchGraph;
use alsvid_ir::{Arg, BinOp, Expr, QModule, Qop, Stmt, StmtId};

use crate::error::CompileResult;
use crate::pass::Pass;

/// Lowers CX gates sitting on reverse-only edges.
///
/// A `CX u, v` where the device only declares the edge `v → u` becomes
/// the H-conjugated reversed CX. Runs after allocation, when every
/// argument names a device qubit. Conditional statements keep their
/// condition on every emitted gate.
pub struct ReverseEdgesPass<'a> {
    arch: &'a ArchGraph,
}

impl<'a> ReverseEdgesPass<'a> {
    /// Lower against the given device.
    pub fn new(arch: &'a ArchGraph) -> Self {
        ReverseEdgesPass { arch }
    }
}

impl Pass for ReverseEdgesPass<'_> {
    fn name(&self) -> &'static str {
        "reverse-edges"
    }

    fn run(&mut self, m: &mut QModule) -> CompileResult<bool> {
        let mut plan: Vec<(StmtId, Vec<Stmt>)> = vec![];

        for (id, stmt) in m.statements() {
            let Some((control, target)) = cx_args(&stmt.qop) else {
                continue;
            };
            let u = self.arch.uid(&control.to_string())?;
            let v = self.arch.uid(&target.to_string())?;
            if !self.arch.is_reverse(u, v) {
                continue;
            }

            let reversed = Qop::Cx {
                control: target.clone(),
                target: control.clone(),
            };
            plan.push((
                id,
                vec![
                    stmt.rewrap(hadamard(control.clone())),
                    stmt.rewrap(hadamard(target.clone())),
                    stmt.rewrap(reversed),
                    stmt.rewrap(hadamard(target.clone())),
                    stmt.rewrap(hadamard(control.clone())),
                ],
            ));
        }

        let changed = !plan.is_empty();
        for (id, replacement) in plan {
            m.replace_statement(id, replacement)?;
        }
        Ok(changed)
    }
}

/// Control and target of a CX-semantics gate, built-in or called by name.
fn cx_args(qop: &Qop) -> Option<(&Arg, &Arg)> {
    match qop {
        Qop::Cx { control, target } => Some((control, target)),
        Qop::Call { name, qargs, .. } if name == "cx" && qargs.len() == 2 => {
            Some((&qargs[0], &qargs[1]))
        }
        _ => None,
    }
}

fn hadamard(target: Arg) -> Qop {
    Qop::U {
        theta: Expr::binary(BinOp::Div, Expr::Pi, Expr::Int(2)),
        phi: Expr::Int(0),
        lambda: Expr::Pi,
        target,
    }
}
