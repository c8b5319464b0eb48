//! Gate inlining down to a basis.

use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_ir::{Arg, Expr, QModule, Qop, Stmt, StmtId};

use crate::error::CompileResult;
use crate::pass::Pass;

/// Replaces calls to defined gates outside the basis with their bodies.
///
/// The fully inlined body of each gate is memoised per gate name, then
/// cloned and substituted at every call site, so deeply nested gate
/// definitions do not blow up the work. Calls to opaque or undeclared
/// gates, and gates in the basis, are left untouched. Calls under a
/// classical condition expand into one conditional per emitted operation.
pub struct InlineAllPass {
    basis: FxHashSet<String>,
}

impl InlineAllPass {
    /// Inline everything not named in `basis`.
    pub fn new(basis: impl IntoIterator<Item = String>) -> Self {
        InlineAllPass {
            basis: basis.into_iter().collect(),
        }
    }
}

impl Pass for InlineAllPass {
    fn name(&self) -> &'static str {
        "inline-all"
    }

    fn run(&mut self, m: &mut QModule) -> CompileResult<bool> {
        let mut memo: FxHashMap<String, Vec<Qop>> = FxHashMap::default();
        let mut plan: Vec<(StmtId, Vec<Stmt>)> = vec![];

        for (id, stmt) in m.statements() {
            let Qop::Call {
                name,
                params,
                qargs,
            } = &stmt.qop
            else {
                continue;
            };
            if self.basis.contains(name) {
                continue;
            }
            let Some(decl) = m.get_gate(name) else {
                continue;
            };
            if decl.is_opaque() {
                continue;
            }

            let body = inlined_body(m, &self.basis, &mut memo, name);
            let vars = Substitution::bind(&decl.params, params, &decl.qargs, qargs);
            let expanded = body
                .iter()
                .map(|qop| stmt.rewrap(vars.apply(qop)))
                .collect();
            plan.push((id, expanded));
        }

        let changed = !plan.is_empty();
        for (id, replacement) in plan {
            m.replace_statement(id, replacement)?;
        }
        Ok(changed)
    }
}

/// The fully inlined body of a gate, memoised by name.
fn inlined_body(
    m: &QModule,
    basis: &FxHashSet<String>,
    memo: &mut FxHashMap<String, Vec<Qop>>,
    gate: &str,
) -> Vec<Qop> {
    if let Some(cached) = memo.get(gate) {
        return cached.clone();
    }

    let decl = m.get_gate(gate).expect("caller checked the declaration");
    let body = decl.body.as_ref().expect("caller checked for a body");

    let mut out = vec![];
    for qop in body {
        match qop {
            Qop::Call {
                name,
                params,
                qargs,
            } if !basis.contains(name)
                && m.get_gate(name).is_some_and(|d| !d.is_opaque()) =>
            {
                let inner_decl = m.get_gate(name).expect("just checked");
                let inner_body = inlined_body(m, basis, memo, name);
                let vars =
                    Substitution::bind(&inner_decl.params, params, &inner_decl.qargs, qargs);
                out.extend(inner_body.iter().map(|q| vars.apply(q)));
            }
            other => out.push(other.clone()),
        }
    }

    memo.insert(gate.to_string(), out.clone());
    out
}

/// Formal-to-actual substitution for one call site.
struct Substitution<'a> {
    params: FxHashMap<&'a str, &'a Expr>,
    qargs: FxHashMap<&'a str, &'a Arg>,
}

impl<'a> Substitution<'a> {
    fn bind(
        formal_params: &'a [String],
        actual_params: &'a [Expr],
        formal_qargs: &'a [String],
        actual_qargs: &'a [Arg],
    ) -> Self {
        Substitution {
            params: formal_params
                .iter()
                .map(String::as_str)
                .zip(actual_params.iter())
                .collect(),
            qargs: formal_qargs
                .iter()
                .map(String::as_str)
                .zip(actual_qargs.iter())
                .collect(),
        }
    }

    fn apply(&self, qop: &Qop) -> Qop {
        let mut out = qop.clone();
        match &mut out {
            Qop::U {
                theta,
                phi,
                lambda,
                ..
            } => {
                *theta = self.expr(theta);
                *phi = self.expr(phi);
                *lambda = self.expr(lambda);
            }
            Qop::Call { params, .. } => {
                for p in params {
                    *p = self.expr(p);
                }
            }
            _ => {}
        }
        for arg in out.qargs_mut() {
            if let Arg::Id(name) = arg {
                if let Some(&actual) = self.qargs.get(name.as_str()) {
                    *arg = actual.clone();
                }
            }
        }
        out
    }

    fn expr(&self, e: &Expr) -> Expr {
        match e {
            Expr::Ident(name) => self
                .params
                .get(name.as_str())
                .map_or_else(|| e.clone(), |&actual| actual.clone()),
            Expr::Unary(op, inner) => Expr::unary(*op, self.expr(inner)),
            Expr::Binary { op, lhs, rhs } => Expr::binary(*op, self.expr(lhs), self.expr(rhs)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(src: &str, basis: &[&str]) -> QModule {
        let mut m = alsvid_qasm::parse(src).expect("test source must parse");
        InlineAllPass::new(basis.iter().map(|s| s.to_string()))
            .run(&mut m)
            .unwrap();
        m
    }

    fn stmts(m: &QModule) -> Vec<String> {
        m.statements().map(|(_, s)| s.to_string()).collect()
    }

    #[test]
    fn test_inline_simple_gate() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ngate flip a, b { CX b, a; }\nflip q[0], q[1];\n";
        let m = inline(src, &[]);
        assert_eq!(stmts(&m), vec!["CX q[1], q[0];"]);
    }

    #[test]
    fn test_inline_nested_gates() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ngate inner a, b { CX a, b; }\ngate outer x, y { inner y, x; inner x, y; }\nouter q[0], q[1];\n";
        let m = inline(src, &[]);
        assert_eq!(stmts(&m), vec!["CX q[1], q[0];", "CX q[0], q[1];"]);
    }

    #[test]
    fn test_inline_substitutes_parameters() {
        let src = "OPENQASM 2.0;\nqreg q[1];\ngate spin(theta) a { U(theta / 2, 0, theta) a; }\nspin(pi) q[0];\n";
        let m = inline(src, &[]);
        assert_eq!(stmts(&m), vec!["U(pi / 2, 0, pi) q[0];"]);
    }

    #[test]
    fn test_basis_gates_untouched() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ngate flip a, b { CX b, a; }\nflip q[0], q[1];\n";
        let m = inline(src, &["flip"]);
        assert_eq!(stmts(&m), vec!["flip q[0], q[1];"]);
    }

    #[test]
    fn test_opaque_untouched() {
        let src = "OPENQASM 2.0;\nqreg q[1];\nopaque magic a;\nmagic q[0];\n";
        let m = inline(src, &[]);
        assert_eq!(stmts(&m), vec!["magic q[0];"]);
    }

    #[test]
    fn test_conditional_call_expands_into_conditionals() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ncreg c[1];\ngate two a, b { CX a, b; CX b, a; }\nif (c == 1) two q[0], q[1];\n";
        let m = inline(src, &[]);
        assert_eq!(
            stmts(&m),
            vec!["if (c == 1) CX q[0], q[1];", "if (c == 1) CX q[1], q[0];"]
        );
    }

    #[test]
    fn test_stdlib_inlines_to_builtins() {
        let src = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\nh q[0];\ncx q[0], q[1];\n";
        let m = inline(src, &[]);
        let rendered = stmts(&m);
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].starts_with("U("));
        assert_eq!(rendered[1], "CX q[0], q[1];");
    }
}
