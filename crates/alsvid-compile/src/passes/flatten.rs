//! Register-argument expansion.

use alsvid_ir::{Arg, QModule, Qop, Stmt, StmtId};

use crate::error::{CompileError, CompileResult};
use crate::pass::Pass;

/// Expands statements whose arguments are whole registers into one
/// statement per index.
///
/// `CX q, p;` over two registers of size 2 becomes `CX q[0], p[0];
/// CX q[1], p[1];`. Register arguments iterate together; indexed
/// arguments are repeated. When register sizes differ the expansion runs
/// to the smallest size. Conditional statements are expanded into one
/// conditional per index.
pub struct FlattenPass;

impl Pass for FlattenPass {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn run(&mut self, m: &mut QModule) -> CompileResult<bool> {
        let mut plan: Vec<(StmtId, Vec<Stmt>)> = vec![];

        for (id, stmt) in m.statements() {
            if let Some(expanded) = expand(m, stmt)? {
                plan.push((id, expanded));
            }
        }

        let changed = !plan.is_empty();
        for (id, replacement) in plan {
            m.replace_statement(id, replacement)?;
        }
        Ok(changed)
    }
}

/// Argument positions of a statement, classical measure target included.
fn args_of(qop: &Qop) -> Vec<&Arg> {
    match qop {
        Qop::Measure { qarg, carg } => vec![qarg, carg],
        other => other.qargs(),
    }
}

fn args_of_mut(qop: &mut Qop) -> Vec<&mut Arg> {
    match qop {
        Qop::Measure { qarg, carg } => vec![qarg, carg],
        other => other.qargs_mut(),
    }
}

fn expand(m: &QModule, stmt: &Stmt) -> CompileResult<Option<Vec<Stmt>>> {
    let mut min_size: Option<u32> = None;
    for arg in args_of(&stmt.qop) {
        if let Arg::Id(name) = arg {
            let reg = m.get_reg(name).ok_or_else(|| {
                CompileError::Unreachable(format!("undeclared register '{name}' in '{stmt}'"))
            })?;
            min_size = Some(min_size.map_or(reg.size, |s| s.min(reg.size)));
        }
    }

    let Some(count) = min_size else {
        return Ok(None);
    };

    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let mut qop = stmt.qop.clone();
        for arg in args_of_mut(&mut qop) {
            if let Arg::Id(name) = arg {
                *arg = Arg::IdRef(name.clone(), i);
            }
        }
        out.push(stmt.rewrap(qop));
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(src: &str) -> QModule {
        let mut m = alsvid_qasm::parse(src).expect("test source must parse");
        FlattenPass.run(&mut m).unwrap();
        m
    }

    fn stmts(m: &QModule) -> Vec<String> {
        m.statements().map(|(_, s)| s.to_string()).collect()
    }

    #[test]
    fn test_flatten_cx_over_registers() {
        let m = flatten("OPENQASM 2.0;\nqreg q[2];\nqreg p[2];\nCX q, p;\n");
        assert_eq!(stmts(&m), vec!["CX q[0], p[0];", "CX q[1], p[1];"]);
    }

    #[test]
    fn test_flatten_mixed_arguments() {
        let m = flatten("OPENQASM 2.0;\nqreg q[3];\nqreg p[2];\nCX q, p[1];\n");
        assert_eq!(stmts(&m), vec!["CX q[0], p[1];", "CX q[1], p[1];", "CX q[2], p[1];"]);
    }

    #[test]
    fn test_flatten_to_minimum_size() {
        let m = flatten("OPENQASM 2.0;\nqreg q[3];\nqreg p[2];\nCX q, p;\n");
        assert_eq!(stmts(&m).len(), 2);
    }

    #[test]
    fn test_flatten_measure() {
        let m = flatten("OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nmeasure q -> c;\n");
        assert_eq!(
            stmts(&m),
            vec!["measure q[0] -> c[0];", "measure q[1] -> c[1];"]
        );
    }

    #[test]
    fn test_flatten_barrier_and_reset() {
        let m = flatten("OPENQASM 2.0;\nqreg q[2];\nbarrier q;\nreset q;\n");
        assert_eq!(
            stmts(&m),
            vec!["barrier q[0];", "barrier q[1];", "reset q[0];", "reset q[1];"]
        );
    }

    #[test]
    fn test_flatten_wraps_conditionals() {
        let m = flatten("OPENQASM 2.0;\nqreg q[2];\ncreg c[1];\nif (c == 1) reset q;\n");
        assert_eq!(
            stmts(&m),
            vec!["if (c == 1) reset q[0];", "if (c == 1) reset q[1];"]
        );
    }

    #[test]
    fn test_indexed_only_is_untouched() {
        let src = "OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n";
        let mut m = alsvid_qasm::parse(src).unwrap();
        assert!(!FlattenPass.run(&mut m).unwrap());
    }
}
