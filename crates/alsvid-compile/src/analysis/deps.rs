//! Two-qubit dependency extraction.

use rustc_hash::FxHashMap;

use alsvid_ir::{QModule, Qop, StmtId};

use crate::analysis::xbit::XbitTable;
use crate::error::{CompileError, CompileResult};

/// A requested two-qubit interaction, as an ordered pair of virtual
/// qubit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dep {
    /// The control side.
    pub from: u32,
    /// The target side.
    pub to: u32,
}

/// The dependencies a single statement produces, with a back-pointer to
/// the statement.
#[derive(Debug, Clone)]
pub struct Dependencies {
    /// The extracted pairs. At most one in the supported subset.
    pub deps: Vec<Dep>,
    /// The statement that produced them.
    pub stmt: StmtId,
}

/// Dependencies for every statement of a module, in program order.
///
/// Gate bodies are analysed transitively: a call lifts the callee's
/// recorded dependencies through the argument substitution. Extraction
/// fails with [`CompileError::UnsupportedCall`] when a statement would
/// produce more than one dependency; such calls must be inlined first.
#[derive(Debug, Clone, Default)]
pub struct DependencyTable {
    list: Vec<Dependencies>,
    index: FxHashMap<StmtId, usize>,
}

impl DependencyTable {
    /// Extract dependencies from a module.
    pub fn build(m: &QModule, xbits: &XbitTable) -> CompileResult<Self> {
        // Local dependency sets per gate declaration, over formal indices.
        // Declarations may only reference earlier declarations, so one
        // forward walk resolves everything.
        let mut gate_deps: FxHashMap<&str, Vec<(u32, u32)>> = FxHashMap::default();
        for gate in m.gates() {
            let Some(body) = &gate.body else { continue };
            let mut deps = vec![];
            for qop in body {
                match qop {
                    Qop::Cx { control, target } => {
                        let f = xbits.local_uid(&gate.name, control.name());
                        let t = xbits.local_uid(&gate.name, target.name());
                        if let (Some(f), Some(t)) = (f, t) {
                            deps.push((f, t));
                        }
                    }
                    Qop::Call { name, qargs, .. } => {
                        if let Some(inner) = gate_deps.get(name.as_str()) {
                            for &(f, t) in inner {
                                let f = xbits
                                    .local_uid(&gate.name, qargs[f as usize].name());
                                let t = xbits
                                    .local_uid(&gate.name, qargs[t as usize].name());
                                if let (Some(f), Some(t)) = (f, t) {
                                    deps.push((f, t));
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            gate_deps.insert(gate.name.as_str(), deps);
        }

        let mut table = DependencyTable::default();
        for (id, stmt) in m.statements() {
            let deps = match &stmt.qop {
                Qop::Cx { control, target } => {
                    let f = resolve(xbits, control, stmt)?;
                    let t = resolve(xbits, target, stmt)?;
                    vec![Dep { from: f, to: t }]
                }
                Qop::Call { name, qargs, .. } => match gate_deps.get(name.as_str()) {
                    Some(inner) => {
                        let mut deps = Vec::with_capacity(inner.len());
                        for &(f, t) in inner {
                            deps.push(Dep {
                                from: resolve(xbits, &qargs[f as usize], stmt)?,
                                to: resolve(xbits, &qargs[t as usize], stmt)?,
                            });
                        }
                        deps
                    }
                    // Opaque or undeclared: nothing to analyse. A
                    // multi-qubit call without a body cannot be routed.
                    None if qargs.len() > 1 => {
                        return Err(CompileError::UnsupportedCall {
                            stmt: stmt.to_string(),
                        });
                    }
                    None => vec![],
                },
                _ => vec![],
            };

            if deps.len() > 1 {
                return Err(CompileError::UnsupportedCall {
                    stmt: stmt.to_string(),
                });
            }

            table.index.insert(id, table.list.len());
            table.list.push(Dependencies { deps, stmt: id });
        }

        Ok(table)
    }

    /// The dependencies of one statement.
    pub fn deps(&self, id: StmtId) -> Option<&Dependencies> {
        self.index.get(&id).map(|&i| &self.list[i])
    }

    /// The single dependency of a statement, if it has one.
    pub fn dep(&self, id: StmtId) -> Option<Dep> {
        self.deps(id).and_then(|d| d.deps.first().copied())
    }

    /// Every statement's dependencies, in program order.
    pub fn all(&self) -> &[Dependencies] {
        &self.list
    }

    /// Only the entries that carry a dependency, in program order.
    pub fn with_deps(&self) -> impl Iterator<Item = &Dependencies> {
        self.list.iter().filter(|d| !d.deps.is_empty())
    }

    /// Total number of extracted dependencies.
    pub fn total(&self) -> u32 {
        self.list.iter().map(|d| d.deps.len() as u32).sum()
    }
}

fn resolve(
    xbits: &XbitTable,
    arg: &alsvid_ir::Arg,
    stmt: &alsvid_ir::Stmt,
) -> CompileResult<u32> {
    xbits.arg_q_uid(arg).ok_or_else(|| {
        CompileError::Unreachable(format!(
            "unresolved quantum argument '{arg}' in '{stmt}' (module not flattened?)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyse(src: &str) -> CompileResult<(QModule, XbitTable, DependencyTable)> {
        let m = alsvid_qasm::parse(src).expect("test source must parse");
        let xbits = XbitTable::build(&m);
        let deps = DependencyTable::build(&m, &xbits)?;
        Ok((m, xbits, deps))
    }

    #[test]
    fn test_cx_single_dep() {
        let (m, _, deps) = analyse("OPENQASM 2.0;\nqreg q[3];\nCX q[2], q[0];\n").unwrap();
        let (id, _) = m.statements().next().unwrap();
        assert_eq!(deps.dep(id), Some(Dep { from: 2, to: 0 }));
        assert_eq!(deps.total(), 1);
    }

    #[test]
    fn test_single_qubit_gates_have_no_deps() {
        let (m, _, deps) =
            analyse("OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nU(0, 0, 0) q[0];\nreset q[1];\nmeasure q[0] -> c[0];\n")
                .unwrap();
        for (id, _) in m.statements() {
            assert!(deps.dep(id).is_none());
        }
    }

    #[test]
    fn test_call_lifts_gate_deps() {
        let src = "OPENQASM 2.0;\nqreg q[4];\ngate flip a, b { CX b, a; }\nflip q[1], q[3];\n";
        let (m, _, deps) = analyse(src).unwrap();
        let (id, _) = m.statements().next().unwrap();
        assert_eq!(deps.dep(id), Some(Dep { from: 3, to: 1 }));
    }

    #[test]
    fn test_transitive_lift() {
        let src = "OPENQASM 2.0;\nqreg q[3];\ngate inner a, b { CX a, b; }\ngate outer x, y { inner y, x; }\nouter q[0], q[2];\n";
        let (m, _, deps) = analyse(src).unwrap();
        let (id, _) = m.statements().next().unwrap();
        assert_eq!(deps.dep(id), Some(Dep { from: 2, to: 0 }));
    }

    #[test]
    fn test_multi_dep_call_is_unsupported() {
        let src = "OPENQASM 2.0;\nqreg q[3];\ngate pair a, b, c { CX a, b; CX b, c; }\npair q[0], q[1], q[2];\n";
        let err = analyse(src).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedCall { .. }));
    }

    #[test]
    fn test_conditional_inherits_deps() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ncreg c[1];\nif (c == 1) CX q[0], q[1];\n";
        let (m, _, deps) = analyse(src).unwrap();
        let (id, _) = m.statements().next().unwrap();
        assert_eq!(deps.dep(id), Some(Dep { from: 0, to: 1 }));
    }

    #[test]
    fn test_multi_qubit_opaque_is_unsupported() {
        let src = "OPENQASM 2.0;\nqreg q[2];\nopaque magic a, b;\nmagic q[0], q[1];\n";
        let err = analyse(src).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedCall { .. }));
    }
}
