//! Qubit-argument renaming.
//!
//! Allocation passes rewrite programs by substituting each quantum
//! argument through a name table. Classical arguments (measure targets,
//! condition registers) are never renamed.

use rustc_hash::FxHashMap;

use crate::ast::{Arg, Qop, Stmt};

/// Maps the string form of a quantum argument (`q[3]`, or a gate formal)
/// to its replacement.
pub type RenameTable = FxHashMap<String, Arg>;

/// Rename every quantum argument of `qop` through `table`.
///
/// Arguments without a table entry are left untouched.
pub fn rename_qop_qargs(qop: &mut Qop, table: &RenameTable) {
    for arg in qop.qargs_mut() {
        if let Some(replacement) = table.get(&arg.to_string()) {
            *arg = replacement.clone();
        }
    }
}

/// Rename every quantum argument of `stmt` through `table`.
///
/// The classical condition, if any, is preserved as-is.
pub fn rename_stmt_qargs(stmt: &mut Stmt, table: &RenameTable) {
    rename_qop_qargs(&mut stmt.qop, table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Cond, Expr};

    #[test]
    fn test_rename_cx() {
        let mut table = RenameTable::default();
        table.insert("q[0]".into(), Arg::idx("p", 4));
        table.insert("q[1]".into(), Arg::idx("p", 2));

        let mut stmt = Stmt::bare(Qop::Cx {
            control: Arg::idx("q", 0),
            target: Arg::idx("q", 1),
        });
        rename_stmt_qargs(&mut stmt, &table);
        assert_eq!(stmt.to_string(), "CX p[4], p[2];");
    }

    #[test]
    fn test_rename_keeps_classical() {
        let mut table = RenameTable::default();
        table.insert("q[1]".into(), Arg::idx("p", 0));

        let mut stmt = Stmt::guarded(
            Cond {
                reg: "c".into(),
                value: 2,
            },
            Qop::Measure {
                qarg: Arg::idx("q", 1),
                carg: Arg::idx("c", 1),
            },
        );
        rename_stmt_qargs(&mut stmt, &table);
        assert_eq!(stmt.to_string(), "if (c == 2) measure p[0] -> c[1];");
    }

    #[test]
    fn test_rename_untouched_without_entry() {
        let table = RenameTable::default();
        let mut stmt = Stmt::bare(Qop::U {
            theta: Expr::Pi,
            phi: Expr::Int(0),
            lambda: Expr::Int(0),
            target: Arg::idx("q", 0),
        });
        rename_stmt_qargs(&mut stmt, &table);
        assert_eq!(stmt.to_string(), "U(pi, 0, 0) q[0];");
    }
}
