//! Alsvid Program Intermediate Representation
//!
//! This crate provides the typed representation of an OpenQASM 2.0 program
//! used throughout the Alsvid compilation stack.
//!
//! # Overview
//!
//! The central type is [`QModule`]: an ordered program holding register
//! declarations, gate declarations, and a list of top-level statements.
//! Statements are value enums ([`Qop`]) wrapped in [`Stmt`] together with an
//! optional classical condition; every top-level statement carries a
//! module-unique [`StmtId`] that passes and analyses use as a stable
//! reference while the module is rewritten.
//!
//! # Example: building a module by hand
//!
//! ```rust
//! use alsvid_ir::{Arg, QModule, Qop, RegKind, Stmt};
//!
//! let mut m = QModule::new();
//! m.add_reg("q", 2, RegKind::Quantum).unwrap();
//! m.push_statement(Stmt::bare(Qop::Cx {
//!     control: Arg::idx("q", 0),
//!     target: Arg::idx("q", 1),
//! }));
//!
//! assert_eq!(m.to_string(), "OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n");
//! ```

pub mod ast;
pub mod error;
pub mod qmodule;
pub mod rename;

pub use ast::{Arg, BinOp, Cond, Expr, GateDecl, Qop, RegDecl, RegKind, Stmt, UnOp};
pub use error::{IrError, IrResult};
pub use qmodule::{QModule, StmtId};
pub use rename::{RenameTable, rename_qop_qargs, rename_stmt_qargs};
