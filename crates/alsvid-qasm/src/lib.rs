//! OpenQASM 2.0 front end for Alsvid.
//!
//! Provides [`parse`] from source text into an [`alsvid_ir::QModule`] and
//! [`emit`] back to canonical source. The bundled standard gate library
//! (`qelib1.inc`) is recognised by name in `include` statements.
//!
//! ```rust
//! let m = alsvid_qasm::parse(
//!     "OPENQASM 2.0;\nqreg q[2];\nCX q[0], q[1];\n",
//! ).unwrap();
//! assert_eq!(m.num_statements(), 1);
//! assert_eq!(alsvid_qasm::emit(&m), m.to_string());
//! ```

pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod stdlib;

pub use emitter::emit;
pub use error::{ParseError, ParseResult};
pub use parser::parse;
