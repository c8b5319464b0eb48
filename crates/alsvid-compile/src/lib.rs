//! Alsvid Qubit Allocation
//!
//! This crate turns an OpenQASM program that applies two-qubit gates
//! between arbitrary virtual qubits into an equivalent program whose
//! every two-qubit gate acts on physically adjacent qubits of a target
//! device, together with the initial virtual-to-physical mapping.
//!
//! # Pipeline
//!
//! ```text
//! parse → flatten → inline-to-basis → analyses → allocator
//!       → reverse-edge lowering → (optional) verify → emit
//! ```
//!
//! # Allocators
//!
//! | Key | Strategy |
//! |-----|----------|
//! | `Q_bmt` | Bounded mapping tree: partition / DP / reconstruction |
//! | `Q_sabre` | Front-layer heuristic with lookahead scoring |
//! | `Q_greedy` | Circuit walking, cheapest immediate action |
//! | `Q_dynprog` | Exact DP over placement permutations (small devices) |
//!
//! All allocators satisfy the same contract: the rewritten program is
//! architecture-legal (checked by [`verify::ArchVerifierPass`]) and
//! semantically faithful to the source (checked by
//! [`verify::SemanticVerifierPass`]).
//!
//! # Example
//!
//! ```rust
//! use alsvid_compile::{CompileSettings, compile};
//! use alsvid_arch::presets;
//!
//! let m = alsvid_qasm::parse(
//!     "OPENQASM 2.0;\nqreg q[5];\nCX q[0], q[4];\n",
//! ).unwrap();
//!
//! let settings = CompileSettings { verify: true, ..CompileSettings::default() };
//! let out = compile(m, &presets::square5(), &settings).unwrap();
//!
//! assert!(out.verify.unwrap().ok());
//! println!("{}", out.module.unwrap());
//! ```

pub mod allocators;
pub mod analysis;
pub mod driver;
pub mod error;
pub mod intrinsics;
pub mod pass;
pub mod passes;
pub mod solution;
pub mod stats;
pub mod verify;

pub use allocators::{
    AllocContext, AllocatorKind, BmtAllocator, BmtConfig, CostConfig, DynprogAllocator,
    GreedyAllocator, QbitAllocator, SabreAllocator,
};
pub use driver::{CompileOutput, CompileSettings, compile};
pub use error::{CompileError, CompileResult};
pub use pass::Pass;
pub use stats::Stats;
pub use verify::VerifyReport;
