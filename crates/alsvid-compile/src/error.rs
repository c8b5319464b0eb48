//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during allocation and rewriting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A statement carries more than one two-qubit dependency.
    ///
    /// Multi-dependency calls must be inlined away before allocation.
    #[error("Unsupported call with multiple dependencies: {stmt}")]
    UnsupportedCall {
        /// Rendered form of the offending statement.
        stmt: String,
    },

    /// The program uses more virtual qubits than the device provides.
    #[error("Program uses {virtuals} qubits, but the device only has {physicals}")]
    OverCapacity { virtuals: u32, physicals: u32 },

    /// An internal invariant was violated. Not recoverable.
    #[error("Internal error: {0}")]
    Unreachable(String),

    /// IR-level failure.
    #[error(transparent)]
    Ir(#[from] alsvid_ir::IrError),

    /// Architecture-level failure.
    #[error(transparent)]
    Arch(#[from] alsvid_arch::ArchError),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
