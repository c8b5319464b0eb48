//! Error types for the IR crate.

use crate::qmodule::StmtId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A register with this name already exists.
    #[error("Register '{0}' is already declared")]
    DuplicateRegister(String),

    /// A gate with this name already exists.
    #[error("Gate '{0}' is already declared")]
    DuplicateGate(String),

    /// No register with this name.
    #[error("Register '{0}' is not declared")]
    UnknownRegister(String),

    /// No gate with this name.
    #[error("Gate '{0}' is not declared")]
    UnknownGate(String),

    /// Statement reference did not resolve.
    #[error("Statement {0:?} not found in module")]
    StatementNotFound(StmtId),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
